// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversation and message repository.
//!
//! Deletion is per member: a [`ConversationDeletion`] marker hides the
//! conversation from one user, and messages older than the marker stay
//! hidden from that user. Sending a new message clears the markers of both
//! members.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Conversation, ConversationDeletion, Message};
use crate::storage::StoreResult;

/// Page of a conversation, newest message first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePage {
    pub offset: usize,
    pub limit: usize,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create_conversation(&self, conversation: &Conversation) -> StoreResult<()>;

    async fn get_conversation(&self, conversation_id: &str) -> StoreResult<Conversation>;

    /// Conversation between two users, in either order.
    async fn find_conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> StoreResult<Option<Conversation>>;

    /// Conversations of `user_id` without a deletion marker for that user,
    /// ordered by `last_message_at` descending (nulls last) then
    /// `created_at` descending.
    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>>;

    async fn touch_conversation(&self, conversation_id: &str, at: DateTime<Utc>)
        -> StoreResult<()>;

    async fn deletion_marker(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> StoreResult<Option<ConversationDeletion>>;

    /// Fails with `Conflict` when the user already has a marker.
    async fn create_deletion_marker(&self, marker: &ConversationDeletion) -> StoreResult<()>;

    /// Remove the markers of every member of the conversation.
    async fn clear_deletion_markers(&self, conversation_id: &str) -> StoreResult<()>;

    async fn create_message(&self, message: &Message) -> StoreResult<()>;

    async fn get_message(&self, message_id: &str) -> StoreResult<Message>;

    async fn update_message(&self, message: &Message) -> StoreResult<()>;

    /// Non-deleted messages created after `after` (all when `None`).
    async fn list_messages(
        &self,
        conversation_id: &str,
        after: Option<DateTime<Utc>>,
        page: MessagePage,
    ) -> StoreResult<Vec<Message>>;

    /// Most recent non-deleted message created after `after`.
    async fn last_message(
        &self,
        conversation_id: &str,
        after: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Message>>;

    /// Unread, non-deleted messages addressed to `receiver_id`.
    async fn unread_count(
        &self,
        conversation_id: &str,
        receiver_id: &str,
        after: Option<DateTime<Utc>>,
    ) -> StoreResult<i64>;

    /// Mark every unread message addressed to `receiver_id` and created
    /// after `after` as read. Returns how many were updated.
    async fn mark_read(
        &self,
        conversation_id: &str,
        receiver_id: &str,
        after: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;
}
