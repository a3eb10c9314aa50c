// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{expect_rows, store_error, to_limit, PgStore};
use crate::models::{Conversation, ConversationDeletion, Message};
use crate::storage::repository::MessagePage;
use crate::storage::{MessageRepository, StoreResult};

const CONVERSATION_COLUMNS: &str =
    "id, created_at, updated_at, user1_id, user2_id, last_message_at";
const MESSAGE_COLUMNS: &str = "id, created_at, updated_at, conversation_id, sender_id, \
     receiver_id, content, message_type, media_url, is_read, read_at, is_deleted, deleted_at";

#[async_trait]
impl MessageRepository for PgStore {
    async fn create_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO conversations \
             (id, created_at, updated_at, user1_id, user2_id, last_message_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&conversation.id)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .bind(&conversation.user1_id)
        .bind(&conversation.user2_id)
        .bind(conversation.last_message_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Conversation"))?;
        Ok(())
    }

    async fn get_conversation(&self, conversation_id: &str) -> StoreResult<Conversation> {
        sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Conversation"))
    }

    async fn find_conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> StoreResult<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE (user1_id = $1 AND user2_id = $2) OR (user1_id = $2 AND user2_id = $1) \
             ORDER BY created_at LIMIT 1"
        ))
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Conversation"))
    }

    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "SELECT c.id, c.created_at, c.updated_at, c.user1_id, c.user2_id, c.last_message_at \
             FROM conversations c \
             WHERE (c.user1_id = $1 OR c.user2_id = $1) \
             AND NOT EXISTS (SELECT 1 FROM conversation_deletions d \
                             WHERE d.conversation_id = c.id AND d.user_id = $1) \
             ORDER BY c.last_message_at DESC NULLS LAST, c.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Conversation"))
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET last_message_at = $2, updated_at = $2 WHERE id = $1",
        )
        .bind(conversation_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Conversation"))?;
        expect_rows(result, "Conversation")
    }

    async fn deletion_marker(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> StoreResult<Option<ConversationDeletion>> {
        sqlx::query_as::<_, ConversationDeletion>(
            "SELECT id, user_id, conversation_id, deleted_at FROM conversation_deletions \
             WHERE user_id = $1 AND conversation_id = $2",
        )
        .bind(user_id)
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Conversation deletion"))
    }

    async fn create_deletion_marker(&self, marker: &ConversationDeletion) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO conversation_deletions (id, user_id, conversation_id, deleted_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&marker.id)
        .bind(&marker.user_id)
        .bind(&marker.conversation_id)
        .bind(marker.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Conversation deletion"))?;
        Ok(())
    }

    async fn clear_deletion_markers(&self, conversation_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM conversation_deletions WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await
            .map_err(store_error("Conversation deletion"))?;
        Ok(())
    }

    async fn create_message(&self, message: &Message) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, created_at, updated_at, conversation_id, sender_id, \
             receiver_id, content, message_type, media_url, is_read, read_at, is_deleted, \
             deleted_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&message.id)
        .bind(message.created_at)
        .bind(message.updated_at)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(&message.media_url)
        .bind(message.is_read)
        .bind(message.read_at)
        .bind(message.is_deleted)
        .bind(message.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Message"))?;
        Ok(())
    }

    async fn get_message(&self, message_id: &str) -> StoreResult<Message> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(message_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Message"))
    }

    async fn update_message(&self, message: &Message) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE messages SET updated_at = $2, content = $3, media_url = $4, is_read = $5, \
             read_at = $6, is_deleted = $7, deleted_at = $8 WHERE id = $1",
        )
        .bind(&message.id)
        .bind(message.updated_at)
        .bind(&message.content)
        .bind(&message.media_url)
        .bind(message.is_read)
        .bind(message.read_at)
        .bind(message.is_deleted)
        .bind(message.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Message"))?;
        expect_rows(result, "Message")
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        after: Option<DateTime<Utc>>,
        page: MessagePage,
    ) -> StoreResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 AND NOT is_deleted \
             AND ($2::timestamptz IS NULL OR created_at > $2) \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(conversation_id)
        .bind(after)
        .bind(to_limit(page.limit))
        .bind(to_limit(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("Message"))
    }

    async fn last_message(
        &self,
        conversation_id: &str,
        after: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Message>> {
        sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = $1 AND NOT is_deleted \
             AND ($2::timestamptz IS NULL OR created_at > $2) \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(conversation_id)
        .bind(after)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("Message"))
    }

    async fn unread_count(
        &self,
        conversation_id: &str,
        receiver_id: &str,
        after: Option<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages \
             WHERE conversation_id = $1 AND receiver_id = $2 AND NOT is_read AND NOT is_deleted \
             AND ($3::timestamptz IS NULL OR created_at > $3)",
        )
        .bind(conversation_id)
        .bind(receiver_id)
        .bind(after)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("Message"))
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        receiver_id: &str,
        after: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE, read_at = $4, updated_at = $4 \
             WHERE conversation_id = $1 AND receiver_id = $2 AND NOT is_read \
             AND ($3::timestamptz IS NULL OR created_at > $3)",
        )
        .bind(conversation_id)
        .bind(receiver_id)
        .bind(after)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_error("Message"))?;
        Ok(result.rows_affected())
    }
}
