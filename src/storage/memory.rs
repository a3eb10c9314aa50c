// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory backend for every repository.
//!
//! Used by the test suite and by development runs without `DATABASE_URL`.
//! Nothing is persisted across restarts.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{
    reports::{ReasonCount, StatusCount, TargetTypeCount},
    ActivityCounts, CommentRepository, ContentDistribution, FeedFilter, FollowRepository,
    LikeRepository, MessagePage, MessageRepository, PlatformTotals, PostCounts, PostRepository,
    ReportFilter, ReportPage, ReportRepository, ReportStats, StatsRepository,
    SubscriptionRepository, TopUserByLikes, TopUserByPosts, UserRepository,
};
use super::{StoreError, StoreResult};
use crate::models::{
    Comment, Conversation, ConversationDeletion, Follow, Like, Message, Post, Report,
    ReportReason, ReportStatus, ReportTargetType, Subscription, User,
};

#[derive(Default)]
struct MemoryData {
    users: HashMap<String, User>,
    posts: HashMap<String, Post>,
    comments: HashMap<String, Comment>,
    likes: Vec<Like>,
    follows: Vec<Follow>,
    subscriptions: HashMap<String, Subscription>,
    conversations: HashMap<String, Conversation>,
    deletions: Vec<ConversationDeletion>,
    messages: HashMap<String, Message>,
    reports: HashMap<String, Report>,
}

impl MemoryData {
    fn user_list(&self, ids: impl Iterator<Item = String>) -> Vec<User> {
        ids.filter_map(|id| self.users.get(&id).cloned()).collect()
    }

    fn username_of(&self, user_id: &str) -> String {
        self.users
            .get(user_id)
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }
}

/// Shared in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

fn visible_after(created_at: DateTime<Utc>, after: Option<DateTime<Utc>>) -> bool {
    after.map_or(true, |marker| created_at > marker)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let taken = data.users.values().any(|existing| {
            existing.id == user.id
                || existing.email.eq_ignore_ascii_case(&user.email)
                || existing.username == user.username
        });
        if taken {
            return Err(StoreError::Conflict("User".to_string()));
        }
        data.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get(&self, user_id: &str) -> StoreResult<User> {
        self.data
            .read()
            .await
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("User".to_string()))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if !data.users.contains_key(&user.id) {
            return Err(StoreError::NotFound("User".to_string()));
        }
        let collision = data.users.values().any(|other| {
            other.id != user.id
                && (other.username == user.username || other.email.eq_ignore_ascii_case(&user.email))
        });
        if collision {
            return Err(StoreError::Conflict("Username".to_string()));
        }
        data.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> StoreResult<()> {
        self.data
            .write()
            .await
            .users
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("User".to_string()))
    }

    async fn search(&self, query: &str, limit: usize) -> StoreResult<Vec<User>> {
        let needle = query.to_lowercase();
        let data = self.data.read().await;
        let mut matches: Vec<User> = data
            .users
            .values()
            .filter(|user| {
                user.username.to_lowercase().contains(&needle)
                    || user.firstname.to_lowercase().contains(&needle)
                    || user.lastname.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn is_admin(&self, user_id: &str) -> StoreResult<bool> {
        UserRepository::get(self, user_id)
            .await
            .map(|user| user.is_admin)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, post: &Post) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if data.posts.contains_key(&post.id) {
            return Err(StoreError::Conflict("Post".to_string()));
        }
        data.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get(&self, post_id: &str) -> StoreResult<Post> {
        self.data
            .read()
            .await
            .posts
            .get(post_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Post".to_string()))
    }

    async fn list_by_user(&self, user_id: &str, include_paid: bool) -> StoreResult<Vec<Post>> {
        let data = self.data.read().await;
        let mut posts: Vec<Post> = data
            .posts
            .values()
            .filter(|post| post.user_id == user_id && (include_paid || !post.is_paid))
            .cloned()
            .collect();
        newest_first(&mut posts, |post| post.created_at);
        Ok(posts)
    }

    async fn list_feed(&self, filter: &FeedFilter) -> StoreResult<Vec<Post>> {
        let data = self.data.read().await;
        let mut posts: Vec<Post> = data
            .posts
            .values()
            .filter(|post| {
                !post.is_paid || filter.include_paid_of.as_deref() == Some(post.user_id.as_str())
            })
            .cloned()
            .collect();
        newest_first(&mut posts, |post| post.created_at);
        Ok(posts)
    }

    async fn delete(&self, post_id: &str) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if data.posts.remove(post_id).is_none() {
            return Err(StoreError::NotFound("Post".to_string()));
        }
        data.likes.retain(|like| like.post_id != post_id);
        data.comments.retain(|_, comment| comment.post_id != post_id);
        Ok(())
    }

    async fn counts_for_user(&self, user_id: &str) -> StoreResult<PostCounts> {
        let data = self.data.read().await;
        let mut counts = PostCounts::default();
        for post in data.posts.values().filter(|post| post.user_id == user_id) {
            counts.total += 1;
            if post.is_paid {
                counts.paid += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: &Comment) -> StoreResult<()> {
        let mut data = self.data.write().await;
        data.comments.insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn get(&self, comment_id: &str) -> StoreResult<Comment> {
        self.data
            .read()
            .await
            .comments
            .get(comment_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Comment".to_string()))
    }

    async fn list_for_post(&self, post_id: &str) -> StoreResult<Vec<Comment>> {
        let data = self.data.read().await;
        let mut comments: Vec<Comment> = data
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        newest_first(&mut comments, |comment| comment.created_at);
        Ok(comments)
    }

    async fn delete(&self, comment_id: &str) -> StoreResult<()> {
        self.data
            .write()
            .await
            .comments
            .remove(comment_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("Comment".to_string()))
    }
}

#[async_trait]
impl LikeRepository for MemoryStore {
    async fn toggle(&self, user_id: &str, post_id: &str) -> StoreResult<bool> {
        let mut data = self.data.write().await;
        let existing = data
            .likes
            .iter()
            .position(|like| like.user_id == user_id && like.post_id == post_id);
        match existing {
            Some(index) => {
                data.likes.remove(index);
                Ok(false)
            }
            None => {
                data.likes.push(Like {
                    id: Uuid::new_v4().to_string(),
                    created_at: Utc::now(),
                    user_id: user_id.to_string(),
                    post_id: post_id.to_string(),
                });
                Ok(true)
            }
        }
    }

    async fn is_liked(&self, user_id: &str, post_id: &str) -> StoreResult<bool> {
        let data = self.data.read().await;
        Ok(data
            .likes
            .iter()
            .any(|like| like.user_id == user_id && like.post_id == post_id))
    }

    async fn count_for_post(&self, post_id: &str) -> StoreResult<i64> {
        let data = self.data.read().await;
        Ok(data.likes.iter().filter(|like| like.post_id == post_id).count() as i64)
    }
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn create(&self, follow: &Follow) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let duplicate = data.follows.iter().any(|existing| {
            existing.follower_id == follow.follower_id && existing.creator_id == follow.creator_id
        });
        if duplicate {
            return Err(StoreError::Conflict("Follow".to_string()));
        }
        data.follows.push(follow.clone());
        Ok(())
    }

    async fn delete(&self, follower_id: &str, creator_id: &str) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let before = data.follows.len();
        data.follows
            .retain(|follow| !(follow.follower_id == follower_id && follow.creator_id == creator_id));
        if data.follows.len() == before {
            return Err(StoreError::NotFound("Follow".to_string()));
        }
        Ok(())
    }

    async fn is_following(&self, follower_id: &str, creator_id: &str) -> StoreResult<bool> {
        let data = self.data.read().await;
        Ok(data
            .follows
            .iter()
            .any(|follow| follow.follower_id == follower_id && follow.creator_id == creator_id))
    }

    async fn following(&self, follower_id: &str) -> StoreResult<Vec<User>> {
        let data = self.data.read().await;
        let mut follows: Vec<&Follow> = data
            .follows
            .iter()
            .filter(|follow| follow.follower_id == follower_id)
            .collect();
        follows.sort_by_key(|follow| std::cmp::Reverse(follow.created_at));
        Ok(data.user_list(follows.into_iter().map(|follow| follow.creator_id.clone())))
    }

    async fn followers(&self, creator_id: &str) -> StoreResult<Vec<User>> {
        let data = self.data.read().await;
        let mut follows: Vec<&Follow> = data
            .follows
            .iter()
            .filter(|follow| follow.creator_id == creator_id)
            .collect();
        follows.sort_by_key(|follow| std::cmp::Reverse(follow.created_at));
        Ok(data.user_list(follows.into_iter().map(|follow| follow.follower_id.clone())))
    }

    async fn count_followers(&self, creator_id: &str) -> StoreResult<i64> {
        let data = self.data.read().await;
        Ok(data
            .follows
            .iter()
            .filter(|follow| follow.creator_id == creator_id)
            .count() as i64)
    }

    async fn count_following(&self, follower_id: &str) -> StoreResult<i64> {
        let data = self.data.read().await;
        Ok(data
            .follows
            .iter()
            .filter(|follow| follow.follower_id == follower_id)
            .count() as i64)
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn find(
        &self,
        subscriber_id: &str,
        creator_id: &str,
    ) -> StoreResult<Option<Subscription>> {
        let data = self.data.read().await;
        Ok(data
            .subscriptions
            .values()
            .find(|sub| sub.subscriber_id == subscriber_id && sub.creator_id == creator_id)
            .cloned())
    }

    async fn save(&self, subscription: &Subscription) -> StoreResult<()> {
        let mut data = self.data.write().await;
        data.subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    async fn count_active_subscribers(&self, creator_id: &str) -> StoreResult<i64> {
        let data = self.data.read().await;
        Ok(data
            .subscriptions
            .values()
            .filter(|sub| sub.creator_id == creator_id && sub.is_active())
            .count() as i64)
    }

    async fn count_active_subscriptions(&self, subscriber_id: &str) -> StoreResult<i64> {
        let data = self.data.read().await;
        Ok(data
            .subscriptions
            .values()
            .filter(|sub| sub.subscriber_id == subscriber_id && sub.is_active())
            .count() as i64)
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn create_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        let mut data = self.data.write().await;
        data.conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, conversation_id: &str) -> StoreResult<Conversation> {
        self.data
            .read()
            .await
            .conversations
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Conversation".to_string()))
    }

    async fn find_conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> StoreResult<Option<Conversation>> {
        let data = self.data.read().await;
        Ok(data
            .conversations
            .values()
            .find(|c| {
                (c.user1_id == user_a && c.user2_id == user_b)
                    || (c.user1_id == user_b && c.user2_id == user_a)
            })
            .cloned())
    }

    async fn list_conversations(&self, user_id: &str) -> StoreResult<Vec<Conversation>> {
        let data = self.data.read().await;
        let mut conversations: Vec<Conversation> = data
            .conversations
            .values()
            .filter(|c| c.has_member(user_id))
            .filter(|c| {
                !data
                    .deletions
                    .iter()
                    .any(|marker| marker.user_id == user_id && marker.conversation_id == c.id)
            })
            .cloned()
            .collect();
        conversations.sort_by(|a, b| {
            let by_last_message = match (a.last_message_at, b.last_message_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_last_message.then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(conversations)
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let conversation = data
            .conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::NotFound("Conversation".to_string()))?;
        conversation.last_message_at = Some(at);
        conversation.updated_at = at;
        Ok(())
    }

    async fn deletion_marker(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> StoreResult<Option<ConversationDeletion>> {
        let data = self.data.read().await;
        Ok(data
            .deletions
            .iter()
            .find(|marker| marker.user_id == user_id && marker.conversation_id == conversation_id)
            .cloned())
    }

    async fn create_deletion_marker(&self, marker: &ConversationDeletion) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let exists = data.deletions.iter().any(|existing| {
            existing.user_id == marker.user_id && existing.conversation_id == marker.conversation_id
        });
        if exists {
            return Err(StoreError::Conflict("Conversation deletion".to_string()));
        }
        data.deletions.push(marker.clone());
        Ok(())
    }

    async fn clear_deletion_markers(&self, conversation_id: &str) -> StoreResult<()> {
        let mut data = self.data.write().await;
        data.deletions
            .retain(|marker| marker.conversation_id != conversation_id);
        Ok(())
    }

    async fn create_message(&self, message: &Message) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if !data.conversations.contains_key(&message.conversation_id) {
            return Err(StoreError::NotFound("Conversation".to_string()));
        }
        data.messages.insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn get_message(&self, message_id: &str) -> StoreResult<Message> {
        self.data
            .read()
            .await
            .messages
            .get(message_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Message".to_string()))
    }

    async fn update_message(&self, message: &Message) -> StoreResult<()> {
        let mut data = self.data.write().await;
        match data.messages.get_mut(&message.id) {
            Some(stored) => {
                *stored = message.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("Message".to_string())),
        }
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        after: Option<DateTime<Utc>>,
        page: MessagePage,
    ) -> StoreResult<Vec<Message>> {
        let data = self.data.read().await;
        let mut messages: Vec<Message> = data
            .messages
            .values()
            .filter(|m| {
                m.conversation_id == conversation_id
                    && !m.is_deleted
                    && visible_after(m.created_at, after)
            })
            .cloned()
            .collect();
        newest_first(&mut messages, |m| m.created_at);
        Ok(messages
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }

    async fn last_message(
        &self,
        conversation_id: &str,
        after: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Message>> {
        let data = self.data.read().await;
        Ok(data
            .messages
            .values()
            .filter(|m| {
                m.conversation_id == conversation_id
                    && !m.is_deleted
                    && visible_after(m.created_at, after)
            })
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    async fn unread_count(
        &self,
        conversation_id: &str,
        receiver_id: &str,
        after: Option<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        let data = self.data.read().await;
        Ok(data
            .messages
            .values()
            .filter(|m| {
                m.conversation_id == conversation_id
                    && m.receiver_id == receiver_id
                    && !m.is_read
                    && !m.is_deleted
                    && visible_after(m.created_at, after)
            })
            .count() as i64)
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        receiver_id: &str,
        after: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut data = self.data.write().await;
        let mut updated = 0;
        for message in data.messages.values_mut().filter(|m| {
            m.conversation_id == conversation_id
                && m.receiver_id == receiver_id
                && !m.is_read
                && after.map_or(true, |after| m.created_at > after)
        }) {
            message.is_read = true;
            message.read_at = Some(at);
            message.updated_at = at;
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn create(&self, report: &Report) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let duplicate = data.reports.values().any(|existing| {
            existing.reporter_id == report.reporter_id
                && existing.target_type == report.target_type
                && existing.target_id == report.target_id
        });
        if duplicate {
            return Err(StoreError::Conflict("Report".to_string()));
        }
        data.reports.insert(report.id.clone(), report.clone());
        Ok(())
    }

    async fn get(&self, report_id: &str) -> StoreResult<Report> {
        self.data
            .read()
            .await
            .reports
            .get(report_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Report".to_string()))
    }

    async fn exists_for(
        &self,
        reporter_id: &str,
        target_type: ReportTargetType,
        target_id: &str,
    ) -> StoreResult<bool> {
        let data = self.data.read().await;
        Ok(data.reports.values().any(|report| {
            report.reporter_id == reporter_id
                && report.target_type == target_type
                && report.target_id == target_id
        }))
    }

    async fn update(&self, report: &Report) -> StoreResult<()> {
        let mut data = self.data.write().await;
        match data.reports.get_mut(&report.id) {
            Some(stored) => {
                *stored = report.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("Report".to_string())),
        }
    }

    async fn delete(&self, report_id: &str) -> StoreResult<()> {
        self.data
            .write()
            .await
            .reports
            .remove(report_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("Report".to_string()))
    }

    async fn list(
        &self,
        filter: &ReportFilter,
        offset: usize,
        limit: usize,
    ) -> StoreResult<ReportPage> {
        let data = self.data.read().await;
        let mut reports: Vec<Report> = data
            .reports
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.target_type.map_or(true, |t| r.target_type == t))
            .filter(|r| filter.reason.map_or(true, |reason| r.reason == reason))
            .cloned()
            .collect();
        newest_first(&mut reports, |r| r.created_at);
        let total = reports.len() as i64;
        Ok(ReportPage {
            reports: reports.into_iter().skip(offset).take(limit).collect(),
            total,
        })
    }

    async fn stats(&self, since: DateTime<Utc>) -> StoreResult<ReportStats> {
        let data = self.data.read().await;
        let reports: Vec<&Report> = data.reports.values().collect();

        let stats_by_status = ReportStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: reports.iter().filter(|r| r.status == *status).count() as i64,
            })
            .filter(|entry| entry.count > 0)
            .collect();
        let stats_by_type = ReportTargetType::ALL
            .iter()
            .map(|target_type| TargetTypeCount {
                target_type: *target_type,
                count: reports
                    .iter()
                    .filter(|r| r.target_type == *target_type)
                    .count() as i64,
            })
            .filter(|entry| entry.count > 0)
            .collect();
        let stats_by_reason = ReportReason::ALL
            .iter()
            .map(|reason| ReasonCount {
                reason: *reason,
                count: reports.iter().filter(|r| r.reason == *reason).count() as i64,
            })
            .filter(|entry| entry.count > 0)
            .collect();

        Ok(ReportStats {
            stats_by_status,
            stats_by_type,
            stats_by_reason,
            recent_count: reports.iter().filter(|r| r.created_at > since).count() as i64,
        })
    }
}

#[async_trait]
impl StatsRepository for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        let _data = self.data.read().await;
        Ok(())
    }

    async fn totals(&self) -> StoreResult<PlatformTotals> {
        let data = self.data.read().await;
        Ok(PlatformTotals {
            total_users: data.users.len() as i64,
            creators_count: data.users.values().filter(|u| u.is_creator).count() as i64,
            total_posts: data.posts.len() as i64,
            premium_posts: data.posts.values().filter(|p| p.is_paid).count() as i64,
            total_likes: data.likes.len() as i64,
            total_messages: data.messages.values().filter(|m| !m.is_deleted).count() as i64,
        })
    }

    async fn activity_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<ActivityCounts> {
        let data = self.data.read().await;
        let within = |at: DateTime<Utc>| at >= start && at < end;
        Ok(ActivityCounts {
            users: data.users.values().filter(|u| within(u.created_at)).count() as i64,
            posts: data.posts.values().filter(|p| within(p.created_at)).count() as i64,
            likes: data.likes.iter().filter(|l| within(l.created_at)).count() as i64,
            messages: data
                .messages
                .values()
                .filter(|m| !m.is_deleted && within(m.created_at))
                .count() as i64,
        })
    }

    async fn distribution_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<ContentDistribution> {
        let data = self.data.read().await;
        let within = |at: DateTime<Utc>| at >= start && at <= end;
        Ok(ContentDistribution {
            free_posts: data
                .posts
                .values()
                .filter(|p| !p.is_paid && within(p.created_at))
                .count() as i64,
            paid_posts: data
                .posts
                .values()
                .filter(|p| p.is_paid && within(p.created_at))
                .count() as i64,
            likes: data.likes.iter().filter(|l| within(l.created_at)).count() as i64,
            messages: data
                .messages
                .values()
                .filter(|m| !m.is_deleted && within(m.created_at))
                .count() as i64,
        })
    }

    async fn top_by_posts(&self, limit: usize) -> StoreResult<Vec<TopUserByPosts>> {
        let data = self.data.read().await;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for post in data.posts.values() {
            *counts.entry(post.user_id.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<TopUserByPosts> = counts
            .into_iter()
            .map(|(user_id, post_count)| TopUserByPosts {
                user_id: user_id.to_string(),
                username: data.username_of(user_id),
                post_count,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.post_count
                .cmp(&a.post_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn top_by_likes(&self, limit: usize) -> StoreResult<Vec<TopUserByLikes>> {
        let data = self.data.read().await;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for like in &data.likes {
            if let Some(post) = data.posts.get(&like.post_id) {
                *counts.entry(post.user_id.as_str()).or_default() += 1;
            }
        }
        let mut ranked: Vec<TopUserByLikes> = counts
            .into_iter()
            .map(|(user_id, likes_count)| TopUserByLikes {
                user_id: user_id.to_string(),
                username: data.username_of(user_id),
                likes_count,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.likes_count
                .cmp(&a.likes_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, MessageType, Theme};
    use chrono::Duration;

    fn user(id: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            created_at: Utc::now(),
            email: format!("{username}@example.com"),
            username: username.to_string(),
            firstname: "First".to_string(),
            lastname: "Last".to_string(),
            avatar_url: String::new(),
            bio: String::new(),
            language: Language::Fr,
            theme: Theme::Light,
            is_admin: false,
            is_creator: false,
            subscription_price: 0.0,
            stripe_account_id: None,
        }
    }

    fn post(id: &str, user_id: &str, is_paid: bool, age_minutes: i64) -> Post {
        Post {
            id: id.to_string(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
            user_id: user_id.to_string(),
            title: format!("post {id}"),
            description: String::new(),
            media_url: format!("https://cdn.example.com/posts/{id}.png"),
            is_paid,
        }
    }

    fn message(id: &str, conversation_id: &str, from: &str, to: &str, at: DateTime<Utc>) -> Message {
        Message {
            id: id.to_string(),
            created_at: at,
            updated_at: at,
            conversation_id: conversation_id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            content: "hello".to_string(),
            message_type: MessageType::Text,
            media_url: None,
            is_read: false,
            read_at: None,
            is_deleted: false,
            deleted_at: None,
        }
    }

    fn conversation(id: &str, a: &str, b: &str) -> Conversation {
        let now = Utc::now();
        Conversation {
            id: id.to_string(),
            created_at: now,
            updated_at: now,
            user1_id: a.to_string(),
            user2_id: b.to_string(),
            last_message_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_conflict() {
        let store = MemoryStore::new();
        UserRepository::create(&store, &user("u1", "alice")).await.unwrap();
        let mut other = user("u2", "alice");
        other.email = "other@example.com".to_string();
        let err = UserRepository::create(&store, &other).await.unwrap_err();
        assert_eq!(err, StoreError::Conflict("User".to_string()));
    }

    #[tokio::test]
    async fn is_admin_reports_not_found_for_unknown_user() {
        let store = MemoryStore::new();
        let err = store.is_admin("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn search_matches_names_case_insensitively() {
        let store = MemoryStore::new();
        let mut alice = user("u1", "alice");
        alice.lastname = "Martin".to_string();
        UserRepository::create(&store, &alice).await.unwrap();
        UserRepository::create(&store, &user("u2", "bob")).await.unwrap();

        let found = store.search("mart", 20).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u1");
    }

    #[tokio::test]
    async fn feed_hides_paid_posts_except_the_viewers_own() {
        let store = MemoryStore::new();
        PostRepository::create(&store, &post("free", "u1", false, 3)).await.unwrap();
        PostRepository::create(&store, &post("paid-mine", "me", true, 2)).await.unwrap();
        PostRepository::create(&store, &post("paid-other", "u1", true, 1)).await.unwrap();

        let anonymous = store.list_feed(&FeedFilter::default()).await.unwrap();
        assert_eq!(anonymous.len(), 1);

        let mine = store
            .list_feed(&FeedFilter {
                include_paid_of: Some("me".to_string()),
            })
            .await
            .unwrap();
        let ids: Vec<&str> = mine.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["paid-mine", "free"]);
    }

    #[tokio::test]
    async fn toggling_twice_restores_like_state() {
        let store = MemoryStore::new();
        assert!(store.toggle("u1", "p1").await.unwrap());
        assert_eq!(store.count_for_post("p1").await.unwrap(), 1);
        assert!(!store.toggle("u1", "p1").await.unwrap());
        assert_eq!(store.count_for_post("p1").await.unwrap(), 0);
        assert!(!store.is_liked("u1", "p1").await.unwrap());
    }

    #[tokio::test]
    async fn conversations_order_by_last_message_nulls_last() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut older = conversation("older", "me", "b");
        older.last_message_at = Some(now - Duration::hours(1));
        let mut newer = conversation("newer", "me", "c");
        newer.last_message_at = Some(now);
        let silent = conversation("silent", "d", "me");
        for c in [&older, &silent, &newer] {
            store.create_conversation(c).await.unwrap();
        }

        let listed = store.list_conversations("me").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older", "silent"]);
    }

    #[tokio::test]
    async fn deletion_marker_hides_conversation_for_one_member_only() {
        let store = MemoryStore::new();
        store
            .create_conversation(&conversation("c1", "a", "b"))
            .await
            .unwrap();
        store
            .create_deletion_marker(&ConversationDeletion {
                id: "d1".to_string(),
                user_id: "a".to_string(),
                conversation_id: "c1".to_string(),
                deleted_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.list_conversations("a").await.unwrap().is_empty());
        assert_eq!(store.list_conversations("b").await.unwrap().len(), 1);

        store.clear_deletion_markers("c1").await.unwrap();
        assert_eq!(store.list_conversations("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn messages_before_marker_and_deleted_ones_are_hidden() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .create_conversation(&conversation("c1", "a", "b"))
            .await
            .unwrap();
        store
            .create_message(&message("old", "c1", "b", "a", now - Duration::hours(2)))
            .await
            .unwrap();
        let mut deleted = message("gone", "c1", "b", "a", now - Duration::minutes(5));
        deleted.is_deleted = true;
        store.create_message(&deleted).await.unwrap();
        store
            .create_message(&message("new", "c1", "b", "a", now))
            .await
            .unwrap();

        let marker = Some(now - Duration::hours(1));
        let page = MessagePage { offset: 0, limit: 50 };
        let visible = store.list_messages("c1", marker, page).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "new");
        assert_eq!(store.unread_count("c1", "a", marker).await.unwrap(), 1);
        assert_eq!(store.unread_count("c1", "a", None).await.unwrap(), 2);

        let updated = store.mark_read("c1", "a", marker, now).await.unwrap();
        assert_eq!(updated, 2);
        assert_eq!(store.unread_count("c1", "a", None).await.unwrap(), 1);

        let updated = store.mark_read("c1", "a", None, now).await.unwrap();
        assert_eq!(updated, 1);
        assert_eq!(store.unread_count("c1", "a", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn top_users_rank_by_posts_and_likes() {
        let store = MemoryStore::new();
        UserRepository::create(&store, &user("u1", "alice")).await.unwrap();
        UserRepository::create(&store, &user("u2", "bob")).await.unwrap();
        PostRepository::create(&store, &post("p1", "u1", false, 1)).await.unwrap();
        PostRepository::create(&store, &post("p2", "u1", false, 2)).await.unwrap();
        PostRepository::create(&store, &post("p3", "u2", false, 3)).await.unwrap();
        store.toggle("u1", "p3").await.unwrap();
        store.toggle("u2", "p3").await.unwrap();
        store.toggle("u2", "p1").await.unwrap();

        let by_posts = store.top_by_posts(10).await.unwrap();
        assert_eq!(by_posts[0].username, "alice");
        assert_eq!(by_posts[0].post_count, 2);

        let by_likes = store.top_by_likes(1).await.unwrap();
        assert_eq!(by_likes.len(), 1);
        assert_eq!(by_likes[0].username, "bob");
        assert_eq!(by_likes[0].likes_count, 2);
    }
}
