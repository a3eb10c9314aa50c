// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Domain Models
//!
//! Records persisted by the repositories and returned by the REST API. All
//! types derive `Serialize`, `Deserialize` and `ToSchema` for JSON handling
//! and OpenAPI documentation, and `sqlx::FromRow` for the Postgres backend.
//!
//! Enumerations are stored as lowercase text columns; the `TryFrom<String>`
//! impls are what `#[sqlx(try_from = "String")]` uses when reading rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A stored text value did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a text-backed enum with `as_str`, `parse` and `TryFrom<String>`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                $name::parse(&value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// =============================================================================
// Users
// =============================================================================

text_enum! {
    /// Interface language of a user.
    Language as "language" { Fr => "fr", En => "en" }
}

impl Language {
    /// Anything other than `en` falls back to French.
    pub fn from_form(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("en") {
            Language::En
        } else {
            Language::Fr
        }
    }
}

text_enum! {
    /// Interface theme of a user.
    Theme as "theme" { Light => "light", Dark => "dark" }
}

impl Theme {
    /// Anything other than `dark` falls back to light.
    pub fn from_form(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("dark") {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

/// A platform user.
///
/// The id is the subject issued by the identity provider at signup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub avatar_url: String,
    pub bio: String,
    #[sqlx(try_from = "String")]
    pub language: Language,
    #[sqlx(try_from = "String")]
    pub theme: Theme,
    pub is_admin: bool,
    pub is_creator: bool,
    pub subscription_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_account_id: Option<String>,
}

/// Public projection of a user, safe to show to anyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub avatar_url: String,
    pub bio: String,
    pub is_creator: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            avatar_url: user.avatar_url.clone(),
            bio: user.bio.clone(),
            is_creator: user.is_creator,
        }
    }
}

// =============================================================================
// Posts, comments, likes
// =============================================================================

/// A post with a single media attachment. Paid posts are only visible to
/// their author and active subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Post {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub is_paid: bool,
}

/// A post decorated with like information for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub like_count: i64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    #[serde(rename = "text")]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Like {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub post_id: String,
}

// =============================================================================
// Follows and subscriptions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Follow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub follower_id: String,
    pub creator_id: String,
}

text_enum! {
    SubscriptionStatus as "subscription status" {
        Active => "active",
        Cancelled => "cancelled",
    }
}

/// A paid monthly subscription of a subscriber to a creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Subscription {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub subscriber_id: String,
    pub creator_id: String,
    #[sqlx(try_from = "String")]
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: Option<String>,
    pub price: f64,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

// =============================================================================
// Messaging
// =============================================================================

text_enum! {
    MessageType as "message type" {
        Text => "text",
        Image => "image",
        Video => "video",
        Audio => "audio",
        File => "file",
    }
}

/// Conversation between two users. The pair is unordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user1_id: String,
    pub user2_id: String,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    pub fn other_member(&self, user_id: &str) -> &str {
        if self.user1_id == user_id {
            &self.user2_id
        } else {
            &self.user1_id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Message {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Per-user deletion marker. Hides a conversation from one member only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ConversationDeletion {
    pub id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub deleted_at: DateTime<Utc>,
}

// =============================================================================
// Reports
// =============================================================================

text_enum! {
    ReportTargetType as "report target type" {
        Post => "post",
        User => "user",
        Comment => "comment",
    }
}

text_enum! {
    ReportReason as "report reason" {
        InappropriateContent => "inappropriate_content",
        Spam => "spam",
        HateSpeech => "hate_speech",
        Impersonation => "impersonation",
        Copyright => "copyright",
        Other => "other",
    }
}

text_enum! {
    ReportStatus as "report status" {
        Pending => "pending",
        Reviewed => "reviewed",
        Resolved => "resolved",
        Rejected => "rejected",
    }
}

impl ReportStatus {
    /// Resolved and rejected reports are closed and get a resolution time.
    pub fn is_final(&self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Report {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reporter_id: String,
    #[sqlx(try_from = "String")]
    pub target_type: ReportTargetType,
    pub target_id: String,
    #[sqlx(try_from = "String")]
    pub reason: ReportReason,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    pub admin_note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}
