// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Direct messaging between two users.
//!
//! A conversation is created on the first message between a pair and reused
//! afterwards regardless of who writes first. Deleting a conversation only
//! hides it from the caller: a [`ConversationDeletion`] marker is stored and
//! messages older than it stay out of the caller's view until either member
//! sends a new message, which clears the markers.

use std::collections::HashMap;

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use super::{discard_upload, new_id, users::MessageResponse};
use crate::{
    auth::Auth,
    error::ApiError,
    media::{self, MultipartForm, UploadedFile, MESSAGE_FOLDER},
    models::{Conversation, ConversationDeletion, Message, MessageType, User},
    state::AppState,
    storage::{repository::MessagePage, StoreError},
};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Minimal user card shown in conversations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversationUser {
    pub id: String,
    pub username: String,
    pub avatar_url: String,
    pub is_creator: bool,
}

impl From<&User> for ConversationUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
            is_creator: user.is_creator,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageView {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub conversation_id: String,
    pub sender: ConversationUser,
    pub content: String,
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationView {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub other_user: ConversationUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageView>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageListResponse {
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageSentResponse {
    pub message: MessageView,
    pub conversation_id: String,
}

/// JSON form of a message. Attachments need the multipart form.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    #[serde(default)]
    pub content: String,
    /// Defaults to `text`.
    pub message_type: Option<MessageType>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// 1-based page, default 1.
    pub page: Option<usize>,
    /// Page size, default 50, at most 100.
    pub limit: Option<usize>,
}

impl PageQuery {
    fn to_page(&self) -> MessagePage {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = self
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        MessagePage {
            offset: (page - 1).saturating_mul(limit),
            limit,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Per-request cache of user cards.
struct UserCards<'a> {
    state: &'a AppState,
    cards: HashMap<String, ConversationUser>,
}

impl<'a> UserCards<'a> {
    fn new(state: &'a AppState) -> Self {
        Self {
            state,
            cards: HashMap::new(),
        }
    }

    async fn card(&mut self, user_id: &str) -> Result<ConversationUser, ApiError> {
        if let Some(card) = self.cards.get(user_id) {
            return Ok(card.clone());
        }
        let card = match self.state.repos.users.get(user_id).await {
            Ok(user) => ConversationUser::from(&user),
            // Deleted accounts keep their messages.
            Err(StoreError::NotFound(_)) => ConversationUser {
                id: user_id.to_string(),
                username: String::new(),
                avatar_url: String::new(),
                is_creator: false,
            },
            Err(e) => return Err(e.into()),
        };
        self.cards.insert(user_id.to_string(), card.clone());
        Ok(card)
    }

    async fn message_view(&mut self, message: Message) -> Result<MessageView, ApiError> {
        let sender = self.card(&message.sender_id).await?;
        Ok(MessageView {
            id: message.id,
            created_at: message.created_at,
            conversation_id: message.conversation_id,
            sender,
            content: message.content,
            message_type: message.message_type,
            media_url: message.media_url,
            is_read: message.is_read,
            read_at: message.read_at,
            is_deleted: message.is_deleted,
        })
    }
}

/// The conversation, or 404 when the caller is not a member.
async fn member_conversation(
    state: &AppState,
    conversation_id: &str,
    user_id: &str,
) -> Result<Conversation, ApiError> {
    let conversation = state.repos.messages.get_conversation(conversation_id).await?;
    if !conversation.has_member(user_id) {
        return Err(ApiError::not_found("Conversation not found"));
    }
    Ok(conversation)
}

async fn find_or_create_conversation(
    state: &AppState,
    sender_id: &str,
    receiver_id: &str,
) -> Result<Conversation, ApiError> {
    if let Some(existing) = state
        .repos
        .messages
        .find_conversation(sender_id, receiver_id)
        .await?
    {
        return Ok(existing);
    }
    let now = Utc::now();
    let conversation = Conversation {
        id: new_id(),
        created_at: now,
        updated_at: now,
        user1_id: sender_id.to_string(),
        user2_id: receiver_id.to_string(),
        last_message_at: None,
    };
    state
        .repos
        .messages
        .create_conversation(&conversation)
        .await?;
    debug!(conversation_id = %conversation.id, "conversation created");
    Ok(conversation)
}

/// A message as submitted, before validation.
struct Draft {
    receiver_id: String,
    content: String,
    message_type: MessageType,
    media: Option<UploadedFile>,
}

impl Draft {
    async fn from_request(state: &AppState, request: Request) -> Result<Self, ApiError> {
        let is_multipart = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(|e| ApiError::bad_request("Invalid multipart body").with_details(e.body_text()))?;
            let mut form = MultipartForm::read(multipart).await?;
            let (Some(receiver_id), Some(message_type)) = (
                form.text("receiver_id").map(str::to_string),
                form.text("message_type"),
            ) else {
                return Err(ApiError::bad_request(
                    "receiver_id and message_type are required",
                ));
            };
            let message_type = MessageType::parse(message_type)
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            Ok(Self {
                receiver_id,
                content: form.text_or_default("content"),
                message_type,
                media: form.take_file("media"),
            })
        } else {
            let Json(body) = Json::<SendMessageRequest>::from_request(request, state).await?;
            Ok(Self {
                receiver_id: body.receiver_id.trim().to_string(),
                content: body.content.trim().to_string(),
                message_type: body.message_type.unwrap_or(MessageType::Text),
                media: None,
            })
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.receiver_id.is_empty() {
            return Err(ApiError::bad_request("receiver_id is required"));
        }
        match (&self.message_type, &self.media) {
            (MessageType::Text, _) if self.content.is_empty() => {
                Err(ApiError::bad_request("Text messages need content"))
            }
            (MessageType::Text, _) => Ok(()),
            (_, None) => Err(ApiError::bad_request(
                "A media file is required for this message type",
            )),
            (message_type, Some(file)) => {
                let extension = file.extension();
                if media::message_extensions(*message_type).contains(&extension.as_str()) {
                    Ok(())
                } else {
                    Err(ApiError::bad_request("Invalid file extension"))
                }
            }
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Conversations of the caller, most recent activity first.
#[utoipa::path(
    get,
    path = "/api/messages/conversations",
    tag = "Messages",
    security(("bearer_auth" = [])),
    responses((status = 200, body = ConversationListResponse))
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let user_id = identity.user_id.as_str();
    let conversations = state.repos.messages.list_conversations(user_id).await?;
    let mut cards = UserCards::new(&state);

    let mut views = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let other_user = cards.card(conversation.other_member(user_id)).await?;
        let last_message = match state
            .repos
            .messages
            .last_message(&conversation.id, None)
            .await?
        {
            Some(message) => Some(cards.message_view(message).await?),
            None => None,
        };
        let unread_count = state
            .repos
            .messages
            .unread_count(&conversation.id, user_id, None)
            .await?;

        views.push(ConversationView {
            id: conversation.id,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
            other_user,
            last_message,
            last_message_at: conversation.last_message_at,
            unread_count,
        });
    }

    Ok(Json(ConversationListResponse {
        conversations: views,
    }))
}

/// Messages of a conversation, newest first. Marks received messages read.
#[utoipa::path(
    get,
    path = "/api/messages/conversations/{conversation_id}",
    params(
        ("conversation_id" = String, Path, description = "Conversation identifier"),
        PageQuery
    ),
    tag = "Messages",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageListResponse),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(conversation_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let conversation = member_conversation(&state, &conversation_id, &identity.user_id).await?;
    let hidden_before = state
        .repos
        .messages
        .deletion_marker(&identity.user_id, &conversation.id)
        .await?
        .map(|marker| marker.deleted_at);

    let messages = state
        .repos
        .messages
        .list_messages(&conversation.id, hidden_before, query.to_page())
        .await?;

    let mut cards = UserCards::new(&state);
    let mut views = Vec::with_capacity(messages.len());
    for message in messages {
        views.push(cards.message_view(message).await?);
    }

    let marked = state
        .repos
        .messages
        .mark_read(&conversation.id, &identity.user_id, hidden_before, Utc::now())
        .await?;
    if marked > 0 {
        debug!(conversation_id = %conversation.id, marked, "messages marked read");
    }

    Ok(Json(MessageListResponse { messages: views }))
}

/// Send a message (JSON for text, multipart for attachments).
///
/// Multipart fields: `receiver_id`, `message_type`, `content` and a `media`
/// file for non-text types.
#[utoipa::path(
    post,
    path = "/api/messages/send",
    tag = "Messages",
    security(("bearer_auth" = [])),
    request_body(content = SendMessageRequest, description = "JSON text message or multipart form with `media`"),
    responses(
        (status = 201, body = MessageSentResponse),
        (status = 400, description = "Invalid message or sending to yourself"),
        (status = 404, description = "Receiver not found"),
        (status = 502, description = "Media upload failed")
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    Auth(identity): Auth,
    request: Request,
) -> Result<(StatusCode, Json<MessageSentResponse>), ApiError> {
    let draft = Draft::from_request(&state, request).await?;
    draft.validate()?;

    let receiver = state
        .repos
        .users
        .get(&draft.receiver_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound(_) => ApiError::not_found("Receiver not found"),
            other => other.into(),
        })?;
    if receiver.id == identity.user_id {
        return Err(ApiError::bad_request("You cannot message yourself"));
    }

    let conversation = find_or_create_conversation(&state, &identity.user_id, &receiver.id).await?;

    let media_url = match (draft.message_type, draft.media) {
        (MessageType::Text, _) | (_, None) => None,
        (_, Some(file)) => {
            let extension = file.extension();
            let url = state
                .media
                .put(
                    MESSAGE_FOLDER,
                    &media::message_file_name(&new_id(), &extension),
                    &file.content_type,
                    file.bytes,
                )
                .await
                .map_err(|e| ApiError::upstream("Media upload failed", e.to_string()))?;
            Some(url)
        }
    };

    let now = Utc::now();
    let message = Message {
        id: new_id(),
        created_at: now,
        updated_at: now,
        conversation_id: conversation.id.clone(),
        sender_id: identity.user_id.clone(),
        receiver_id: receiver.id.clone(),
        content: draft.content,
        message_type: draft.message_type,
        media_url,
        is_read: false,
        read_at: None,
        is_deleted: false,
        deleted_at: None,
    };
    if let Err(e) = state.repos.messages.create_message(&message).await {
        if let Some(url) = &message.media_url {
            discard_upload(&state, url).await;
        }
        return Err(e.into());
    }

    state
        .repos
        .messages
        .clear_deletion_markers(&conversation.id)
        .await?;
    state
        .repos
        .messages
        .touch_conversation(&conversation.id, now)
        .await?;
    info!(
        message_id = %message.id,
        conversation_id = %conversation.id,
        message_type = %message.message_type,
        "message sent"
    );

    let view = UserCards::new(&state).message_view(message).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageSentResponse {
            message: view,
            conversation_id: conversation.id,
        }),
    ))
}

/// Mark a received message as read.
#[utoipa::path(
    put,
    path = "/api/messages/{message_id}/read",
    params(("message_id" = String, Path, description = "Message identifier")),
    tag = "Messages",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Message not found or not addressed to you")
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(message_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut message = state.repos.messages.get_message(&message_id).await?;
    if message.receiver_id != identity.user_id {
        return Err(ApiError::not_found("Message not found"));
    }
    if !message.is_read {
        let now = Utc::now();
        message.is_read = true;
        message.read_at = Some(now);
        message.updated_at = now;
        state.repos.messages.update_message(&message).await?;
    }
    Ok(Json(MessageResponse {
        message: "Message marked as read".to_string(),
    }))
}

/// Soft-delete one of your messages.
#[utoipa::path(
    delete,
    path = "/api/messages/{message_id}",
    params(("message_id" = String, Path, description = "Message identifier")),
    tag = "Messages",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Message not found or not yours")
    )
)]
pub async fn delete_message(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(message_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut message = state.repos.messages.get_message(&message_id).await?;
    if message.sender_id != identity.user_id {
        return Err(ApiError::not_found("Message not found"));
    }
    let now = Utc::now();
    message.is_deleted = true;
    message.deleted_at = Some(now);
    message.updated_at = now;
    state.repos.messages.update_message(&message).await?;
    Ok(Json(MessageResponse {
        message: "Message deleted".to_string(),
    }))
}

/// Hide a conversation from the caller only.
#[utoipa::path(
    delete,
    path = "/api/messages/conversations/{conversation_id}",
    params(("conversation_id" = String, Path, description = "Conversation identifier")),
    tag = "Messages",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn delete_conversation(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(conversation_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conversation = member_conversation(&state, &conversation_id, &identity.user_id).await?;
    let marker = ConversationDeletion {
        id: new_id(),
        user_id: identity.user_id.clone(),
        conversation_id: conversation.id,
        deleted_at: Utc::now(),
    };
    let message = match state.repos.messages.create_deletion_marker(&marker).await {
        Ok(()) => "Conversation deleted",
        Err(StoreError::Conflict(_)) => "Conversation already deleted",
        Err(e) => return Err(e.into()),
    };
    info!(conversation_id = %marker.conversation_id, user_id = %marker.user_id, "{message}");
    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use axum::http::Method;
    use serde_json::json;

    async fn send_text(ctx: &TestContext, from: &User, to: &str, content: &str) -> String {
        let response = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/messages/send",
                Some(from),
                Some(json!({ "receiver_id": to, "content": content })),
            ))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.json["conversation_id"].as_str().unwrap().to_string()
    }

    async fn conversations(ctx: &TestContext, user: &User) -> serde_json::Value {
        ctx.send(TestContext::request(
            Method::GET,
            "/api/messages/conversations",
            Some(user),
            None,
        ))
        .await
        .json["conversations"]
            .clone()
    }

    #[tokio::test]
    async fn conversation_is_shared_regardless_of_direction() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        let bob = ctx.seed_user("u2", "bob").await;

        let first = send_text(&ctx, &alice, "u2", "hi bob").await;
        let reply = send_text(&ctx, &bob, "u1", "hi alice").await;
        assert_eq!(first, reply);

        let listed = conversations(&ctx, &alice).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["other_user"]["username"], "bob");
        assert_eq!(listed[0]["last_message"]["content"], "hi alice");
        assert_eq!(listed[0]["unread_count"], 1);
    }

    #[tokio::test]
    async fn reading_conversation_marks_messages_read() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        let bob = ctx.seed_user("u2", "bob").await;
        let id = send_text(&ctx, &alice, "u2", "one").await;
        send_text(&ctx, &alice, "u2", "two").await;

        let uri = format!("/api/messages/conversations/{id}");
        let page = ctx
            .send(TestContext::request(Method::GET, &uri, Some(&bob), None))
            .await;
        assert_eq!(page.status, StatusCode::OK);
        assert_eq!(page.json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(page.json["messages"][0]["sender"]["username"], "alice");

        let listed = conversations(&ctx, &bob).await;
        assert_eq!(listed[0]["unread_count"], 0);
    }

    #[test]
    fn page_offset_saturates() {
        let page = PageQuery {
            page: Some(usize::MAX),
            limit: Some(100),
        }
        .to_page();
        assert_eq!(page.offset, usize::MAX);
        assert_eq!(page.limit, 100);
    }

    #[tokio::test]
    async fn page_far_past_the_end_is_empty() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        ctx.seed_user("u2", "bob").await;
        let id = send_text(&ctx, &alice, "u2", "one").await;

        let response = ctx
            .send(TestContext::request(
                Method::GET,
                &format!("/api/messages/conversations/{id}?page={}&limit=100", usize::MAX),
                Some(&alice),
                None,
            ))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.json["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hidden_history_stays_unread() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        let bob = ctx.seed_user("u2", "bob").await;
        let id = send_text(&ctx, &alice, "u2", "before").await;
        let uri = format!("/api/messages/conversations/{id}");

        ctx.send(TestContext::request(Method::DELETE, &uri, Some(&bob), None))
            .await;
        let page = ctx
            .send(TestContext::request(Method::GET, &uri, Some(&bob), None))
            .await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.json["messages"].as_array().unwrap().is_empty());

        let unread = ctx
            .state
            .repos
            .messages
            .unread_count(&id, "u2", None)
            .await
            .unwrap();
        assert_eq!(unread, 1);
    }

    #[tokio::test]
    async fn outsiders_cannot_read_conversation() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        ctx.seed_user("u2", "bob").await;
        let eve = ctx.seed_user("u3", "eve").await;
        let id = send_text(&ctx, &alice, "u2", "secret").await;

        let response = ctx
            .send(TestContext::request(
                Method::GET,
                &format!("/api/messages/conversations/{id}"),
                Some(&eve),
                None,
            ))
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_conversation_hides_it_for_caller_only() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        let bob = ctx.seed_user("u2", "bob").await;
        let id = send_text(&ctx, &alice, "u2", "hello").await;
        let uri = format!("/api/messages/conversations/{id}");

        let deleted = ctx
            .send(TestContext::request(Method::DELETE, &uri, Some(&alice), None))
            .await;
        assert_eq!(deleted.status, StatusCode::OK);
        assert_eq!(deleted.json["message"], "Conversation deleted");

        assert!(conversations(&ctx, &alice).await.as_array().unwrap().is_empty());
        assert_eq!(conversations(&ctx, &bob).await.as_array().unwrap().len(), 1);

        let again = ctx
            .send(TestContext::request(Method::DELETE, &uri, Some(&alice), None))
            .await;
        assert_eq!(again.status, StatusCode::OK);
        assert_eq!(again.json["message"], "Conversation already deleted");

        send_text(&ctx, &bob, "u1", "still there?").await;
        assert_eq!(conversations(&ctx, &alice).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn message_rules() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;

        let to_self = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/messages/send",
                Some(&alice),
                Some(json!({ "receiver_id": "u1", "content": "me" })),
            ))
            .await;
        assert_eq!(to_self.status, StatusCode::BAD_REQUEST);

        let unknown = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/messages/send",
                Some(&alice),
                Some(json!({ "receiver_id": "ghost", "content": "boo" })),
            ))
            .await;
        assert_eq!(unknown.status, StatusCode::NOT_FOUND);

        ctx.seed_user("u2", "bob").await;
        let empty = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/messages/send",
                Some(&alice),
                Some(json!({ "receiver_id": "u2", "content": "  " })),
            ))
            .await;
        assert_eq!(empty.status, StatusCode::BAD_REQUEST);

        let image_without_file = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/messages/send",
                Some(&alice),
                Some(json!({ "receiver_id": "u2", "message_type": "image" })),
            ))
            .await;
        assert_eq!(image_without_file.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn multipart_attachment_is_uploaded() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        ctx.seed_user("u2", "bob").await;

        let sent = ctx
            .send(TestContext::multipart(
                Method::POST,
                "/api/messages/send",
                Some(&alice),
                &[("receiver_id", "u2"), ("message_type", "audio")],
                &[("media", "note.M4A", b"audio")],
            ))
            .await;
        assert_eq!(sent.status, StatusCode::CREATED);
        assert_eq!(sent.json["message"]["message_type"], "audio");
        let url = sent.json["message"]["media_url"].as_str().unwrap();
        assert!(url.starts_with("https://media.test/messages/message_"));
        assert!(url.ends_with(".m4a"));
        assert!(ctx.media.contains(url));

        let wrong_kind = ctx
            .send(TestContext::multipart(
                Method::POST,
                "/api/messages/send",
                Some(&alice),
                &[("receiver_id", "u2"), ("message_type", "image")],
                &[("media", "photo.heic", b"heic")],
            ))
            .await;
        assert_eq!(wrong_kind.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn read_and_delete_are_restricted() {
        let ctx = TestContext::new();
        let alice = ctx.seed_user("u1", "alice").await;
        let bob = ctx.seed_user("u2", "bob").await;
        let sent = ctx
            .send(TestContext::request(
                Method::POST,
                "/api/messages/send",
                Some(&alice),
                Some(json!({ "receiver_id": "u2", "content": "hey" })),
            ))
            .await;
        let id = sent.json["message"]["id"].as_str().unwrap().to_string();

        let sender_marks = ctx
            .send(TestContext::request(
                Method::PUT,
                &format!("/api/messages/{id}/read"),
                Some(&alice),
                None,
            ))
            .await;
        assert_eq!(sender_marks.status, StatusCode::NOT_FOUND);

        let receiver_marks = ctx
            .send(TestContext::request(
                Method::PUT,
                &format!("/api/messages/{id}/read"),
                Some(&bob),
                None,
            ))
            .await;
        assert_eq!(receiver_marks.status, StatusCode::OK);
        assert!(ctx.state.repos.messages.get_message(&id).await.unwrap().is_read);

        let receiver_deletes = ctx
            .send(TestContext::request(
                Method::DELETE,
                &format!("/api/messages/{id}"),
                Some(&bob),
                None,
            ))
            .await;
        assert_eq!(receiver_deletes.status, StatusCode::NOT_FOUND);

        let sender_deletes = ctx
            .send(TestContext::request(
                Method::DELETE,
                &format!("/api/messages/{id}"),
                Some(&alice),
                None,
            ))
            .await;
        assert_eq!(sender_deletes.status, StatusCode::OK);
        assert!(ctx.state.repos.messages.get_message(&id).await.unwrap().is_deleted);
    }
}
