// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Multipart form reading and media validation.
//!
//! Uploaded files are validated by lowercase extension (dot included, as in
//! `.png`) and stored under a per-resource folder:
//!
//! | Folder | Name | Accepted |
//! |--------|------|----------|
//! | `avatars` | `user_{id}{ext}` | images |
//! | `posts` | `post_{id}{ext}` | images, post videos |
//! | `messages` | `message_{uuid}{ext}` | per message type |

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::models::MessageType;

pub const AVATAR_FOLDER: &str = "avatars";
pub const POST_FOLDER: &str = "posts";
pub const MESSAGE_FOLDER: &str = "messages";

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".heic"];
pub const POST_VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi"];

const MESSAGE_IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];
const MESSAGE_VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv"];
const MESSAGE_AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".wav", ".aac", ".m4a"];
const MESSAGE_FILE_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".txt", ".zip"];

/// Extensions accepted for a message attachment. Text messages take none.
pub fn message_extensions(message_type: MessageType) -> &'static [&'static str] {
    match message_type {
        MessageType::Text => &[],
        MessageType::Image => MESSAGE_IMAGE_EXTENSIONS,
        MessageType::Video => MESSAGE_VIDEO_EXTENSIONS,
        MessageType::Audio => MESSAGE_AUDIO_EXTENSIONS,
        MessageType::File => MESSAGE_FILE_EXTENSIONS,
    }
}

pub fn is_post_media(extension: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension) || POST_VIDEO_EXTENSIONS.contains(&extension)
}

pub fn avatar_file_name(user_id: &str, extension: &str) -> String {
    format!("user_{user_id}{extension}")
}

pub fn post_file_name(post_id: &str, extension: &str) -> String {
    format!("post_{post_id}{extension}")
}

pub fn message_file_name(attachment_id: &str, extension: &str) -> String {
    format!("message_{attachment_id}{extension}")
}

/// A file part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Lowercase extension including the dot, empty when there is none.
    pub fn extension(&self) -> String {
        extension_of(&self.file_name)
    }
}

pub fn extension_of(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(index) if index > 0 => base[index..].to_lowercase(),
        _ => String::new(),
    }
}

/// Text fields and files of a fully read multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request("Invalid multipart body").with_details(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request("Invalid multipart body").with_details(e.to_string()))?;

            match file_name {
                Some(file_name) if !file_name.is_empty() => {
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                _ => {
                    form.fields
                        .insert(name, String::from_utf8_lossy(&bytes).into_owned());
                }
            }
        }
        Ok(form)
    }

    /// Trimmed text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn text_or_default(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().to_string()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).filter(|file| !file.bytes.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn from_parts(fields: &[(&str, &str)], files: Vec<(&str, UploadedFile)>) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files
                .into_iter()
                .map(|(k, f)| (k.to_string(), f))
                .collect(),
        }
    }
}
