//! Attachment metadata.
//!
//! Only metadata lives here; bytes are written and removed by the file
//! storage layer using [`storage_path`].

use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::{CardId, UserId};

pub type AttachmentId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub card_id: CardId,
    pub user_id: UserId,
    /// Generated on-disk name.
    pub filename: String,
    /// Name supplied by the uploader.
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    /// Relative path under the upload root.
    pub path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
}

/// Largest accepted upload, in bytes.
pub const MAX_FILE_SIZE: i64 = 10 * 1024 * 1024;

/// Upload types accepted for attachments.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    // Images
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    // Documents
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "text/csv",
    "application/rtf",
    // Spreadsheets
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    // Presentations
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    // Archives
    "application/zip",
    "application/x-rar-compressed",
    "application/x-7z-compressed",
];

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(mime_type.trim()))
}

impl NewAttachment {
    /// Checks the upload against the name, size and type policy.
    pub fn validate(&self) -> KanbanResult<()> {
        if self.original_name.trim().is_empty() {
            return Err(KanbanError::Validation(
                "Attachment name is required".to_string(),
            ));
        }
        if self.size < 0 {
            return Err(KanbanError::Validation(
                "Attachment size must not be negative".to_string(),
            ));
        }
        if self.size > MAX_FILE_SIZE {
            return Err(KanbanError::Validation(format!(
                "File is too large: {} bytes, limit is {} bytes",
                self.size, MAX_FILE_SIZE
            )));
        }
        if !is_allowed_mime_type(&self.mime_type) {
            return Err(KanbanError::Validation(format!(
                "File type {} is not allowed",
                self.mime_type
            )));
        }
        Ok(())
    }
}

impl Attachment {
    pub fn new(card_id: CardId, user_id: UserId, input: NewAttachment) -> Self {
        let now = Utc::now();
        let original_name = repair_original_name(&input.original_name);
        let filename = generate_filename(&original_name, &input.mime_type, now);
        let path = storage_path(user_id, card_id, &filename);
        Self {
            id: Uuid::new_v4(),
            card_id,
            user_id,
            filename,
            original_name,
            mime_type: input.mime_type,
            size: input.size,
            path,
            created_at: now,
        }
    }
}

const MIME_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("image/svg+xml", ".svg"),
    ("application/pdf", ".pdf"),
    ("application/msword", ".doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".docx",
    ),
    ("text/plain", ".txt"),
    ("text/csv", ".csv"),
    ("application/rtf", ".rtf"),
    ("application/vnd.ms-excel", ".xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".xlsx",
    ),
    ("application/vnd.ms-powerpoint", ".ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ".pptx",
    ),
    ("application/zip", ".zip"),
    ("application/x-rar-compressed", ".rar"),
    ("application/x-7z-compressed", ".7z"),
];

/// Extension (with leading dot) taken from the original name, or from the
/// MIME type when the name has none. Empty when neither is known.
pub fn file_extension(original_name: &str, mime_type: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .or_else(|| {
            MIME_TYPE_EXTENSIONS
                .iter()
                .find(|(mime, _)| *mime == mime_type)
                .map(|(_, ext)| ext.to_string())
        })
        .unwrap_or_default()
}

/// `{unix millis}-{16 hex chars}{ext}`, unique per upload.
pub fn generate_filename(original_name: &str, mime_type: &str, now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}{}",
        now.timestamp_millis(),
        &random[..16],
        file_extension(original_name, mime_type)
    )
}

pub fn storage_path(user_id: UserId, card_id: CardId, filename: &str) -> String {
    format!("{}/{}/{}", user_id, card_id, filename)
}

/// Multipart parsers commonly hand over UTF-8 file names decoded as
/// latin-1 ("rÃ©sumÃ©.pdf" instead of "résumé.pdf").
/// When every char fits in a byte and those bytes form valid UTF-8 with
/// non-ASCII content, the re-decoded name is returned.
pub fn repair_original_name(name: &str) -> String {
    if name.is_ascii() || name.chars().any(|c| (c as u32) > 0xFF) {
        return name.to_string();
    }
    let bytes: Vec<u8> = name.chars().map(|c| c as u8).collect();
    match String::from_utf8(bytes) {
        Ok(decoded) if !decoded.is_ascii() => decoded,
        _ => name.to_string(),
    }
}
