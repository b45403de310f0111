//! Attachment entity model.

use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::{EntityId, EntityMeta, Relation};

use crate::tables;
use crate::validation::{non_negative, optional_text, reference, required_text};

/// Metadata of a file (photo, delivery note) attached to an incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Owning incident.
    pub incident_id: EntityId,
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Location in blob storage.
    pub storage_path: String,
    /// Uploading user.
    pub uploaded_by: EntityId,
    /// Optional caption.
    pub description: Option<String>,
}

impl_entity!(
    Attachment,
    tables::ATTACHMENTS,
    [
        Relation::belongs_to("incident", tables::INCIDENTS, "incident_id"),
        Relation::belongs_to("uploader", tables::USERS, "uploaded_by"),
    ]
);

/// Data required to attach a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
    /// Owning incident.
    pub incident_id: EntityId,
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Location in blob storage.
    pub storage_path: String,
    /// Uploading user.
    pub uploaded_by: EntityId,
    /// Optional caption.
    pub description: Option<String>,
}

impl Attachment {
    /// Create attachment metadata, enforcing construction invariants.
    pub fn new(data: NewAttachment) -> AppResult<Self> {
        Ok(Self {
            meta: EntityMeta::new(),
            incident_id: reference("incident_id", data.incident_id)?,
            file_name: required_text("file_name", &data.file_name)?,
            content_type: required_text("content_type", &data.content_type)?.to_lowercase(),
            size_bytes: non_negative("size_bytes", data.size_bytes)?,
            storage_path: required_text("storage_path", &data.storage_path)?,
            uploaded_by: reference("uploaded_by", data.uploaded_by)?,
            description: optional_text(data.description.as_deref()),
        })
    }

    /// Change the caption.
    pub fn describe(&mut self, description: Option<&str>) {
        self.description = optional_text(description);
        self.meta.touch();
    }

    /// Whether the file is an image.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}
