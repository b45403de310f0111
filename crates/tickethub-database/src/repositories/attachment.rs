//! Attachment search criteria and queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::{EntityId, Repository};
use tickethub_core::types::filter::Filter;
use tickethub_core::types::sorting::{SortKey, SortValue};
use tickethub_entity::Attachment;

use crate::criteria::{Paging, SearchCriteria};
use crate::repository::EntityRepository;

/// Repository for attachments.
pub type AttachmentRepository = EntityRepository<Attachment>;

/// Fields attachments can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSortKey {
    /// Upload time (default).
    CreatedAt,
    /// File name, case-insensitive.
    FileName,
    /// MIME type.
    ContentType,
    /// Size in bytes.
    SizeBytes,
}

impl SortKey<Attachment> for AttachmentSortKey {
    const DEFAULT: Self = Self::CreatedAt;
    const ALL: &'static [Self] = &[
        Self::CreatedAt,
        Self::FileName,
        Self::ContentType,
        Self::SizeBytes,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::FileName => "file_name",
            Self::ContentType => "content_type",
            Self::SizeBytes => "size_bytes",
        }
    }

    fn value(self, attachment: &Attachment) -> SortValue {
        match self {
            Self::CreatedAt => attachment.meta.created_at.into(),
            Self::FileName => SortValue::text(&attachment.file_name),
            Self::ContentType => SortValue::text(&attachment.content_type),
            Self::SizeBytes => attachment.size_bytes.into(),
        }
    }
}

/// Attachment search criteria.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentSearch {
    /// Owning incident.
    #[serde(default)]
    pub incident_id: Option<EntityId>,
    /// Substring of the file name.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Substring of the MIME type, e.g. `image/`.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Uploading user.
    #[serde(default)]
    pub uploaded_by: Option<EntityId>,
    /// Earliest upload time, inclusive.
    #[serde(default)]
    pub uploaded_from: Option<DateTime<Utc>>,
    /// Latest upload time, inclusive.
    #[serde(default)]
    pub uploaded_to: Option<DateTime<Utc>>,
    /// Smallest size in bytes, inclusive.
    #[serde(default)]
    pub min_size: Option<i64>,
    /// Largest size in bytes, inclusive.
    #[serde(default)]
    pub max_size: Option<i64>,
    /// Ordering and paging.
    #[serde(flatten)]
    pub paging: Paging,
}

impl SearchCriteria<Attachment> for AttachmentSearch {
    type SortKey = AttachmentSortKey;

    fn filter(&self) -> Filter<Attachment> {
        Filter::new()
            .eq(self.incident_id, |a: &Attachment| a.incident_id)
            .contains(self.file_name.as_deref(), |a: &Attachment| {
                a.file_name.as_str()
            })
            .contains(self.content_type.as_deref(), |a: &Attachment| {
                a.content_type.as_str()
            })
            .eq(self.uploaded_by, |a: &Attachment| a.uploaded_by)
            .range(self.uploaded_from, self.uploaded_to, |a: &Attachment| {
                a.meta.created_at
            })
            .range(self.min_size, self.max_size, |a: &Attachment| a.size_bytes)
    }

    fn paging(&self) -> &Paging {
        &self.paging
    }
}

impl EntityRepository<Attachment> {
    /// Attachments of one incident.
    pub async fn find_by_incident(&self, incident_id: EntityId) -> AppResult<Vec<Attachment>> {
        self.find(&Filter::new().eq(Some(incident_id), |a: &Attachment| a.incident_id))
            .await
    }

    /// Total stored bytes for one incident.
    pub async fn total_size_for_incident(&self, incident_id: EntityId) -> AppResult<i64> {
        Ok(self
            .find_by_incident(incident_id)
            .await?
            .iter()
            .map(|a| a.size_bytes)
            .sum())
    }
}
