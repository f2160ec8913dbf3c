//! Gallery model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Gallery entity
///
/// `owner_id` is immutable after creation. Every lookup is scoped by both id
/// and owner, so a non-owner's request behaves exactly like "not found".
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gallery {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
    pub owner_id: Uuid,
}

/// Gallery create/update body; both fields are required on creation and a
/// missing one is a 400 validation error
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryPayload {
    pub name: Option<String>,
    pub desc: Option<String>,
}
