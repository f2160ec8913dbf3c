//! Picture model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Picture entity
///
/// `object_key`/`image_uri` reference an object that was durably stored in
/// the object store before this record was created. Deleting the record does
/// not retract the remote object.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Pic {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "desc")]
    pub description: String,
    pub object_key: String,
    pub image_uri: String,
    pub owner_id: Uuid,
    pub gallery_id: Uuid,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

/// Fields for the picture record created as the final pipeline step
#[derive(Debug, Clone)]
pub struct NewPic {
    pub name: String,
    pub description: String,
    pub object_key: String,
    pub image_uri: String,
    pub owner_id: Uuid,
    pub gallery_id: Uuid,
}
