//! Picture repository for database operations

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{NewPic, Pic};

/// Picture repository
#[derive(Clone)]
pub struct PicRepository {
    pool: PgPool,
}

impl PicRepository {
    /// Create a new picture repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a picture; called only after the object store has
    /// acknowledged the upload
    pub async fn create(&self, new_pic: &NewPic) -> ApiResult<Pic> {
        let pic = sqlx::query_as::<_, Pic>(
            r#"
            INSERT INTO pics (name, description, object_key, image_uri, owner_id, gallery_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, object_key, image_uri, owner_id, gallery_id, created_at
            "#,
        )
        .bind(&new_pic.name)
        .bind(&new_pic.description)
        .bind(&new_pic.object_key)
        .bind(&new_pic.image_uri)
        .bind(new_pic.owner_id)
        .bind(new_pic.gallery_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(pic)
    }

    /// List every picture owned by `owner_id`, oldest first
    pub async fn list_for_owner(&self, owner_id: Uuid) -> ApiResult<Vec<Pic>> {
        let pics = sqlx::query_as::<_, Pic>(
            r#"
            SELECT id, name, description, object_key, image_uri, owner_id, gallery_id, created_at
            FROM pics
            WHERE owner_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pics)
    }
}

/// Group pictures by their gallery id, preserving the input order within
/// each gallery
pub fn group_by_gallery(pics: Vec<Pic>) -> HashMap<Uuid, Vec<Pic>> {
    let mut grouped: HashMap<Uuid, Vec<Pic>> = HashMap::new();
    for pic in pics {
        grouped.entry(pic.gallery_id).or_default().push(pic);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pic(gallery_id: Uuid, name: &str) -> Pic {
        Pic {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: "a pic".to_string(),
            object_key: format!("{}-{}", Uuid::new_v4(), name),
            image_uri: "https://example.com/obj".to_string(),
            owner_id: Uuid::new_v4(),
            gallery_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_gallery_covers_each_pic_once() {
        let g1 = Uuid::new_v4();
        let g2 = Uuid::new_v4();
        let pics = vec![pic(g1, "a"), pic(g2, "b"), pic(g1, "c")];

        let grouped = group_by_gallery(pics);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&g1].len(), 2);
        assert_eq!(grouped[&g2].len(), 1);
        let total: usize = grouped.values().map(Vec::len).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_group_by_gallery_preserves_order() {
        let g = Uuid::new_v4();
        let pics = vec![pic(g, "first"), pic(g, "second"), pic(g, "third")];

        let grouped = group_by_gallery(pics);

        let names: Vec<_> = grouped[&g].iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn test_group_by_gallery_empty() {
        assert!(group_by_gallery(Vec::new()).is_empty());
    }
}
