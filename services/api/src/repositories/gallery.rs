//! Gallery repository for database operations
//!
//! Every read/update/delete is scoped by `(id, owner_id)` in the query
//! itself, so a gallery owned by someone else is indistinguishable from one
//! that does not exist.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::Gallery;

/// Gallery repository
#[derive(Clone)]
pub struct GalleryRepository {
    pool: PgPool,
}

impl GalleryRepository {
    /// Create a new gallery repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a gallery owned by `owner_id`
    pub async fn create(&self, owner_id: Uuid, name: &str, description: &str) -> ApiResult<Gallery> {
        let gallery = sqlx::query_as::<_, Gallery>(
            r#"
            INSERT INTO galleries (name, description, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_at, owner_id
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(gallery)
    }

    /// Fetch a gallery by id, scoped to its owner
    pub async fn find_for_owner(&self, id: Uuid, owner_id: Uuid) -> ApiResult<Gallery> {
        let gallery = sqlx::query_as::<_, Gallery>(
            r#"
            SELECT id, name, description, created_at, owner_id
            FROM galleries
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        gallery.ok_or(ApiError::NotFound("gallery"))
    }

    /// List all galleries owned by `owner_id`
    pub async fn list_for_owner(&self, owner_id: Uuid) -> ApiResult<Vec<Gallery>> {
        let galleries = sqlx::query_as::<_, Gallery>(
            r#"
            SELECT id, name, description, created_at, owner_id
            FROM galleries
            WHERE owner_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(galleries)
    }

    /// Update name/description of an owned gallery; absent fields keep
    /// their current value
    pub async fn update_for_owner(
        &self,
        id: Uuid,
        owner_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> ApiResult<Gallery> {
        let gallery = sqlx::query_as::<_, Gallery>(
            r#"
            UPDATE galleries
            SET name = COALESCE($3, name),
                description = COALESCE($4, description)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, name, description, created_at, owner_id
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?;

        gallery.ok_or(ApiError::NotFound("gallery"))
    }

    /// Delete an owned gallery; pic records go with it via the cascade,
    /// remote objects are never retracted
    pub async fn delete_for_owner(&self, id: Uuid, owner_id: Uuid) -> ApiResult<()> {
        let done = sqlx::query("DELETE FROM galleries WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(ApiError::NotFound("gallery"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::repositories::UserRepository;

    // These tests need a running postgres (DATABASE_URL); run them with
    // `cargo test -- --ignored`.

    async fn test_pool() -> PgPool {
        let config = common::database::DatabaseConfig::from_env().unwrap();
        let pool = common::database::init_pool(&config).await.unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        pool
    }

    async fn test_user(users: &UserRepository, tag: &str) -> Uuid {
        let id = Uuid::new_v4().simple();
        users
            .create(&NewUser {
                username: format!("{}-{}", tag, id),
                email: format!("{}-{}@example.com", tag, id),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    #[ignore = "requires a running postgres"]
    async fn test_owner_roundtrip() {
        let pool = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let galleries = GalleryRepository::new(pool);

        let owner = test_user(&users, "owner").await;
        let gallery = galleries.create(owner, "cats", "cat pics").await.unwrap();

        let fetched = galleries.find_for_owner(gallery.id, owner).await.unwrap();
        assert_eq!(fetched.name, "cats");
        assert_eq!(fetched.description, "cat pics");
        assert_eq!(fetched.owner_id, owner);
    }

    #[tokio::test]
    #[ignore = "requires a running postgres"]
    async fn test_non_owner_lookup_is_not_found() {
        let pool = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let galleries = GalleryRepository::new(pool);

        let owner = test_user(&users, "owner").await;
        let imposter = test_user(&users, "imposter").await;
        let gallery = galleries.create(owner, "cats", "cat pics").await.unwrap();

        assert!(matches!(
            galleries.find_for_owner(gallery.id, imposter).await,
            Err(ApiError::NotFound("gallery"))
        ));
        assert!(matches!(
            galleries.delete_for_owner(gallery.id, imposter).await,
            Err(ApiError::NotFound("gallery"))
        ));

        // the owner still sees it untouched
        assert!(galleries.find_for_owner(gallery.id, owner).await.is_ok());
    }

    #[tokio::test]
    #[ignore = "requires a running postgres"]
    async fn test_update_keeps_unset_fields() {
        let pool = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let galleries = GalleryRepository::new(pool);

        let owner = test_user(&users, "update").await;
        let gallery = galleries.create(owner, "cats", "cat pics").await.unwrap();

        let updated = galleries
            .update_for_owner(gallery.id, owner, Some("dogs"), None)
            .await
            .unwrap();
        assert_eq!(updated.name, "dogs");
        assert_eq!(updated.description, "cat pics");
    }
}
