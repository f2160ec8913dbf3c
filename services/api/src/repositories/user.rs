//! User repository: the credential store
//!
//! Owns password hashing/verification and the rotating token seed that
//! backs bearer-token revocation. Plaintext passwords never leave this
//! module unhashed and are never logged.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{NewUser, User};

/// Token seed length in bytes before encoding
const SEED_BYTES: usize = 32;

/// Bounded retries when a freshly generated seed or username collides
const UNIQUE_RETRIES: u32 = 3;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with a hashed password
    ///
    /// A username or email uniqueness violation surfaces as a validation
    /// error; any other database failure is a persistence error.
    pub async fn create(&self, new_user: &NewUser) -> ApiResult<User> {
        info!("Creating new user: {}", new_user.username);

        let password_hash = hash_password(&new_user.password)?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, token_seed, created_at, updated_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                ApiError::Validation("username or email already taken".to_string()),
            ),
            Err(err) => Err(ApiError::Persistence(err)),
        }
    }

    /// Verify a plaintext password against the stored hash
    ///
    /// Resolves the user on a match; a mismatch is an auth error carrying
    /// the same message as an unknown username.
    pub async fn verify_password(&self, user: &User, password: &str) -> ApiResult<()> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| ApiError::Internal(format!("stored hash unparseable: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Auth("username/password mismatch".to_string()))
    }

    /// Rotate the user's token seed and return the new value
    ///
    /// The seed is 32 random bytes, encoded. On the (vanishingly unlikely)
    /// uniqueness collision the generation is retried a bounded number of
    /// times before surfacing a persistence error.
    pub async fn rotate_token_seed(&self, user_id: Uuid) -> ApiResult<String> {
        let mut attempt = 0;
        loop {
            let seed = generate_seed();

            let result = sqlx::query(
                "UPDATE users SET token_seed = $1, updated_at = now() WHERE id = $2",
            )
            .bind(&seed)
            .bind(user_id)
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 1 => return Ok(seed),
                Ok(_) => return Err(ApiError::NotFound("user")),
                Err(sqlx::Error::Database(db))
                    if db.is_unique_violation() && attempt < UNIQUE_RETRIES =>
                {
                    attempt += 1;
                    warn!("token seed collision, retrying (attempt {})", attempt);
                }
                Err(err) => return Err(ApiError::Persistence(err)),
            }
        }
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, token_seed, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, token_seed, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find the user whose current token seed matches
    pub async fn find_by_token_seed(&self, seed: &str) -> ApiResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, token_seed, created_at, updated_at
            FROM users
            WHERE token_seed = $1
            "#,
        )
        .bind(seed)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Resolve an OAuth login to a local account, creating one if absent
    ///
    /// Only a genuinely missing row triggers creation; a store error
    /// propagates as-is instead of being mistaken for "not found". Created
    /// accounts get a generated username (retried on collision) and a
    /// random password, so they cannot be entered through the password flow
    /// with a known value.
    pub async fn find_or_create_by_email(&self, email: &str) -> ApiResult<User> {
        if let Some(user) = self.find_by_email(email).await? {
            return Ok(user);
        }

        let mut attempt = 0;
        loop {
            let new_user = NewUser {
                username: generate_username(email),
                email: email.to_string(),
                password: generate_password(),
            };

            match self.create(&new_user).await {
                Err(ApiError::Validation(_)) if attempt < UNIQUE_RETRIES => {
                    attempt += 1;
                    warn!("generated username collision, retrying (attempt {})", attempt);
                }
                other => return other,
            }
        }
    }
}

/// Hash a plaintext password with argon2 and a fresh salt
fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Generate a fresh high-entropy token seed
fn generate_seed() -> String {
    let bytes: [u8; SEED_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive a username for an OAuth-created account from the email local part
fn generate_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("user");
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{}-{}", local, suffix)
}

/// Random throwaway password for OAuth-created accounts
fn generate_password() -> String {
    let bytes: [u8; SEED_BYTES] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}
