//! Bearer token service
//!
//! Tokens are HS256 JWTs whose only payload of consequence is the user's
//! current token seed. Issuing rotates the seed first and then signs it, so
//! at most one token per user verifies at any time: rotation is revocation,
//! with no blacklist to maintain.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::User;
use crate::repositories::UserRepository;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The server-persisted token seed this token is bound to
    pub seed: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// Signing/verification keys derived once from the process signing key
#[derive(Clone)]
pub struct TokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    /// Build keys from the symmetric signing secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Sign a seed into a bearer token valid for `expiry_seconds`
    pub fn sign(&self, seed: String, expiry_seconds: u64) -> ApiResult<String> {
        let now = unix_now()?;
        self.sign_with_exp(seed, now, now + expiry_seconds)
    }

    fn sign_with_exp(&self, seed: String, iat: u64, exp: u64) -> ApiResult<String> {
        let claims = Claims { seed, iat, exp };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verify signature and expiry, returning the claims
    pub fn decode(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::Auth("invalid token".to_string()))
    }
}

/// Token service binding signed tokens to server-persisted seeds
#[derive(Clone)]
pub struct TokenService {
    keys: TokenKeys,
    users: UserRepository,
    expiry_seconds: u64,
}

impl TokenService {
    /// Create a new token service
    pub fn new(config: &AppConfig, users: UserRepository) -> Self {
        Self {
            keys: TokenKeys::new(&config.app_secret),
            users,
            expiry_seconds: config.token_expiry_seconds,
        }
    }

    /// Issue a bearer token for a user
    ///
    /// Side effect: rotates and persists the user's token seed, which
    /// invalidates any token signed with the previous seed.
    pub async fn issue(&self, user: &User) -> ApiResult<String> {
        let seed = self.users.rotate_token_seed(user.id).await?;
        self.keys.sign(seed, self.expiry_seconds)
    }

    /// Verify a bearer token and resolve the user it belongs to
    ///
    /// Fails as an auth error if the signature is invalid, the token is
    /// expired, the seed is no longer anyone's current seed, or the user is
    /// gone.
    pub async fn verify(&self, token: &str) -> ApiResult<User> {
        let claims = self.keys.decode(token)?;
        self.users
            .find_by_token_seed(&claims.seed)
            .await?
            .ok_or_else(|| ApiError::Auth("invalid token".to_string()))
    }
}

fn unix_now() -> ApiResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| ApiError::Internal(format!("clock error: {}", e)))
}
