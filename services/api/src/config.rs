//! Application configuration loaded once at startup
//!
//! Required values are a startup-time fatal condition, never a per-request
//! error. The signing key is held here and never logged.

use anyhow::Result;
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Symmetric signing key for bearer tokens
    pub app_secret: String,
    /// S3 bucket receiving uploaded images
    pub aws_bucket: String,
    /// Google OAuth client id
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Public URL of this API, used as the OAuth redirect base
    pub api_url: String,
    /// Client URL the OAuth flow redirects back to
    pub client_url: String,
    /// Bearer token lifetime in seconds (default: 7 days)
    pub token_expiry_seconds: u64,
    /// Directory for scratch files staged during uploads
    pub scratch_dir: PathBuf,
    /// Address the HTTP server binds to
    pub bind_addr: String,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `APP_SECRET`: token signing key (required)
    /// - `AWS_BUCKET`: S3 bucket name (required)
    /// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`: OAuth credentials (required)
    /// - `API_URL`: public URL of this service (required)
    /// - `CLIENT_URL`: frontend URL for OAuth redirects (required)
    /// - `TOKEN_EXPIRY_SECONDS`: token lifetime (default: 604800)
    /// - `SCRATCH_DIR`: upload staging directory (default: system temp dir)
    /// - `PORT`: listen port (default: 3000)
    pub fn from_env() -> Result<Self> {
        let app_secret = require("APP_SECRET")?;
        let aws_bucket = require("AWS_BUCKET")?;
        let google_client_id = require("GOOGLE_CLIENT_ID")?;
        let google_client_secret = require("GOOGLE_CLIENT_SECRET")?;
        let api_url = require("API_URL")?;
        let client_url = require("CLIENT_URL")?;

        let token_expiry_seconds = env::var("TOKEN_EXPIRY_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(604800); // 7 days

        let scratch_dir = env::var("SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir());

        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        Ok(AppConfig {
            app_secret,
            aws_bucket,
            google_client_id,
            google_client_secret,
            api_url,
            client_url,
            token_expiry_seconds,
            scratch_dir,
            bind_addr: format!("0.0.0.0:{}", port),
        })
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable not set", name))
}

// The signing key and OAuth secret must not leak through debug logging.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("aws_bucket", &self.aws_bucket)
            .field("google_client_id", &self.google_client_id)
            .field("api_url", &self.api_url)
            .field("client_url", &self.client_url)
            .field("token_expiry_seconds", &self.token_expiry_seconds)
            .field("scratch_dir", &self.scratch_dir)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_required_vars() {
        // SAFETY: the tests mutating the environment are `#[serial]`
        unsafe {
            env::set_var("APP_SECRET", "test-secret");
            env::set_var("AWS_BUCKET", "test-bucket");
            env::set_var("GOOGLE_CLIENT_ID", "client-id");
            env::set_var("GOOGLE_CLIENT_SECRET", "client-secret");
            env::set_var("API_URL", "http://localhost:3000");
            env::set_var("CLIENT_URL", "http://localhost:8080");
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        set_required_vars();
        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.aws_bucket, "test-bucket");
        assert_eq!(config.token_expiry_seconds, 604800);
        assert!(config.bind_addr.ends_with(":3000"));
    }

    #[test]
    #[serial]
    fn test_config_missing_secret_is_fatal() {
        set_required_vars();
        // SAFETY: the tests mutating the environment are `#[serial]`
        unsafe {
            env::remove_var("APP_SECRET");
        }
        assert!(AppConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_debug_does_not_leak_secret() {
        set_required_vars();
        let config = AppConfig::from_env().expect("config should load");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("test-secret"));
        assert!(!printed.contains("client-secret"));
    }
}
