//! Google OAuth2 integration
//!
//! Builds the provider authorization URL and exchanges returned codes for
//! an access token, then fetches the user's profile. Provider errors never
//! reach the end user; the routes collapse any failure here into a
//! `reason=error` redirect.

use anyhow::Result;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{ApiError, ApiResult};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Profile fields fetched from the provider after the exchange
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthProfile {
    pub email: Option<String>,
}

/// OAuth2 client wrapper for Google
#[derive(Clone)]
pub struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
}

impl GoogleOAuth {
    /// Create a new Google OAuth client; the redirect URI is fixed to
    /// `{API_URL}/oauth/google/code`
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.google_client_id.clone()),
            Some(ClientSecret::new(config.google_client_secret.clone())),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string())?,
            Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string())?),
        )
        .set_redirect_uri(RedirectUrl::new(format!(
            "{}/oauth/google/code",
            config.api_url
        ))?);

        Ok(Self {
            client,
            http: reqwest::Client::new(),
        })
    }

    /// Authorization URL the login route redirects to
    pub fn authorize_url(&self) -> String {
        let (auth_url, _csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .url();

        auth_url.to_string()
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: String) -> ApiResult<String> {
        info!("Exchanging authorization code for access token");

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| ApiError::Auth(format!("code exchange failed: {}", e)))?;

        Ok(token_response.access_token().secret().clone())
    }

    /// Fetch the authenticated user's profile from the provider
    pub async fn fetch_profile(&self, access_token: &str) -> ApiResult<OAuthProfile> {
        let profile = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| ApiError::Auth(format!("profile fetch failed: {}", e)))?
            .json::<OAuthProfile>()
            .await
            .map_err(|e| ApiError::Auth(format!("profile decode failed: {}", e)))?;

        Ok(profile)
    }
}
