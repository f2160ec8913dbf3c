//! API service routes
//!
//! Route wiring plus the request handlers. Handlers never swallow errors:
//! each step's failure propagates with `?` to the centralized responder in
//! `error.rs`.

use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::bearer_auth,
    models::{Gallery, GalleryPayload, Pic, SignupRequest, User},
    repositories::pic::group_by_gallery,
    state::AppState,
    upload::{self, StagedUpload},
    validation,
};

/// Upper bound for multipart upload bodies
const UPLOAD_BODY_LIMIT: usize = 32 * 1024 * 1024;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/gallery", post(create_gallery))
        .route("/api/galleries", get(list_galleries))
        .route(
            "/api/gallery/:id",
            get(get_gallery).put(update_gallery).delete(delete_gallery),
        )
        .route(
            "/api/gallery/:id/pic",
            post(upload_pic).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/pics", get(list_pics))
        .route_layer(middleware::from_fn_with_state(state.clone(), bearer_auth));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/signin", get(signin))
        .route("/api/signup", post(signup))
        .route("/login/google", get(login_google))
        .route("/oauth/google/code", get(oauth_google_code))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    common::database::health_check(&state.db_pool)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(json!({
        "status": "ok",
        "service": "gallery-api"
    })))
}

/// Basic-auth signin: verify credentials, issue a fresh bearer token
///
/// The token body is plain text. An unknown username and a wrong password
/// are reported identically.
pub async fn signin(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Basic>>>,
) -> ApiResult<String> {
    let TypedHeader(auth) =
        auth.ok_or_else(|| ApiError::Auth("basic auth required".to_string()))?;

    info!("Signin attempt for user: {}", auth.username());

    let user = state
        .user_repository
        .find_by_username(auth.username())
        .await?
        .ok_or_else(|| ApiError::Auth("username/password mismatch".to_string()))?;

    state
        .user_repository
        .verify_password(&user, auth.password())
        .await?;

    state.token_service.issue(&user).await
}

/// Signup: create the account, return its first bearer token
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<String> {
    let new_user = validation::validate_signup(payload)?;

    info!("Signup for user: {}", new_user.username);

    let user = state.user_repository.create(&new_user).await?;
    state.token_service.issue(&user).await
}

/// Create a gallery owned by the caller
pub async fn create_gallery(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<GalleryPayload>,
) -> ApiResult<Json<Gallery>> {
    let (name, desc) = validation::validate_gallery(payload)?;

    let gallery = state
        .gallery_repository
        .create(user.id, &name, &desc)
        .await?;

    Ok(Json(gallery))
}

/// List the caller's galleries
pub async fn list_galleries(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<Vec<Gallery>>> {
    let galleries = state.gallery_repository.list_for_owner(user.id).await?;
    Ok(Json(galleries))
}

/// Fetch one of the caller's galleries
pub async fn get_gallery(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<Gallery>> {
    let id = parse_id(&id, "gallery")?;
    let gallery = state.gallery_repository.find_for_owner(id, user.id).await?;
    Ok(Json(gallery))
}

/// Update name/description of one of the caller's galleries
pub async fn update_gallery(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<User>,
    Json(payload): Json<GalleryPayload>,
) -> ApiResult<Json<Gallery>> {
    let id = parse_id(&id, "gallery")?;
    let gallery = state
        .gallery_repository
        .update_for_owner(id, user.id, payload.name.as_deref(), payload.desc.as_deref())
        .await?;
    Ok(Json(gallery))
}

/// Delete one of the caller's galleries
pub async fn delete_gallery(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<User>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "gallery")?;
    state
        .gallery_repository
        .delete_for_owner(id, user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Upload a picture into one of the caller's galleries
///
/// Runs the upload pipeline; the scratch file is removed once the outcome
/// is settled, whether the pipeline succeeded or failed.
pub async fn upload_pic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<User>,
    multipart: Multipart,
) -> ApiResult<Json<Pic>> {
    let gallery_id = parse_id(&id, "gallery")?;

    let staged = StagedUpload::receive(multipart, &state.config.scratch_dir).await?;
    let outcome = upload::store_and_record(&state, &user, gallery_id, &staged).await;
    staged.cleanup().await;

    outcome.map(Json)
}

/// All of the caller's pictures, grouped by gallery id
pub async fn list_pics(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> ApiResult<Json<HashMap<Uuid, Vec<Pic>>>> {
    let pics = state.pic_repository.list_for_owner(user.id).await?;
    Ok(Json(group_by_gallery(pics)))
}

/// OAuth callback query parameters
#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: Option<String>,
}

/// Redirect to the provider's authorization endpoint
pub async fn login_google(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.oauth.authorize_url())
}

/// OAuth callback: exchange the code, resolve the account, hand the client
/// a token cookie
///
/// Every failure collapses to a `reason=error` redirect; provider errors
/// are logged but never surfaced to the end user.
pub async fn oauth_google_code(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallback>,
) -> Response {
    let Some(code) = params.code else {
        return client_redirect(&state.config.client_url, "error").into_response();
    };

    match oauth_flow(&state, code).await {
        Ok(token) => {
            let cookie = format!("X-Insta-Token={}; Path=/", token);
            (
                [(header::SET_COOKIE, cookie)],
                client_redirect(&state.config.client_url, "authorized"),
            )
                .into_response()
        }
        Err(err) => {
            error!("OAuth flow failed: {}", err);
            client_redirect(&state.config.client_url, "error").into_response()
        }
    }
}

async fn oauth_flow(state: &AppState, code: String) -> ApiResult<String> {
    let access_token = state.oauth.exchange_code(code).await?;
    let profile = state.oauth.fetch_profile(&access_token).await?;

    let email = profile
        .email
        .ok_or_else(|| ApiError::Validation("missing login info".to_string()))?;

    let user = state.user_repository.find_or_create_by_email(&email).await?;
    state.token_service.issue(&user).await
}

/// An unparseable entity id behaves exactly like a missing one
fn parse_id(raw: &str, entity: &'static str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(entity))
}

fn client_redirect(client_url: &str, reason: &str) -> Redirect {
    Redirect::temporary(&client_redirect_url(client_url, reason))
}

fn client_redirect_url(client_url: &str, reason: &str) -> String {
    let separator = if client_url.contains('?') { '&' } else { '?' };
    format!("{}{}reason={}", client_url, separator, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_rejects_garbage_as_not_found() {
        assert!(matches!(
            parse_id("missing", "gallery"),
            Err(ApiError::NotFound("gallery"))
        ));
        assert!(matches!(
            parse_id("deadbeefdeadbeefdeadbeef", "gallery"),
            Err(ApiError::NotFound("gallery"))
        ));
        assert!(parse_id("8c3f1c9e-0a57-4a57-9d36-6f7a9b1f2d3c", "gallery").is_ok());
    }

    #[test]
    fn test_client_redirect_url_separator() {
        assert_eq!(
            client_redirect_url("https://app.example.com", "authorized"),
            "https://app.example.com?reason=authorized"
        );
        assert_eq!(
            client_redirect_url("https://app.example.com/cb?next=home", "error"),
            "https://app.example.com/cb?next=home&reason=error"
        );
    }
}
