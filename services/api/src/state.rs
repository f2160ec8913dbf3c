//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::oauth::GoogleOAuth;
use crate::repositories::{GalleryRepository, PicRepository, UserRepository};
use crate::storage::ObjectStorage;
use crate::token::TokenService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub user_repository: UserRepository,
    pub gallery_repository: GalleryRepository,
    pub pic_repository: PicRepository,
    pub token_service: TokenService,
    pub storage: ObjectStorage,
    pub oauth: GoogleOAuth,
}
