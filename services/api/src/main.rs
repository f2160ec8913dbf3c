use anyhow::Result;
use aws_config::BehaviorVersion;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod middleware;
mod models;
mod oauth;
mod repositories;
mod routes;
mod state;
mod storage;
mod token;
mod upload;
mod validation;

use common::database::{self, DatabaseConfig};

use crate::config::AppConfig;
use crate::oauth::GoogleOAuth;
use crate::repositories::{GalleryRepository, PicRepository, UserRepository};
use crate::state::AppState;
use crate::storage::ObjectStorage;
use crate::token::TokenService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting gallery API service");

    // Load configuration; missing required values are fatal here, never
    // per-request
    let config = Arc::new(AppConfig::from_env()?);

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    sqlx::migrate!().run(&pool).await?;

    // Initialize the S3 client
    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let storage = ObjectStorage::new(s3_client, config.aws_bucket.clone());

    let oauth = GoogleOAuth::new(&config)?;

    let user_repository = UserRepository::new(pool.clone());
    let gallery_repository = GalleryRepository::new(pool.clone());
    let pic_repository = PicRepository::new(pool.clone());
    let token_service = TokenService::new(&config, user_repository.clone());

    let app_state = AppState {
        db_pool: pool,
        config: config.clone(),
        user_repository,
        gallery_repository,
        pic_repository,
        token_service,
        storage,
        oauth,
    };

    info!("Gallery API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Gallery API service listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
