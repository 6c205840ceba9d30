//! Blog Dashboard server

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_dashboard::{
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCategoryRepository, SqlxPostRepository, SqlxSessionRepository, SqlxUserRepository,
        },
    },
    media::MediaStore,
    services::{CategoryService, PostService, UserService},
    view::ViewEngine,
    web::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_dashboard=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting blog dashboard...");

    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());

    // Services
    let user_service = Arc::new(UserService::with_session_expiration(
        user_repo,
        session_repo,
        config.session.expiration_days,
    ));
    let category_service = Arc::new(CategoryService::new(category_repo.clone()));
    let post_service = Arc::new(PostService::new(
        post_repo,
        category_repo,
        MediaStore::new(config.upload.clone()),
    ));

    if let Some(ref admin) = config.admin {
        user_service.ensure_admin(admin).await?;
    }

    let views = ViewEngine::new(config.templates.path.as_deref())?;
    tracing::info!("Templates loaded");

    // Purge expired sessions periodically
    {
        let user_service = user_service.clone();
        let period = tokio::time::Duration::from_secs(config.session.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(count) => tracing::info!("Removed {} expired session(s)", count),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        user_service,
        category_service,
        post_service,
        views: Arc::new(views),
        config: Arc::new(config),
    };

    let app = web::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
