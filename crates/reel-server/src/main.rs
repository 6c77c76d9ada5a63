use anyhow::{Context, Result};
use reel_db::{create_pool, run_migrations, UserRepo};
use reel_server::auth::hash_password;
use reel_server::config::load_config;
use reel_server::state::AppState;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Reel server");

    // Load configuration
    let config_path =
        std::env::var("REEL_CONFIG").unwrap_or_else(|_| "server-config.yaml".to_string());

    tracing::info!("Loading config from: {}", config_path);
    let config = load_config(&config_path)?;

    if config.auth.is_none() {
        tracing::warn!("No auth section configured: every authenticated route will deny");
    }

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.db.url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Seed initial user if configured
    if let Some(auth_config) = &config.auth {
        if let Some(initial_user) = &auth_config.initial_user {
            match UserRepo::get_by_email(&pool, &initial_user.email).await {
                Ok(Some(_)) => {
                    tracing::info!(
                        "Initial user '{}' already exists, skipping seed",
                        initial_user.email
                    );
                }
                Ok(None) => {
                    let password_hash = hash_password(&initial_user.password)
                        .context("Failed to hash initial user password")?;
                    UserRepo::create(
                        &pool,
                        uuid::Uuid::new_v4(),
                        &initial_user.email,
                        &initial_user.username,
                        Some(&password_hash),
                    )
                    .await
                    .context("Failed to create initial user")?;
                    tracing::info!("Created initial user: {}", initial_user.email);
                }
                Err(e) => {
                    tracing::warn!("Failed to check for initial user: {:#}", e);
                }
            }
        }
    }

    // Build application state
    let state = AppState::new(pool, config.clone());

    // Start the AI posting scheduler
    let cancel_token = CancellationToken::new();
    let _scheduler = reel_server::scheduler::start(state.clone(), cancel_token.clone());

    // Build router
    let app = reel_server::web::build_router(state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;

    tracing::info!("Server listening on {}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
    cancel_token.cancel();
}
