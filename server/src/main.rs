mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::password::PasswordHasher;
use services::token::TokenIssuer;
use services::users::{MemoryUserStore, PgUserStore, UserStore};

#[tokio::main]
async fn main() {
    // Missing .env is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    let config = config::ServerConfig::from_env().expect("invalid configuration");

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_ansi(config.mode == config::ServerMode::Development)
        .init();

    tracing::info!(mode = config.mode.as_str(), port = config.port, "starting project portal auth service");

    let users: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            tracing::info!("database connection established");
            Arc::new(PgUserStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
            Arc::new(MemoryUserStore::new())
        }
    };

    let tokens = TokenIssuer::new(config.jwt_secret.clone(), config.jwt_previous_secrets.clone(), config.token_ttl);
    let hasher = PasswordHasher::new(config.bcrypt_cost);
    tracing::info!(bcrypt_cost = hasher.cost(), token_ttl_secs = tokens.ttl_secs(), "auth service configured");
    let state = state::AppState::new(users, hasher, tokens);

    let app = routes::app(state, &config.cors_origins, config.request_timeout);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, "project portal auth listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
    tracing::info!("server exited");
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
