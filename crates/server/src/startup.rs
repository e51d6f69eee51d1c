use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, AuthSettings};
use service::auth::{repository::memory::MemoryAuthRepository, AuthConfig, AuthService};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::dispatch::ActionDispatcher;
use crate::errors::StartupError;
use crate::responder::JsonResponder;
use crate::routes::{self, auth::AuthState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Map file/env settings onto the auth service configuration
pub fn auth_config(settings: &AuthSettings) -> AuthConfig {
    AuthConfig {
        jwt_secret: settings.jwt_secret.clone(),
        password_algorithm: "argon2".into(),
        token_ttl: chrono::Duration::hours(settings.token_ttl_hours as i64),
        code_ttl: chrono::Duration::seconds(settings.code_ttl_secs as i64),
        code_resend_interval: chrono::Duration::seconds(settings.code_resend_secs as i64),
        code_max_attempts: settings.code_max_attempts,
        min_password_len: settings.min_password_len,
        sign_up_requires_code: settings.sign_up_requires_code,
    }
}

/// Wire the in-memory auth service behind the dispatcher
pub fn build_state(settings: &AuthSettings) -> AuthState {
    let repo = Arc::new(MemoryAuthRepository::new());
    let svc = AuthService::new(repo, auth_config(settings));
    AuthState {
        dispatcher: ActionDispatcher::new(Arc::new(svc), Arc::new(JsonResponder)),
    }
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("server address: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down");
}

/// Public entry: build the app and run the HTTP server until Ctrl+C
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    if cfg.auth.jwt_secret.is_none() {
        tracing::warn!("auth.jwt_secret not set; login will not issue tokens");
    }
    let app: Router = routes::build_router(build_state(&cfg.auth), build_cors());

    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting auth server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
