//! HTTP surface for Sidepick.
//!
//! A thin axum layer over the room service: every handler authenticates the
//! bearer token, dispatches to one service operation, and wraps the result
//! in the `{code, message, data}` envelope. Failures render as
//! `{statusCode, message, timestamp, path}` with the status chosen by the
//! error kind.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

pub use auth::{AuthError, AuthUser, Authenticator, SharedSecretAuth};
pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{build_router, AppService, AppState, Envelope};

/// Binds the listener and serves the API until the task is cancelled.
pub async fn serve<A: Authenticator>(
    state: AppState<A>,
    config: &ServerConfig,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "api listening");
    axum::serve(listener, build_router(state, config)).await?;
    Ok(())
}
