use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use sidepick_realtime::BroadcastHub;
use sidepick_service::RoomService;
use sidepick_server::{serve, AppState, ServerConfig, SharedSecretAuth};
use sidepick_store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,sidepick_server=debug,sidepick_service=debug")
            }),
        )
        .init();

    info!("starting sidepick v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(
        addr = %config.listen_addr,
        db = %config.db_connection,
        timeout_secs = config.request_timeout.as_secs(),
        "configuration loaded"
    );

    let store = SqliteStore::connect(&config.db_connection).await?;
    let hub = Arc::new(BroadcastHub::new());
    let service = Arc::new(RoomService::new(store, Arc::clone(&hub)));
    let auth = Arc::new(SharedSecretAuth::new(config.token_secret.clone()));

    let state = AppState { service, auth };

    tokio::select! {
        result = serve(state, &config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
            Ok(())
        }
    }
}
