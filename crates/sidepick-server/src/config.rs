//! Process configuration, read from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP endpoint the HTTP API listens on.
    pub listen_addr: SocketAddr,
    /// Repository URL, e.g. `sqlite://sidepick.db`.
    pub db_connection: String,
    /// Credentials for an external pub/sub deployment of the publisher
    /// contract. Unused by the in-process hub.
    pub publisher_key: String,
    pub publisher_cluster: String,
    pub publisher_secret: String,
    /// Credentials the external credential-exchange provider needs.
    pub auth_provider_appid: String,
    pub auth_provider_secret: String,
    /// Shared secret behind bearer-token verification.
    pub token_secret: String,
    /// How long issued bearer tokens stay valid.
    pub token_ttl: Duration,
    /// Per-request deadline for API handlers.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: ([127, 0, 0, 1], 8080).into(),
            db_connection: "sqlite://sidepick.db".to_string(),
            publisher_key: String::new(),
            publisher_cluster: String::new(),
            publisher_secret: String::new(),
            auth_provider_appid: String::new(),
            auth_provider_secret: String::new(),
            token_secret: "dev-secret".to_string(),
            token_ttl: Duration::from_secs(7 * 24 * 3600),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("LISTEN_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.listen_addr = parsed,
                Err(_) => {
                    tracing::warn!(value = %addr, "invalid LISTEN_ADDR, using default");
                }
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.db_connection = url;
        }

        if let Ok(key) = std::env::var("PUBLISHER_KEY") {
            config.publisher_key = key;
        }
        if let Ok(cluster) = std::env::var("PUBLISHER_CLUSTER") {
            config.publisher_cluster = cluster;
        }
        if let Ok(secret) = std::env::var("PUBLISHER_SECRET") {
            config.publisher_secret = secret;
        }

        if let Ok(appid) = std::env::var("AUTH_PROVIDER_APPID") {
            config.auth_provider_appid = appid;
        }
        if let Ok(secret) = std::env::var("AUTH_PROVIDER_SECRET") {
            config.auth_provider_secret = secret;
        }

        if let Ok(secret) = std::env::var("TOKEN_SECRET") {
            if !secret.is_empty() {
                config.token_secret = secret;
            }
        }

        if let Ok(val) = std::env::var("TOKEN_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.token_ttl = Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(value = %val, "invalid TOKEN_TTL_SECS, using default");
                }
            }
        }

        if let Ok(val) = std::env::var("REQUEST_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => config.request_timeout = Duration::from_secs(secs),
                Err(_) => {
                    tracing::warn!(value = %val, "invalid REQUEST_TIMEOUT_SECS, using default");
                }
            }
        }

        config
    }
}
