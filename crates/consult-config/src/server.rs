//! HTTP server configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_bind() -> String {
    String::from("127.0.0.1:8080")
}

/// Requests buffered between the accept thread and the async handlers.
const fn default_queue_depth() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl ServerConfig {
    /// Parse `bind` into a socket address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `bind` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                field: "server.bind".into(),
                reason: format!("{e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bind_parses() {
        let config = ServerConfig::default();
        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
        assert_eq!(config.queue_depth, 64);
    }

    #[test]
    fn invalid_bind_is_reported() {
        let config = ServerConfig {
            bind: "localhost".into(),
            ..Default::default()
        };
        let err = config.socket_addr().unwrap_err();
        assert!(err.to_string().contains("server.bind"));
    }
}
