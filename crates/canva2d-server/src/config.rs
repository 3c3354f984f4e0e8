//! Server configuration from the environment.

use canva2d_core::store::{StoreBackend, StoreBackendError};
use std::net::SocketAddr;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_ADDR: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
    3030,
);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid CANVA2D_ADDR {0:?}: expected host:port")]
    InvalidAddr(String),
    #[error(transparent)]
    Store(#[from] StoreBackendError),
}

/// Server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to listen on (`CANVA2D_ADDR`).
    pub addr: SocketAddr,
    /// Where documents are kept (`CANVA2D_STORE`).
    pub store: StoreBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR,
            store: StoreBackend::File(None),
        }
    }
}

impl ServerConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(addr) = lookup("CANVA2D_ADDR") {
            config.addr = addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddr(addr.clone()))?;
        }
        if let Some(store) = lookup("CANVA2D_STORE") {
            config.store = store.parse()?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr.port(), 3030);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CANVA2D_ADDR", "127.0.0.1:8080"),
            ("CANVA2D_STORE", "file:/var/lib/canva2d"),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(
            config.store,
            StoreBackend::File(Some(PathBuf::from("/var/lib/canva2d")))
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("CANVA2D_ADDR", "nope")])),
            Err(ConfigError::InvalidAddr(_))
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("CANVA2D_STORE", "redis")])),
            Err(ConfigError::Store(_))
        ));
    }
}
