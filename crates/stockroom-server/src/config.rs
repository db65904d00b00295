use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const ENV_BIND: &str = "STOCKROOM_BIND";
pub const ENV_DATA_DIR: &str = "STOCKROOM_DATA_DIR";
pub const ENV_DEBUG: &str = "STOCKROOM_DEBUG";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the journals; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    /// Expose failure detail in 500 responses.
    pub debug: bool,
    pub token_ttl_secs: u64,
    /// Hex-encoded 32-byte ed25519 seed. A fresh key is generated when
    /// absent, which invalidates tokens on restart.
    pub signing_key_hex: Option<String>,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Sync every journal write to disk before acknowledging it.
    pub sync_writes: bool,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            data_dir: None,
            debug: false,
            token_ttl_secs: 3600,
            signing_key_hex: None,
            cors_origins: vec!["http://localhost:3000".into()],
            request_timeout_secs: 30,
            sync_writes: false,
            bootstrap_admin: None,
        }
    }
}

/// Administrator created at startup if no user by that name exists.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ServerConfig {
    pub fn from_toml(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read `path` if given (defaults otherwise), then apply the process
    /// environment.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let config = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.with_env(|name| std::env::var(name).ok())
    }

    /// Apply `STOCKROOM_*` overrides read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind_addr = bind
                .parse()
                .map_err(|e| ServerError::Config(format!("{ENV_BIND}={bind}: {e}")))?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(debug) = lookup(ENV_DEBUG) {
            self.debug = matches!(debug.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        Ok(self)
    }

    pub fn signing_seed(&self) -> ServerResult<Option<[u8; 32]>> {
        let Some(raw) = &self.signing_key_hex else {
            return Ok(None);
        };
        let bytes = hex::decode(raw.trim())
            .map_err(|e| ServerError::Config(format!("signing_key_hex: {e}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ServerError::Config("signing_key_hex must encode 32 bytes".into()))?;
        Ok(Some(seed))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.token_ttl_secs, 3600);
        assert_eq!(c.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert!(c.data_dir.is_none());
        assert!(!c.debug);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml(
            r#"
            debug = true
            data_dir = "/var/lib/stockroom"

            [bootstrap_admin]
            username = "root"
            password = "Sup3rSecret"
            "#,
        )
        .unwrap();
        assert!(c.debug);
        assert_eq!(c.data_dir, Some(PathBuf::from("/var/lib/stockroom")));
        assert_eq!(c.request_timeout_secs, 30);
        assert_eq!(c.bootstrap_admin.unwrap().username, "root");
    }

    #[test]
    fn toml_roundtrip() {
        let c = ServerConfig::default();
        assert_eq!(ServerConfig::from_toml(&c.to_toml().unwrap()).unwrap(), c);
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_BIND, "0.0.0.0:8080"),
            (ENV_DATA_DIR, "/tmp/stock"),
            (ENV_DEBUG, "TRUE"),
        ]
        .into_iter()
        .collect();
        let c = ServerConfig::default()
            .with_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.data_dir, Some(PathBuf::from("/tmp/stock")));
        assert!(c.debug);
    }

    #[test]
    fn bad_bind_is_a_config_error() {
        let err = ServerConfig::default()
            .with_env(|name| (name == ENV_BIND).then(|| "nope".to_string()))
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn signing_seed_must_be_32_bytes() {
        let mut c = ServerConfig::default();
        assert_eq!(c.signing_seed().unwrap(), None);

        c.signing_key_hex = Some("ab".repeat(32));
        assert_eq!(c.signing_seed().unwrap(), Some([0xab; 32]));

        c.signing_key_hex = Some("abcd".into());
        assert!(c.signing_seed().is_err());
    }
}
