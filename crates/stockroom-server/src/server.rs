use std::sync::Arc;

use chrono::Duration;
use stockroom_engine::Stores;
use stockroom_store::SyncMode;
use stockroom_types::Role;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::TokenAuthority;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;
use crate::users::{NewUser, UserDirectory};

pub const USERS_JOURNAL: &str = "users.journal";

/// Stockroom HTTP server.
pub struct StockroomServer {
    config: ServerConfig,
    state: AppState,
}

impl StockroomServer {
    /// Open the stores named by `config`, set up token signing and seed
    /// the bootstrap administrator.
    pub fn build(config: ServerConfig) -> ServerResult<Self> {
        let sync_mode = if config.sync_writes {
            SyncMode::EveryWrite
        } else {
            SyncMode::OsDefault
        };
        let (stores, users) = match &config.data_dir {
            Some(dir) => {
                let stores = Stores::open(dir, sync_mode)?;
                let users = UserDirectory::open(&dir.join(USERS_JOURNAL), sync_mode)?;
                (stores, users)
            }
            None => {
                warn!("no data_dir configured; inventory is kept in memory only");
                (Stores::in_memory(), UserDirectory::in_memory())
            }
        };

        let ttl_secs = i64::try_from(config.token_ttl_secs)
            .map_err(|_| ServerError::Config("token_ttl_secs is too large".into()))?;
        let ttl = Duration::seconds(ttl_secs);
        let tokens = match config.signing_seed()? {
            Some(seed) => TokenAuthority::from_seed(seed, ttl),
            None => {
                warn!("no signing key configured; issued tokens will not survive a restart");
                TokenAuthority::generate(ttl)
            }
        };

        if let Some(admin) = &config.bootstrap_admin {
            if !users.contains(&admin.username) {
                users.create(&NewUser::new(&admin.username, &admin.password, Role::Admin))?;
                info!(username = %admin.username, "bootstrap administrator created");
            }
        }

        let state = AppState::new(&stores, Arc::new(tokens), Arc::new(users));
        Ok(Self { config, state })
    }

    /// Serve with already-built state (embedding and tests).
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), &self.config)
    }

    /// Serve until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, debug = self.config.debug, "stockroom server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("stockroom server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootstrapAdmin;

    #[test]
    fn server_construction() {
        let server = StockroomServer::build(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:5000".parse().unwrap());
        assert!(server.state().users.is_empty());
        let _router = server.router();
    }

    #[test]
    fn bootstrap_admin_is_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: Some(dir.path().to_path_buf()),
            bootstrap_admin: Some(BootstrapAdmin {
                username: "root".into(),
                password: "Adm1nPass".into(),
            }),
            ..ServerConfig::default()
        };

        let first = StockroomServer::build(config.clone()).unwrap();
        assert_eq!(first.state().users.len(), 1);
        drop(first);

        let second = StockroomServer::build(config).unwrap();
        assert_eq!(second.state().users.len(), 1);
        let root = second.state().users.authenticate("root", "Adm1nPass").unwrap().unwrap();
        assert_eq!(root.role, Role::Admin);
    }

    #[test]
    fn weak_bootstrap_password_fails_startup() {
        let config = ServerConfig {
            bootstrap_admin: Some(BootstrapAdmin {
                username: "root".into(),
                password: "weak".into(),
            }),
            ..ServerConfig::default()
        };
        assert!(StockroomServer::build(config).is_err());
    }

    #[tokio::test]
    async fn tokens_survive_restart_with_configured_key() {
        let config = ServerConfig {
            signing_key_hex: Some("11".repeat(32)),
            ..ServerConfig::default()
        };
        let first = StockroomServer::build(config.clone()).unwrap();
        let token = first
            .state()
            .tokens
            .issue(&stockroom_types::Actor::user("alice"))
            .unwrap()
            .token;

        let second = StockroomServer::build(config).unwrap();
        assert_eq!(second.state().tokens.verify(&token).unwrap().sub, "alice");
    }
}
