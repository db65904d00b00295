//! HTTP server for Stockroom.
//!
//! Exposes the inventory, audit-log and account endpoints over axum. Every
//! response, including failures, uses the `{success, message?, data?,
//! errors?}` envelope. Mutations go through the engine; this crate only
//! authenticates, decodes and renders.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;
pub mod users;

pub use auth::{Action, AuthProvider, Authenticated, Claims, Credentials, IssuedToken, TokenAuthority};
pub use config::{BootstrapAdmin, ServerConfig};
pub use envelope::Reply;
pub use error::{ServerError, ServerResult};
pub use server::StockroomServer;
pub use state::AppState;
pub use users::{NewUser, UserDirectory, UserRecord};
