use std::sync::Arc;

use stockroom_engine::{MutationEngine, QueryService, Stores};

use crate::auth::{AuthProvider, TokenAuthority};
use crate::users::UserDirectory;

/// Shared handles every handler receives.
#[derive(Clone)]
pub struct AppState {
    pub engine: MutationEngine,
    pub queries: QueryService,
    pub auth: Arc<dyn AuthProvider>,
    pub tokens: Arc<TokenAuthority>,
    pub users: Arc<UserDirectory>,
}

impl AppState {
    pub fn new(stores: &Stores, tokens: Arc<TokenAuthority>, users: Arc<UserDirectory>) -> Self {
        Self {
            engine: stores.engine(),
            queries: stores.queries(),
            auth: tokens.clone(),
            tokens,
            users,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tokens", &self.tokens)
            .field("users", &self.users)
            .finish_non_exhaustive()
    }
}
