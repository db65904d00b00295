//! Bearer-token authentication.
//!
//! A token is `hex(claims JSON) "." hex(ed25519 signature over the claims JSON)`.
//! Tokens are stateless: any server holding the same signing key accepts them
//! until `exp`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use stockroom_types::{Actor, Role};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(|token| Self::Bearer(token.trim().to_string()))
            .unwrap_or(Self::Anonymous)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    ReadInventory,
    WriteInventory,
    ManageUsers,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadInventory => write!(f, "read:inventory"),
            Self::WriteInventory => write!(f, "write:inventory"),
            Self::ManageUsers => write!(f, "manage:users"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Actor>;
    async fn authorize(&self, actor: &Actor, action: &Action) -> ServerResult<bool>;
}

/// Signed token payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer tokens.
pub struct TokenAuthority {
    key: SigningKey,
    verifying: VerifyingKey,
    ttl: Duration,
}

impl TokenAuthority {
    pub fn new(key: SigningKey, ttl: Duration) -> Self {
        let verifying = key.verifying_key();
        Self { key, verifying, ttl }
    }

    /// Authority with a fresh random key.
    pub fn generate(ttl: Duration) -> Self {
        Self::new(SigningKey::generate(&mut rand::thread_rng()), ttl)
    }

    pub fn from_seed(seed: [u8; 32], ttl: Duration) -> Self {
        Self::new(SigningKey::from_bytes(&seed), ttl)
    }

    pub fn issue(&self, actor: &Actor) -> ServerResult<IssuedToken> {
        self.issue_at(actor, Utc::now())
    }

    pub fn issue_at(&self, actor: &Actor, now: DateTime<Utc>) -> ServerResult<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: actor.identity.clone(),
            role: actor.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| ServerError::Internal(format!("encode claims: {e}")))?;
        let signature = self.key.sign(&payload);
        Ok(IssuedToken {
            token: format!("{}.{}", hex::encode(&payload), hex::encode(signature.to_bytes())),
            role: actor.role,
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> ServerResult<Claims> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> ServerResult<Claims> {
        let invalid = || ServerError::Unauthorized("Invalid or expired token".into());

        let (payload_hex, signature_hex) = token.split_once('.').ok_or_else(invalid)?;
        let payload = hex::decode(payload_hex).map_err(|_| invalid())?;
        let signature_bytes: [u8; 64] = hex::decode(signature_hex)
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;
        self.verifying
            .verify(&payload, &Signature::from_bytes(&signature_bytes))
            .map_err(|_| invalid())?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| invalid())?;
        if claims.exp <= now.timestamp() {
            return Err(invalid());
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("verifying_key", &hex::encode(self.verifying.to_bytes()))
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish()
    }
}

#[async_trait]
impl AuthProvider for TokenAuthority {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Actor> {
        match credentials {
            Credentials::Bearer(token) => {
                let claims = self.verify(token)?;
                Ok(Actor {
                    identity: claims.sub,
                    role: claims.role,
                })
            }
            Credentials::Anonymous => Err(ServerError::Unauthorized("Missing authorization token".into())),
        }
    }

    async fn authorize(&self, actor: &Actor, action: &Action) -> ServerResult<bool> {
        Ok(match action {
            Action::ReadInventory | Action::WriteInventory => true,
            Action::ManageUsers => actor.is_admin(),
        })
    }
}

/// The authenticated caller of a request.
#[derive(Clone, Debug)]
pub struct Authenticated(pub Actor);

impl Authenticated {
    /// Fail with 403 unless the caller may perform `action`.
    pub async fn require(&self, auth: &Arc<dyn AuthProvider>, action: Action) -> ServerResult<()> {
        if auth.authorize(&self.0, &action).await? {
            Ok(())
        } else {
            tracing::warn!(identity = %self.0.identity, %action, "authorization denied");
            Err(ServerError::Forbidden("Unauthorized".into()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = Credentials::from_headers(&parts.headers);
        state.auth.authenticate(&credentials).await.map(Self)
    }
}
