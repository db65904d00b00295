//! User accounts and password checks.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use stockroom_engine::validation::Validator;
use stockroom_store::{Journal, SyncMode};
use stockroom_types::{Actor, Role};
use tracing::info;

use crate::error::{ServerError, ServerResult};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const WEAK_PASSWORD: &str =
    "Password must contain at least 8 characters, one uppercase, one lowercase, and one number";

const PASSWORD_DOMAIN: &[u8] = b"stockroom-password-v1:";

/// At least eight characters with an uppercase letter, a lowercase letter
/// and a digit.
pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

fn hash_password(salt: &[u8], password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(PASSWORD_DOMAIN);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize()
}

/// A stored account. The password is kept only as a salted hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub role: Role,
    salt: String,
    password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    fn new(username: String, password: &str, role: Role) -> Self {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            username,
            role,
            salt: hex::encode(salt),
            password_hash: hash_password(&salt, password).to_hex().to_string(),
            created_at: Utc::now(),
        }
    }

    fn verify(&self, password: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (
            hex::decode(&self.salt),
            blake3::Hash::from_hex(&self.password_hash),
        ) else {
            return false;
        };
        // blake3::Hash equality is constant-time.
        hash_password(&salt, password) == expected
    }

    pub fn actor(&self) -> Actor {
        Actor {
            identity: self.username.clone(),
            role: self.role,
        }
    }
}

/// `POST /auth/login` body.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `POST /auth/create_user` body.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewUser {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            role: Some(role.as_str().to_string()),
        }
    }
}

/// Registered accounts, optionally journaled to disk.
pub struct UserDirectory {
    users: RwLock<BTreeMap<String, UserRecord>>,
    journal: Option<Journal<UserRecord>>,
}

impl UserDirectory {
    pub fn in_memory() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            journal: None,
        }
    }

    pub fn open(path: &Path, sync_mode: SyncMode) -> ServerResult<Self> {
        let journal = Journal::open(path, sync_mode).map_err(unavailable)?;
        let users: BTreeMap<_, _> = journal
            .recover()
            .map_err(unavailable)?
            .into_iter()
            .map(|u: UserRecord| (u.username.clone(), u))
            .collect();
        info!(path = %path.display(), users = users.len(), "user journal opened");
        Ok(Self {
            users: RwLock::new(users),
            journal: Some(journal),
        })
    }

    /// Validate and register a new account.
    pub fn create(&self, request: &NewUser) -> ServerResult<UserRecord> {
        let mut v = Validator::new();
        let username = v.text("username", &request.username).map(str::trim);
        if matches!(username, Some(name) if name.chars().count() < MIN_USERNAME_LEN) {
            v.reject("username", format!("Shorter than minimum length {MIN_USERNAME_LEN}."));
        }
        let password = v.text("password", &request.password);
        if matches!(password, Some(pw) if pw.chars().count() < MIN_PASSWORD_LEN) {
            v.reject("password", format!("Shorter than minimum length {MIN_PASSWORD_LEN}."));
        }
        let role = match request.role.as_deref() {
            None => Some(Role::User),
            Some(raw) => match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(_) => {
                    v.reject("role", "Must be one of: user, admin.");
                    None
                }
            },
        };
        v.finish("Validation error").map_err(ServerError::from)?;

        let (Some(username), Some(password), Some(role)) = (username, password, role) else {
            return Err(ServerError::Internal("validator accepted incomplete user".into()));
        };
        if !validate_password(password) {
            return Err(ServerError::invalid(WEAK_PASSWORD));
        }

        let mut users = self
            .users
            .write()
            .map_err(|_| ServerError::Internal("user directory lock poisoned".into()))?;
        if users.contains_key(username) {
            return Err(ServerError::Conflict("User already exists".into()));
        }

        let record = UserRecord::new(username.to_string(), password, role);
        if let Some(journal) = &self.journal {
            journal.append(&record).map_err(unavailable)?;
        }
        users.insert(record.username.clone(), record.clone());
        info!(username = %record.username, role = %record.role, "user created");
        Ok(record)
    }

    /// The account matching `username` and `password`, if any.
    pub fn authenticate(&self, username: &str, password: &str) -> ServerResult<Option<UserRecord>> {
        let users = self
            .users
            .read()
            .map_err(|_| ServerError::Internal("user directory lock poisoned".into()))?;
        Ok(users
            .get(username.trim())
            .filter(|u| u.verify(password))
            .cloned())
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users
            .read()
            .map(|users| users.contains_key(username))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn unavailable(err: stockroom_store::StoreError) -> ServerError {
    ServerError::StoreUnavailable(format!("user journal: {err}"))
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("users", &self.len())
            .field("journaled", &self.journal.is_some())
            .finish()
    }
}
