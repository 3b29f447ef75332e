//! External collaborators the pipeline calls into.
//!
//! Persistence is out of the pipeline's hands: it only needs to resolve a
//! token to a user and a user to a permission set. Both are behind traits
//! so the binary, a database layer or a test fake can sit behind them.
//! [`MemoryStore`] backs both traits for the standalone binary.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture};
use thiserror::Error;

use crate::config::SeedUser;
use crate::security::principal::{Permissions, User};

/// What a token was issued for. Only authentication tokens log a user in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    Authentication,
    Activation,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    RecordNotFound,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a plaintext token to the user it was issued to.
pub trait UserStore: Send + Sync {
    fn get_for_token<'a>(
        &'a self,
        scope: TokenScope,
        plaintext: &'a str,
    ) -> BoxFuture<'a, Result<User, StoreError>>;
}

/// Resolves a user to their permission codes.
pub trait PermissionStore: Send + Sync {
    fn get_all_for_user(&self, user_id: i64) -> BoxFuture<'_, Result<Permissions, StoreError>>;
}

/// In-process user, token and permission tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<i64, User>,
    tokens: DashMap<(TokenScope, String), i64>,
    permissions: DashMap<i64, Permissions>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding the configured seed users.
    pub fn from_seed(seed: &[SeedUser]) -> Arc<Self> {
        let store = Self::new();
        for user in seed {
            store.insert_user(
                User {
                    id: user.id,
                    activated: user.activated,
                },
                &user.token,
                user.permissions.iter().cloned().collect(),
            );
        }
        Arc::new(store)
    }

    /// Register a user with one authentication token.
    pub fn insert_user(&self, user: User, token: &str, permissions: Permissions) {
        self.tokens
            .insert((TokenScope::Authentication, token.to_string()), user.id);
        self.permissions.insert(user.id, permissions);
        self.users.insert(user.id, user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn lookup(&self, scope: TokenScope, plaintext: &str) -> Result<User, StoreError> {
        let user_id = self
            .tokens
            .get(&(scope, plaintext.to_string()))
            .map(|id| *id.value())
            .ok_or(StoreError::RecordNotFound)?;

        self.users
            .get(&user_id)
            .map(|user| user.value().clone())
            .ok_or(StoreError::RecordNotFound)
    }
}

impl UserStore for MemoryStore {
    fn get_for_token<'a>(
        &'a self,
        scope: TokenScope,
        plaintext: &'a str,
    ) -> BoxFuture<'a, Result<User, StoreError>> {
        Box::pin(future::ready(self.lookup(scope, plaintext)))
    }
}

impl PermissionStore for MemoryStore {
    fn get_all_for_user(&self, user_id: i64) -> BoxFuture<'_, Result<Permissions, StoreError>> {
        let permissions = self
            .permissions
            .get(&user_id)
            .map(|p| p.value().clone())
            .unwrap_or_default();
        Box::pin(future::ready(Ok(permissions)))
    }
}
