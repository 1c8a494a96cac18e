//! Identity resolution port.
//!
//! The marketplace never issues tokens itself; an external identity
//! collaborator turns an opaque caller token into a `(role, entity_id)`
//! principal. The shipped `StaticTokenAuth` implementation keeps an
//! in-memory token table with expiry, which is all development and
//! tests need.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ServiceError;

// =============================================================================
// Principal
// =============================================================================

/// Which side of the marketplace the caller acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// An ordering customer
    Customer,
    /// A delivery driver
    Driver,
    /// A restaurant operator
    Restaurant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Driver => write!(f, "driver"),
            Role::Restaurant => write!(f, "restaurant"),
        }
    }
}

/// A resolved caller identity.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    /// The caller's role
    pub role: Role,
    /// The entity the caller acts as (customer/driver/restaurant id)
    pub entity_id: Uuid,
}

impl Principal {
    /// The entity id, provided the principal has the expected role.
    ///
    /// # Errors
    /// Returns `AuthError::WrongRole` otherwise.
    pub fn expect_role(&self, role: Role) -> Result<Uuid, AuthError> {
        if self.role == role {
            Ok(self.entity_id)
        } else {
            Err(AuthError::WrongRole { expected: role, actual: self.role })
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Identity resolution failures.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Token is not known to the identity collaborator
    #[error("Unknown access token")]
    UnknownToken,

    /// Token was known but its lifetime has passed
    #[error("Access token expired")]
    ExpiredToken,

    /// Token resolved, but to the wrong kind of principal
    #[error("Token grants {actual} access, {expected} required")]
    WrongRole {
        /// Role the endpoint requires
        expected: Role,
        /// Role the token actually carries
        actual: Role,
    },
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Auth(err.to_string())
    }
}

// =============================================================================
// Identity Port
// =============================================================================

/// Port for the external identity collaborator.
#[async_trait]
pub trait IdentityPort: Send + Sync {
    /// Resolve an opaque token into a principal.
    async fn resolve(&self, token: &str) -> Result<Principal, AuthError>;
}

// =============================================================================
// Static Token Auth
// =============================================================================

struct IssuedToken {
    principal: Principal,
    expires_at: DateTime<Utc>,
}

/// In-memory identity implementation for development and tests.
///
/// Tokens are issued explicitly; resolution checks the expiry the way
/// the real collaborator would.
pub struct StaticTokenAuth {
    tokens: RwLock<HashMap<String, IssuedToken>>,
}

impl StaticTokenAuth {
    /// Create an empty token table.
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a fresh token for `principal`, valid for `ttl`.
    pub fn issue(&self, principal: Principal, ttl: Duration) -> String {
        let token = format!("tok_{}", Uuid::now_v7().simple());
        self.insert(token.clone(), principal, Utc::now() + ttl);
        token
    }

    /// Register a caller-chosen token (useful in tests).
    pub fn insert(&self, token: String, principal: Principal, expires_at: DateTime<Utc>) {
        let mut tokens = self.tokens.write().unwrap();
        tokens.insert(token, IssuedToken { principal, expires_at });
    }
}

impl Default for StaticTokenAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityPort for StaticTokenAuth {
    async fn resolve(&self, token: &str) -> Result<Principal, AuthError> {
        let tokens = self.tokens.read().unwrap();
        let issued = tokens.get(token).ok_or(AuthError::UnknownToken)?;

        if issued.expires_at <= Utc::now() {
            return Err(AuthError::ExpiredToken);
        }

        Ok(issued.principal)
    }
}

// =============================================================================
// Tests
// =============================================================================
