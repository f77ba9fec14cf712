//! Account sign-up, sign-in and bearer token verification.
//!
//! The server only talks to the identity service through
//! [`IdentityProvider`]; [`FirebaseIdentity`] is the production backend.

mod firebase;

pub use firebase::FirebaseIdentity;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Tokens returned after a successful sign-up or sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub email: String,
    pub id_token: String,
}

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account. Rejections (duplicate email, weak password,
    /// malformed email) are `AccountRejected`.
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Exchange credentials for an ID token. Bad credentials are `AuthInvalid`.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Check an ID token. Invalid or expired tokens are `AuthInvalid`.
    async fn verify_token(&self, id_token: &str) -> Result<Identity>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
