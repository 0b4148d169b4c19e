//! Session lifecycle
//!
//! The login call exchanges an account name and a SHA-512 digest of the password
//! for a session id. That id is attached as `Authorization: OAuth {id}` to every
//! later request until it is explicitly replaced. Expiry is not modeled: a
//! rejected call (see [`ControlPlaneError::is_unauthorized`]) is the caller's cue
//! to authenticate again.

use crate::common::ApiRequest;
use crate::error::{ControlPlaneError, Result};
use crate::transport_trait::Transport;
use serde_json::json;
use sha2::{Digest, Sha512};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Login endpoint, relative to `{base}/v1/`
pub const LOGIN_PATH: &str = "accounts/login";

/// Opaque session id returned by the login call
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw session id
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw session id
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("OAuth {}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Current session, shared by every request issued through one client.
///
/// Readers clone the token under a read lock; replacement takes the write
/// lock, so a request never sees a half-replaced token.
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<SessionToken>>,
}

impl Session {
    /// Create an unauthenticated session
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if logged in
    pub fn token(&self) -> Option<SessionToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a new token, returning the previous one
    pub fn replace(&self, token: SessionToken) -> Option<SessionToken> {
        self.token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token)
    }

    /// Whether a token is installed
    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Lowercase hex SHA-512 of the password, as the login call expects it
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha512::digest(password.as_bytes()))
}

/// Performs the login call and installs the resulting token on the transport's session
#[derive(Debug)]
pub struct SessionAuthenticator<'a, T: Transport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> SessionAuthenticator<'a, T> {
    /// Create an authenticator over a transport
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Log in and store the session token.
    ///
    /// # Returns
    /// * `Ok(SessionToken)` - The token now attached to every request
    /// * `Err(ControlPlaneError::Authentication)` - Credentials rejected or endpoint unreachable
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<SessionToken> {
        let body = json!({
            "logInByAccount": {
                "accountName": username,
                "password": password_digest(password),
            }
        });
        debug!("Logging in to {} as {}", self.transport.base_url(), username);

        let request = ApiRequest::put(LOGIN_PATH, body).anonymous();
        let envelope = self.transport.send(request).await.map_err(|e| {
            ControlPlaneError::Authentication(format!("login as {username} failed: {e}"))
        })?;

        let token = envelope
            .str_at(&["inventory", "uuid"])
            .filter(|uuid| !uuid.is_empty())
            .map(SessionToken::new)
            .ok_or_else(|| {
                ControlPlaneError::Authentication(
                    "login response carries no session id at inventory.uuid".to_string(),
                )
            })?;

        self.transport.session().replace(token.clone());
        info!("Authenticated to {} as {}", self.transport.base_url(), username);
        Ok(token)
    }
}
