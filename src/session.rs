//! Signed-in session context.
//!
//! A `Session` is constructed once at startup and handed to whatever needs the
//! current identity. It starts in the loading state; `restore` validates any
//! persisted token against the backend and ends loading. `logout` tears the
//! session down and forgets the persisted token.

use crate::api::TodoBackend;
use crate::error::{ClientError, Result};
use crate::models::User;
use crate::token_store::TokenStore;
use tracing::{info, warn};

pub struct Session {
    user: Option<User>,
    token: Option<String>,
    loading: bool,
    store: Box<dyn TokenStore>,
}

impl Session {
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        Session {
            user: None,
            token: None,
            loading: true,
            store,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Token for an authenticated call.
    pub fn require_token(&self) -> Result<&str> {
        self.token().ok_or(ClientError::SignedOut)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    /// Adopts a token and user. Persistence failures are logged; the
    /// in-memory session is still established.
    pub fn login(&mut self, token: String, user: User) {
        if let Err(e) = self.store.save(&token) {
            warn!(error = %e, "Failed to persist session token");
        }
        info!(user_id = user.id, email = %user.email, "Signed in");
        self.token = Some(token);
        self.user = Some(user);
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            info!(user_id = user.id, "Signed out");
        }
        self.token = None;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to remove persisted session token");
        }
    }

    pub fn update_user(&mut self, user: User) {
        self.user = Some(user);
    }

    /// Validates the persisted token, if any. Never fails: any problem
    /// leaves the session signed out.
    pub async fn restore(&mut self, backend: &dyn TodoBackend) {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Could not read persisted session");
                None
            }
        };

        if let Some(token) = stored {
            match backend.current_user(&token).await {
                Ok(user) => {
                    info!(user_id = user.id, "Session restored");
                    self.token = Some(token);
                    self.user = Some(user);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to restore session");
                    self.token = None;
                    self.user = None;
                    if let Err(e) = self.store.clear() {
                        warn!(error = %e, "Failed to remove persisted session token");
                    }
                }
            }
        }

        self.loading = false;
    }
}
