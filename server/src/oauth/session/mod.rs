use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::oauth::token::OAuthTokenSet;

/// How many logins may wait for their callback at once
pub const MAX_PENDING_AUTHORIZATIONS: usize = 32;

/// Data remembered between `/login` and `/callback` for one authorization attempt
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    /// PKCE code verifier to send with the token request
    pub code_verifier: String,
    /// The timestamp when this authorization was started
    pub created_at: DateTime<Utc>,
}

impl PendingAuthorization {
    pub fn new(code_verifier: String) -> Self {
        Self {
            code_verifier,
            created_at: Utc::now(),
        }
    }
}

/// Where the process is in the authorization flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    AwaitingCallback,
    Authenticated,
}

/// In-memory session state for the single interactive user
///
/// Pending authorizations are keyed by their anti-forgery `state` value and are
/// consumed on first use. The token lives in a single slot; every write to it
/// goes through the slot's lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    pending: Mutex<HashMap<String, PendingAuthorization>>,
    token: Mutex<Option<OAuthTokenSet>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a pending authorization under its state value
    ///
    /// At most [`MAX_PENDING_AUTHORIZATIONS`] are kept; the oldest are dropped to
    /// make room.
    pub async fn insert_pending(&self, state: String, pending: PendingAuthorization) {
        let mut map = self.pending.lock().await;

        while map.len() >= MAX_PENDING_AUTHORIZATIONS {
            let Some(oldest) = map
                .iter()
                .min_by_key(|(_, pending)| pending.created_at)
                .map(|(state, _)| state.clone())
            else {
                break;
            };

            map.remove(&oldest);
            debug!("Dropped oldest pending authorization");
        }

        map.insert(state, pending);
    }

    /// Remove and return the pending authorization for `state`
    ///
    /// A state value can only be redeemed once.
    pub async fn take_pending(&self, state: &str) -> Option<PendingAuthorization> {
        self.pending.lock().await.remove(state)
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Lock the token slot
    ///
    /// Callers that need to read-then-write (refresh, revoke) hold this guard for
    /// the whole operation.
    pub async fn token_slot(&self) -> MutexGuard<'_, Option<OAuthTokenSet>> {
        self.token.lock().await
    }

    pub async fn set_token(&self, token: OAuthTokenSet) {
        *self.token.lock().await = Some(token);
    }

    pub async fn status(&self) -> SessionStatus {
        if self.token.lock().await.is_some() {
            return SessionStatus::Authenticated;
        }

        if self.pending.lock().await.is_empty() {
            SessionStatus::Unauthenticated
        } else {
            SessionStatus::AwaitingCallback
        }
    }
}
