// Session store: owns the bearer token and identity of the signed-in
// admin, persists them through a `CredentialStore`, and pushes every
// state change to registered listeners.
//
// There is exactly one `SessionManager` per running client. It is shared
// (behind an `Arc`) with `api::ApiClient`, which calls `logout()` when the
// backend reports the token as expired.

use crate::storage::{CredentialStore, StorageError, IDENTITY_KEY, TOKEN_KEY};
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

pub(crate) const SIGNIN_PATH: &str = "/api/v2/auth/signin";

/// Snapshot of the session as seen by listeners.
///
/// `authenticated` is always `token.is_some()`; `loading` is only true
/// before the first `initialize()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub identity: Option<String>,
    pub authenticated: bool,
    pub loading: bool,
}

impl SessionState {
    fn loading() -> Self {
        SessionState {
            token: None,
            identity: None,
            authenticated: false,
            loading: true,
        }
    }

    fn signed_out() -> Self {
        SessionState {
            token: None,
            identity: None,
            authenticated: false,
            loading: false,
        }
    }

    fn signed_in(token: String, identity: Option<String>) -> Self {
        SessionState {
            token: Some(token),
            identity,
            authenticated: true,
            loading: false,
        }
    }
}

/// Reasons a login attempt can fail. The display strings are what the
/// console shows to the operator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Network error. Please try again.")]
    Network(#[source] reqwest::Error),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("No authorization token received")]
    MissingToken,
    #[error("Failed to save session: {0}")]
    Storage(#[from] StorageError),
}

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

pub struct SessionManager {
    storage: Arc<dyn CredentialStore>,
    client: Client,
    base_url: String,
    state: Mutex<SessionState>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl SessionManager {
    /// Create a manager in the `loading` state. Call `initialize()` before
    /// relying on `state()`.
    pub fn new(storage: Arc<dyn CredentialStore>, client: Client, base_url: &str) -> Self {
        SessionManager {
            storage,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Mutex::new(SessionState::loading()),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Resolve the session from persisted storage. Safe to call repeatedly.
    pub fn initialize(&self) {
        let next = match self.get_token() {
            Some(token) => SessionState::signed_in(token, self.read_entry(IDENTITY_KEY)),
            None => SessionState::signed_out(),
        };
        debug!(authenticated = next.authenticated, "session initialized");
        self.publish(next);
    }

    /// Exchange credentials for a bearer token. The token arrives in the
    /// `Authorization` response header, not in the body.
    pub fn login(&self, identity: &str, secret: &str) -> Result<(), AuthError> {
        let url = format!("{}{}", self.base_url, SIGNIN_PATH);
        let body = SignInRequest {
            email: identity,
            password: secret,
        };
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(AuthError::Network)?;

        if !res.status().is_success() {
            info!(status = %res.status(), "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let token = res
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or(AuthError::MissingToken)?;

        let previous_token = self.storage.get(TOKEN_KEY).ok().flatten();
        self.storage.set(TOKEN_KEY, &token)?;
        if let Err(e) = self.storage.set(IDENTITY_KEY, identity) {
            warn!(error = %e, "failed to persist identity, restoring previous session");
            self.restore_token(previous_token);
            return Err(e.into());
        }

        info!(identity, "signed in");
        self.publish(SessionState::signed_in(token, Some(identity.to_string())));
        Ok(())
    }

    /// Forget the token and identity. Purely local and idempotent.
    pub fn logout(&self) {
        for key in [TOKEN_KEY, IDENTITY_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to clear persisted session entry");
            }
        }
        info!("signed out");
        self.publish(SessionState::signed_out());
    }

    /// Current token, read from storage on every call so that changes made
    /// elsewhere are visible immediately.
    pub fn get_token(&self) -> Option<String> {
        self.read_entry(TOKEN_KEY)
    }

    /// In-memory snapshot of the last published state.
    pub fn state(&self) -> SessionState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns false when the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Put the token entry back to what it was before a half-finished
    /// login, then republish from storage so memory and disk agree. If
    /// the token cannot be restored, both entries are cleared.
    fn restore_token(&self, previous: Option<String>) {
        let restored = match &previous {
            Some(token) => self.storage.set(TOKEN_KEY, token),
            None => self.storage.remove(TOKEN_KEY),
        };
        match restored {
            Ok(()) => self.initialize(),
            Err(e) => {
                warn!(error = %e, "failed to restore previous token");
                self.logout();
            }
        }
    }

    fn read_entry(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted session entry");
                None
            }
        }
    }

    fn publish(&self, next: SessionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next.clone();
        // Listeners run without any lock held so they may call back in.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn manager(storage: Arc<MemoryStore>) -> SessionManager {
        SessionManager::new(storage, Client::new(), "http://127.0.0.1:9")
    }

    #[test]
    fn starts_loading_until_initialized() {
        let session = manager(Arc::new(MemoryStore::new()));
        assert!(session.state().loading);
        session.initialize();
        let state = session.state();
        assert!(!state.loading);
        assert!(!state.authenticated);
        assert_eq!(state.token, None);
    }

    #[test]
    fn initialize_picks_up_persisted_token() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(TOKEN_KEY, "tok").unwrap();
        storage.set(IDENTITY_KEY, "op@example.com").unwrap();
        let session = manager(storage);

        session.initialize();
        session.initialize();
        let state = session.state();
        assert!(state.authenticated);
        assert_eq!(state.token.as_deref(), Some("tok"));
        assert_eq!(state.identity.as_deref(), Some("op@example.com"));
    }

    #[test]
    fn get_token_reads_storage_not_cache() {
        let storage = Arc::new(MemoryStore::new());
        let session = manager(storage.clone());
        session.initialize();
        assert_eq!(session.get_token(), None);

        storage.set(TOKEN_KEY, "set-elsewhere").unwrap();
        assert_eq!(session.get_token().as_deref(), Some("set-elsewhere"));
    }

    #[test]
    fn logout_is_idempotent() {
        let storage = Arc::new(MemoryStore::new());
        let session = manager(storage.clone());
        session.logout();
        session.logout();
        assert!(!session.state().authenticated);
        assert!(!session.state().loading);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn listeners_see_every_transition_until_unsubscribed() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(TOKEN_KEY, "tok").unwrap();
        let session = manager(storage);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = session.subscribe(move |s| sink.lock().unwrap().push(s.authenticated));
        session.initialize();
        session.logout();
        assert!(session.unsubscribe(id));
        session.initialize();

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert!(!session.unsubscribe(id));
    }
}
