//! Session manager.
//!
//! Single source of truth for who is signed in. The state only moves
//! through [`SessionManager::bootstrap`], [`SessionManager::login`] and
//! [`SessionManager::logout`]:
//!
//! - `Bootstrapping -> Authenticated`: stored token accepted by `GET /me`
//! - `Bootstrapping -> Anonymous`: no stored token, or any failure
//! - `Anonymous -> Authenticated`: `login`
//! - `Authenticated -> Anonymous`: `logout`
//!
//! There is no refresh transition. A failed bootstrap clears the stored
//! token and is never retried.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::models::{Identity, LoginResponse};
use crate::token_store::{redact, TokenStore};

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Startup re-authentication not resolved yet.
    Bootstrapping,
    /// Nobody signed in.
    Anonymous,
    /// Signed in as the given identity.
    Authenticated(Identity),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Bootstrapping)
    }

    pub fn current_user(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

/// Server side of authentication, as seen by the session manager.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the identity owning `token` (`GET /me`).
    async fn fetch_identity(&self, token: &str) -> Result<Identity, ClientError>;

    /// Exchange credentials for a token and identity (`POST /auth/login`).
    async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError>;
}

/// Owns the current identity and the persisted token.
pub struct SessionManager {
    tokens: Arc<dyn TokenStore>,
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<SessionState>,
    /// Serialises every state write together with its token store write.
    gate: Mutex<()>,
    bootstrapped: AtomicBool,
}

impl SessionManager {
    /// Create a manager in the `Bootstrapping` state.
    pub fn new(tokens: Arc<dyn TokenStore>, provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::Bootstrapping);
        Self {
            tokens,
            provider,
            state,
            gate: Mutex::new(()),
            bootstrapped: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.state.borrow().current_user().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until the session leaves `Bootstrapping`.
    #[allow(clippy::let_and_return)]
    pub async fn wait_ready(&self) -> SessionState {
        let mut rx = self.subscribe();
        // The watch guard must drop before `rx` does.
        let ready = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        ready
    }

    /// Run [`bootstrap`](Self::bootstrap) on a background task.
    pub fn spawn_bootstrap(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.bootstrap().await })
    }

    /// Restore the session from the persisted token.
    ///
    /// Runs once per manager; later calls return immediately. Never fails:
    /// every error resolves to `Anonymous` with the token cleared.
    pub async fn bootstrap(&self) {
        if self.bootstrapped.swap(true, Ordering::SeqCst) {
            return;
        }

        let _guard = self.gate.lock().await;

        // An explicit login/logout already settled the session.
        if !self.state.borrow().is_loading() {
            tracing::debug!("Session settled before bootstrap, skipping");
            return;
        }

        let token = match self.tokens.get().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("No stored token, starting anonymous");
                self.state.send_replace(SessionState::Anonymous);
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored token");
                self.discard_token().await;
                self.state.send_replace(SessionState::Anonymous);
                return;
            }
        };

        match self.provider.fetch_identity(&token).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, username = %user.username, "Session restored");
                self.state.send_replace(SessionState::Authenticated(user));
            }
            Err(e) => {
                tracing::warn!(
                    token = %redact(&token),
                    error = %e,
                    "Stored token rejected, signing out"
                );
                self.discard_token().await;
                self.state.send_replace(SessionState::Anonymous);
            }
        }
    }

    async fn discard_token(&self) {
        if let Err(e) = self.tokens.clear().await {
            tracing::warn!(error = %e, "Failed to clear stored token");
        }
    }

    /// Sign in with a token and identity from a successful authentication.
    ///
    /// Does not call the network. The token is persisted before the
    /// identity is published, so every request issued after this returns
    /// carries it. On storage failure the state is left untouched.
    pub async fn login(&self, token: &str, user: Identity) -> Result<(), ClientError> {
        let _guard = self.gate.lock().await;

        self.tokens.set(token).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "Signed in");
        self.state.send_replace(SessionState::Authenticated(user));
        Ok(())
    }

    /// Sign out locally. No-op when nobody is signed in.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let _guard = self.gate.lock().await;

        self.tokens.clear().await?;
        if let Some(user) = self.state.borrow().current_user() {
            tracing::info!(user_id = %user.id, "Signed out");
        }
        self.state.send_replace(SessionState::Anonymous);
        Ok(())
    }

    /// Authenticate with credentials, then [`login`](Self::login).
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ClientError> {
        let LoginResponse { token, user } = self.provider.authenticate(email, password).await?;
        self.login(&token, user.clone()).await?;
        Ok(user)
    }
}
