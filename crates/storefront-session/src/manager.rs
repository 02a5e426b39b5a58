//! Session manager: token lifecycle and profile state.

use crate::error::{SessionError, SessionResult};
use crate::session_fsm::{
    SessionMachine, SessionMachineInput, SessionState, SessionStateChanged,
};
use crate::SessionStateCallback;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storefront_api::{ApiGateway, Credentials, Registration, UserProfile};
use storefront_storage::SessionVault;
use tracing::{debug, info, warn};

/// In-memory credential pair.
#[derive(Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// Owns the access/refresh tokens and the current user profile.
///
/// The session is authenticated iff BOTH an access token and a validated
/// profile are held. A token alone (profile fetch pending or failed) is not
/// authenticated: a token restored from storage at startup may be expired,
/// and the profile fetch is the gate that proves it against the server.
///
/// Concurrent calls are not deduplicated; the last write to shared token
/// state wins. Callers serialize where that matters.
pub struct SessionManager {
    api: Arc<dyn ApiGateway>,
    vault: SessionVault,
    tokens: Mutex<Tokens>,
    profile: Mutex<Option<UserProfile>>,
    /// Internal FSM tracking lifecycle transitions.
    fsm: Mutex<SessionMachine>,
    /// Count of in-flight caller-facing operations (login/register/update).
    busy: AtomicUsize,
    /// Callbacks notified on every state change.
    state_callbacks: Mutex<Vec<SessionStateCallback>>,
}

impl SessionManager {
    /// Create a session manager over the given gateway and vault.
    pub fn new(api: Arc<dyn ApiGateway>, vault: SessionVault) -> Self {
        Self {
            api,
            vault,
            tokens: Mutex::new(Tokens::default()),
            profile: Mutex::new(None),
            fsm: Mutex::new(SessionMachine::new()),
            busy: AtomicUsize::new(0),
            state_callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Register a callback to be notified of session state changes.
    ///
    /// This is how the route guard / view layer observes the reactive
    /// authentication flag. The composition root registers its own observer
    /// too, so multiple callbacks are supported.
    pub fn add_state_callback(&self, callback: SessionStateCallback) {
        self.state_callbacks.lock().unwrap().push(callback);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        let fsm = self.fsm.lock().unwrap();
        SessionState::from(fsm.state())
    }

    /// True iff both an access token and a validated profile are held.
    pub fn is_authenticated(&self) -> bool {
        let has_token = self.tokens.lock().unwrap().access.is_some();
        has_token && self.profile.lock().unwrap().is_some()
    }

    /// The current profile, if validated.
    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.lock().unwrap().clone()
    }

    /// The in-memory access token.
    pub fn access_token(&self) -> Option<String> {
        self.tokens.lock().unwrap().access.clone()
    }

    /// The in-memory refresh token.
    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.lock().unwrap().refresh.clone()
    }

    /// True while a caller-facing operation is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst) > 0
    }

    /// Attempt a transition and notify the callback if the state changed.
    /// An input invalid for the current state leaves the machine untouched.
    fn transition(&self, input: &SessionMachineInput) {
        let mut fsm = self.fsm.lock().unwrap();
        let old_state = SessionState::from(fsm.state());
        if fsm.consume(input).is_err() {
            return;
        }
        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(old_state = ?old_state, new_state = ?new_state, "Session state transition");
            self.notify_state_change(new_state);
        }
    }

    fn notify_state_change(&self, state: SessionState) {
        let callbacks = self.state_callbacks.lock().unwrap();
        if callbacks.is_empty() {
            return;
        }
        let profile = self.profile.lock().unwrap().clone();
        for callback in callbacks.iter() {
            callback(SessionStateChanged {
                state: state.clone(),
                profile: profile.clone(),
            });
        }
    }

    /// Drive the FSM to Anonymous from whatever state it is in.
    fn force_anonymous(&self) {
        self.transition(&SessionMachineInput::AuthFailed);
        self.transition(&SessionMachineInput::LogoutRequested);
    }

    /// Clear in-memory and persisted session state unconditionally.
    fn clear_session(&self) {
        {
            let mut tokens = self.tokens.lock().unwrap();
            tokens.access = None;
            tokens.refresh = None;
        }
        *self.profile.lock().unwrap() = None;
        if let Err(e) = self.vault.clear() {
            warn!(error = %e, "Could not erase persisted tokens");
        }
        self.force_anonymous();
    }

    /// Log in with credentials and validate the minted token.
    ///
    /// The session transitions toward Authenticated only after the follow-up
    /// profile fetch succeeds. On any failure the session is fully cleared;
    /// no partial token is retained.
    pub async fn login(&self, credentials: Credentials) -> SessionResult<UserProfile> {
        let _busy = BusyGuard::hold(&self.busy);
        self.transition(&SessionMachineInput::LoginAttempt);

        let pair = match self.api.login(&credentials).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Login rejected");
                self.clear_session();
                return Err(SessionError::from_login(e));
            }
        };

        {
            let mut tokens = self.tokens.lock().unwrap();
            tokens.access = Some(pair.access.clone());
            tokens.refresh = Some(pair.refresh.clone());
        }
        if let Err(e) = self.vault.set_tokens(&pair.access, &pair.refresh) {
            self.clear_session();
            return Err(SessionError::Storage(e));
        }

        // The minted token is unproven until the profile fetch accepts it.
        match self.api.get_profile().await {
            Ok(profile) => {
                *self.profile.lock().unwrap() = Some(profile.clone());
                self.transition(&SessionMachineInput::ProfileConfirmed);
                info!("Login successful");
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch after login failed");
                self.clear_session();
                Err(SessionError::from_login(e))
            }
        }
    }

    /// Create a new account. Registration does not imply login; the session
    /// is left untouched either way.
    pub async fn register(&self, registration: Registration) -> SessionResult<UserProfile> {
        let _busy = BusyGuard::hold(&self.busy);
        match self.api.register(&registration).await {
            Ok(created) => {
                info!("Registration accepted");
                Ok(created)
            }
            Err(e) => {
                warn!(error = %e, "Registration rejected");
                Err(SessionError::from_submission(e))
            }
        }
    }

    /// Clear in-memory and persisted tokens/profile unconditionally.
    /// Idempotent.
    pub fn logout(&self) {
        self.clear_session();
        info!("Logged out");
    }

    /// Fetch the profile for the held access token.
    ///
    /// Best effort: failures are logged, except a 401, which means the token
    /// is invalid and forces a logout. No-op without an access token.
    pub async fn fetch_profile(&self) {
        if self.tokens.lock().unwrap().access.is_none() {
            return;
        }

        match self.api.get_profile().await {
            Ok(profile) => {
                *self.profile.lock().unwrap() = Some(profile);
                // A retained token can reach here with the machine resolved
                // to Anonymous (startup validation failed against an
                // unreachable server). Re-enter the validation path so the
                // confirmation lands and observers hear about it.
                if self.state() == SessionState::Anonymous {
                    self.transition(&SessionMachineInput::TokenRestored);
                }
                self.transition(&SessionMachineInput::ProfileConfirmed);
                debug!("Profile fetched");
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Profile fetch rejected with 401, clearing session");
                self.transition(&SessionMachineInput::CredentialRejected);
                self.logout();
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch failed");
            }
        }
    }

    /// Mint a fresh access token from the held refresh token.
    ///
    /// Returns whether a new access token was obtained. Any failure path
    /// (missing refresh token, server rejection) clears the session.
    /// The refresh token itself is retained on success.
    pub async fn refresh_access_token(&self) -> bool {
        let refresh = self.tokens.lock().unwrap().refresh.clone();
        let Some(refresh) = refresh else {
            debug!("No refresh token held, clearing session");
            self.logout();
            return false;
        };

        match self.api.refresh_token(&refresh).await {
            Ok(grant) => {
                self.tokens.lock().unwrap().access = Some(grant.access.clone());
                if let Err(e) = self.vault.set_access_token(&grant.access) {
                    warn!(error = %e, "Could not persist refreshed access token");
                }
                info!("Access token refreshed");
                true
            }
            Err(e) => {
                warn!(error = %e, "Token refresh rejected, clearing session");
                self.logout();
                false
            }
        }
    }

    /// Apply a partial profile update and merge the server's echo into the
    /// held profile non-destructively.
    pub async fn update_profile(&self, patch: UserProfile) -> SessionResult<UserProfile> {
        let _busy = BusyGuard::hold(&self.busy);
        match self.api.update_profile(&patch).await {
            Ok(echo) => {
                let mut held = self.profile.lock().unwrap();
                let merged = match held.as_mut() {
                    Some(profile) => {
                        profile.merge(&echo);
                        profile.clone()
                    }
                    None => {
                        *held = Some(echo.clone());
                        echo
                    }
                };
                info!("Profile updated");
                Ok(merged)
            }
            Err(e) => {
                warn!(error = %e, "Profile update rejected");
                Err(SessionError::from_submission(e))
            }
        }
    }

    /// Restore persisted tokens and validate them. Called once at startup.
    ///
    /// A stale or invalid restored token resolves to Anonymous; the session
    /// never reports authenticated with an unverified credential.
    pub async fn initialize(&self) {
        let access = self.vault.get_access_token().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read persisted access token");
            None
        });
        let refresh = self.vault.get_refresh_token().unwrap_or_else(|e| {
            warn!(error = %e, "Could not read persisted refresh token");
            None
        });

        let restored = access.is_some();
        {
            let mut tokens = self.tokens.lock().unwrap();
            tokens.access = access;
            tokens.refresh = refresh;
        }

        if !restored {
            debug!("No persisted session found at startup");
            return;
        }

        info!("Persisted token restored, validating against the server");
        self.transition(&SessionMachineInput::TokenRestored);
        self.fetch_profile().await;

        if self.profile.lock().unwrap().is_none() {
            // Token kept for a later retry, but the session stays anonymous.
            self.transition(&SessionMachineInput::AuthFailed);
        }
    }
}

/// Increments a counter for its lifetime.
struct BusyGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> BusyGuard<'a> {
    fn hold(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
