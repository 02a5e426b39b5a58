//! Composition root for the storefront client core.
//!
//! Wires the session manager and the favorites reconciler over a shared
//! gateway and persistent store, and reconciles favorites on every
//! transition into the authenticated state. The embedding application
//! (route guard, views) reads state through [`StorefrontClient`].

use std::sync::Arc;
use storefront_favorites::AuthQuery;
use storefront_session::SessionResult;
use storefront_storage::SessionVault;
use tracing::debug;

pub use storefront_api::{
    ApiError, ApiGateway, Credentials, HttpGateway, Product, ProductId, Registration, TokenPair,
    UserProfile,
};
pub use storefront_favorites::{FavoritesReconciler, ToggleTarget};
pub use storefront_session::{SessionError, SessionManager, SessionState, SessionStateChanged};
pub use storefront_storage::{JsonFileStore, KeyValueStore, MemoryStore};

/// Adapter exposing the session's authentication flag to the reconciler.
struct SessionAuthQuery(Arc<SessionManager>);

impl AuthQuery for SessionAuthQuery {
    fn is_authenticated(&self) -> bool {
        self.0.is_authenticated()
    }
}

/// Application-lifetime context owning both core services.
pub struct StorefrontClient {
    pub session: Arc<SessionManager>,
    pub favorites: Arc<FavoritesReconciler>,
}

impl StorefrontClient {
    /// Wire the core over an injected gateway and persistent store.
    ///
    /// Every transition into the authenticated state reloads favorites from
    /// the server, whichever path caused it (login, startup restoration, or
    /// a later profile revalidation).
    pub fn new(api: Arc<dyn ApiGateway>, storage: Arc<dyn KeyValueStore>) -> Self {
        let session = Arc::new(SessionManager::new(
            api.clone(),
            SessionVault::new(storage.clone()),
        ));
        let favorites = Arc::new(FavoritesReconciler::new(
            storage,
            api,
            Arc::new(SessionAuthQuery(session.clone())),
        ));

        let observer = favorites.clone();
        session.add_state_callback(Box::new(move |changed| {
            if changed.state.is_authenticated() {
                let favorites = observer.clone();
                tokio::spawn(async move { favorites.load_from_remote().await });
            }
        }));

        Self { session, favorites }
    }

    /// Startup: restore and validate any persisted session, then reconcile
    /// favorites against the server when the restored session proved valid.
    ///
    /// The state hook fires too; the reconciler's in-flight guard makes the
    /// overlap a no-op. Awaiting here lets callers observe the reconciled
    /// set as soon as startup returns.
    pub async fn initialize(&self) {
        self.session.initialize().await;
        if self.session.is_authenticated() {
            self.favorites.load_from_remote().await;
        } else {
            debug!("Starting with guest favorites only");
        }
    }

    /// Log in and reconcile favorites with the server's list before
    /// returning.
    pub async fn login(&self, credentials: Credentials) -> SessionResult<UserProfile> {
        let profile = self.session.login(credentials).await?;
        self.favorites.load_from_remote().await;
        Ok(profile)
    }

    /// Log out. The favorites collection keeps its last reconciled content
    /// as the new guest state.
    pub fn logout(&self) {
        self.session.logout();
    }

    /// Reactive authentication flag for the route guard.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }
}
