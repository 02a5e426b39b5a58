//! Favorites reconciliation for the storefront client.
//!
//! This crate owns the favorites collection: guest state persisted locally,
//! reconciled against the server's list once the user authenticates, with
//! optimistic toggles falling back to local mutation when the server is
//! unreachable.

mod reconciler;

pub use reconciler::{FavoritesReconciler, ToggleTarget};

/// Authentication-state query the reconciler consults before choosing the
/// remote or local toggle path. Supplied at construction; keeps this crate
/// free of a dependency on the session manager.
pub trait AuthQuery: Send + Sync {
    /// True iff the session holds a validated credential.
    fn is_authenticated(&self) -> bool;
}
