//! The favorites reconciler.

use crate::AuthQuery;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use storefront_api::{ApiGateway, FavoriteAction, FavoriteEntry, Product, ProductId};
use storefront_storage::{KeyValueStore, StorageKeys};
use tracing::{debug, info, warn};

/// What a toggle call refers to.
///
/// A full product enables local insertion without a round trip; a bare id is
/// remove-only capable, since insertion needs display data.
pub enum ToggleTarget {
    Product(Product),
    Id(ProductId),
}

impl From<Product> for ToggleTarget {
    fn from(product: Product) -> Self {
        ToggleTarget::Product(product)
    }
}

impl From<ProductId> for ToggleTarget {
    fn from(id: ProductId) -> Self {
        ToggleTarget::Id(id)
    }
}

impl From<i64> for ToggleTarget {
    fn from(id: i64) -> Self {
        ToggleTarget::Id(id.into())
    }
}

/// Owns the favorites collection: an ordered product sequence, unique by id.
///
/// Guest state is seeded from the persistent store at construction. After
/// authentication the server's list is the source of truth and fully
/// replaces the local one. Every local mutation is written back to the
/// store immediately, regardless of authentication state.
///
/// Two overlapping toggles on the same product are not serialized; whichever
/// network response resolves last wins.
pub struct FavoritesReconciler {
    items: Mutex<Vec<Product>>,
    /// Reentrancy guard for remote loads.
    loading: AtomicBool,
    storage: Arc<dyn KeyValueStore>,
    api: Arc<dyn ApiGateway>,
    auth: Arc<dyn AuthQuery>,
}

impl FavoritesReconciler {
    /// Create a reconciler, seeding the collection from the persisted cache.
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        api: Arc<dyn ApiGateway>,
        auth: Arc<dyn AuthQuery>,
    ) -> Self {
        let reconciler = Self {
            items: Mutex::new(Vec::new()),
            loading: AtomicBool::new(false),
            storage,
            api,
            auth,
        };
        reconciler.restore_from_cache();
        reconciler
    }

    /// Read the persisted set. Malformed cache content resets to an empty
    /// set; it is a cache, never worth failing construction over.
    fn restore_from_cache(&self) {
        let raw = match self.storage.get(StorageKeys::FAVORITES) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Could not read favorites cache");
                return;
            }
        };
        match serde_json::from_str::<Vec<Product>>(&raw) {
            Ok(products) => {
                let mut items = self.items.lock().unwrap();
                *items = dedupe_by_id(products);
                debug!(count = items.len(), "Favorites restored from cache");
            }
            Err(e) => {
                warn!(error = %e, "Favorites cache is malformed, starting empty");
            }
        }
    }

    /// Write the full set back to the store. Best effort.
    fn persist(&self, items: &[Product]) {
        match serde_json::to_string(items) {
            Ok(json) => {
                if let Err(e) = self.storage.set(StorageKeys::FAVORITES, &json) {
                    warn!(error = %e, "Could not persist favorites");
                }
            }
            Err(e) => warn!(error = %e, "Could not encode favorites"),
        }
    }

    /// Membership test against the current set.
    pub fn is_favorite(&self, id: &ProductId) -> bool {
        self.items.lock().unwrap().iter().any(|p| &p.id == id)
    }

    /// Snapshot of the current set, in order.
    pub fn favorite_items(&self) -> Vec<Product> {
        self.items.lock().unwrap().clone()
    }

    /// Number of favorites held.
    pub fn favorite_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// True when any favorite is held.
    pub fn has_favorites(&self) -> bool {
        self.favorite_count() > 0
    }

    /// True while a remote load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn insert_local(&self, product: Product) -> bool {
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|p| p.id == product.id) {
            return false;
        }
        debug!(product_id = %product.id, "Favorite added locally");
        items.push(product);
        self.persist(&items);
        true
    }

    fn remove_local(&self, id: &ProductId) -> bool {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|p| &p.id != id);
        if items.len() == before {
            return false;
        }
        debug!(product_id = %id, "Favorite removed locally");
        self.persist(&items);
        true
    }

    /// Pure local flip from the pre-toggle membership.
    fn flip_local(&self, was_favorite: bool, id: &ProductId, payload: Option<Product>) {
        if was_favorite {
            self.remove_local(id);
        } else if let Some(product) = payload {
            self.insert_local(product);
        } else {
            // Insertion needs display data; a bare id cannot produce a
            // displayable entry, so the flip is skipped rather than faked.
            info!(product_id = %id, "No product payload supplied, skipping local insert");
        }
    }

    /// Add a product directly, used for non-toggle flows.
    pub fn add(&self, product: Product) {
        self.insert_local(product);
    }

    /// Remove a product directly.
    pub fn remove(&self, id: &ProductId) {
        self.remove_local(id);
    }

    /// Empty the set.
    pub fn clear(&self) {
        let mut items = self.items.lock().unwrap();
        items.clear();
        self.persist(&items);
        info!("Favorites cleared");
    }

    /// Flip a product's favorite membership.
    ///
    /// Authenticated sessions go through the server and branch on its
    /// reported action rather than the pre-toggle local membership, since
    /// the server's knowledge of the user's favorites may differ from the
    /// guest cache. A remote failure falls back to a pure local flip.
    /// Unauthenticated sessions flip locally and never call the server.
    pub async fn toggle(&self, target: impl Into<ToggleTarget>) {
        let (id, payload) = match target.into() {
            ToggleTarget::Product(product) => (product.id.clone(), Some(product)),
            ToggleTarget::Id(id) => (id, None),
        };
        let was_favorite = self.is_favorite(&id);

        if !self.auth.is_authenticated() {
            self.flip_local(was_favorite, &id, payload);
            return;
        }

        match self.api.toggle_favorite(&id).await {
            Ok(FavoriteAction::Added) => match payload {
                Some(product) => {
                    self.insert_local(product);
                }
                None => {
                    // The server added it, but without display data the
                    // local list cannot reflect that. Accepted limitation.
                    warn!(product_id = %id, "Server added favorite but no product payload was supplied");
                }
            },
            Ok(FavoriteAction::Removed) => {
                self.remove_local(&id);
            }
            Err(e) => {
                warn!(error = %e, product_id = %id, "Remote toggle failed, falling back to local flip");
                self.flip_local(was_favorite, &id, payload);
            }
        }
    }

    /// Replace the local set with the server's list.
    ///
    /// Best effort: failures are logged and the local set is left as-is.
    /// A call arriving while a previous load is still in flight is a no-op.
    pub async fn load_from_remote(&self) {
        if self.loading.swap(true, Ordering::SeqCst) {
            debug!("Favorites load already in flight");
            return;
        }

        match self.api.get_favorites().await {
            Ok(entries) => {
                let products =
                    dedupe_by_id(entries.into_iter().map(FavoriteEntry::into_product).collect());
                let mut items = self.items.lock().unwrap();
                *items = products;
                self.persist(&items);
                info!(count = items.len(), "Favorites loaded from server");
            }
            Err(e) => {
                warn!(error = %e, "Could not load favorites from server");
            }
        }

        self.loading.store(false, Ordering::SeqCst);
    }
}

/// Keep the first occurrence of each product id, preserving order.
fn dedupe_by_id(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use storefront_api::{
        AccessTokenGrant, ApiError, ApiResult, Credentials, Registration, TokenPair, UserProfile,
    };
    use storefront_storage::MemoryStore;
    use tokio::sync::Notify;

    fn product(id: i64, title: &str) -> Product {
        serde_json::from_value(json!({"id": id, "title": title})).unwrap()
    }

    fn ids(reconciler: &FavoritesReconciler) -> Vec<ProductId> {
        reconciler
            .favorite_items()
            .into_iter()
            .map(|p| p.id)
            .collect()
    }

    /// Fixed-answer auth probe.
    struct StaticAuth(bool);

    impl AuthQuery for StaticAuth {
        fn is_authenticated(&self) -> bool {
            self.0
        }
    }

    /// Scriptable gateway double for the favorites endpoints.
    #[derive(Default)]
    struct FakeGateway {
        favorites_results: Mutex<VecDeque<ApiResult<Vec<FavoriteEntry>>>>,
        toggle_results: Mutex<VecDeque<ApiResult<FavoriteAction>>>,
        toggle_calls: AtomicUsize,
        favorites_calls: AtomicUsize,
        /// When set, `get_favorites` blocks until released.
        gate: Option<Arc<Gate>>,
    }

    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    fn unscripted<T>() -> ApiResult<T> {
        Err(ApiError::Status {
            status: 500,
            body: "unscripted call".to_string(),
        })
    }

    #[async_trait]
    impl ApiGateway for FakeGateway {
        async fn login(&self, _credentials: &Credentials) -> ApiResult<TokenPair> {
            unscripted()
        }

        async fn refresh_token(&self, _refresh_token: &str) -> ApiResult<AccessTokenGrant> {
            unscripted()
        }

        async fn register(&self, _registration: &Registration) -> ApiResult<UserProfile> {
            unscripted()
        }

        async fn get_profile(&self) -> ApiResult<UserProfile> {
            unscripted()
        }

        async fn update_profile(&self, _patch: &UserProfile) -> ApiResult<UserProfile> {
            unscripted()
        }

        async fn get_favorites(&self) -> ApiResult<Vec<FavoriteEntry>> {
            self.favorites_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.favorites_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(unscripted)
        }

        async fn toggle_favorite(&self, _product_id: &ProductId) -> ApiResult<FavoriteAction> {
            self.toggle_calls.fetch_add(1, Ordering::SeqCst);
            self.toggle_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(unscripted)
        }
    }

    struct Harness {
        api: Arc<FakeGateway>,
        storage: Arc<MemoryStore>,
        reconciler: FavoritesReconciler,
    }

    fn harness(authenticated: bool) -> Harness {
        harness_with(authenticated, FakeGateway::default(), MemoryStore::new())
    }

    fn harness_with(authenticated: bool, api: FakeGateway, storage: MemoryStore) -> Harness {
        let api = Arc::new(api);
        let storage = Arc::new(storage);
        let reconciler = FavoritesReconciler::new(
            storage.clone(),
            api.clone(),
            Arc::new(StaticAuth(authenticated)),
        );
        Harness {
            api,
            storage,
            reconciler,
        }
    }

    fn entries(products: Vec<Product>) -> ApiResult<Vec<FavoriteEntry>> {
        Ok(products
            .into_iter()
            .map(|p| {
                serde_json::from_value(serde_json::to_value(p).unwrap()).unwrap()
            })
            .collect())
    }

    fn cached(storage: &MemoryStore) -> Vec<i64> {
        let raw = storage.get(StorageKeys::FAVORITES).unwrap().unwrap();
        let products: Vec<Product> = serde_json::from_str(&raw).unwrap();
        products
            .into_iter()
            .map(|p| match p.id {
                ProductId::Int(n) => n,
                ProductId::Text(_) => panic!("expected integer ids"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_unauthenticated_toggle_parity() {
        let h = harness(false);
        let target = product(5, "Sun hat");

        for round in 1..=4 {
            h.reconciler.toggle(target.clone()).await;
            let expect_member = round % 2 == 1;
            assert_eq!(
                h.reconciler.is_favorite(&ProductId::Int(5)),
                expect_member,
                "membership after {} toggles",
                round
            );
        }
        // Never touched the server
        assert_eq!(h.api.toggle_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unauthenticated_bare_id_toggle_gains_no_entry() {
        let h = harness(false);

        h.reconciler.toggle(5).await;

        assert!(!h.reconciler.is_favorite(&ProductId::Int(5)));
        assert!(!h.reconciler.has_favorites());
    }

    #[tokio::test]
    async fn test_unauthenticated_bare_id_toggle_removes() {
        let h = harness(false);
        h.reconciler.add(product(5, "Sun hat"));

        h.reconciler.toggle(5).await;

        assert!(!h.reconciler.is_favorite(&ProductId::Int(5)));
    }

    #[tokio::test]
    async fn test_authenticated_toggle_follows_server_added_verdict() {
        let h = harness(true);
        h.api
            .toggle_results
            .lock()
            .unwrap()
            .push_back(Ok(FavoriteAction::Added));

        h.reconciler.toggle(product(3, "Raincoat")).await;

        assert!(h.reconciler.is_favorite(&ProductId::Int(3)));
        assert_eq!(cached(&h.storage), vec![3]);
    }

    #[tokio::test]
    async fn test_authenticated_bare_id_add_verdict_skips_insert() {
        let h = harness(true);
        h.api
            .toggle_results
            .lock()
            .unwrap()
            .push_back(Ok(FavoriteAction::Added));

        h.reconciler.toggle(3).await;

        // Server added it, but without display data there is nothing to show
        assert!(!h.reconciler.is_favorite(&ProductId::Int(3)));
    }

    #[tokio::test]
    async fn test_authenticated_toggle_follows_server_removed_verdict() {
        let h = harness(true);
        // Locally absent, but the server knows it as a favorite
        h.api
            .toggle_results
            .lock()
            .unwrap()
            .push_back(Ok(FavoriteAction::Removed));
        h.reconciler.add(product(3, "Raincoat"));

        h.reconciler.toggle(3).await;

        assert!(!h.reconciler.is_favorite(&ProductId::Int(3)));
    }

    #[tokio::test]
    async fn test_authenticated_toggle_falls_back_to_local_flip_on_failure() {
        let h = harness(true);
        // No scripted toggle result: the server answers 500

        h.reconciler.toggle(product(3, "Raincoat")).await;
        assert!(h.reconciler.is_favorite(&ProductId::Int(3)));

        h.reconciler.toggle(product(3, "Raincoat")).await;
        assert!(!h.reconciler.is_favorite(&ProductId::Int(3)));
    }

    #[tokio::test]
    async fn test_load_from_remote_replaces_local_set_exactly() {
        let h = harness(true);
        h.reconciler.add(product(1, "A"));
        h.reconciler.add(product(2, "B"));
        h.api
            .favorites_results
            .lock()
            .unwrap()
            .push_back(entries(vec![product(2, "B"), product(3, "C")]));

        h.reconciler.load_from_remote().await;

        assert_eq!(ids(&h.reconciler), vec![ProductId::Int(2), ProductId::Int(3)]);
        assert_eq!(cached(&h.storage), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_load_from_remote_unwraps_wrapper_records() {
        let h = harness(true);
        let wrapped: Vec<FavoriteEntry> = serde_json::from_value(json!([
            {"id": 11, "product": {"id": 1, "title": "Hat"}, "added_at": "2024-05-01T10:00:00Z"},
            {"id": 2, "title": "Scarf"}
        ]))
        .unwrap();
        h.api
            .favorites_results
            .lock()
            .unwrap()
            .push_back(Ok(wrapped));

        h.reconciler.load_from_remote().await;

        assert_eq!(ids(&h.reconciler), vec![ProductId::Int(1), ProductId::Int(2)]);
    }

    #[tokio::test]
    async fn test_load_from_remote_failure_keeps_local_set() {
        let h = harness(true);
        h.reconciler.add(product(1, "A"));
        // No scripted favorites result: the server answers 500

        h.reconciler.load_from_remote().await;

        assert_eq!(ids(&h.reconciler), vec![ProductId::Int(1)]);
        assert!(!h.reconciler.is_loading());
    }

    #[tokio::test]
    async fn test_overlapping_load_is_a_no_op() {
        let gate = Arc::new(Gate::default());
        let api = FakeGateway {
            gate: Some(gate.clone()),
            ..FakeGateway::default()
        };
        api.favorites_results
            .lock()
            .unwrap()
            .push_back(entries(vec![product(1, "A")]));
        let h = harness_with(true, api, MemoryStore::new());
        let reconciler = Arc::new(h.reconciler);

        let first = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.load_from_remote().await })
        };
        gate.entered.notified().await;

        // Second call while the first is still in flight returns immediately
        reconciler.load_from_remote().await;
        assert_eq!(h.api.favorites_calls.load(Ordering::SeqCst), 1);

        gate.release.notify_one();
        first.await.unwrap();

        assert_eq!(ids(&reconciler), vec![ProductId::Int(1)]);
        assert!(!reconciler.is_loading());
    }

    #[tokio::test]
    async fn test_restore_from_malformed_cache_yields_empty_set() {
        let storage = MemoryStore::new();
        storage.set(StorageKeys::FAVORITES, "{not json").unwrap();

        let h = harness_with(false, FakeGateway::default(), storage);

        assert!(!h.reconciler.has_favorites());
        assert_eq!(h.reconciler.favorite_count(), 0);
    }

    #[tokio::test]
    async fn test_restore_from_cache_seeds_guest_state() {
        let storage = MemoryStore::new();
        storage
            .set(
                StorageKeys::FAVORITES,
                &serde_json::to_string(&vec![product(1, "A"), product(2, "B")]).unwrap(),
            )
            .unwrap();

        let h = harness_with(false, FakeGateway::default(), storage);

        assert_eq!(ids(&h.reconciler), vec![ProductId::Int(1), ProductId::Int(2)]);
    }

    #[tokio::test]
    async fn test_add_deduplicates_by_id() {
        let h = harness(false);
        h.reconciler.add(product(1, "A"));
        h.reconciler.add(product(1, "A again"));

        assert_eq!(h.reconciler.favorite_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_and_persists() {
        let h = harness(false);
        h.reconciler.add(product(1, "A"));

        h.reconciler.clear();

        assert!(!h.reconciler.has_favorites());
        assert_eq!(cached(&h.storage), Vec::<i64>::new());
    }

    #[tokio::test]
    async fn test_every_mutation_persists_regardless_of_auth() {
        let h = harness(true);
        h.api
            .toggle_results
            .lock()
            .unwrap()
            .push_back(Ok(FavoriteAction::Added));

        h.reconciler.toggle(product(9, "Boots")).await;
        assert_eq!(cached(&h.storage), vec![9]);

        h.reconciler.remove(&ProductId::Int(9));
        assert_eq!(cached(&h.storage), Vec::<i64>::new());
    }
}
