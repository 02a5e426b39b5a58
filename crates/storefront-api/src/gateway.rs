//! The gateway trait: the seam between the core and the transport.

use crate::types::{
    AccessTokenGrant, Credentials, FavoriteAction, FavoriteEntry, ProductId, Registration,
    TokenPair, UserProfile,
};
use crate::ApiResult;
use async_trait::async_trait;

/// Authenticated HTTP surface the client core consumes.
///
/// Implementors attach the bearer credential themselves; callers never pass
/// tokens per request. The session manager and the favorites reconciler hold
/// this as `Arc<dyn ApiGateway>`, which is also how tests slot in doubles.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// Exchange credentials for a token pair.
    async fn login(&self, credentials: &Credentials) -> ApiResult<TokenPair>;

    /// Mint a fresh access token from a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> ApiResult<AccessTokenGrant>;

    /// Create a new account. Does not log the user in.
    async fn register(&self, registration: &Registration) -> ApiResult<UserProfile>;

    /// Fetch the authenticated user's profile.
    async fn get_profile(&self) -> ApiResult<UserProfile>;

    /// Apply a partial profile update; the server echoes the updated fields.
    async fn update_profile(&self, patch: &UserProfile) -> ApiResult<UserProfile>;

    /// Fetch the authenticated user's favorites list.
    async fn get_favorites(&self) -> ApiResult<Vec<FavoriteEntry>>;

    /// Flip a product's favorite membership; the server reports which way.
    async fn toggle_favorite(&self, product_id: &ProductId) -> ApiResult<FavoriteAction>;
}
