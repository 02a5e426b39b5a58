//! Storage key constants.

/// Storage keys used by the storefront client core.
pub struct StorageKeys;

impl StorageKeys {
    /// Short-lived bearer credential
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Long-lived credential used to mint new access tokens
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Cached favorites collection (JSON array of products)
    pub const FAVORITES: &'static str = "favorites";
}
