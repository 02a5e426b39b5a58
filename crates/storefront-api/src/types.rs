//! Wire and domain types shared across the client core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable product identifier.
///
/// The catalog service issues integer ids today, but the client treats the
/// id as opaque and also accepts string forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Int(n) => write!(f, "{}", n),
            ProductId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        ProductId::Int(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        ProductId::Text(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        ProductId::Text(id)
    }
}

/// A catalog product as the favorites collection stores it.
///
/// Only the id matters to the core's logic; the display fields (title,
/// price, images, ...) ride along untouched so the view layer can render
/// cached entries without a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    /// Build a product carrying only its id, with no display fields.
    pub fn bare(id: impl Into<ProductId>) -> Self {
        Self {
            id: id.into(),
            details: serde_json::Map::new(),
        }
    }
}

/// The authenticated user's profile.
///
/// An opaque record owned by the API: a mapping of named fields (identity,
/// contact, address). Partial update responses are merged shallowly into the
/// existing record, never replacing it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub serde_json::Map<String, serde_json::Value>);

impl UserProfile {
    /// Read a named field.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// Shallow-merge a partial record into this one. Fields present in the
    /// patch overwrite; everything else is retained.
    pub fn merge(&mut self, patch: &UserProfile) {
        for (name, value) in &patch.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }
}

/// Login credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration payload: arbitrary user fields (identity, contact, address)
/// the client forwards without interpretation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registration(pub serde_json::Map<String, serde_json::Value>);

/// Token pair minted by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// A fresh access token minted from a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenGrant {
    pub access: String,
}

/// The server's verdict on a favorite toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteAction {
    Added,
    Removed,
}

/// One entry of the server's favorites list.
///
/// The list endpoint may return association records wrapping the product, or
/// bare products; both unwrap to the same thing.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FavoriteEntry {
    Wrapped { product: Product },
    Bare(Product),
}

impl FavoriteEntry {
    /// Unwrap down to the bare product.
    pub fn into_product(self) -> Product {
        match self {
            FavoriteEntry::Wrapped { product } => product,
            FavoriteEntry::Bare(product) => product,
        }
    }
}
