//! API gateway for the storefront client core.
//!
//! This crate provides:
//! - The wire/domain types shared by the session manager and the favorites
//!   reconciler ([`Product`], [`UserProfile`], token grants, ...)
//! - The [`ApiGateway`] trait, the seam between the core and the transport
//! - [`HttpGateway`], the reqwest-backed implementation

mod error;
mod gateway;
mod http;
mod types;

pub use error::{ApiError, ApiResult};
pub use gateway::ApiGateway;
pub use http::HttpGateway;
pub use types::{
    AccessTokenGrant, Credentials, FavoriteAction, FavoriteEntry, Product, ProductId,
    Registration, TokenPair, UserProfile,
};
