//! Reqwest-backed gateway implementation.

use crate::gateway::ApiGateway;
use crate::types::{
    AccessTokenGrant, Credentials, FavoriteAction, FavoriteEntry, ProductId, Registration,
    TokenPair, UserProfile,
};
use crate::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use storefront_storage::{KeyValueStore, StorageKeys};
use tracing::{debug, warn};
use url::Url;

/// Request timeout for every gateway call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The favorites list arrives either paginated or as a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FavoritesEnvelope {
    Paged { results: Vec<FavoriteEntry> },
    Plain(Vec<FavoriteEntry>),
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Serialize)]
struct ToggleRequest<'a> {
    product_id: &'a ProductId,
}

#[derive(Debug, Deserialize)]
struct ToggleResponse {
    action: FavoriteAction,
}

/// HTTP gateway against the storefront REST API.
///
/// Reads the persisted access token on every request and attaches it as a
/// bearer header when present, so a token refreshed elsewhere is picked up
/// without rewiring.
pub struct HttpGateway {
    http_client: reqwest::Client,
    base_url: Url,
    storage: Arc<dyn KeyValueStore>,
}

impl HttpGateway {
    /// Create a gateway rooted at `base_url` (e.g. `https://shop.example/api/`).
    pub fn new(base_url: Url, storage: Arc<dyn KeyValueStore>) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            base_url,
            storage,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Attach the bearer credential, when one is persisted.
    fn with_bearer(&self, req: RequestBuilder) -> RequestBuilder {
        match self.storage.get(StorageKeys::ACCESS_TOKEN) {
            Ok(Some(token)) => req.bearer_auth(token),
            Ok(None) => req,
            Err(e) => {
                warn!(error = %e, "Could not read access token from storage");
                req
            }
        }
    }

    async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let response = self.with_bearer(req).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Request rejected");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn login(&self, credentials: &Credentials) -> ApiResult<TokenPair> {
        let url = self.endpoint("token/");
        debug!(url = %url, username = %credentials.username, "Requesting token pair");
        self.execute(self.http_client.post(&url).json(credentials))
            .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> ApiResult<AccessTokenGrant> {
        let url = self.endpoint("token/refresh/");
        debug!(url = %url, "Refreshing access token");
        self.execute(self.http_client.post(&url).json(&RefreshRequest {
            refresh: refresh_token,
        }))
        .await
    }

    async fn register(&self, registration: &Registration) -> ApiResult<UserProfile> {
        let url = self.endpoint("auth/users/");
        debug!(url = %url, "Registering account");
        self.execute(self.http_client.post(&url).json(registration))
            .await
    }

    async fn get_profile(&self) -> ApiResult<UserProfile> {
        let url = self.endpoint("profiles/me/");
        debug!(url = %url, "Fetching profile");
        self.execute(self.http_client.get(&url)).await
    }

    async fn update_profile(&self, patch: &UserProfile) -> ApiResult<UserProfile> {
        let url = self.endpoint("profiles/update_me/");
        debug!(url = %url, "Updating profile");
        self.execute(self.http_client.put(&url).json(patch)).await
    }

    async fn get_favorites(&self) -> ApiResult<Vec<FavoriteEntry>> {
        let url = self.endpoint("favorites/");
        debug!(url = %url, "Fetching favorites");
        let envelope: FavoritesEnvelope = self.execute(self.http_client.get(&url)).await?;
        Ok(match envelope {
            FavoritesEnvelope::Paged { results } => results,
            FavoritesEnvelope::Plain(entries) => entries,
        })
    }

    async fn toggle_favorite(&self, product_id: &ProductId) -> ApiResult<FavoriteAction> {
        let url = self.endpoint("favorites/toggle/");
        debug!(url = %url, product_id = %product_id, "Toggling favorite");
        let verdict: ToggleResponse = self
            .execute(self.http_client.post(&url).json(&ToggleRequest { product_id }))
            .await?;
        Ok(verdict.action)
    }
}
