//! REST gateway for the cafe backend.
//!
//! Plain request/response wrappers around the menu, sale, dashboard and
//! admin endpoints. Holds no state beyond the HTTP client and base URL;
//! concurrent identical requests are not deduplicated.

use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::dashboard::{DashboardScope, StaffFilter};
use crate::error::PosError;
use crate::models::{
    DashboardSummary, ImageFile, ItemDraft, MenuItem, PaymentMethod, PriceUpdate, SaleRecord,
    StaffPerformance,
};
use crate::store::FilterState;

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the API base URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Query shapes
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/menu-items`. The `All` category and an
/// empty search are omitted.
pub fn menu_query_pairs(filter: &FilterState) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if !filter.is_all_categories() {
        pairs.push(("category", filter.active_category.clone()));
    }
    if !filter.active_search_query.is_empty() {
        pairs.push(("search", filter.active_search_query.clone()));
    }
    pairs
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> PosError {
    let message = if err.is_connect() {
        format!("Cannot reach server at {url}")
    } else if err.is_timeout() {
        format!("Connection to {url} timed out")
    } else if err.is_builder() {
        format!("Invalid server URL: {url}")
    } else {
        format!("Network error communicating with {url}: {err}")
    };
    PosError::Network(message)
}

/// Build the error for a non-2xx response from its body text.
/// Prefers the JSON `error` field, then `message`; `None` when neither is
/// present so callers can show their own fallback.
pub(crate) fn api_error_from_body(status: StatusCode, body_text: &str) -> PosError {
    let message = serde_json::from_str::<Value>(body_text)
        .ok()
        .and_then(|json| {
            json.get("error")
                .or_else(|| json.get("message"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty());
    PosError::Api {
        status: status.as_u16(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Gateway contract
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_menu_items(&self, filter: &FilterState) -> Result<Vec<MenuItem>, PosError>;

    /// Record one sold unit.
    async fn record_sale(&self, item_id: &str, method: PaymentMethod) -> Result<(), PosError>;

    async fn fetch_dashboard(&self, scope: &DashboardScope) -> Result<DashboardSummary, PosError>;

    /// Ranked list; index 0 is the top performer.
    async fn fetch_staff_performance(
        &self,
        filter: &StaffFilter,
    ) -> Result<Vec<StaffPerformance>, PosError>;

    async fn update_price(&self, item_id: &str, update: &PriceUpdate) -> Result<(), PosError>;

    async fn create_item(&self, draft: &ItemDraft) -> Result<(), PosError>;

    async fn update_item(&self, item_id: &str, draft: &ItemDraft) -> Result<(), PosError>;

    async fn set_item_visibility(&self, item_id: &str, visible: bool) -> Result<(), PosError>;

    async fn delete_item(&self, item_id: &str) -> Result<(), PosError>;

    /// Upload an image bound to `item_id`; returns the stored image URL.
    async fn upload_image(&self, item_id: &str, file: &ImageFile) -> Result<String, PosError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, PosError> {
        let base_url = normalize_base_url(base_url);
        if base_url.is_empty() {
            return Err(PosError::Validation("API URL cannot be empty".to_string()));
        }
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| PosError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        debug!(method = %method, url = %url, "api request");
        self.client.request(method, url)
    }

    /// Send a request and return the JSON body, or `Value::Null` for an
    /// empty success body.
    async fn send(&self, req: RequestBuilder) -> Result<Value, PosError> {
        let resp = req
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let err = api_error_from_body(status, &body_text);
            warn!(status = status.as_u16(), error = %err, "api request failed");
            return Err(err);
        }

        if body_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body_text).map_err(|e| PosError::Decode(e.to_string()))
    }

    async fn send_json<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Value, PosError> {
        self.send(self.request(method, path).json(body)).await
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_menu_items(&self, filter: &FilterState) -> Result<Vec<MenuItem>, PosError> {
        let req = self
            .request(Method::GET, "/api/menu-items")
            .query(&menu_query_pairs(filter));
        let body = self.send(req).await?;
        serde_json::from_value(body).map_err(|e| PosError::Decode(format!("menu items: {e}")))
    }

    async fn record_sale(&self, item_id: &str, method: PaymentMethod) -> Result<(), PosError> {
        let record = SaleRecord {
            item_id,
            payment_method: method,
        };
        self.send_json(Method::POST, "/api/record-sale", &record)
            .await
            .map(|_| ())
    }

    async fn fetch_dashboard(&self, scope: &DashboardScope) -> Result<DashboardSummary, PosError> {
        let req = self
            .request(Method::GET, scope.path())
            .query(&scope.query_pairs());
        let body = self.send(req).await?;
        DashboardSummary::from_value(scope.clone(), body)
    }

    async fn fetch_staff_performance(
        &self,
        filter: &StaffFilter,
    ) -> Result<Vec<StaffPerformance>, PosError> {
        let req = self
            .request(Method::GET, "/api/admin/staff-performance")
            .query(&filter.query_pairs());
        let body = self.send(req).await?;
        if body.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(body)
            .map_err(|e| PosError::Decode(format!("staff performance: {e}")))
    }

    async fn update_price(&self, item_id: &str, update: &PriceUpdate) -> Result<(), PosError> {
        let path = format!("/api/admin/update-price/{item_id}");
        self.send_json(Method::PUT, &path, update).await.map(|_| ())
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<(), PosError> {
        self.send_json(Method::POST, "/api/admin/item", draft)
            .await
            .map(|_| ())
    }

    async fn update_item(&self, item_id: &str, draft: &ItemDraft) -> Result<(), PosError> {
        let path = format!("/api/admin/item/{item_id}");
        self.send_json(Method::PUT, &path, draft).await.map(|_| ())
    }

    async fn set_item_visibility(&self, item_id: &str, visible: bool) -> Result<(), PosError> {
        let path = format!("/api/admin/item/{item_id}");
        let body = serde_json::json!({ "is_visible": visible });
        self.send_json(Method::PUT, &path, &body).await.map(|_| ())
    }

    async fn delete_item(&self, item_id: &str) -> Result<(), PosError> {
        let path = format!("/api/admin/item/{item_id}");
        self.send(self.request(Method::DELETE, &path))
            .await
            .map(|_| ())
    }

    async fn upload_image(&self, item_id: &str, file: &ImageFile) -> Result<String, PosError> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.content_type())
            .map_err(|e| PosError::Validation(format!("Invalid image type: {e}")))?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("item_id", item_id.to_string());

        let body = self
            .send(self.request(Method::POST, "/api/upload-image").multipart(form))
            .await?;
        body.get("image_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PosError::Decode("upload response missing image_url".to_string()))
    }
}
