//! Barcode lookup against an Open Food Facts compatible API.
//!
//! Results, including "no such product", are cached for an hour.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::models::ValidationError;

const CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("Larder/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ProductLookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {0}")]
    Upstream(u16),
}

/// Product metadata used to prefill a new pantry item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInfo {
    pub barcode: String,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    /// Package size as printed, e.g. "1 L".
    pub quantity: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    status: i64,
    product: Option<RawProduct>,
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    product_name: Option<String>,
    brands: Option<String>,
    categories: Option<String>,
    quantity: Option<String>,
    image_url: Option<String>,
}

/// Accept 8 to 14 ASCII digits (EAN-8, UPC-A, EAN-13, GTIN-14).
///
/// # Errors
///
/// Returns a [`ValidationError`] for anything else.
pub fn validate_barcode(raw: &str) -> Result<&str, ValidationError> {
    let barcode = raw.trim();
    if !(8..=14).contains(&barcode.len()) || !barcode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new("barcode", "must be 8 to 14 digits"));
    }
    Ok(barcode)
}

/// First comma-separated entry, trimmed.
fn first_listed(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn into_product(barcode: &str, response: LookupResponse) -> Option<ProductInfo> {
    if response.status != 1 {
        return None;
    }
    let raw = response.product?;
    Some(ProductInfo {
        barcode: barcode.to_owned(),
        name: non_blank(raw.product_name),
        brand: first_listed(raw.brands),
        category: first_listed(raw.categories),
        quantity: non_blank(raw.quantity),
        image_url: non_blank(raw.image_url),
    })
}

#[derive(Clone)]
pub struct ProductLookupClient {
    inner: Arc<ProductLookupInner>,
}

struct ProductLookupInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, Option<ProductInfo>>,
}

impl ProductLookupClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &Url) -> Result<Self, ProductLookupError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ProductLookupInner {
                client,
                base_url: base_url.as_str().trim_end_matches('/').to_owned(),
                cache,
            }),
        })
    }

    /// Look up a validated barcode. `Ok(None)` means the product is unknown.
    ///
    /// # Errors
    ///
    /// Returns error if the upstream request fails or answers with a non-404
    /// error status.
    #[instrument(skip(self))]
    pub async fn lookup(&self, barcode: &str) -> Result<Option<ProductInfo>, ProductLookupError> {
        if let Some(cached) = self.inner.cache.get(barcode).await {
            debug!("Cache hit for product");
            return Ok(cached);
        }

        let url = format!("{}/api/v2/product/{barcode}.json", self.inner.base_url);
        let response = self.inner.client.get(&url).send().await?;
        let status = response.status();

        let product = if status == reqwest::StatusCode::NOT_FOUND {
            None
        } else if status.is_success() {
            into_product(barcode, response.json::<LookupResponse>().await?)
        } else {
            return Err(ProductLookupError::Upstream(status.as_u16()));
        };

        self.inner
            .cache
            .insert(barcode.to_owned(), product.clone())
            .await;
        Ok(product)
    }

    #[cfg(test)]
    pub(crate) async fn prime(&self, barcode: &str, product: Option<ProductInfo>) {
        self.inner.cache.insert(barcode.to_owned(), product).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_barcode() {
        assert_eq!(validate_barcode(" 3017620422003 ").unwrap(), "3017620422003");
        assert!(validate_barcode("12345670").is_ok());
        assert!(validate_barcode("1234567").is_err());
        assert!(validate_barcode("123456789012345").is_err());
        assert!(validate_barcode("30176204220ab").is_err());
    }

    #[test]
    fn test_parse_found_product() {
        let body = r#"{
            "code": "3017620422003",
            "status": 1,
            "product": {
                "product_name": "Nutella",
                "brands": "Ferrero, Nutella",
                "categories": "Spreads, Sweet spreads",
                "quantity": "400 g",
                "image_url": ""
            }
        }"#;
        let response: LookupResponse = serde_json::from_str(body).unwrap();
        let product = into_product("3017620422003", response).unwrap();

        assert_eq!(product.name.as_deref(), Some("Nutella"));
        assert_eq!(product.brand.as_deref(), Some("Ferrero"));
        assert_eq!(product.category.as_deref(), Some("Spreads"));
        assert_eq!(product.quantity.as_deref(), Some("400 g"));
        assert_eq!(product.image_url, None);
    }

    #[test]
    fn test_parse_unknown_product() {
        let body = r#"{"code":"00000000","status":0,"status_verbose":"product not found"}"#;
        let response: LookupResponse = serde_json::from_str(body).unwrap();
        assert!(into_product("00000000", response).is_none());
    }

    #[tokio::test]
    async fn test_cached_result_skips_network() {
        // Port 9 (discard) is never contacted when the cache answers.
        let client = ProductLookupClient::new(&Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
        client.prime("12345670", None).await;
        assert_eq!(client.lookup("12345670").await.unwrap(), None);
    }
}
