//! Variant list retrieval.

use serde::Deserialize;

use crate::error::EdgeError;

/// Ordered list of variant page URLs, valid for one request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantList {
    variants: Vec<String>,
}

impl VariantList {
    pub fn new(variants: Vec<String>) -> Self {
        Self { variants }
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// URL of the variant at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.variants.get(index).map(String::as_str)
    }

    /// Decode a `{ "variants": [...] }` body.
    pub fn from_json(url: &str, body: &[u8]) -> Result<Self, EdgeError> {
        serde_json::from_slice(body).map_err(|source| EdgeError::MalformedVariantList {
            url: url.to_string(),
            source,
        })
    }
}

/// Fetch the variant list from the variants endpoint.
///
/// Network failures, non-2xx statuses, malformed bodies and empty lists all
/// fail the request; there is no fallback list.
pub async fn fetch_all_variants(client: &reqwest::Client, url: &str) -> Result<VariantList, EdgeError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| EdgeError::VariantList {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(EdgeError::VariantListStatus {
            url: url.to_string(),
            status,
        });
    }

    let body = response.bytes().await.map_err(|source| EdgeError::VariantList {
        url: url.to_string(),
        source,
    })?;

    let variants = VariantList::from_json(url, &body)?;
    if variants.is_empty() {
        return Err(EdgeError::EmptyVariantList(url.to_string()));
    }

    tracing::debug!(url = %url, count = variants.len(), "Variant list fetched");
    Ok(variants)
}
