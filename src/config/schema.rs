//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! handler. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the variant edge handler.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// A/B experiment definition: where variants come from and what gets
    /// written into the fetched pages.
    pub experiment: ExperimentConfig,

    /// Outbound client settings.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests processed at once (backpressure).
    pub max_concurrent_requests: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_concurrent_requests: 10_000,
        }
    }
}

/// Experiment definition.
///
/// The custom-data table is indexed with `variant % custom_data.len()`, so a
/// variant list longer than the table makes several variants share one entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Endpoint returning `{ "variants": ["<url>", ...] }`.
    pub variants_url: String,

    /// Text written into the page `<title>`.
    pub page_title: String,

    /// Name of the cookie pinning a client to a variant.
    pub cookie_name: String,

    /// Content written into each variant page.
    pub custom_data: Vec<CustomDataEntry>,
}

impl ExperimentConfig {
    /// Custom data for a variant index, wrapping around the table.
    pub fn custom_data_for(&self, variant: usize) -> Option<&CustomDataEntry> {
        if self.custom_data.is_empty() {
            return None;
        }
        self.custom_data.get(variant % self.custom_data.len())
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            variants_url: "https://cfw-takehome.developers.workers.dev/api/variants".to_string(),
            page_title: "Variant Edge".to_string(),
            cookie_name: "CLOUDFLARE_WORKER_VARIANT_CONTROL".to_string(),
            custom_data: vec![
                CustomDataEntry {
                    heading: "Variant One".to_string(),
                    description: "You are looking at the first variant.".to_string(),
                    url_text: "Read the docs".to_string(),
                    url_href: "https://developers.cloudflare.com/workers/".to_string(),
                },
                CustomDataEntry {
                    heading: "Variant Two".to_string(),
                    description: "You are looking at the second variant.".to_string(),
                    url_text: "Browse the source".to_string(),
                    url_href: "https://github.com/cloudflare/lol-html".to_string(),
                },
            ],
        }
    }
}

/// Content written into the four rewritten slots of a variant page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomDataEntry {
    /// Replaces the text of `h1#title`.
    pub heading: String,

    /// Replaces the text of `p#description`.
    pub description: String,

    /// Replaces the text of `a#url`.
    pub url_text: String,

    /// Replaces the `href` of `a#url`.
    pub url_href: String,
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` for outbound calls.
    pub system_proxy: bool,

    /// `User-Agent` sent to the variants endpoint and variant pages.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            system_proxy: true,
            user_agent: concat!("variant-edge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for one upstream call, body included, in seconds.
    pub upstream_secs: u64,

    /// Request timeout (inbound request to response head) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 15,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
