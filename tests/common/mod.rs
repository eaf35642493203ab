//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use variant_edge::config::{CustomDataEntry, EdgeConfig};
use variant_edge::{EdgeServer, Shutdown};

pub const COOKIE_NAME: &str = "CLOUDFLARE_WORKER_VARIANT_CONTROL";
pub const PAGE_TITLE: &str = "Integration Title";

/// What the mock variants endpoint serves.
#[allow(dead_code)]
pub enum Variants {
    /// JSON list of pages on the mock itself, one per path.
    Paths(Vec<String>),
    /// Raw body with status 200.
    Raw(&'static str),
    /// Empty body with the given status.
    Status(u16),
}

impl Variants {
    /// `count` pages at `/variants/{i}`.
    #[allow(dead_code)]
    pub fn pages(count: usize) -> Self {
        Variants::Paths((0..count).map(|i| format!("/variants/{i}")).collect())
    }
}

/// A running mock upstream serving the variants endpoint and variant pages.
pub struct MockUpstream {
    pub addr: SocketAddr,
    page_hits: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    /// Paths of variant pages requested so far, in order.
    #[allow(dead_code)]
    pub fn page_hits(&self) -> Vec<String> {
        self.page_hits.lock().unwrap().clone()
    }

    pub fn variants_url(&self) -> String {
        format!("http://{}/api/variants", self.addr)
    }
}

/// HTML of the page served at `path`.
pub fn variant_page(path: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Variant {path}</title></head><body>\
         <h1 id=\"title\">Variant {path}</h1>\
         <p id=\"description\">Original description for {path}</p>\
         <a id=\"url\" href=\"https://original.test/\">Return to the original</a>\
         <footer>served from {path}</footer></body></html>"
    )
}

/// Start the mock upstream on an ephemeral port.
///
/// Pages whose path starts with `/missing` answer 404.
pub async fn start_mock_upstream(variants: Variants) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let variants_response: Arc<dyn Fn() -> Response + Send + Sync> = match variants {
        Variants::Paths(paths) => {
            let urls: Vec<String> = paths.iter().map(|p| format!("http://{addr}{p}")).collect();
            let body = serde_json::json!({ "variants": urls }).to_string();
            Arc::new(move || ([(header::CONTENT_TYPE, "application/json")], body.clone()).into_response())
        }
        Variants::Raw(body) => Arc::new(move || (StatusCode::OK, body).into_response()),
        Variants::Status(code) => Arc::new(move || {
            StatusCode::from_u16(code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }),
    };

    let page_hits = Arc::new(Mutex::new(Vec::new()));
    let hits = page_hits.clone();

    let app = Router::new()
        .route(
            "/api/variants",
            get(move || {
                let respond = variants_response.clone();
                async move { respond() }
            }),
        )
        .fallback(move |uri: Uri| {
            let hits = hits.clone();
            async move {
                let path = uri.path().to_string();
                hits.lock().unwrap().push(path.clone());
                if path.starts_with("/missing") {
                    return StatusCode::NOT_FOUND.into_response();
                }
                (
                    [
                        (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                        (header::SET_COOKIE, "upstream_session=abc; path=/"),
                    ],
                    variant_page(&path),
                )
                    .into_response()
            }
        });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, page_hits }
}

/// Custom data used by every integration test.
pub fn custom_data() -> Vec<CustomDataEntry> {
    vec![
        CustomDataEntry {
            heading: "Heading Zero".into(),
            description: "Description zero".into(),
            url_text: "Link zero".into(),
            url_href: "https://zero.test/".into(),
        },
        CustomDataEntry {
            heading: "Heading One".into(),
            description: "Description one".into(),
            url_text: "Link one".into(),
            url_href: "https://one.test/".into(),
        },
    ]
}

/// Edge configuration pointing at `upstream`.
pub fn edge_config(upstream: &MockUpstream) -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.experiment.variants_url = upstream.variants_url();
    config.experiment.page_title = PAGE_TITLE.into();
    config.experiment.cookie_name = COOKIE_NAME.into();
    config.experiment.custom_data = custom_data();
    config.upstream.system_proxy = false;
    config.timeouts.connect_secs = 2;
    config.timeouts.upstream_secs = 5;
    config.observability.metrics_enabled = false;
    config
}

/// A running edge server.
pub struct Edge {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    #[allow(dead_code)]
    pub updates: mpsc::UnboundedSender<EdgeConfig>,
}

impl Edge {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Edge {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the edge server on an ephemeral port.
pub async fn start_edge(config: EdgeConfig) -> Edge {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = EdgeServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    Edge {
        addr,
        shutdown,
        updates,
    }
}

/// Client that never stores cookies and ignores proxy settings.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Every `Set-Cookie` value on a response.
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The selection cookie on a response, if any.
#[allow(dead_code)]
pub fn selection_cookie(response: &reqwest::Response) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{COOKIE_NAME}=")))
}
