//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router sending every method and path to the variant handler
//! - Wire up middleware (tracing, timeout, request ID, concurrency limit)
//! - Bind server to listener with graceful shutdown
//! - Apply hot-reloaded experiment configuration
//! - Run the variant pipeline: list → selection → page → rewrite → cookie

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{EdgeConfig, ExperimentConfig};
use crate::error::EdgeError;
use crate::experiment::{fetch_all_variants, resolve_variant, selection_cookie, variant_from_cookie};
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response::finalize_response;
use crate::observability::metrics;
use crate::rewrite::PageEdits;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Current experiment; each request works on the snapshot it loads.
    pub experiment: Arc<ArcSwap<ExperimentConfig>>,
    /// Client for the variants endpoint and variant pages.
    pub client: reqwest::Client,
}

impl AppState {
    /// Build state from configuration.
    pub fn new(config: &EdgeConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.upstream.user_agent.as_str())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.upstream_secs));
        if !config.upstream.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        Ok(Self {
            experiment: Arc::new(ArcSwap::from_pointee(config.experiment.clone())),
            client,
        })
    }
}

/// HTTP server for the variant edge handler.
pub struct EdgeServer {
    router: Router,
    state: AppState,
}

impl EdgeServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: EdgeConfig) -> Result<Self, reqwest::Error> {
        let state = AppState::new(&config)?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EdgeConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(variant_handler))
            .route("/", any(variant_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                Arc::new(Semaphore::new(config.listener.max_concurrent_requests)),
                limit_concurrency,
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Router with all middleware, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configurations received on `config_updates` replace the experiment for
    /// requests that start afterwards.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let experiment = self.state.experiment.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    variants_url = %new_config.experiment.variants_url,
                    custom_data = new_config.experiment.custom_data.len(),
                    "Experiment configuration reloaded"
                );
                experiment.store(Arc::new(new_config.experiment));
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Variant handler: every request gets a (possibly pinned) variant page.
async fn variant_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_string();
    let experiment = state.experiment.load_full();

    let response = match serve_variant(&state.client, &experiment, &headers, &request_id).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, stage = e.stage(), error = %e, "Variant request failed");
            metrics::record_upstream_error(e.stage());
            e.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), start_time);
    response
}

/// Fetch, select, rewrite and finalize one variant response.
async fn serve_variant(
    client: &reqwest::Client,
    experiment: &ExperimentConfig,
    headers: &HeaderMap,
    request_id: &str,
) -> Result<Response, EdgeError> {
    let variants = fetch_all_variants(client, &experiment.variants_url).await?;

    let previous = variant_from_cookie(headers, &experiment.cookie_name);
    let selection = resolve_variant(variants.len(), previous, &mut rand::thread_rng())
        .ok_or_else(|| EdgeError::EmptyVariantList(experiment.variants_url.clone()))?;
    metrics::record_selection(selection.index, selection.source);

    if variants.len() > experiment.custom_data.len() {
        tracing::debug!(
            request_id = %request_id,
            variants = variants.len(),
            custom_data = experiment.custom_data.len(),
            "More variants than custom data entries; entries are shared"
        );
    }

    let url = variants
        .get(selection.index)
        .ok_or_else(|| EdgeError::EmptyVariantList(experiment.variants_url.clone()))?
        .to_string();

    tracing::debug!(
        request_id = %request_id,
        variant = selection.index,
        source = selection.source.as_str(),
        url = %url,
        "Variant selected"
    );

    let page = client
        .get(&url)
        .send()
        .await
        .map_err(|source| EdgeError::VariantPage {
            url: url.clone(),
            source,
        })?;

    let status = page.status();
    if !status.is_success() {
        return Err(EdgeError::VariantPageStatus { url, status });
    }

    let headers = page.headers().clone();
    let body = match experiment.custom_data_for(selection.index) {
        Some(entry) => PageEdits::new(&experiment.page_title, entry).rewrite_body(page.bytes_stream()),
        // Unreachable with a validated config; pass the page through untouched.
        None => Body::from_stream(page.bytes_stream()),
    };
    let cookie = selection
        .is_new()
        .then(|| selection_cookie(&experiment.cookie_name, selection.index));

    finalize_response(status, headers, body, cookie.as_deref())
}

/// Hold a permit for the duration of each request; waits when none are left.
async fn limit_concurrency(
    State(permits): State<Arc<Semaphore>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match permits.acquire_owned().await {
        Ok(_permit) => next.run(request).await,
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn unreachable_config() -> EdgeConfig {
        let mut config = EdgeConfig::default();
        // Port 9 (discard) on loopback is closed in test environments.
        config.experiment.variants_url = "http://127.0.0.1:9/api/variants".into();
        config.upstream.system_proxy = false;
        config.timeouts.connect_secs = 1;
        config.timeouts.upstream_secs = 2;
        config
    }

    #[tokio::test]
    async fn unreachable_variant_list_is_bad_gateway() {
        let server = EdgeServer::new(unreachable_config()).unwrap();

        let response = server
            .router()
            .oneshot(Request::builder().uri("/any/path").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get("set-cookie").is_none());
        assert!(response.headers().get("x-request-id").is_some());
    }

    #[tokio::test]
    async fn keeps_client_request_id() {
        let server = EdgeServer::new(unreachable_config()).unwrap();

        let response = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[test]
    fn state_snapshot_matches_config() {
        let config = EdgeConfig::default();
        let state = AppState::new(&config).unwrap();
        assert_eq!(
            state.experiment.load().variants_url,
            config.experiment.variants_url
        );
    }
}
