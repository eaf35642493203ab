//! Request pipeline errors.

use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that abort a variant request before any body is sent.
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("failed to fetch variant list from {url}: {source}")]
    VariantList {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("variant list endpoint {url} returned {status}")]
    VariantListStatus { url: String, status: StatusCode },

    #[error("variant list from {url} is not JSON with a `variants` array: {source}")]
    MalformedVariantList {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("variant list from {0} is empty")]
    EmptyVariantList(String),

    #[error("failed to fetch variant page {url}: {source}")]
    VariantPage {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("variant page {url} returned {status}")]
    VariantPageStatus { url: String, status: StatusCode },

    #[error("selection cookie is not a valid header value: {0}")]
    SelectionCookie(#[from] InvalidHeaderValue),
}

impl EdgeError {
    /// Pipeline stage that failed, used as a metrics label.
    pub fn stage(&self) -> &'static str {
        match self {
            EdgeError::VariantList { .. }
            | EdgeError::VariantListStatus { .. }
            | EdgeError::MalformedVariantList { .. }
            | EdgeError::EmptyVariantList(_) => "variant_list",
            EdgeError::VariantPage { .. } | EdgeError::VariantPageStatus { .. } => "variant_page",
            EdgeError::SelectionCookie(_) => "finalize",
        }
    }

    /// Status code reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            EdgeError::SelectionCookie(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::BAD_GATEWAY => "Upstream request failed",
            _ => "Internal server error",
        };
        (status, message).into_response()
    }
}

/// Errors raised while a rewritten body is being streamed.
///
/// The response head has already been sent, so these end the body early.
#[derive(Debug, Clone, Error)]
pub enum RewriteError {
    #[error("upstream body failed: {0}")]
    Upstream(String),

    #[error("html rewriting failed: {0}")]
    Html(String),
}
