//! Response handling and transformation.
//!
//! # Responsibilities
//! - Mirror the variant page's status and headers for the client
//! - Drop framing and hop-by-hop headers invalidated by the rewrite
//! - Append the selection cookie for newly selected clients
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Upstream `Set-Cookie` headers are kept; the selection cookie is appended

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::Response;

use crate::error::EdgeError;

/// Remove headers that no longer hold once the body is rewritten.
///
/// These describe a single connection or the original body framing.
pub fn strip_upstream_headers(headers: &mut HeaderMap) {
    for name in [
        header::CONNECTION,
        header::CONTENT_LENGTH,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ] {
        headers.remove(name);
    }
    for name in ["keep-alive", "proxy-connection"] {
        headers.remove(name);
    }
}

/// Build the client response from the variant page's head and rewritten body.
pub fn finalize_response(
    status: StatusCode,
    mut headers: HeaderMap,
    body: Body,
    selection_cookie: Option<&str>,
) -> Result<Response, EdgeError> {
    strip_upstream_headers(&mut headers);

    if let Some(cookie) = selection_cookie {
        headers.append(header::SET_COOKIE, HeaderValue::from_str(cookie)?);
    }

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
