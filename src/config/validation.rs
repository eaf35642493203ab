//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs
//! - Validate value ranges (timeouts > 0, non-empty tables)
//! - Reject cookie names that cannot be sent in a `Set-Cookie` header
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::EdgeConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.max_concurrent_requests must be greater than zero")]
    ZeroConcurrency,

    #[error("experiment.variants_url `{url}` is invalid: {reason}")]
    VariantsUrl { url: String, reason: String },

    #[error("experiment.cookie_name `{0}` is not a valid cookie name")]
    CookieName(String),

    #[error("experiment.page_title must not be empty")]
    EmptyPageTitle,

    #[error("experiment.custom_data must contain at least one entry")]
    EmptyCustomData,

    #[error("experiment.custom_data[{0}].url_href must not be empty")]
    EmptyUrlHref(usize),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::ZeroConcurrency);
    }

    let experiment = &config.experiment;
    match Url::parse(&experiment.variants_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::VariantsUrl {
            url: experiment.variants_url.clone(),
            reason: format!("unsupported scheme `{}`", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::VariantsUrl {
            url: experiment.variants_url.clone(),
            reason: e.to_string(),
        }),
    }

    if !is_cookie_token(&experiment.cookie_name) {
        errors.push(ValidationError::CookieName(experiment.cookie_name.clone()));
    }
    if experiment.page_title.is_empty() {
        errors.push(ValidationError::EmptyPageTitle);
    }
    if experiment.custom_data.is_empty() {
        errors.push(ValidationError::EmptyCustomData);
    }
    for (i, entry) in experiment.custom_data.iter().enumerate() {
        if entry.url_href.is_empty() {
            errors.push(ValidationError::EmptyUrlHref(i));
        }
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// RFC 6265 cookie-name: a non-empty RFC 7230 token.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
                )
        })
}
