//! Selection cookie parsing and formatting.
//!
//! # Design Decisions
//! - Every `Cookie` header is scanned (HTTP/2 clients may split them)
//! - Names match exactly; the first matching pair wins
//! - Values must be plain ASCII digits that fit a `usize`

use axum::http::{header::COOKIE, HeaderMap};

/// Previously selected variant index carried by the request, if any.
///
/// No bounds check happens here; see [`crate::experiment::resolve_variant`].
pub fn variant_from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<usize> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .and_then(|(_, value)| parse_index(value.trim()))
}

/// `Set-Cookie` value pinning the client to `index`.
pub fn selection_cookie(cookie_name: &str, index: usize) -> String {
    format!("{cookie_name}={index}; path=/")
}

fn parse_index(value: &str) -> Option<usize> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const NAME: &str = "CLOUDFLARE_WORKER_VARIANT_CONTROL";

    fn headers(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(COOKIE, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn missing_header_is_absent() {
        assert_eq!(variant_from_cookie(&HeaderMap::new(), NAME), None);
    }

    #[test]
    fn finds_pair_among_others() {
        let h = headers(&["session=abc; CLOUDFLARE_WORKER_VARIANT_CONTROL=1; theme=dark"]);
        assert_eq!(variant_from_cookie(&h, NAME), Some(1));
    }

    #[test]
    fn zero_is_a_valid_selection() {
        let h = headers(&["CLOUDFLARE_WORKER_VARIANT_CONTROL=0"]);
        assert_eq!(variant_from_cookie(&h, NAME), Some(0));
    }

    #[test]
    fn scans_every_cookie_header() {
        let h = headers(&["session=abc", "CLOUDFLARE_WORKER_VARIANT_CONTROL=7"]);
        assert_eq!(variant_from_cookie(&h, NAME), Some(7));
    }

    #[test]
    fn name_must_match_exactly() {
        let h = headers(&["XCLOUDFLARE_WORKER_VARIANT_CONTROL=1; CLOUDFLARE_WORKER_VARIANT=2"]);
        assert_eq!(variant_from_cookie(&h, NAME), None);
    }

    #[test]
    fn non_numeric_values_are_absent() {
        for value in ["", "-1", "1a", "abc", " ", "1.5", "99999999999999999999999999"] {
            let h = headers(&[format!("{NAME}={value}").as_str()]);
            assert_eq!(variant_from_cookie(&h, NAME), None, "value {value:?}");
        }
    }

    #[test]
    fn first_matching_pair_wins() {
        let h = headers(&["CLOUDFLARE_WORKER_VARIANT_CONTROL=2; CLOUDFLARE_WORKER_VARIANT_CONTROL=0"]);
        assert_eq!(variant_from_cookie(&h, NAME), Some(2));
    }

    #[test]
    fn formats_set_cookie_value() {
        assert_eq!(selection_cookie(NAME, 0), "CLOUDFLARE_WORKER_VARIANT_CONTROL=0; path=/");
        assert_eq!(selection_cookie("AB", 12), "AB=12; path=/");
    }
}
