//! Admission pipeline (spec §4.1): loopback → host → origin → body size →
//! rate limit, in that order, first rejection wins. Mirrors the teacher's
//! `from_fn_with_state` auth-middleware shape, generalised into a single
//! ordered gate since every route shares the same admission policy.

use std::net::{IpAddr, SocketAddr};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{AllowOrigin, CorsLayer};

use gd_domain::error::DaemonError;

use crate::state::AppState;

const MAX_BODY_BYTES: u64 = 256 * 1024;

/// Build the CORS layer from the configured exact-match allowlist. Never
/// echoes `*`; `AllowOrigin::list` only ever reflects an origin already
/// present in the allowlist.
pub fn build_cors_layer(allowlist: &[String]) -> CorsLayer {
    use axum::http::Method;

    let origins: Vec<HeaderValue> = allowlist
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .max_age(std::time::Duration::from_secs(10 * 60))
}

/// True for `127.0.0.1`, `::1`, and IPv4-mapped loopback addresses.
fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback()),
    }
}

fn host_is_allowed(headers: &HeaderMap) -> bool {
    let Some(host) = headers.get(axum::http::header::HOST).and_then(|h| h.to_str().ok()) else {
        return false;
    };
    let hostname = host.split(':').next().unwrap_or(host);
    hostname == "127.0.0.1" || hostname == "localhost"
}

fn matched_origin(headers: &HeaderMap, allowlist: &[String]) -> Option<String> {
    let origin = headers.get(axum::http::header::ORIGIN)?.to_str().ok()?;
    if origin.is_empty() {
        return None;
    }
    allowlist.iter().find(|o| o.as_str() == origin).cloned()
}

/// The single ordered admission gate. Applied as the outermost
/// `from_fn_with_state` layer so nothing downstream runs for a rejected
/// request.
pub async fn admission_filter(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match check(&state, &addr, &req) {
        Ok(()) => next.run(req).await,
        Err(e) => axum::response::IntoResponse::into_response(e),
    }
}

fn check(state: &AppState, addr: &SocketAddr, req: &Request<Body>) -> Result<(), DaemonError> {
    if !is_loopback(addr.ip()) {
        return Err(DaemonError::OriginNotAllowed);
    }

    let headers = req.headers();

    if !host_is_allowed(headers) {
        return Err(DaemonError::OriginNotAllowed);
    }

    let allowlist = &state.config.read().origin_allowlist;
    if matched_origin(headers, allowlist).is_none() {
        return Err(DaemonError::OriginNotAllowed);
    }

    if let Some(len) = headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
    {
        if len > MAX_BODY_BYTES {
            return Err(DaemonError::RequestTooLarge);
        }
    }

    if !state.global_limiter.check(addr.ip()) {
        return Err(DaemonError::RateLimited);
    }

    if req.uri().path() == "/v1/pair" && !state.pairing_limiter.check(addr.ip()) {
        return Err(DaemonError::RateLimited);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_ipv4_is_accepted() {
        assert!(is_loopback("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn loopback_ipv6_is_accepted() {
        assert!(is_loopback("::1".parse().unwrap()));
    }

    #[test]
    fn non_loopback_is_rejected() {
        assert!(!is_loopback("10.0.0.5".parse().unwrap()));
    }

    #[test]
    fn ipv4_mapped_loopback_is_accepted() {
        assert!(is_loopback("::ffff:127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn host_header_accepts_loopback_literal_and_port() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::HOST, "127.0.0.1:4173".parse().unwrap());
        assert!(host_is_allowed(&headers));
    }

    #[test]
    fn host_header_rejects_other_hosts() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::HOST, "evil.example".parse().unwrap());
        assert!(!host_is_allowed(&headers));
    }

    #[test]
    fn origin_must_exact_match_allowlist() {
        let allowlist = vec!["http://localhost:5173".to_string()];
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::ORIGIN,
            "http://localhost:5173".parse().unwrap(),
        );
        assert_eq!(
            matched_origin(&headers, &allowlist),
            Some("http://localhost:5173".to_string())
        );
    }

    #[test]
    fn origin_missing_is_rejected() {
        let allowlist = vec!["http://localhost:5173".to_string()];
        let headers = HeaderMap::new();
        assert_eq!(matched_origin(&headers, &allowlist), None);
    }

    #[test]
    fn origin_not_in_allowlist_is_rejected() {
        let allowlist = vec!["http://localhost:5173".to_string()];
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::ORIGIN, "http://evil.example".parse().unwrap());
        assert_eq!(matched_origin(&headers, &allowlist), None);
    }
}
