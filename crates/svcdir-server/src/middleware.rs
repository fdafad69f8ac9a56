use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use svcdir_search::RateLimiter;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is inserted into request
/// extensions as [`RequestId`] and echoed on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Limiter plus the policy for identifying clients.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<dyn RateLimiter>,
    /// Honor `x-forwarded-for` / `x-real-ip`. Clients can set those headers
    /// freely, so this is only enabled behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,
}

impl RateLimitState {
    pub fn new(limiter: Arc<dyn RateLimiter>, trust_proxy_headers: bool) -> Self {
        Self {
            limiter,
            trust_proxy_headers,
        }
    }
}

/// Identity used for rate limiting.
///
/// The peer address by default. With `trust_proxy_headers`, the first
/// `x-forwarded-for` hop, then `x-real-ip`, then the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
            if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
                return first.to_string();
            }
        }
        if let Some(real_ip) = header_str(headers, "x-real-ip") {
            return real_ip.to_string();
        }
    }
    peer.map_or_else(|| "anonymous".to_string(), |addr| addr.ip().to_string())
}

/// Middleware rejecting clients over their quota before any handler runs.
pub async fn enforce_rate_limit(
    State(state): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(req.headers(), peer, state.trust_proxy_headers);

    let decision = state.limiter.check(&key).await;
    if !decision.allowed {
        tracing::warn!(
            stage = "rate_check",
            client = %key,
            reset_after_secs = decision.reset_after.as_secs(),
            "rate limit exceeded"
        );
        return ApiError::new("rate_limited", "too many requests, try again later")
            .with_details(format!("retry after {} seconds", decision.reset_after.as_secs()))
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).expect("header value"));
        }
        map
    }

    fn peer() -> SocketAddr {
        "192.0.2.10:5555".parse().expect("socket addr")
    }

    #[test]
    fn peer_address_is_the_default_identity() {
        let h = headers(&[("x-forwarded-for", "203.0.113.7"), ("x-real-ip", "10.0.0.9")]);
        assert_eq!(client_key(&h, Some(peer()), false), "192.0.2.10");
        assert_eq!(client_key(&h, None, false), "anonymous");
    }

    #[test]
    fn trusted_forwarded_for_takes_first_hop() {
        let h = headers(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1"), ("x-real-ip", "10.0.0.9")]);
        assert_eq!(client_key(&h, Some(peer()), true), "203.0.113.7");
    }

    #[test]
    fn trusted_real_ip_then_peer_then_anonymous() {
        let h = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_key(&h, Some(peer()), true), "198.51.100.2");

        assert_eq!(client_key(&HeaderMap::new(), Some(peer()), true), "192.0.2.10");
        assert_eq!(client_key(&HeaderMap::new(), None, true), "anonymous");
    }
}
