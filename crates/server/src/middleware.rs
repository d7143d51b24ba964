use crate::auth::{extract_bearer_token, token_matches};
use crate::error::ServerError;
use crate::observability;
use crate::state::ServerState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id carried in request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer token authentication middleware
pub async fn bearer_auth(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let authorized = extract_bearer_token(header)
        .is_some_and(|token| token_matches(token, &state.config.access_token));

    if !authorized {
        tracing::warn!(uri = %request.uri(), "rejected request without valid bearer token");
        observability::record_request(ServerError::Unauthorized.error_code());
        return Err(ServerError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Sliding-window rate limiting middleware. Runs after authentication.
pub async fn rate_limit(
    State(state): State<Arc<ServerState>>,
    request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let client = client_ip(&request, state.config.trust_forwarded_for);

    if let Err(err) = state.rate_limiter.check(client) {
        tracing::warn!(
            client = %client,
            scope = err.scope.as_str(),
            retry_after_secs = err.retry_after.as_secs(),
            "rate limit exceeded"
        );
        observability::record_rate_limited(err.scope.as_str());
        observability::record_request("rate_limited");
        return Err(err.into());
    }

    Ok(next.run(request).await)
}

/// Rate-limit bucket for a request: the first `X-Forwarded-For` hop when
/// trusted, else the peer address.
pub fn client_ip(request: &Request, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(request.headers()) {
            return ip;
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Request ID injection middleware
pub async fn request_id(mut request: Request, next: Next) -> Response {
    // Generate or extract request ID
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    // Get request ID if available
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    tracing::info!(
        method = %method,
        uri = %uri,
        request_id = %request_id,
        "Request started"
    );

    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = %request_id,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(peer: &str, forwarded: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/get_results");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        request
    }

    #[test]
    fn peer_address_is_default_identity() {
        let request = request_from("192.0.2.7:5123", Some("203.0.113.9"));
        assert_eq!(
            client_ip(&request, false),
            "192.0.2.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn forwarded_for_first_hop_when_trusted() {
        let request = request_from("10.0.0.1:80", Some("203.0.113.9, 10.0.0.1"));
        assert_eq!(
            client_ip(&request, true),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn garbage_forwarded_for_falls_back_to_peer() {
        let request = request_from("10.0.0.1:80", Some("not-an-ip"));
        assert_eq!(
            client_ip(&request, true),
            "10.0.0.1".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn missing_connect_info_uses_unspecified() {
        let request = axum::http::Request::builder()
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            client_ip(&request, false),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }
}
