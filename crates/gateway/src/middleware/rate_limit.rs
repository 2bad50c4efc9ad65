//! Per-origin rate limiting using the GCRA token bucket from governor

use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use gsr_common::{
    config::RateLimitConfig,
    errors::{AppError, Result},
    metrics::record_rate_limited,
};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Rate limiter with one bucket per client origin
pub type OriginRateLimiter = DefaultKeyedRateLimiter<String>;

/// Origin used when neither a forwarded header nor a peer address is known
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Create a keyed rate limiter from configuration
pub fn create_rate_limiter(config: &RateLimitConfig) -> Result<Arc<OriginRateLimiter>> {
    let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
        AppError::Configuration {
            message: "rate_limit.requests_per_minute must be greater than zero".to_string(),
        }
    })?;
    let burst = NonZeroU32::new(config.burst).ok_or_else(|| AppError::Configuration {
        message: "rate_limit.burst must be greater than zero".to_string(),
    })?;

    let quota = Quota::per_minute(per_minute).allow_burst(burst);
    Ok(Arc::new(RateLimiter::keyed(quota)))
}

/// Periodically drop buckets that have fully refilled
pub fn spawn_pruner(limiter: Arc<OriginRateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            limiter.retain_recent();
            limiter.shrink_to_fit();
            tracing::debug!(origins = limiter.len(), "Rate limiter pruned");
        }
    })
}

fn forwarded_for(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Peer address, or the first `X-Forwarded-For` entry when the deployment
/// sits behind a trusted proxy. Clients control the header, so it is
/// ignored otherwise.
pub fn client_origin(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(origin) = forwarded_for(request) {
            return origin.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}

/// Rate limiting middleware
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return Ok(next.run(request).await);
    };

    let origin = client_origin(&request, state.config.rate_limit.trust_forwarded_for);
    match limiter.check_key(&origin) {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(origin = %origin, path = %request.uri().path(), "Rate limit exceeded");
            record_rate_limited(request.uri().path());
            Err(AppError::RateLimited { origin })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    fn config(per_minute: u32, burst: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: per_minute,
            burst,
            enabled: true,
            trust_forwarded_for: false,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = create_rate_limiter(&config(10, 10)).unwrap();
        assert!(limiter.check_key(&"10.0.0.1".to_string()).is_ok());
    }

    #[test]
    fn test_zero_quota_is_rejected() {
        assert!(matches!(
            create_rate_limiter(&config(0, 10)),
            Err(AppError::Configuration { .. })
        ));
        assert!(create_rate_limiter(&config(10, 0)).is_err());
    }

    #[test]
    fn test_origins_have_separate_buckets() {
        let limiter = create_rate_limiter(&config(1, 2)).unwrap();
        let a = "10.0.0.1".to_string();
        let b = "10.0.0.2".to_string();

        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_err());
        assert!(limiter.check_key(&b).is_ok());
    }

    fn peer(request: &mut Request) {
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 4711))));
    }

    #[test]
    fn test_client_origin() {
        let mut request = http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_origin(&request, false), UNKNOWN_ORIGIN);

        peer(&mut request);
        assert_eq!(client_origin(&request, false), "192.168.1.20");
        assert_eq!(client_origin(&request, true), "192.168.1.20");
    }

    #[test]
    fn test_forwarded_header_needs_trust() {
        let mut request = http::Request::builder()
            .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        peer(&mut request);

        assert_eq!(client_origin(&request, true), "203.0.113.7");
        assert_eq!(client_origin(&request, false), "192.168.1.20");
    }
}
