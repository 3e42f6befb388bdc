// web-server/src/middleware/rate_limiter.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Instant, Duration};
use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    Error, ResponseError,
    HttpResponse
};
use common::config::RateLimitConfig;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::fmt;

// Custom error for rate limiting
#[derive(Debug)]
struct RateLimitExceeded {
    retry_after: u64,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, self.retry_after.to_string()))
            .body("Rate limit exceeded. Please try again later.")
    }
}

// Per-IP request timestamps within the current window
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    store: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_requests: usize, window: Duration) -> Self {
        Self {
            paths,
            max_requests,
            window,
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.paths.clone(),
            config.max_requests,
            Duration::from_secs(config.window_secs),
        )
    }

    fn applies_to(&self, path: &str) -> bool {
        self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Record a hit for `ip`. When over the limit, returns how long until
    /// the oldest hit in the window expires.
    fn check(&self, ip: &str, now: Instant) -> Option<Duration> {
        let mut store = match self.store.lock() {
            Ok(store) => store,
            Err(poisoned) => poisoned.into_inner(),
        };
        let window = self.window;

        // Forget clients that have been quiet for a whole window
        store.retain(|_, hits| hits.last().map_or(false, |t| now.duration_since(*t) < window));

        let hits = store.entry(ip.to_string()).or_default();
        hits.retain(|time| now.duration_since(*time) < window);

        if hits.len() >= self.max_requests {
            let oldest = hits.first().copied().unwrap_or(now);
            Some(window.saturating_sub(now.duration_since(oldest)))
        } else {
            hits.push(now);
            None
        }
    }
}

/// Whole seconds, rounded up, never below one
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.limiter.applies_to(req.path()) {
            // Get client IP
            let ip = req.connection_info().realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            if let Some(wait) = self.limiter.check(&ip, Instant::now()) {
                tracing::warn!("Rate limit exceeded for IP: {}", ip);

                let retry_after = retry_after_secs(wait);
                let response = RateLimitExceeded { retry_after }.error_response();
                return Box::pin(async move {
                    Ok(req.into_response(response).map_into_right_body())
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            fut.await.map(ServiceResponse::map_into_left_body)
        })
    }
}
