use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimitLayer {
    /// `requests` per minute; zero is treated as one
    pub fn per_minute(requests: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));

        RateLimitLayer {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn check(&self) -> Result<(), Response> {
        self.limiter.check().map_err(|_| {
            let body = serde_json::json!({
                "error": "Rate limit exceeded. Please try again later.",
                "error_code": "RATE_LIMITED",
            });
            (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
        })
    }
}

pub async fn rate_limit_middleware(State(limit): State<RateLimitLayer>, req: Request, next: Next) -> Response {
    match limit.check() {
        Ok(()) => next.run(req).await,
        Err(response) => {
            warn!("⏳ Rate limit hit on {}", req.uri().path());
            response
        }
    }
}
