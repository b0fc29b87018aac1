//! Shared-secret authentication for scheduler-triggered endpoints.
//!
//! The caller presents the secret either as `x-cron-secret` or as an
//! `Authorization: Bearer` token. A server without `CRON_SECRET` refuses
//! every call with 503 rather than running unauthenticated.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

use crate::error::AppError;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Clone)]
pub struct CronAuth {
    secret: Option<Arc<str>>,
}

impl CronAuth {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.map(Arc::from),
        }
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let Some(expected) = &self.secret else {
            return Err(AppError::Config("CRON_SECRET is not set".to_string()));
        };

        match presented_secret(headers) {
            Some(presented) if secrets_match(presented, expected) => Ok(()),
            _ => Err(AppError::Unauthorized),
        }
    }
}

fn presented_secret(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(CRON_SECRET_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.trim());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compare fixed-length digests so timing does not depend on the secret
fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn require_cron_secret(State(auth): State<CronAuth>, request: Request, next: Next) -> Response {
    match auth.check(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!("🔒 Rejected {} {}: {}", request.method(), request.uri().path(), e);
            e.into_response()
        }
    }
}
