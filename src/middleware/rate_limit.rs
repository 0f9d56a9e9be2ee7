use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
struct Window {
    start: Instant,
    count: u32,
}

/// Fixed one-second window shared by every request through the layer.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    window: Arc<Mutex<Window>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            window: Arc::new(Mutex::new(Window {
                start: Instant::now(),
                count: 0,
            })),
        }
    }

    fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut guard = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if now.duration_since(guard.start) >= Duration::from_secs(1) {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rps {
            guard.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.allow() {
        tracing::warn!(path = %req.uri().path(), limit = limiter.rps, "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Demasiados pedidos, tente novamente mais tarde" })),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        assert!(limiter.allow_at(start));
        assert!(limiter.allow_at(start));
        assert!(!limiter.allow_at(start + Duration::from_millis(500)));
    }

    #[test]
    fn window_resets_after_one_second() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();
        assert!(limiter.allow_at(start));
        assert!(!limiter.allow_at(start));
        assert!(limiter.allow_at(start + Duration::from_secs(2)));
    }

    #[test]
    fn zero_rps_still_admits_one_request() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.allow());
    }
}
