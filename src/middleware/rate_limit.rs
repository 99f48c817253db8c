use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Fixed one-second window limiter, shared per router group.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_per_second: u32,
    state: Arc<Mutex<Window>>,
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    served: u32,
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second: max_per_second.max(1),
            state: Arc::new(Mutex::new(Window {
                opened_at: Instant::now(),
                served: 0,
            })),
        }
    }

    fn try_acquire(&self) -> bool {
        let mut window = self.state.lock().expect("rate limiter mutex poisoned");
        if window.opened_at.elapsed() >= Duration::from_secs(1) {
            window.opened_at = Instant::now();
            window.served = 0;
        }
        if window.served >= self.max_per_second {
            return false;
        }
        window.served += 1;
        true
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.try_acquire() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_caps_within_a_window() {
        let limiter = RateLimiter::new(3);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }
}
