use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use feedbot_core::{domain::Image, ports::Publisher, Result};

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// Publisher decorator that keeps a minimum spacing between posts.
///
/// Telegram limits bots to roughly 20 messages per minute in one group or
/// channel; a short interval or a manual burst would otherwise hit 429s.
pub struct ThrottledPublisher {
    inner: Arc<dyn Publisher>,
    limiter: Mutex<IntervalLimiter>,
}

impl ThrottledPublisher {
    pub fn new(inner: Arc<dyn Publisher>, min_interval: Duration) -> Self {
        Self {
            inner,
            limiter: Mutex::new(IntervalLimiter::new(min_interval)),
        }
    }
}

#[async_trait::async_trait]
impl Publisher for ThrottledPublisher {
    async fn publish_photo(&self, image: &Image, caption: &str) -> Result<()> {
        let wait = { self.limiter.lock().await.reserve() };
        if !wait.is_zero() {
            tracing::debug!(wait_ms = wait.as_millis() as u64, "throttling publish");
            sleep(wait).await;
        }
        self.inner.publish_photo(image, caption).await
    }
}
