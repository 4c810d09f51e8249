use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Spaces out sends to the message transport.
///
/// The interval runs from the end of one send attempt to the start of the
/// next, so the first send is immediate and nothing waits after the last.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_completed: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_completed: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next send is allowed.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_completed {
            let ready_at = last + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                debug!("Rate limiting sends: waiting {:?}", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }
    }

    /// Record that a send attempt finished, successful or not.
    pub fn complete(&mut self) {
        self.last_completed = Some(Instant::now());
    }
}
