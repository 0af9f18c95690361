//! Rate limiting module to prevent abuse

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Sliding-window message limiter, one window per connection
pub struct MessageRateLimiter {
    message_times: RwLock<HashMap<String, VecDeque<Instant>>>,
    max_messages_per_window: u32,
    window_duration: Duration,
}

impl MessageRateLimiter {
    pub fn new(max_messages_per_minute: u32) -> Self {
        Self::with_window(max_messages_per_minute, Duration::from_secs(60))
    }

    pub fn with_window(max_messages_per_window: u32, window_duration: Duration) -> Self {
        Self {
            message_times: RwLock::new(HashMap::new()),
            max_messages_per_window,
            window_duration,
        }
    }

    /// Check if a connection can send another message, and count it if so
    pub async fn allow_message(&self, connection_id: &str) -> bool {
        let now = Instant::now();
        let mut times = self.message_times.write().await;
        let window = times.entry(connection_id.to_string()).or_default();

        // Remove old messages outside the window
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) < self.window_duration {
                break;
            }
            window.pop_front();
        }

        if window.len() < self.max_messages_per_window as usize {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// Get current message count for a connection in the window
    pub async fn get_message_count(&self, connection_id: &str) -> usize {
        let now = Instant::now();
        let times = self.message_times.read().await;
        times
            .get(connection_id)
            .map(|window| {
                window
                    .iter()
                    .filter(|&&time| now.duration_since(time) < self.window_duration)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Forget a closed connection
    pub async fn remove(&self, connection_id: &str) {
        self.message_times.write().await.remove(connection_id);
    }

    /// Clean up old entries to prevent memory leaks
    pub async fn cleanup_old_entries(&self) {
        let now = Instant::now();
        let mut times = self.message_times.write().await;
        times.retain(|_, window| {
            window.retain(|&time| now.duration_since(time) < self.window_duration);
            !window.is_empty()
        });
    }

    /// Get number of tracked connections
    pub async fn get_tracked_count(&self) -> usize {
        self.message_times.read().await.len()
    }

    /// Start cleanup task for the limiter
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300)); // Cleanup every 5 minutes
            loop {
                interval.tick().await;
                self.cleanup_old_entries().await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_limit_within_window() {
        let limiter = MessageRateLimiter::new(3);
        for _ in 0..3 {
            assert!(limiter.allow_message("c1").await);
        }
        assert!(!limiter.allow_message("c1").await);
        // Other connections have their own window
        assert!(limiter.allow_message("c2").await);
        assert_eq!(limiter.get_message_count("c1").await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = MessageRateLimiter::with_window(2, Duration::from_secs(10));
        assert!(limiter.allow_message("c1").await);
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(limiter.allow_message("c1").await);
        assert!(!limiter.allow_message("c1").await);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(limiter.allow_message("c1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_and_remove() {
        let limiter = MessageRateLimiter::with_window(5, Duration::from_secs(1));
        limiter.allow_message("c1").await;
        limiter.allow_message("c2").await;
        limiter.remove("c2").await;
        assert_eq!(limiter.get_tracked_count().await, 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        limiter.cleanup_old_entries().await;
        assert_eq!(limiter.get_tracked_count().await, 0);
    }
}
