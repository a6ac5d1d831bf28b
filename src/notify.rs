use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(4);
const MAX_VISIBLE: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    expires_at: Instant,
}

/// Transient toasts, newest last.
pub struct Notifications {
    queue: VecDeque<Notification>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Notifications {
    pub fn new(ttl: Duration) -> Self {
        Notifications {
            queue: VecDeque::new(),
            ttl,
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Level::Success, message.into(), Instant::now());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message.into(), Instant::now());
    }

    fn push(&mut self, level: Level, message: String, now: Instant) {
        self.queue.push_back(Notification {
            level,
            message,
            expires_at: now + self.ttl,
        });
        while self.queue.len() > MAX_VISIBLE {
            self.queue.pop_front();
        }
    }

    pub fn prune(&mut self, now: Instant) {
        self.queue.retain(|n| n.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_expire() {
        let mut toasts = Notifications::new(Duration::from_secs(2));
        let start = Instant::now();
        toasts.push(Level::Success, "saved".to_string(), start);

        toasts.prune(start + Duration::from_secs(1));
        assert!(!toasts.is_empty());
        toasts.prune(start + Duration::from_secs(3));
        assert!(toasts.is_empty());
    }

    #[test]
    fn test_only_newest_kept() {
        let mut toasts = Notifications::default();
        for i in 0..5 {
            toasts.error(format!("e{}", i));
        }
        let messages: Vec<&str> = toasts.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["e2", "e3", "e4"]);
        assert!(toasts.iter().all(|n| n.level == Level::Error));
    }
}
