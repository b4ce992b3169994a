//! Short-lived toasts raised by background tasks for whoever is watching.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// A record changed.
    Info,
    /// Live updates are degraded.
    Warning,
}

impl NotificationLevel {
    /// How long a toast of this level stays on screen.
    pub fn lifetime(self) -> Duration {
        match self {
            NotificationLevel::Info => Duration::from_secs(4),
            NotificationLevel::Warning => Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
    expires_at: Instant,
}

impl Notification {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title.into(), body.into())
    }

    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title.into(), body.into())
    }

    fn new(level: NotificationLevel, title: String, body: String) -> Self {
        Self {
            level,
            title,
            body,
            expires_at: Instant::now() + level.lifetime(),
        }
    }

    /// Override the level's lifetime, counted from now.
    pub fn lasting(mut self, lifetime: Duration) -> Self {
        self.expires_at = Instant::now() + lifetime;
        self
    }

    pub fn expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// The toasts currently on screen, oldest first. Holds at most `capacity`;
/// a new toast pushes out the oldest one.
#[derive(Debug)]
pub struct NotificationQueue {
    toasts: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            toasts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, toast: Notification) {
        self.prune(Instant::now());
        while self.toasts.len() >= self.capacity {
            self.toasts.pop_front();
        }
        self.toasts.push_back(toast);
    }

    /// Unexpired toasts, oldest first.
    pub fn visible(&mut self) -> &[Notification] {
        self.prune(Instant::now());
        self.toasts.make_contiguous()
    }

    fn prune(&mut self, now: Instant) {
        self.toasts.retain(|t| !t.expired_at(now));
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(queue: &mut NotificationQueue) -> Vec<String> {
        queue.visible().iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn warnings_outlive_info() {
        assert!(NotificationLevel::Warning.lifetime() > NotificationLevel::Info.lifetime());

        let now = Instant::now();
        let toast = Notification::warning("Live updates", "Live updates stopped");
        assert_eq!(toast.level, NotificationLevel::Warning);
        assert!(!toast.expired_at(now));
        assert!(toast.expired_at(now + Duration::from_secs(9)));
    }

    #[test]
    fn pushed_toast_is_visible() {
        let mut queue = NotificationQueue::default();
        queue.push(Notification::info("Medications", "Medication added"));
        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].body, "Medication added");
        assert_eq!(visible[0].level, NotificationLevel::Info);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut queue = NotificationQueue::with_capacity(2);
        for title in ["a", "b", "c"] {
            queue.push(Notification::info(title, ""));
        }
        assert_eq!(titles(&mut queue), vec!["b", "c"]);
    }

    #[test]
    fn expired_toasts_disappear() {
        let mut queue = NotificationQueue::default();
        queue.push(Notification::info("gone", "").lasting(Duration::ZERO));
        queue.push(Notification::info("kept", ""));
        assert_eq!(titles(&mut queue), vec!["kept"]);
    }

    #[test]
    fn zero_capacity_still_shows_latest() {
        let mut queue = NotificationQueue::with_capacity(0);
        queue.push(Notification::info("first", ""));
        queue.push(Notification::info("second", ""));
        assert_eq!(titles(&mut queue), vec!["second"]);
    }
}
