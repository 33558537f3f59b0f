//! Transient user-facing notifications.
//!
//! Front ends push `Notification`s and call `prune` on every tick; each one
//! disappears once its duration has elapsed or it is dismissed.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a notification stays up unless it says otherwise.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);

/// Upper bound on queued notifications; the oldest are dropped first.
const MAX_QUEUED: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
    pub duration: Duration,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Default,
            duration: DEFAULT_DURATION,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: Variant::Destructive,
            ..Self::info(title, description)
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

#[derive(Debug, Default)]
pub struct Notifications {
    queue: VecDeque<(Notification, Instant)>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification, now: Instant) {
        if self.queue.len() == MAX_QUEUED {
            self.queue.pop_front();
        }
        let expires = now + notification.duration;
        self.queue.push_back((notification, expires));
    }

    /// Drop everything that has expired by `now`.
    pub fn prune(&mut self, now: Instant) {
        self.queue.retain(|(_, expires)| *expires > now);
    }

    /// Newest live notification.
    pub fn current(&self) -> Option<&Notification> {
        self.queue.back().map(|(n, _)| n)
    }

    /// Dismiss the newest notification.
    pub fn dismiss(&mut self) -> Option<Notification> {
        self.queue.pop_back().map(|(n, _)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter().map(|(n, _)| n)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
