//! Transient, dismissible user notifications.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Oldest notifications are dropped past this many.
pub const MAX_QUEUED: usize = 20;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: Level,
    pub message: String,
}

#[derive(Default)]
pub struct Notifications {
    next_id: AtomicU64,
    queue: Mutex<VecDeque<Notification>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: Level, message: impl Into<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let notification = Notification {
            id,
            level,
            message: message.into(),
        };
        tracing::debug!(id, ?level, message = %notification.message, "notification queued");
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.push_back(notification);
        while queue.len() > MAX_QUEUED {
            queue.pop_front();
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Success, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(Level::Error, message)
    }

    pub fn list(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Returns false if the id was already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let before = queue.len();
        queue.retain(|n| n.id != id);
        queue.len() != before
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}
