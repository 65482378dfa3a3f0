use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use crate::util::format_hms;

/// User-facing confirmations raised by the tracking session.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DogSelected { name: String },
    Started { dog: String },
    Paused,
    Resumed,
    Ended { distance_km: f64, elapsed_secs: u64 },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::DogSelected { name } => write!(f, "{} is ready to go!", name),
            Notification::Started { dog } => write!(f, "Activity started with {}", dog),
            Notification::Paused => f.write_str("Activity paused"),
            Notification::Resumed => f.write_str("Activity resumed"),
            Notification::Ended {
                distance_km,
                elapsed_secs,
            } => write!(
                f,
                "Activity ended: {:.2} km in {}",
                distance_km,
                format_hms(*elapsed_secs)
            ),
        }
    }
}

pub const TOAST_TTL: Duration = Duration::from_secs(3);
const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub shown_at: Instant,
}

/// Short-lived messages shown at the bottom of the tracking screen.
#[derive(Debug)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    ttl: Duration,
}

impl ToastQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            toasts: VecDeque::new(),
            ttl,
        }
    }

    pub fn push(&mut self, notification: &Notification, now: Instant) {
        log::info!("{}", notification);
        self.push_message(notification.to_string(), now);
    }

    pub fn push_message(&mut self, message: String, now: Instant) {
        if self.toasts.len() == MAX_TOASTS {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            message,
            shown_at: now,
        });
    }

    /// Drops expired toasts; returns true if anything changed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.toasts.len();
        let ttl = self.ttl;
        self.toasts
            .retain(|t| now.saturating_duration_since(t.shown_at) < ttl);
        before != self.toasts.len()
    }

    /// When the oldest toast is due to disappear.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.toasts
            .front()
            .and_then(|t| t.shown_at.checked_add(self.ttl))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(TOAST_TTL)
    }
}
