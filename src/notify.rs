//! Role-addressed staff notifications.
//!
//! Fire-and-forget: queue events are broadcast to whichever delivery
//! transport is subscribed (a future websocket fan-out, a test). Nobody
//! listening is fine — a notification must never fail or delay the
//! operation that produced it.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::models::StaffRole;

/// Channel capacity. Slow subscribers lose the oldest messages; queue
/// notifications are ephemeral by design.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct StaffNotification {
    pub role: StaffRole,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<StaffNotification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Broadcast a message to a staff role. Errors (no subscribers) are
    /// swallowed.
    pub fn notify_role(&self, role: StaffRole, message: impl Into<String>) {
        let notification = StaffNotification {
            role,
            message: message.into(),
            at: Utc::now(),
        };
        tracing::debug!(role = %notification.role, message = %notification.message, "notify");
        let _ = self.tx.send(notification);
    }

    /// Subscribe to the notification stream.
    pub fn subscribe(&self) -> broadcast::Receiver<StaffNotification> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
