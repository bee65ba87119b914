//! User-facing notifications (fire-and-forget)

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::info;

use crate::protocol::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }
}

/// Text shown when the local participant changes team
pub fn team_change(new_team: Team) -> Notification {
    match new_team {
        Team::Spectator => Notification::info("You are now a spectator"),
        team => Notification::info(format!("You are now in {team} team")),
    }
}

/// Text shown when a participant joins or leaves
pub fn join_left(name: &str, joined: bool) -> Notification {
    let verb = if joined { "joined" } else { "left" };
    Notification::info(format!("{name} {verb} the game"))
}

/// Receives notifications; never blocks the caller
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: Notification) {
        info!(severity = ?notification.severity, "{}", notification.message);
    }
}

/// Forwards notifications to a UI task
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        // Receiver gone means nobody is displaying toasts anymore.
        let _ = self.tx.send(notification);
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    seen: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}
