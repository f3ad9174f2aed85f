//! User-visible notification delivery.

use serde::{Deserialize, Serialize};

/// Which reminder produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EyeReminder,
    FocusComplete,
    BreakComplete,
}

/// Fire-and-forget delivery of user-visible notifications.
///
/// Implementations must not block the calling state machine and must not
/// surface failures to it; a failed delivery is logged and dropped.
pub trait NotificationSink: Send + Sync {
    fn send(&self, kind: NotificationKind, title: &str, body: &str);
}

/// Logs notifications instead of displaying them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send(&self, kind: NotificationKind, title: &str, body: &str) {
        tracing::info!(?kind, title, body, "notification");
    }
}

/// Desktop notifications via the platform notification service.
///
/// Delivery runs on a detached thread; with no notification daemon
/// available this degrades to a logged warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopSink;

impl NotificationSink for DesktopSink {
    fn send(&self, kind: NotificationKind, title: &str, body: &str) {
        let title = title.to_string();
        let body = body.to_string();
        std::thread::spawn(move || {
            let result = notify_rust::Notification::new()
                .appname("restcycle")
                .summary(&title)
                .body(&body)
                .show();
            if let Err(e) = result {
                tracing::warn!(error = %e, ?kind, "desktop notification failed");
            }
        });
    }
}

pub(crate) fn send_eye_reminder(sink: &dyn NotificationSink) {
    sink.send(
        NotificationKind::EyeReminder,
        "Eye rest reminder",
        "Look at something 20 feet (6 meters) away for 20 seconds.",
    );
}

pub(crate) fn send_focus_complete(sink: &dyn NotificationSink) {
    sink.send(
        NotificationKind::FocusComplete,
        "Focus session complete",
        "Time for a break.",
    );
}

pub(crate) fn send_break_complete(sink: &dyn NotificationSink) {
    sink.send(
        NotificationKind::BreakComplete,
        "Break finished",
        "Back to focus.",
    );
}
