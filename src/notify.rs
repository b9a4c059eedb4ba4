// File: ./src/notify.rs
//! The notification capability the core calls for transient failures and
//! confirmations. How notices are displayed belongs to the host.
use notify_rust::Notification;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Writes notices to the log only.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Info => log::info!("{}", message),
            NoticeKind::Error => log::warn!("{}", message),
        }
    }
}

/// Raises a desktop notification in addition to logging.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        LogNotifier.notify(kind, message);
        let summary = match kind {
            NoticeKind::Info => "Editorial calendar",
            NoticeKind::Error => "Editorial calendar: action failed",
        };
        if let Err(e) = Notification::new()
            .appname(&self.app_name)
            .summary(summary)
            .body(message)
            .show()
        {
            log::debug!("Desktop notification failed: {}", e);
        }
    }
}
