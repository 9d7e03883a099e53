//! User-visible notices
//!
//! Only the generation path raises notices; structural misses stay in the log.

use notify_rust::Notification;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message meant for the person using the compose window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Destination for notices
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotices;

impl NoticeSink for LogNotices {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!("{}: {}", notice.title, notice.message),
            NoticeLevel::Warning => tracing::warn!("{}: {}", notice.title, notice.message),
            NoticeLevel::Error => tracing::error!("{}: {}", notice.title, notice.message),
        }
    }
}

/// Pops a native desktop notification
#[derive(Debug, Clone)]
pub struct DesktopNotices {
    app_name: String,
}

impl DesktopNotices {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl NoticeSink for DesktopNotices {
    fn notify(&self, notice: Notice) {
        if let Err(e) = Notification::new()
            .appname(&self.app_name)
            .summary(&notice.title)
            .body(&notice.message)
            .show()
        {
            tracing::warn!("Failed to show desktop notification: {}", e);
        }
    }
}

/// Keeps every notice in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingNotices {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.notices.lock().map(|n| n.len()).unwrap_or(0)
    }
}

impl NoticeSink for RecordingNotices {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

/// Forwards each notice to several sinks
#[derive(Default, Clone)]
pub struct FanoutNotices {
    sinks: Vec<Arc<dyn NoticeSink>>,
}

impl FanoutNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn NoticeSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl NoticeSink for FanoutNotices {
    fn notify(&self, notice: Notice) {
        for sink in &self.sinks {
            sink.notify(notice.clone());
        }
    }
}
