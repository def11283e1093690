//! Notify - 사용자에게 보이는 알림
//!
//! ProcessRunner / ProfileSwitcher 의 결과처럼 사용자가 직접 봐야 하는
//! 메시지만 이 경로로 보낸다. 나머지는 `tracing` 로그로 충분하다.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// 알림 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

impl NotifyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyLevel::Info => "info",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Error => "error",
        }
    }
}

/// 단일 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotifyLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// 알림 표시 trait
///
/// host(에디터, 터미널 등)가 구현한다.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn info(&self, message: &str) {
        self.notify(Notification::new(NotifyLevel::Info, message));
    }

    fn warn(&self, message: &str) {
        self.notify(Notification::new(NotifyLevel::Warning, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::new(NotifyLevel::Error, message));
    }
}

// ============================================================================
// LogNotifier - tracing 으로 출력
// ============================================================================

/// 알림을 tracing 이벤트로 내보내는 기본 구현
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotifyLevel::Info => info!(target: "flagbridge::notify", "{}", notification.message),
            NotifyLevel::Warning => warn!(target: "flagbridge::notify", "{}", notification.message),
            NotifyLevel::Error => error!(target: "flagbridge::notify", "{}", notification.message),
        }
    }
}

// ============================================================================
// MemoryNotifier - 기록용 (테스트, 헤드리스 실행)
// ============================================================================

/// 받은 알림을 순서대로 기록
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 기록된 알림
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    /// 특정 레벨의 알림 수
    pub fn count(&self, level: NotifyLevel) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|n| n.level == level)
            .count()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.entries.lock().push(notification);
    }
}
