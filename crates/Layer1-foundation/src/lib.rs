//! # flagbridge-foundation
//!
//! Foundation layer for flagbridge:
//! - Error: 공통 에러 타입 (`Error`, `Result`)
//! - Config: 통합 설정 (`BridgeConfig`, global + project 병합)
//! - Storage: JsonStore (범용 JSON 파일 저장/로드)
//! - Notify: 사용자에게 보이는 알림 (`Notifier`)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Layer4-cli  (flagbridge binary, hosts, wiring)         │
//! ├─────────────────────────────────────────────────────────┤
//! │  Layer2-core (FlagChannel, ProfileSwitcher, Bootstrap)  │
//! │  Layer2-task (ProcessRunner, OutputLog)                 │
//! ├─────────────────────────────────────────────────────────┤
//! │  Layer1-foundation (이 레이어)                          │
//! │  ├── Error / Result                                     │
//! │  ├── BridgeConfig + JsonStore                           │
//! │  └── Notifier                                           │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod notify;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    BridgeConfig, ENV_NONINTERACTIVE, ENV_PROFILE, ENV_PROFILE_ID, ENV_PROFILE_NAME,
    ENV_STARTUP_URL, ENV_TOOL, BRIDGE_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;

// ============================================================================
// Notify (알림)
// ============================================================================
pub use notify::{LogNotifier, MemoryNotifier, Notification, NotifyLevel, Notifier};
