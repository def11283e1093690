//! flagbridge-core: filesystem mailbox + profile orchestration
//!
//! Layer2 - 외부 프로비저닝 도구와 에디터 사이의 협력 레이어
//!
//! # 주요 모듈
//!
//! - `flag`: 폴링 기반 flag 파일 채널 (reload, profile-switch)
//! - `profile`: profile capability, 전환 state machine, switch guard, bootstrap
//! - `apply`: profile 변경 후 config/extensions 동시 실행
//! - `handlers`: 채널 → switcher / reloader 연결
//! - `restart`: restart gate (fire-and-forget)
//! - `policy`: 권한 있는 작업 허용 여부
//!
//! # 사용 예시
//!
//! ```ignore
//! use flagbridge_core::{watch, ReloadProtocol, ReloadHandler, IDLE};
//!
//! let handle = watch(
//!     config.reload_flag_path(),
//!     IDLE,
//!     config.poll_interval(),
//!     ReloadProtocol::new(),
//!     Arc::new(ReloadHandler::new(reloader)),
//! );
//! // ...
//! handle.stop().await;
//! ```

pub mod apply;
pub mod flag;
pub mod handlers;
pub mod policy;
pub mod profile;
pub mod restart;

// Re-exports: Flag channels
pub use flag::{
    watch, ChannelHandle, FlagChannel, FlagHandler, FlagProtocol, PollOutcome,
    ProfileSwitchProtocol, ReloadProtocol, ACK_PREFIX, DEFAULT_POLL_INTERVAL, IDLE, RELOAD_PREFIX,
};

// Re-exports: Profile
pub use profile::{
    resolve_target, ArgumentForm, BootstrapReport, ProfileArgument, ProfileBaseline,
    ProfileBootstrap, ProfileCapability, ProfileCommand, ProfileHost, ProfileInfo, ProfileRef,
    ProfileSwitcher, SwitchAttempt, SwitchGuard, SwitchOutcome, SwitchStrategy,
    PROFILE_QUERY_KEY, SWITCH_GUARD_FILE,
};

// Re-exports: Apply / handlers
pub use apply::{ApplyPlan, ApplyReport, DEFAULT_SETTLE_DELAY};
pub use handlers::{ProfileSwitchHandler, ReloadHandler, WindowReloader};

// Re-exports: Restart / policy
pub use policy::{Policy, ROOT_PASSWORD_KEY};
pub use restart::{RestartGate, DEFAULT_RESTART_GATE};
