//! Config - 통합 설정 관리
//!
//! - `bridge.rs` - BridgeConfig 통합 설정 (global + project + env)

mod bridge;

pub use bridge::{
    BridgeConfig, BRIDGE_CONFIG_FILE, ENV_NONINTERACTIVE, ENV_PROFILE, ENV_PROFILE_ID,
    ENV_PROFILE_NAME, ENV_STARTUP_URL, ENV_TOOL,
};
