//! Bridge Config - 통합 설정
//!
//! 외부 provisioning 도구 위치, flag 파일 경로, 폴링 주기 등
//! flagbridge의 모든 설정을 통합 관리하는 BridgeConfig

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 설정 파일명
pub const BRIDGE_CONFIG_FILE: &str = "config.json";

// ============================================================================
// 환경 변수
// ============================================================================

/// 외부 도구 실행 파일 경로 override
pub const ENV_TOOL: &str = "FLAGBRIDGE_TOOL";
/// 대상 프로필 이름 override
pub const ENV_PROFILE: &str = "FLAGBRIDGE_PROFILE";
/// 시작 URL (일부 hosting 모드에서만 존재, `profile` query parameter 포함 가능)
pub const ENV_STARTUP_URL: &str = "FLAGBRIDGE_STARTUP_URL";
/// 자식 프로세스에 전달: non-interactive 모드 강제
pub const ENV_NONINTERACTIVE: &str = "FLAGBRIDGE_NONINTERACTIVE";
/// 자식 프로세스에 전달: 활성 프로필 id
pub const ENV_PROFILE_ID: &str = "FLAGBRIDGE_PROFILE_ID";
/// 자식 프로세스에 전달: 활성 프로필 이름
pub const ENV_PROFILE_NAME: &str = "FLAGBRIDGE_PROFILE_NAME";

// ============================================================================
// Bridge Config (통합)
// ============================================================================

/// flagbridge 통합 설정
///
/// 모든 필드는 optional 이며, 값이 없으면 accessor 가 기본값을 돌려준다.
/// global → project → 환경 변수 순서로 병합된다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 외부 도구의 명시적 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_path: Option<PathBuf>,

    /// 고정된 설치 경로 후보들
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_candidates: Option<Vec<PathBuf>>,

    /// PATH 에서 찾을 도구 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// 최후 수단 shell script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_script: Option<PathBuf>,

    /// fallback script 에 넘길 고정 sub-argument
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_arg: Option<String>,

    /// flag 파일 및 switch guard 저장 디렉토리
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,

    /// reload flag 파일 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reload_flag: Option<String>,

    /// profile-switch flag 파일 이름
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_flag: Option<String>,

    /// 폴링 주기 (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// 프로필 전환 후 안정화 대기 (ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,

    /// 기본 대상 프로필
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    /// restart gate 주소 (host:port, loopback)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_gate: Option<String>,

    /// policy YAML 파일 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_file: Option<PathBuf>,
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Self::default()
        }
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 + 환경 변수 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 글로벌 → 프로젝트 순서로 덮어쓴다
        let layers = [JsonStore::global().ok(), JsonStore::current_project().ok()];
        for store in layers.iter().flatten() {
            config.merge(Self::load_from(store)?);
        }

        // 환경 변수가 마지막
        config.apply_env(|key| std::env::var(key).ok());

        Ok(config)
    }

    /// 특정 저장소에서만 로드
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        let mut config = Self::new();
        if let Some(loaded) = store.load_optional::<BridgeConfig>(BRIDGE_CONFIG_FILE)? {
            config.merge(loaded);
        }
        Ok(config)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: BridgeConfig) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            tool_path,
            tool_candidates,
            tool_name,
            fallback_script,
            fallback_arg,
            state_dir,
            reload_flag,
            profile_flag,
            poll_interval_ms,
            settle_delay_ms,
            default_profile,
            restart_gate,
            policy_file,
        );
    }

    /// 환경 변수 override 적용
    ///
    /// `lookup` 은 테스트에서 프로세스 환경을 건드리지 않도록 주입한다.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_TOOL).filter(|v| !v.trim().is_empty()) {
            self.tool_path = Some(PathBuf::from(path.trim()));
        }
    }

    // ========================================================================
    // Accessors (기본값 포함)
    // ========================================================================

    pub fn tool_candidates(&self) -> Vec<PathBuf> {
        self.tool_candidates.clone().unwrap_or_else(|| {
            vec![
                PathBuf::from("/usr/local/bin/provision"),
                PathBuf::from("/opt/provision/bin/provision"),
            ]
        })
    }

    pub fn tool_name(&self) -> &str {
        self.tool_name.as_deref().unwrap_or("provision")
    }

    pub fn fallback_arg(&self) -> &str {
        self.fallback_arg.as_deref().unwrap_or("tool")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".flagbridge")
        })
    }

    pub fn reload_flag_path(&self) -> PathBuf {
        self.state_dir()
            .join(self.reload_flag.as_deref().unwrap_or("reload.flag"))
    }

    pub fn profile_flag_path(&self) -> PathBuf {
        self.state_dir()
            .join(self.profile_flag.as_deref().unwrap_or("profile.flag"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(500).max(10))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms.unwrap_or(400))
    }

    pub fn default_profile(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default-workspace")
    }

    pub fn restart_gate(&self) -> &str {
        self.restart_gate.as_deref().unwrap_or("127.0.0.1:7331")
    }

    pub fn policy_file(&self) -> PathBuf {
        self.policy_file
            .clone()
            .unwrap_or_else(|| self.state_dir().join("policy.yaml"))
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tool_path = Some(path.into());
        self
    }

    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = Some(dir.into());
        self
    }

    pub fn with_default_profile(mut self, name: impl Into<String>) -> Self {
        self.default_profile = Some(name.into());
        self
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_bridge_config_defaults() {
        let config = BridgeConfig::new();
        assert_eq!(config.version, 1);
        assert!(config.tool_path.is_none());
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.settle_delay(), Duration::from_millis(400));
        assert_eq!(config.fallback_arg(), "tool");
        assert_eq!(config.tool_candidates().len(), 2);
    }

    #[test]
    fn test_flag_paths_follow_state_dir() {
        let config = BridgeConfig::new().with_state_dir("/tmp/fb");
        assert_eq!(config.reload_flag_path(), PathBuf::from("/tmp/fb/reload.flag"));
        assert_eq!(config.profile_flag_path(), PathBuf::from("/tmp/fb/profile.flag"));
        assert_eq!(config.policy_file(), PathBuf::from("/tmp/fb/policy.yaml"));
    }

    #[test]
    fn test_config_merge() {
        let mut base = BridgeConfig::new().with_default_profile("base");
        base.poll_interval_ms = Some(250);

        let mut overlay = BridgeConfig::new().with_default_profile("team-default");
        overlay.restart_gate = Some("127.0.0.1:9000".to_string());

        base.merge(overlay);

        assert_eq!(base.default_profile(), "team-default");
        assert_eq!(base.restart_gate(), "127.0.0.1:9000");
        // overlay 에 없는 값은 유지
        assert_eq!(base.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_env_override() {
        let mut config = BridgeConfig::new().tool_path("/from/file");
        config.apply_env(|key| (key == ENV_TOOL).then(|| " /from/env ".to_string()));
        assert_eq!(config.tool_path, Some(PathBuf::from("/from/env")));

        config.apply_env(|_| Some("   ".to_string()));
        assert_eq!(config.tool_path, Some(PathBuf::from("/from/env")));
    }

    #[test]
    fn test_load_from_store() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(BRIDGE_CONFIG_FILE),
            r#"{ "toolName": "devbox", "pollIntervalMs": 100 }"#,
        )
        .unwrap();

        let config = BridgeConfig::load_from(&JsonStore::new(dir.path())).unwrap();
        assert_eq!(config.tool_name(), "devbox");
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }
}
