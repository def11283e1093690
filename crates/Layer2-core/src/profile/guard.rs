//! Switch guard - 설치 단위로 "이미 전환함" 기록
//!
//! 에디터를 재시작할 때마다 프로필을 강제로 바꾸지 않도록
//! 프로필 이름별 boolean 을 `switch-guard.json` 에 저장한다.

use flagbridge_foundation::{Error, JsonStore, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

pub const SWITCH_GUARD_FILE: &str = "switch-guard.json";

type GuardMap = BTreeMap<String, bool>;

/// 프로필별 전환 기록
///
/// 파일 I/O 는 blocking pool 에서 돈다.
#[derive(Debug, Clone)]
pub struct SwitchGuard {
    store: JsonStore,
}

impl SwitchGuard {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    /// state 디렉토리 기준
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(JsonStore::new(dir))
    }

    /// 읽을 수 없는 파일은 "전환 안 함" 으로 취급
    pub async fn is_switched(&self, profile: &str) -> bool {
        let profile = profile.trim().to_string();
        let result = self
            .blocking(move |store| Ok(load(&store).get(&profile).copied().unwrap_or(false)))
            .await;
        result.unwrap_or_else(|e| {
            warn!("Switch guard unreadable: {}", e);
            false
        })
    }

    pub async fn mark_switched(&self, profile: &str) -> Result<()> {
        let profile = profile.trim().to_string();
        self.blocking(move |store| {
            let mut map = load(&store);
            map.insert(profile, true);
            store.save(SWITCH_GUARD_FILE, &map)
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(JsonStore) -> Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|e| Error::Internal(format!("switch guard task failed: {}", e)))?
    }
}

fn load(store: &JsonStore) -> GuardMap {
    store.load_or_default(SWITCH_GUARD_FILE)
}
