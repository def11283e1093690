//! Hosts used by the standalone binary
//!
//! - `FileProfileHost`: profiles kept in `profiles.json` under the state dir
//! - `ConsoleReloader`: "reloading" a headless host means telling the user

use async_trait::async_trait;
use flagbridge_core::{
    ProfileArgument, ProfileBaseline, ProfileCommand, ProfileHost, ProfileInfo, WindowReloader,
};
use flagbridge_foundation::{Error, JsonStore, Notifier, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub const PROFILES_FILE: &str = "profiles.json";

/// profiles.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileBook {
    #[serde(default)]
    profiles: Vec<StoredProfile>,
    #[serde(default)]
    active: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProfile {
    #[serde(flatten)]
    info: ProfileInfo,
    #[serde(default)]
    baseline: ProfileBaseline,
}

impl ProfileBook {
    /// Exact name first, then id
    fn find(&self, key: &str) -> Option<&StoredProfile> {
        let key = key.trim();
        self.profiles
            .iter()
            .find(|p| p.info.name == key)
            .or_else(|| self.profiles.iter().find(|p| p.info.id == key))
    }

    fn insert(&mut self, name: &str, baseline: &ProfileBaseline) -> Result<ProfileInfo> {
        if self.profiles.iter().any(|p| p.info.name == name) {
            return Err(Error::InvalidInput(format!("profile '{}' already exists", name)));
        }
        let info = ProfileInfo::new(self.unique_id(name), name);
        self.profiles.push(StoredProfile {
            info: info.clone(),
            baseline: baseline.clone(),
        });
        Ok(info)
    }

    /// Slug of the name, suffixed with `-2`, `-3`, ... when taken
    fn unique_id(&self, name: &str) -> String {
        let base = slug(name);
        let mut id = base.clone();
        let mut n = 2;
        while self.profiles.iter().any(|p| p.info.id == id) {
            id = format!("{}-{}", base, n);
            n += 1;
        }
        id
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// File-backed profile host
///
/// Accepts both argument forms for switch and create. The combined
/// create-and-switch operation is not offered, like older editor builds.
/// File access runs on the blocking pool, serialized by `lock`.
pub struct FileProfileHost {
    store: JsonStore,
    lock: Arc<Mutex<()>>,
}

impl FileProfileHost {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(state_dir),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ProfileBook) -> T + Send + 'static,
    {
        self.with_book(false, move |book| Ok(f(book))).await
    }

    /// Read-modify-write under the lock
    async fn update<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ProfileBook) -> Result<T> + Send + 'static,
    {
        self.with_book(true, f).await
    }

    async fn with_book<T, F>(&self, save: bool, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ProfileBook) -> Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        let lock = Arc::clone(&self.lock);
        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            let mut book: ProfileBook = store.load_optional(PROFILES_FILE)?.unwrap_or_default();
            let value = f(&mut book)?;
            if save {
                store.save(PROFILES_FILE, &book)?;
            }
            Ok(value)
        })
        .await
        .map_err(|e| Error::Internal(format!("profile store task failed: {}", e)))?
    }
}

#[async_trait]
impl ProfileHost for FileProfileHost {
    fn name(&self) -> &str {
        "profiles.json"
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileInfo>> {
        self.read(|book| book.profiles.iter().map(|p| p.info.clone()).collect::<Vec<_>>())
            .await
    }

    async fn active_profile(&self) -> Result<Option<ProfileInfo>> {
        self.read(|book| {
            book.active.as_deref().and_then(|active| {
                book.profiles
                    .iter()
                    .find(|p| p.info.id == active)
                    .map(|p| p.info.clone())
            })
        })
        .await
    }

    async fn create_profile(&self, name: &str, baseline: &ProfileBaseline) -> Result<ProfileInfo> {
        let name = name.trim().to_string();
        let baseline = baseline.clone();
        self.update(move |book| book.insert(&name, &baseline)).await
    }

    async fn execute(&self, command: ProfileCommand, argument: &ProfileArgument) -> Result<()> {
        let name = argument.name().trim().to_string();
        match command {
            ProfileCommand::Switch => {
                self.update(move |book| {
                    let id = book
                        .find(&name)
                        .map(|p| p.info.id.clone())
                        .ok_or_else(|| {
                            Error::InvalidInput(format!("no profile named '{}'", name))
                        })?;
                    book.active = Some(id);
                    Ok(())
                })
                .await
            }
            ProfileCommand::Create => {
                self.update(move |book| book.insert(&name, &ProfileBaseline::empty()).map(|_| ()))
                    .await
            }
            ProfileCommand::CreateAndSwitch => Err(Error::CapabilityUnsupported(
                "create-and-switch is not available in profiles.json".to_string(),
            )),
        }
    }
}

/// Reload for a host without a window: report it
pub struct ConsoleReloader {
    notifier: Arc<dyn Notifier>,
}

impl ConsoleReloader {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl WindowReloader for ConsoleReloader {
    async fn reload(&self, nonce: u64) -> Result<()> {
        self.notifier
            .info(&format!("flagbridge: reload requested (#{})", nonce));
        Ok(())
    }
}
