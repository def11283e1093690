//! Scripted profile host shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use flagbridge_core::{
    ArgumentForm, ProfileArgument, ProfileBaseline, ProfileCommand, ProfileHost, ProfileInfo,
};
use flagbridge_foundation::{Error, Result};
use parking_lot::Mutex;

/// Host accepting only the configured (command, form) pairs
pub struct FakeHost {
    pub supported: bool,
    pub accepts: Vec<(ProfileCommand, ArgumentForm)>,
    pub profiles: Mutex<Vec<ProfileInfo>>,
    pub calls: Mutex<Vec<(ProfileCommand, ArgumentForm, String)>>,
    pub creates: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new(accepts: Vec<(ProfileCommand, ArgumentForm)>) -> Self {
        Self {
            supported: true,
            accepts,
            profiles: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every profile operation
    pub fn rejecting() -> Self {
        Self::new(Vec::new())
    }

    pub fn legacy() -> Self {
        Self {
            supported: false,
            ..Self::rejecting()
        }
    }

    pub fn with_profile(self, id: &str, name: &str) -> Self {
        self.profiles.lock().push(ProfileInfo::new(id, name));
        self
    }

    pub fn commands(&self) -> Vec<ProfileCommand> {
        self.calls.lock().iter().map(|(c, _, _)| *c).collect()
    }

    pub fn switch_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(c, _, _)| *c == ProfileCommand::Switch)
            .count()
    }
}

#[async_trait]
impl ProfileHost for FakeHost {
    fn name(&self) -> &str {
        "fake"
    }

    fn supports_profiles(&self) -> bool {
        self.supported
    }

    async fn list_profiles(&self) -> Result<Vec<ProfileInfo>> {
        Ok(self.profiles.lock().clone())
    }

    async fn active_profile(&self) -> Result<Option<ProfileInfo>> {
        Ok(None)
    }

    async fn create_profile(&self, name: &str, _baseline: &ProfileBaseline) -> Result<ProfileInfo> {
        let info = ProfileInfo::new(format!("id-{}", name), name);
        self.creates.lock().push(name.to_string());
        self.profiles.lock().push(info.clone());
        Ok(info)
    }

    async fn execute(&self, command: ProfileCommand, argument: &ProfileArgument) -> Result<()> {
        self.calls
            .lock()
            .push((command, argument.form(), argument.name().to_string()));
        if self.accepts.contains(&(command, argument.form())) {
            Ok(())
        } else {
            Err(Error::CapabilityUnsupported(format!("{} {:?}", command, argument.form())))
        }
    }
}
