//! Channel handlers wiring the flag channels to the rest of the bridge

use crate::apply::ApplyPlan;
use crate::flag::FlagHandler;
use crate::profile::{ProfileCapability, ProfileSwitcher};
use async_trait::async_trait;
use flagbridge_foundation::{Notifier, Result};
use flagbridge_task::RunContext;
use std::sync::Arc;
use tracing::info;

/// Reloads the host window
#[async_trait]
pub trait WindowReloader: Send + Sync {
    async fn reload(&self, nonce: u64) -> Result<()>;
}

/// Reload channel handler
pub struct ReloadHandler {
    reloader: Arc<dyn WindowReloader>,
}

impl ReloadHandler {
    pub fn new(reloader: Arc<dyn WindowReloader>) -> Self {
        Self { reloader }
    }
}

#[async_trait]
impl FlagHandler<u64> for ReloadHandler {
    async fn handle(&self, nonce: u64) -> Result<()> {
        info!("Reload requested (nonce {})", nonce);
        self.reloader.reload(nonce).await
    }
}

/// Profile-switch channel handler
///
/// Always returns `Ok` so the channel writes its ACK; the outcome is
/// reported through the notifier instead.
pub struct ProfileSwitchHandler {
    switcher: ProfileSwitcher,
    apply: Option<ApplyPlan>,
    notifier: Arc<dyn Notifier>,
}

impl ProfileSwitchHandler {
    pub fn new(switcher: ProfileSwitcher, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            switcher,
            apply: None,
            notifier,
        }
    }

    /// Run the follow-up apply after a successful switch
    pub fn with_apply(mut self, plan: ApplyPlan) -> Self {
        self.apply = Some(plan);
        self
    }

    async fn context_for(&self, name: &str) -> RunContext {
        if let ProfileCapability::Supported(host) = self.switcher.capability() {
            if let Ok(profiles) = host.list_profiles().await {
                if let Some(p) = profiles.into_iter().find(|p| p.matches(name)) {
                    return RunContext::new().with_profile(p.id, p.name);
                }
            }
        }
        RunContext::new().with_profile(name, name)
    }
}

#[async_trait]
impl FlagHandler<String> for ProfileSwitchHandler {
    async fn handle(&self, name: String) -> Result<()> {
        let outcome = self.switcher.switch_to(&name).await;
        if !outcome.switched {
            self.notifier.warn(&format!(
                "flagbridge: could not switch to profile '{}'. Switch to it manually.",
                outcome.profile
            ));
            return Ok(());
        }

        self.notifier
            .info(&format!("flagbridge: switched to profile '{}'", outcome.profile));
        if let Some(plan) = &self.apply {
            let ctx = self.context_for(&outcome.profile).await;
            plan.run(&ctx).await;
        }
        Ok(())
    }
}
