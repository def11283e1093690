//! Profile bootstrap - runs once per process start
//!
//! 1. target 결정: env override → startup URL `profile` query → 기본값
//! 2. host 에 profile API 가 없으면 로그만 남기고 종료
//! 3. 이름/id 로 찾고, 없으면 빈 baseline 으로 생성
//! 4. SwitchGuard 에 기록이 없을 때만 전환
//! 5. 생성 또는 전환이 있었으면 follow-up apply

use super::guard::SwitchGuard;
use super::host::ProfileCapability;
use super::switcher::{create_empty, ProfileSwitcher};
use crate::apply::{ApplyPlan, ApplyReport};
use flagbridge_task::RunContext;
use tracing::{debug, info, warn};
use url::Url;

/// Query parameter naming the target profile in a startup URL
pub const PROFILE_QUERY_KEY: &str = "profile";

/// Target profile name
///
/// `startup_url` may be a full URL or a bare query string
/// (`?profile=x` or `profile=x`).
pub fn resolve_target(
    env_override: Option<&str>,
    startup_url: Option<&str>,
    default: &str,
) -> String {
    if let Some(name) = env_override.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    if let Some(name) = startup_url.and_then(profile_from_url) {
        return name;
    }
    default.trim().to_string()
}

fn profile_from_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let url = Url::parse(raw).or_else(|_| {
        let query = raw.trim_start_matches('?');
        Url::parse(&format!("flagbridge://startup/?{}", query))
    });
    let url = url.ok()?;
    url.query_pairs()
        .find(|(key, _)| key == PROFILE_QUERY_KEY)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// What bootstrap did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub target: String,
    /// Host has no profile API; nothing else was attempted
    pub degraded: bool,
    pub created: bool,
    pub switched: bool,
    /// Switch skipped because the guard says it already happened
    pub guarded: bool,
    pub applied: Option<ApplyReport>,
}

pub struct ProfileBootstrap {
    target: String,
    switcher: ProfileSwitcher,
    guard: SwitchGuard,
    apply: Option<ApplyPlan>,
}

impl ProfileBootstrap {
    pub fn new(target: impl Into<String>, switcher: ProfileSwitcher, guard: SwitchGuard) -> Self {
        Self {
            target: target.into().trim().to_string(),
            switcher,
            guard,
            apply: None,
        }
    }

    pub fn with_apply(mut self, plan: ApplyPlan) -> Self {
        self.apply = Some(plan);
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Never fails; every problem degrades to a log line
    pub async fn run(self) -> BootstrapReport {
        let mut report = BootstrapReport {
            target: self.target.clone(),
            ..Default::default()
        };

        let host = match self.switcher.capability() {
            ProfileCapability::Supported(host) => host.clone(),
            ProfileCapability::Unsupported { reason } => {
                info!("Profile bootstrap skipped: {}", reason);
                report.degraded = true;
                return report;
            }
        };

        if self.target.is_empty() {
            warn!("Profile bootstrap skipped: empty target profile");
            return report;
        }

        let profiles = match host.list_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Failed to list profiles on '{}': {}", host.name(), e);
                return report;
            }
        };

        let mut profile = profiles.into_iter().find(|p| p.matches(&self.target));
        if profile.is_none() {
            profile = create_empty(&*host, &self.target).await;
            report.created = profile.is_some();
            if report.created {
                info!("Created profile '{}'", self.target);
            }
        }

        if self.guard.is_switched(&self.target).await {
            debug!("Profile '{}' already switched to once; skipping", self.target);
            report.guarded = true;
        } else {
            let outcome = self.switcher.switch_to(&self.target).await;
            report.switched = outcome.switched;
            if outcome.switched {
                if let Err(e) = self.guard.mark_switched(&self.target).await {
                    warn!("Failed to persist switch guard: {}", e);
                }
            }
        }

        if report.created || report.switched {
            if let Some(plan) = &self.apply {
                let (id, name) = match &profile {
                    Some(p) => (p.id.clone(), p.name.clone()),
                    None => (self.target.clone(), self.target.clone()),
                };
                let ctx = RunContext::new().with_profile(id, name);
                report.applied = Some(plan.run(&ctx).await);
            }
        }

        report
    }
}
