//! Profile switcher - ordered fallback over equivalent host operations
//!
//! ```text
//! Direct ──fail──▶ CreateAndSwitch ──fail──▶ CreateThenSwitch ──fail──▶ not switched
//!   │                   │                        │
//!   └────── ok ─────────┴──────── ok ────────────┴──▶ switched
//! ```
//!
//! Every attempt tries the string form before the structured form. A host
//! error, unsupported operation or panic counts as "not ok" and moves the
//! machine forward; nothing propagates out of `switch_to`.

use super::host::{
    ArgumentForm, ProfileArgument, ProfileBaseline, ProfileCapability, ProfileCommand,
    ProfileHost,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Strategy that produced the switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchStrategy {
    Direct,
    CreateAndSwitch,
    CreateThenSwitch,
}

/// One host call made during a switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchAttempt {
    pub command: ProfileCommand,
    pub form: ArgumentForm,
    pub ok: bool,
}

/// Result of `switch_to`
#[derive(Debug, Clone)]
pub struct SwitchOutcome {
    pub profile: String,
    pub switched: bool,
    pub strategy: Option<SwitchStrategy>,
    pub attempts: Vec<SwitchAttempt>,
}

impl SwitchOutcome {
    fn new(profile: String) -> Self {
        Self {
            profile,
            switched: false,
            strategy: None,
            attempts: Vec::new(),
        }
    }

    fn succeed(mut self, strategy: SwitchStrategy) -> Self {
        self.switched = true;
        self.strategy = Some(strategy);
        self
    }
}

/// Drives the switch state machine against the host
#[derive(Debug, Clone)]
pub struct ProfileSwitcher {
    capability: ProfileCapability,
}

impl ProfileSwitcher {
    pub fn new(capability: ProfileCapability) -> Self {
        Self { capability }
    }

    pub fn capability(&self) -> &ProfileCapability {
        &self.capability
    }

    /// Try to make `name` the active profile
    pub async fn switch_to(&self, name: &str) -> SwitchOutcome {
        let name = name.trim();
        let mut outcome = SwitchOutcome::new(name.to_string());

        let host = match &self.capability {
            ProfileCapability::Supported(host) => Arc::clone(host),
            ProfileCapability::Unsupported { reason } => {
                warn!("Profile switch to '{}' skipped: {}", name, reason);
                return outcome;
            }
        };
        if name.is_empty() {
            warn!("Profile switch skipped: empty profile name");
            return outcome;
        }

        if attempt_forms(&*host, ProfileCommand::Switch, name, &mut outcome).await {
            info!("Switched to profile '{}'", name);
            return outcome.succeed(SwitchStrategy::Direct);
        }

        if attempt_forms(&*host, ProfileCommand::CreateAndSwitch, name, &mut outcome).await {
            info!("Created and switched to profile '{}'", name);
            return outcome.succeed(SwitchStrategy::CreateAndSwitch);
        }

        if attempt_forms(&*host, ProfileCommand::Create, name, &mut outcome).await
            && attempt_forms(&*host, ProfileCommand::Switch, name, &mut outcome).await
        {
            info!("Created profile '{}', then switched", name);
            return outcome.succeed(SwitchStrategy::CreateThenSwitch);
        }

        warn!(
            "Could not switch to profile '{}' after {} attempts",
            name,
            outcome.attempts.len()
        );
        outcome
    }
}

/// String form, then structured form; stops at the first success
async fn attempt_forms(
    host: &dyn ProfileHost,
    command: ProfileCommand,
    name: &str,
    outcome: &mut SwitchOutcome,
) -> bool {
    for argument in ProfileArgument::forms(name) {
        let ok = attempt(host, command, &argument).await;
        outcome.attempts.push(SwitchAttempt {
            command,
            form: argument.form(),
            ok,
        });
        if ok {
            return true;
        }
    }
    false
}

async fn attempt(host: &dyn ProfileHost, command: ProfileCommand, argument: &ProfileArgument) -> bool {
    match AssertUnwindSafe(host.execute(command, argument))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!("{} {:?} failed: {}", command, argument.form(), e);
            false
        }
        Err(_) => {
            warn!("{} {:?} panicked in host", command, argument.form());
            false
        }
    }
}

/// Create a profile with an empty baseline, swallowing failure
pub(crate) async fn create_empty(host: &dyn ProfileHost, name: &str) -> Option<super::ProfileInfo> {
    match AssertUnwindSafe(host.create_profile(name, &ProfileBaseline::empty()))
        .catch_unwind()
        .await
    {
        Ok(Ok(info)) => Some(info),
        Ok(Err(e)) => {
            warn!("Failed to create profile '{}': {}", name, e);
            None
        }
        Err(_) => {
            warn!("Creating profile '{}' panicked in host", name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileInfo;
    use async_trait::async_trait;
    use flagbridge_foundation::{Error, Result};
    use parking_lot::Mutex;

    /// Host that only accepts the listed (command, form) pairs
    struct ScriptedHost {
        accepts: Vec<(ProfileCommand, ArgumentForm)>,
        created: Mutex<bool>,
        /// Switch only works after a Create succeeded
        switch_needs_create: bool,
    }

    impl ScriptedHost {
        fn new(accepts: Vec<(ProfileCommand, ArgumentForm)>) -> Self {
            Self {
                accepts,
                created: Mutex::new(false),
                switch_needs_create: false,
            }
        }
    }

    #[async_trait]
    impl ProfileHost for ScriptedHost {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn list_profiles(&self) -> Result<Vec<ProfileInfo>> {
            Ok(Vec::new())
        }

        async fn active_profile(&self) -> Result<Option<ProfileInfo>> {
            Ok(None)
        }

        async fn create_profile(&self, name: &str, _: &ProfileBaseline) -> Result<ProfileInfo> {
            Ok(ProfileInfo::new(name, name))
        }

        async fn execute(&self, command: ProfileCommand, argument: &ProfileArgument) -> Result<()> {
            if command == ProfileCommand::Switch && self.switch_needs_create && !*self.created.lock() {
                return Err(Error::InvalidInput("no such profile".into()));
            }
            if self.accepts.contains(&(command, argument.form())) {
                if command == ProfileCommand::Create {
                    *self.created.lock() = true;
                }
                Ok(())
            } else {
                Err(Error::CapabilityUnsupported(format!("{command}")))
            }
        }
    }

    struct PanickyHost;

    #[async_trait]
    impl ProfileHost for PanickyHost {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn list_profiles(&self) -> Result<Vec<ProfileInfo>> {
            Ok(Vec::new())
        }

        async fn active_profile(&self) -> Result<Option<ProfileInfo>> {
            Ok(None)
        }

        async fn create_profile(&self, _: &str, _: &ProfileBaseline) -> Result<ProfileInfo> {
            panic!("create")
        }

        async fn execute(&self, _: ProfileCommand, _: &ProfileArgument) -> Result<()> {
            panic!("execute")
        }
    }

    fn switcher(host: impl ProfileHost + 'static) -> ProfileSwitcher {
        ProfileSwitcher::new(ProfileCapability::Supported(Arc::new(host)))
    }

    #[tokio::test]
    async fn test_direct_string_form_short_circuits() {
        let s = switcher(ScriptedHost::new(vec![(
            ProfileCommand::Switch,
            ArgumentForm::Named,
        )]));
        let outcome = s.switch_to("team-default").await;
        assert!(outcome.switched);
        assert_eq!(outcome.strategy, Some(SwitchStrategy::Direct));
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_structured_form_after_string_form() {
        let s = switcher(ScriptedHost::new(vec![(
            ProfileCommand::Switch,
            ArgumentForm::Structured,
        )]));
        let outcome = s.switch_to("team-default").await;
        assert_eq!(outcome.strategy, Some(SwitchStrategy::Direct));
        assert_eq!(outcome.attempts.len(), 2);
        assert!(!outcome.attempts[0].ok);
        assert!(outcome.attempts[1].ok);
    }

    #[tokio::test]
    async fn test_create_and_switch() {
        let s = switcher(ScriptedHost::new(vec![(
            ProfileCommand::CreateAndSwitch,
            ArgumentForm::Structured,
        )]));
        let outcome = s.switch_to("team-default").await;
        assert_eq!(outcome.strategy, Some(SwitchStrategy::CreateAndSwitch));
        assert_eq!(outcome.attempts.len(), 4);
    }

    #[tokio::test]
    async fn test_create_then_switch_retries_direct_forms() {
        let mut host = ScriptedHost::new(vec![
            (ProfileCommand::Create, ArgumentForm::Named),
            (ProfileCommand::Switch, ArgumentForm::Named),
        ]);
        host.switch_needs_create = true;
        let outcome = switcher(host).switch_to("team-default").await;

        assert!(outcome.switched);
        assert_eq!(outcome.strategy, Some(SwitchStrategy::CreateThenSwitch));
        let commands: Vec<_> = outcome.attempts.iter().map(|a| a.command).collect();
        assert_eq!(
            commands,
            vec![
                ProfileCommand::Switch,
                ProfileCommand::Switch,
                ProfileCommand::CreateAndSwitch,
                ProfileCommand::CreateAndSwitch,
                ProfileCommand::Create,
                ProfileCommand::Switch,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_create_skips_retry() {
        let outcome = switcher(ScriptedHost::new(Vec::new()))
            .switch_to("team-default")
            .await;
        assert!(!outcome.switched);
        assert_eq!(outcome.strategy, None);
        // 2 direct + 2 create-and-switch + 2 create, no retry
        assert_eq!(outcome.attempts.len(), 6);
        assert!(outcome.attempts.iter().all(|a| !a.ok));
    }

    #[tokio::test]
    async fn test_panicking_host_is_not_ok() {
        let outcome = switcher(PanickyHost).switch_to("team-default").await;
        assert!(!outcome.switched);
        assert_eq!(outcome.attempts.len(), 6);
    }

    #[tokio::test]
    async fn test_unsupported_and_blank() {
        let s = ProfileSwitcher::new(ProfileCapability::detect(None));
        let outcome = s.switch_to("team-default").await;
        assert!(!outcome.switched);
        assert!(outcome.attempts.is_empty());

        let s = switcher(ScriptedHost::new(vec![(
            ProfileCommand::Switch,
            ArgumentForm::Named,
        )]));
        let outcome = s.switch_to("   ").await;
        assert!(!outcome.switched);
        assert!(outcome.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_name_is_trimmed() {
        let s = switcher(ScriptedHost::new(vec![(
            ProfileCommand::Switch,
            ArgumentForm::Named,
        )]));
        assert_eq!(s.switch_to("  team-default\n").await.profile, "team-default");
    }

    #[tokio::test]
    async fn test_create_empty_swallows_panic() {
        assert!(create_empty(&PanickyHost, "x").await.is_none());
        let host = ScriptedHost::new(Vec::new());
        assert_eq!(
            create_empty(&host, "x").await,
            Some(ProfileInfo::new("x", "x"))
        );
    }
}
