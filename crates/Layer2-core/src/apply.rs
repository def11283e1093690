//! Follow-up apply after a profile change
//!
//! Waits for the settling delay, then runs the configuration merge and the
//! extension reconciliation concurrently and waits for both completions.

use flagbridge_task::{ProcessRunner, RunContext, ToolOperation};
use std::time::Duration;
use tracing::{info, warn};

/// Default settling delay before the apply operations start
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(400);

/// Outcome of one apply run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub config_ok: bool,
    pub extensions_ok: bool,
}

impl ApplyReport {
    pub fn all_ok(&self) -> bool {
        self.config_ok && self.extensions_ok
    }
}

#[derive(Clone)]
pub struct ApplyPlan {
    runner: ProcessRunner,
    settle_delay: Duration,
}

impl ApplyPlan {
    pub fn new(runner: ProcessRunner) -> Self {
        Self {
            runner,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub async fn run(&self, context: &RunContext) -> ApplyReport {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let config = self.runner.start(&ToolOperation::config_merge(), context);
        let extensions = self
            .runner
            .start(&ToolOperation::extension_reconcile(), context);
        let (config, extensions) = tokio::join!(config, extensions);

        let report = ApplyReport {
            config_ok: config.ok,
            extensions_ok: extensions.ok,
        };
        if report.all_ok() {
            info!("Profile apply finished");
        } else {
            warn!(
                "Profile apply finished with failures (config: {}, extensions: {})",
                report.config_ok, report.extensions_ok
            );
        }
        report
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use flagbridge_foundation::{MemoryNotifier, NotifyLevel};
    use flagbridge_task::{ExecutableResolver, OutputLog};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn plan(resolver: ExecutableResolver, notifier: Arc<MemoryNotifier>) -> ApplyPlan {
        let runner = ProcessRunner::new(resolver, Arc::new(OutputLog::new("test")), notifier);
        ApplyPlan::new(runner).with_settle_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_runs_both_operations() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("tool.sh");
        // argv: <sub_arg> <operation> ...
        std::fs::write(&script, "shift\necho \"$1 $FLAGBRIDGE_PROFILE_NAME\"\n").unwrap();
        let notifier = Arc::new(MemoryNotifier::new());
        let plan = plan(
            ExecutableResolver::new().fallback(&script, "tool"),
            Arc::clone(&notifier),
        );

        let ctx = RunContext::new().with_profile("p-1", "team-default");
        let report = plan.run(&ctx).await;
        assert!(report.all_ok());

        let log = plan.runner().log();
        let config: Vec<_> = log
            .for_operation("config")
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert!(config.iter().any(|c| c == "config team-default"));
        assert!(!log.for_operation("extensions").is_empty());
        assert_eq!(notifier.count(NotifyLevel::Error), 0);
    }

    #[tokio::test]
    async fn test_missing_tool_reports_both_failed() {
        let notifier = Arc::new(MemoryNotifier::new());
        let plan = plan(ExecutableResolver::new(), Arc::clone(&notifier));
        let report = plan.run(&RunContext::new()).await;
        assert_eq!(
            report,
            ApplyReport {
                config_ok: false,
                extensions_ok: false
            }
        );
        assert_eq!(notifier.count(NotifyLevel::Error), 2);
    }
}
