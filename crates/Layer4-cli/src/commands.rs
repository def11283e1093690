//! Subcommand implementations

use crate::host::{ConsoleReloader, FileProfileHost};
use crate::RunCommand;
use anyhow::{bail, Context};
use flagbridge_core::{
    resolve_target, watch as watch_flag, ApplyPlan, FlagHandler, Policy, ProfileBootstrap,
    ProfileCapability, ProfileHost, ProfileSwitchHandler, ProfileSwitchProtocol, ProfileSwitcher,
    ReloadHandler, ReloadProtocol, RestartGate, SwitchGuard, IDLE, RELOAD_PREFIX,
};
use flagbridge_foundation::{BridgeConfig, LogNotifier, Notifier, ENV_PROFILE, ENV_STARTUP_URL};
use flagbridge_task::{
    ConfigSelection, ExecutableResolver, OutputLog, ProcessRunner, RunContext, ToolOperation,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const PRINTER_DRAIN: Duration = Duration::from_millis(500);

/// Shared pieces every command builds the same way
struct Session {
    notifier: Arc<dyn Notifier>,
    runner: ProcessRunner,
    capability: ProfileCapability,
}

impl Session {
    fn new(config: &BridgeConfig) -> Self {
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        let runner = ProcessRunner::new(
            ExecutableResolver::from_config(config),
            Arc::new(OutputLog::default()),
            Arc::clone(&notifier),
        );
        let host: Arc<dyn ProfileHost> = Arc::new(FileProfileHost::new(config.state_dir()));
        Self {
            notifier,
            runner,
            capability: ProfileCapability::detect(Some(host)),
        }
    }

    fn apply_plan(&self, config: &BridgeConfig) -> ApplyPlan {
        ApplyPlan::new(self.runner.clone()).with_settle_delay(config.settle_delay())
    }
}

pub async fn watch(config: &BridgeConfig) -> anyhow::Result<()> {
    let session = Session::new(config);
    let switcher = ProfileSwitcher::new(session.capability.clone());

    let env_profile = std::env::var(ENV_PROFILE).ok();
    let startup_url = std::env::var(ENV_STARTUP_URL).ok();
    let target = resolve_target(
        env_profile.as_deref(),
        startup_url.as_deref(),
        config.default_profile(),
    );

    // Bootstrap runs beside the channels, never in front of them
    let bootstrap = ProfileBootstrap::new(
        target,
        switcher.clone(),
        SwitchGuard::in_dir(config.state_dir()),
    )
    .with_apply(session.apply_plan(config));
    let bootstrap = tokio::spawn(async move {
        let report = bootstrap.run().await;
        info!("Bootstrap finished: {:?}", report);
    });

    let reload_handler: Arc<dyn FlagHandler<u64>> = Arc::new(ReloadHandler::new(Arc::new(
        ConsoleReloader::new(Arc::clone(&session.notifier)),
    )));
    let reload = watch_flag(
        config.reload_flag_path(),
        IDLE,
        config.poll_interval(),
        ReloadProtocol::new(),
        reload_handler,
    );

    let switch_handler: Arc<dyn FlagHandler<String>> = Arc::new(
        ProfileSwitchHandler::new(switcher, Arc::clone(&session.notifier))
            .with_apply(session.apply_plan(config)),
    );
    let profile = watch_flag(
        config.profile_flag_path(),
        IDLE,
        config.poll_interval(),
        ProfileSwitchProtocol::new(),
        switch_handler,
    );

    println!(
        "Watching {} and {} (Ctrl-C to stop)",
        config.reload_flag_path().display(),
        config.profile_flag_path().display()
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    reload.stop().await;
    profile.stop().await;
    bootstrap.abort();
    Ok(())
}

fn to_operation(command: RunCommand) -> ToolOperation {
    match command {
        RunCommand::Config {
            settings,
            keybindings,
            tasks,
            extensions,
        } => {
            let selection = ConfigSelection {
                settings,
                keybindings,
                tasks,
                extensions,
            };
            if selection.is_empty() {
                ToolOperation::Config(ConfigSelection::all())
            } else {
                ToolOperation::Config(selection)
            }
        }
        RunCommand::Extensions { uninstall, install } => {
            ToolOperation::Extensions { uninstall, install }
        }
        RunCommand::Passwd { value, confirm } => ToolOperation::Passwd { value, confirm },
        RunCommand::RootPasswd { value, confirm } => ToolOperation::RootPasswd { value, confirm },
        RunCommand::Other(mut argv) => {
            let name = if argv.is_empty() {
                String::new()
            } else {
                argv.remove(0)
            };
            ToolOperation::Custom { name, args: argv }
        }
    }
}

pub async fn run(config: &BridgeConfig, command: RunCommand) -> anyhow::Result<()> {
    let operation = to_operation(command);
    Policy::load(&config.policy_file()).authorize(&operation)?;

    let session = Session::new(config);
    let mut lines = session.runner.log().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match lines.recv().await {
                Ok(entry) => println!("{}", entry.format_line()),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let completion = session.runner.run(&operation, &RunContext::new()).await;
    // Dropping the last log handle closes the stream once buffered lines are printed
    drop(session);
    if tokio::time::timeout(PRINTER_DRAIN, printer).await.is_err() {
        warn!("Output printer did not finish draining");
    }

    completion.into_result()?;
    Ok(())
}

pub async fn switch(config: &BridgeConfig, name: &str, apply: bool) -> anyhow::Result<()> {
    let session = Session::new(config);
    let switcher = ProfileSwitcher::new(session.capability.clone());

    let outcome = switcher.switch_to(name).await;
    if !outcome.switched {
        bail!(
            "Could not switch to profile '{}' ({} attempts failed)",
            outcome.profile,
            outcome.attempts.len()
        );
    }
    println!("Switched to '{}' ({:?})", outcome.profile, outcome.strategy);

    if apply {
        let context = match session.capability.require()?.active_profile().await? {
            Some(profile) => RunContext::new().with_profile(profile.id, profile.name),
            None => RunContext::new(),
        };
        let report = session.apply_plan(config).run(&context).await;
        if !report.all_ok() {
            bail!("Apply after switching finished with failures: {:?}", report);
        }
    }
    Ok(())
}

pub async fn restart(config: &BridgeConfig) -> anyhow::Result<()> {
    let gate = RestartGate::new(config.restart_gate(), Arc::new(LogNotifier));
    let answered = gate.request().await.context("Restart request task failed")?;
    if !answered {
        println!("Restart requested (the gate did not confirm)");
    }
    Ok(())
}

async fn write_flag(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} <- {}", path.display(), content);
    Ok(())
}

pub async fn post_reload(config: &BridgeConfig, nonce: Option<u64>) -> anyhow::Result<()> {
    let nonce = match nonce {
        Some(nonce) => nonce,
        None => u64::try_from(chrono::Utc::now().timestamp_millis())
            .context("System clock is before the epoch")?,
    };
    write_flag(
        &config.reload_flag_path(),
        &format!("{}{}", RELOAD_PREFIX, nonce),
    )
    .await
}

pub async fn post_switch(config: &BridgeConfig, name: &str) -> anyhow::Result<()> {
    let name = name.trim();
    if name.is_empty() || name.contains('\n') {
        bail!("Profile name must be a single non-empty line");
    }
    write_flag(&config.profile_flag_path(), name).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagbridge_task::Scope;

    #[test]
    fn test_config_without_flags_selects_all() {
        let op = to_operation(RunCommand::Config {
            settings: false,
            keybindings: false,
            tasks: false,
            extensions: false,
        });
        assert_eq!(op, ToolOperation::Config(ConfigSelection::all()));
    }

    #[test]
    fn test_external_subcommand_becomes_custom() {
        let op = to_operation(RunCommand::Other(vec!["doctor".into(), "--fix".into()]));
        assert_eq!(op.argv().unwrap(), vec!["doctor", "--fix"]);

        let op = to_operation(RunCommand::Extensions {
            uninstall: Scope::All,
            install: Scope::None,
        });
        assert_eq!(
            op.argv().unwrap(),
            vec!["extensions", "--uninstall", "all", "--install", "none"]
        );
    }

    #[tokio::test]
    async fn test_post_commands_write_flag_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::default().with_state_dir(dir.path().join("state"));

        post_reload(&config, Some(7)).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(config.reload_flag_path()).unwrap(),
            "RELOAD:7"
        );

        post_switch(&config, " team-default ").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(config.profile_flag_path()).unwrap(),
            "team-default"
        );
        assert!(post_switch(&config, "  ").await.is_err());
    }
}
