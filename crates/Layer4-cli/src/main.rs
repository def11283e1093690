//! flagbridge CLI - Main entry point

mod commands;
mod host;

use clap::{Parser, Subcommand};
use flagbridge_foundation::BridgeConfig;
use flagbridge_task::Scope;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// flagbridge - filesystem mailbox between a provisioning tool and an editor
#[derive(Parser, Debug)]
#[command(name = "flagbridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bootstrap the target profile, then watch both flag files until Ctrl-C
    Watch,
    /// Run one operation of the external tool
    Run {
        #[command(subcommand)]
        operation: RunCommand,
    },
    /// Switch to a profile once
    Switch {
        name: String,
        /// Skip the config/extensions apply after switching
        #[arg(long)]
        no_apply: bool,
    },
    /// Ask the host environment to restart
    Restart,
    /// Post a reload request into the reload flag file
    PostReload {
        /// Defaults to the current time in milliseconds
        nonce: Option<u64>,
    },
    /// Post a profile name into the profile-switch flag file
    PostSwitch { name: String },
}

#[derive(Subcommand, Debug)]
pub(crate) enum RunCommand {
    /// Sync configuration files (all of them when no flag is given)
    Config {
        #[arg(long)]
        settings: bool,
        #[arg(long)]
        keybindings: bool,
        #[arg(long)]
        tasks: bool,
        #[arg(long)]
        extensions: bool,
    },
    /// Reconcile installed extensions
    Extensions {
        #[arg(long, default_value = "none")]
        uninstall: Scope,
        #[arg(long, default_value = "missing")]
        install: Scope,
    },
    /// Set the user password
    Passwd { value: String, confirm: String },
    /// Set the root password (requires policy)
    RootPasswd { value: String, confirm: String },
    /// Any other tool operation, passed through as-is
    #[command(external_subcommand)]
    Other(Vec<String>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config = BridgeConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}", e);
        let mut config = BridgeConfig::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    });

    match args.command {
        Command::Watch => commands::watch(&config).await,
        Command::Run { operation } => commands::run(&config, operation).await,
        Command::Switch { name, no_apply } => commands::switch(&config, &name, !no_apply).await,
        Command::Restart => commands::restart(&config).await,
        Command::PostReload { nonce } => commands::post_reload(&config, nonce).await,
        Command::PostSwitch { name } => commands::post_switch(&config, &name).await,
    }
}
