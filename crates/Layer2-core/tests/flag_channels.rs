//! End-to-end flag channel behavior against a scripted host

mod common;

use async_trait::async_trait;
use common::FakeHost;
use flagbridge_core::{
    watch, ArgumentForm, FlagChannel, FlagHandler, PollOutcome, ProfileCapability, ProfileCommand,
    ProfileSwitchHandler, ProfileSwitchProtocol, ProfileSwitcher, ReloadHandler, ReloadProtocol,
    WindowReloader, IDLE,
};
use flagbridge_foundation::{MemoryNotifier, NotifyLevel, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn switch_channel(
    path: std::path::PathBuf,
    host: Arc<FakeHost>,
    notifier: Arc<MemoryNotifier>,
) -> FlagChannel<ProfileSwitchProtocol> {
    let switcher = ProfileSwitcher::new(ProfileCapability::Supported(host));
    let handler: Arc<dyn FlagHandler<String>> =
        Arc::new(ProfileSwitchHandler::new(switcher, notifier));
    FlagChannel::new(path, ProfileSwitchProtocol::new(), handler)
}

#[tokio::test]
async fn test_failed_switch_still_acks_and_warns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profile.flag");
    let host = Arc::new(FakeHost::rejecting());
    let notifier = Arc::new(MemoryNotifier::new());
    let channel = switch_channel(path.clone(), host.clone(), notifier.clone());

    channel.setup().await.unwrap();
    std::fs::write(&path, "team-default\n").unwrap();

    let outcome = channel.poll_once().await;
    assert_eq!(
        outcome,
        PollOutcome::Honored {
            ack: "ACK:team-default".to_string()
        }
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "ACK:team-default");

    assert_eq!(
        host.commands(),
        vec![
            ProfileCommand::Switch,
            ProfileCommand::Switch,
            ProfileCommand::CreateAndSwitch,
            ProfileCommand::CreateAndSwitch,
            ProfileCommand::Create,
            ProfileCommand::Create,
        ]
    );
    assert!(host.calls.lock().iter().all(|(_, _, name)| name == "team-default"));
    assert_eq!(notifier.count(NotifyLevel::Warning), 1);
    assert_eq!(notifier.count(NotifyLevel::Info), 0);

    // The echoed ACK is inert
    assert_eq!(channel.poll_once().await, PollOutcome::Idle);
    assert_eq!(host.calls.lock().len(), 6);
}

#[tokio::test]
async fn test_switch_stops_at_first_success() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profile.flag");
    let host = Arc::new(FakeHost::new(vec![(
        ProfileCommand::CreateAndSwitch,
        ArgumentForm::Named,
    )]));
    let notifier = Arc::new(MemoryNotifier::new());
    let channel = switch_channel(path.clone(), host.clone(), notifier.clone());

    channel.setup().await.unwrap();
    std::fs::write(&path, "team-default").unwrap();
    channel.poll_once().await;

    assert_eq!(
        host.commands(),
        vec![
            ProfileCommand::Switch,
            ProfileCommand::Switch,
            ProfileCommand::CreateAndSwitch,
        ]
    );
    assert_eq!(notifier.count(NotifyLevel::Info), 1);
    assert_eq!(notifier.count(NotifyLevel::Warning), 0);
}

#[tokio::test]
async fn test_same_name_rewritten_is_not_reswitched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profile.flag");
    let host = Arc::new(FakeHost::new(vec![(
        ProfileCommand::Switch,
        ArgumentForm::Named,
    )]));
    let notifier = Arc::new(MemoryNotifier::new());
    let channel = switch_channel(path.clone(), host.clone(), notifier);

    channel.setup().await.unwrap();
    std::fs::write(&path, "team-default").unwrap();
    channel.poll_once().await;
    std::fs::write(&path, "  team-default  ").unwrap();
    assert_eq!(channel.poll_once().await, PollOutcome::Duplicate);
    assert_eq!(host.switch_count(), 1);

    std::fs::write(&path, "other").unwrap();
    channel.poll_once().await;
    assert_eq!(host.switch_count(), 2);
}

#[derive(Default)]
struct CountingReloader {
    nonces: Mutex<Vec<u64>>,
}

#[async_trait]
impl WindowReloader for CountingReloader {
    async fn reload(&self, nonce: u64) -> Result<()> {
        self.nonces.lock().push(nonce);
        Ok(())
    }
}

async fn wait_for_content(path: &std::path::Path, expected: &str) {
    for _ in 0..100 {
        if std::fs::read_to_string(path).map(|c| c == expected).unwrap_or(false) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never became {:?}", path.display(), expected);
}

#[tokio::test]
async fn test_both_channels_run_independently() {
    let dir = tempdir().unwrap();
    let reload_path = dir.path().join("state/reload.flag");
    let profile_path = dir.path().join("state/profile.flag");

    let reloader = Arc::new(CountingReloader::default());
    let reload_handler: Arc<dyn FlagHandler<u64>> =
        Arc::new(ReloadHandler::new(reloader.clone()));
    let reload = watch(
        &reload_path,
        IDLE,
        Duration::from_millis(20),
        ReloadProtocol::new(),
        reload_handler,
    );

    let host = Arc::new(FakeHost::new(vec![(
        ProfileCommand::Switch,
        ArgumentForm::Structured,
    )]));
    let switch_handler: Arc<dyn FlagHandler<String>> = Arc::new(ProfileSwitchHandler::new(
        ProfileSwitcher::new(ProfileCapability::Supported(host.clone())),
        Arc::new(MemoryNotifier::new()),
    ));
    let profile = watch(
        &profile_path,
        IDLE,
        Duration::from_millis(20),
        ProfileSwitchProtocol::new(),
        switch_handler,
    );

    wait_for_content(&reload_path, IDLE).await;
    wait_for_content(&profile_path, IDLE).await;

    std::fs::write(&reload_path, "RELOAD:5").unwrap();
    std::fs::write(&profile_path, "team-default").unwrap();
    wait_for_content(&reload_path, "ACK:5").await;
    wait_for_content(&profile_path, "ACK:team-default").await;

    // Duplicate and out-of-order nonces are ignored
    std::fs::write(&reload_path, "RELOAD:5").unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    std::fs::write(&reload_path, "RELOAD:3").unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    std::fs::write(&reload_path, "RELOAD:8").unwrap();
    wait_for_content(&reload_path, "ACK:8").await;

    reload.stop().await;
    profile.stop().await;

    assert_eq!(*reloader.nonces.lock(), vec![5, 8]);
    assert_eq!(host.switch_count(), 2);
}
