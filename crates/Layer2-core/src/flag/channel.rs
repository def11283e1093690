//! FlagChannel - polling mailbox over a single file
//!
//! Change notification is unreliable on bind mounts and network filesystems,
//! so the channel reads the file content on a fixed interval instead.
//!
//! Per cycle:
//! 1. skip entirely if the previous cycle is still handling a command
//! 2. read + parse; idle / ACK / malformed content is ignored silently
//! 3. `admit` records the command before the handler runs
//! 4. run the handler (errors and panics are contained)
//! 5. write `ACK:<payload>` back, whether or not the handler succeeded,
//!    unless the file no longer holds the command that was handled

use super::protocol::{FlagProtocol, IDLE};
use async_trait::async_trait;
use flagbridge_foundation::Result;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Reference polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Reacts to an admitted command
#[async_trait]
pub trait FlagHandler<C>: Send + Sync {
    async fn handle(&self, command: C) -> Result<()>;
}

/// What one poll cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A previous cycle is still in flight
    Busy,
    /// File missing or unreadable this cycle
    Unreadable,
    /// Idle marker or echoed ACK
    Idle,
    /// Content outside the grammar
    Malformed,
    /// Valid command already honored
    Duplicate,
    /// Handler ran; ACK written with this content
    Honored { ack: String },
}

/// Resets the busy flag when the cycle ends, including on early return
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One flag file + its protocol session + its handler
pub struct FlagChannel<P: FlagProtocol> {
    path: PathBuf,
    seed: String,
    interval: Duration,
    protocol: Mutex<P>,
    handler: Arc<dyn FlagHandler<P::Command>>,
    busy: AtomicBool,
}

impl<P: FlagProtocol> FlagChannel<P> {
    pub fn new(
        path: impl Into<PathBuf>,
        protocol: P,
        handler: Arc<dyn FlagHandler<P::Command>>,
    ) -> Self {
        Self {
            path: path.into(),
            seed: IDLE.to_string(),
            interval: DEFAULT_POLL_INTERVAL,
            protocol: Mutex::new(protocol),
            handler,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &'static str {
        self.protocol.lock().name()
    }

    /// Create the parent directory and seed the file if absent
    ///
    /// An existing file is left untouched.
    pub async fn setup(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        if !tokio::fs::try_exists(&self.path).await? {
            tokio::fs::write(&self.path, &self.seed).await?;
            debug!("Seeded {} with {}", self.path.display(), self.seed);
        }
        Ok(())
    }

    /// Run a single poll cycle
    pub async fn poll_once(&self) -> PollOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("{}: previous cycle still in flight, skipping", self.name());
            return PollOutcome::Busy;
        }
        let _guard = BusyGuard(&self.busy);

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                trace!("{}: cannot read {}: {}", self.name(), self.path.display(), e);
                return PollOutcome::Unreadable;
            }
        };

        let (command, ack) = {
            let mut protocol = self.protocol.lock();
            let command = match protocol.parse(&content) {
                Ok(Some(command)) => command,
                Ok(None) => return PollOutcome::Idle,
                Err(e) if e.is_silent() => {
                    trace!("{}: ignoring content: {}", protocol.name(), e);
                    return PollOutcome::Malformed;
                }
                Err(e) => {
                    warn!("{}: cannot parse content: {}", protocol.name(), e);
                    return PollOutcome::Malformed;
                }
            };
            if !protocol.admit(&command) {
                return PollOutcome::Duplicate;
            }
            let ack = protocol.ack(&command);
            (command, ack)
        };

        info!("{}: honoring {:?}", self.name(), command);

        match AssertUnwindSafe(self.handler.handle(command))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("{}: handler failed: {}", self.name(), e),
            Err(_) => warn!("{}: handler panicked", self.name()),
        }

        // A command posted while the handler ran must survive for the next cycle
        match tokio::fs::read_to_string(&self.path).await {
            Ok(current) if current.trim() == content.trim() => {}
            Ok(_) => {
                debug!("{}: content changed while handling, not writing {}", self.name(), ack);
                return PollOutcome::Honored { ack };
            }
            Err(e) => trace!("{}: cannot re-read {}: {}", self.name(), self.path.display(), e),
        }

        if let Err(e) = tokio::fs::write(&self.path, &ack).await {
            warn!(
                "{}: failed to write {} to {}: {}",
                self.name(),
                ack,
                self.path.display(),
                e
            );
        }

        PollOutcome::Honored { ack }
    }

    /// Start polling in the background
    pub fn watch(self: Arc<Self>) -> ChannelHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let channel = self;

        let task = tokio::spawn(async move {
            if let Err(e) = channel.setup().await {
                // keep polling; the file may become available later
                warn!(
                    "{}: setup of {} failed: {}",
                    channel.name(),
                    channel.path.display(),
                    e
                );
            }

            let mut ticker = tokio::time::interval(channel.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                "{}: watching {} every {:?}",
                channel.name(),
                channel.path.display(),
                channel.interval
            );

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        channel.poll_once().await;
                    }
                }
            }

            debug!("{}: stopped", channel.name());
        });

        ChannelHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Convenience form: build a channel and start watching it
pub fn watch<P: FlagProtocol>(
    path: impl Into<PathBuf>,
    seed: impl Into<String>,
    interval: Duration,
    protocol: P,
    handler: Arc<dyn FlagHandler<P::Command>>,
) -> ChannelHandle {
    Arc::new(
        FlagChannel::new(path, protocol, handler)
            .with_seed(seed)
            .with_interval(interval),
    )
    .watch()
}

/// Teardown handle for a watching channel
///
/// Dropping the handle aborts the polling task.
pub struct ChannelHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Stop polling and wait for an in-flight cycle to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
