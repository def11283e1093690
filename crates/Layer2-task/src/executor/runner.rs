//! Process runner - runs the external tool with output streaming
//!
//! Features:
//! - Executable resolution (explicit / candidates / PATH / fallback script)
//! - Real-time stdout/stderr streaming into the `OutputLog`
//! - Exit code tracking with a user-visible failure notification
//! - Single-resolution completion (`RunHandle` future or `FnOnce` callback)
//!
//! A started process is not cancelable: dropping the `RunHandle` does not
//! kill it, the supervising task still drives it to exit.

use crate::executor::resolve::{ExecutableResolver, ResolvedCommand};
use crate::log::OutputLog;
use crate::operation::{RunContext, ToolOperation};
use flagbridge_foundation::{Error, Notifier, Result};
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// One captured output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

/// Result of a process that was actually spawned
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Operation name
    pub operation: String,
    /// Exit code (None when terminated by a signal)
    pub exit_code: Option<i32>,
    /// Captured lines in arrival order
    pub output: Vec<OutputLine>,
    /// `exit_code == Some(0)`
    pub success: bool,
}

impl ProcessResult {
    pub fn stdout(&self) -> impl Iterator<Item = &str> {
        self.lines(Stream::Stdout)
    }

    pub fn stderr(&self) -> impl Iterator<Item = &str> {
        self.lines(Stream::Stderr)
    }

    fn lines(&self, stream: Stream) -> impl Iterator<Item = &str> {
        self.output
            .iter()
            .filter(move |l| l.stream == stream)
            .map(|l| l.text.as_str())
    }
}

/// Terminal outcome of one invocation, delivered exactly once
#[derive(Debug)]
pub struct Completion {
    pub operation: String,
    pub ok: bool,
    /// `Err` when the process never ran (not found, spawn failure, invalid argv)
    pub outcome: Result<ProcessResult>,
}

impl Completion {
    fn finished(result: ProcessResult) -> Self {
        Self {
            operation: result.operation.clone(),
            ok: result.success,
            outcome: Ok(result),
        }
    }

    fn not_started(operation: impl Into<String>, error: Error) -> Self {
        Self {
            operation: operation.into(),
            ok: false,
            outcome: Err(error),
        }
    }

    /// Collapse into a `Result`, turning a non-zero exit into `ProcessFailed`
    pub fn into_result(self) -> Result<ProcessResult> {
        let result = self.outcome?;
        if result.success {
            Ok(result)
        } else {
            Err(Error::process_failed(result.operation, result.exit_code))
        }
    }
}

/// Future resolving to the `Completion` of a started invocation
pub struct RunHandle {
    operation: String,
    rx: oneshot::Receiver<Completion>,
}

impl RunHandle {
    fn resolved(completion: Completion) -> Self {
        let (tx, rx) = oneshot::channel();
        let operation = completion.operation.clone();
        let _ = tx.send(completion);
        Self { operation, rx }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Completion if already available (e.g. the tool was never found)
    pub fn try_completion(&mut self) -> Option<Completion> {
        self.rx.try_recv().ok()
    }
}

impl Future for RunHandle {
    type Output = Completion;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let polled = Pin::new(&mut self.rx).poll(cx);
        match polled {
            Poll::Ready(Ok(completion)) => Poll::Ready(completion),
            Poll::Ready(Err(_)) => Poll::Ready(Completion::not_started(
                self.operation.clone(),
                Error::Internal("process supervisor dropped before completion".to_string()),
            )),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Runs the external tool
#[derive(Clone)]
pub struct ProcessRunner {
    resolver: ExecutableResolver,
    log: Arc<OutputLog>,
    notifier: Arc<dyn Notifier>,
}

impl ProcessRunner {
    pub fn new(
        resolver: ExecutableResolver,
        log: Arc<OutputLog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            resolver,
            log,
            notifier,
        }
    }

    /// Get the output log
    pub fn log(&self) -> Arc<OutputLog> {
        Arc::clone(&self.log)
    }

    /// Start an operation; never blocks on the child process
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self, operation: &ToolOperation, context: &RunContext) -> RunHandle {
        let name = operation.name().to_string();

        let argv = match operation.argv() {
            Ok(argv) => argv,
            Err(e) => return self.fail_before_start(&name, e),
        };

        let resolved = match self.resolver.resolve() {
            Ok(resolved) => resolved,
            Err(e) => return self.fail_before_start(&name, e),
        };

        let child = match spawn(&resolved, &argv, context) {
            Ok(child) => child,
            Err(e) => {
                return self.fail_before_start(
                    &name,
                    Error::Internal(format!(
                        "failed to spawn {}: {}",
                        resolved.program.display(),
                        e
                    )),
                )
            }
        };

        self.log
            .push_system(&name, format!("Starting: {}", operation));
        debug!(
            "Spawned {} ({:?}) for {}",
            resolved.program.display(),
            resolved.source,
            name
        );

        let (tx, rx) = oneshot::channel();
        let log = Arc::clone(&self.log);
        let notifier = Arc::clone(&self.notifier);
        let operation_name = name.clone();
        tokio::spawn(async move {
            let completion = supervise(child, operation_name, log, notifier).await;
            let _ = tx.send(completion);
        });

        RunHandle {
            operation: name,
            rx,
        }
    }

    /// Start and wait for the completion
    pub async fn run(&self, operation: &ToolOperation, context: &RunContext) -> Completion {
        self.start(operation, context).await
    }

    /// Callback form: `on_complete` runs exactly once
    ///
    /// When the process cannot be started the callback runs synchronously,
    /// before this function returns, with `ok == false`.
    pub fn run_with<F>(&self, operation: &ToolOperation, context: &RunContext, on_complete: F)
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        let mut handle = self.start(operation, context);
        if let Some(completion) = handle.try_completion() {
            on_complete(completion);
            return;
        }
        tokio::spawn(async move {
            on_complete(handle.await);
        });
    }

    fn fail_before_start(&self, operation: &str, error: Error) -> RunHandle {
        warn!("{} did not start: {}", operation, error);
        self.log.push_system(operation, format!("Not started: {}", error));
        self.notifier
            .error(&format!("flagbridge: '{}' could not start: {}", operation, error));
        RunHandle::resolved(Completion::not_started(operation, error))
    }
}

fn spawn(
    resolved: &ResolvedCommand,
    argv: &[String],
    context: &RunContext,
) -> std::io::Result<Child> {
    let mut cmd = Command::new(&resolved.program);
    cmd.args(&resolved.prefix_args)
        .args(argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    // Parent environment is inherited; overlay on top
    for (key, value) in context.env_overlay() {
        cmd.env(key, value);
    }

    cmd.spawn()
}

/// Consecutive read errors tolerated on one pipe before giving up on it
const MAX_READ_ERRORS: u32 = 8;

/// Line reader over one child pipe
///
/// Lines are decoded lossily, so non-UTF-8 output never ends the stream.
/// Partially read bytes stay in `buf` when a `select!` branch is cancelled.
struct PipeLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    errors: u32,
}

impl<R: AsyncRead + Unpin> PipeLines<R> {
    fn new(pipe: R) -> Self {
        Self {
            reader: BufReader::new(pipe),
            buf: Vec::new(),
            errors: 0,
        }
    }

    /// Next line without its terminator; `None` at end of stream
    async fn next_line(&mut self) -> Option<String> {
        loop {
            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) if self.buf.is_empty() => return None,
                Ok(_) => {
                    self.errors = 0;
                    return Some(self.take_line());
                }
                Err(e) => {
                    self.errors += 1;
                    warn!("Read error on child pipe ({}): {}", self.errors, e);
                    if self.errors >= MAX_READ_ERRORS {
                        return None;
                    }
                }
            }
        }
    }

    fn take_line(&mut self) -> String {
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}

async fn next_line<R>(pipe: &mut Option<PipeLines<R>>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(lines) => lines.next_line().await,
        None => None,
    }
}

/// Streams both pipes until closed, then waits for exit
async fn supervise(
    mut child: Child,
    operation: String,
    log: Arc<OutputLog>,
    notifier: Arc<dyn Notifier>,
) -> Completion {
    let mut stdout = child.stdout.take().map(PipeLines::new);
    let mut stderr = child.stderr.take().map(PipeLines::new);
    let mut output = Vec::new();

    loop {
        tokio::select! {
            line = next_line(&mut stdout), if stdout.is_some() => match line {
                Some(text) => {
                    log.push_stdout(&operation, text.as_str());
                    output.push(OutputLine { stream: Stream::Stdout, text });
                }
                None => stdout = None,
            },
            line = next_line(&mut stderr), if stderr.is_some() => match line {
                Some(text) => {
                    log.push_stderr(&operation, text.as_str());
                    output.push(OutputLine { stream: Stream::Stderr, text });
                }
                None => stderr = None,
            },
            else => break,
        }
    }

    let exit_code = match child.wait().await {
        Ok(status) => status.code(),
        Err(e) => {
            error!("Failed to wait for {}: {}", operation, e);
            None
        }
    };
    let success = exit_code == Some(0);

    match exit_code {
        Some(0) => {
            log.push_system(&operation, "Completed successfully");
            info!("{} completed", operation);
        }
        _ => {
            let code = exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            log.push_system(&operation, format!("Exited with {}", code));
            notifier.error(&format!(
                "flagbridge: '{}' failed (exit {}). See the output log for details.",
                operation, code
            ));
        }
    }

    Completion::finished(ProcessResult {
        operation,
        exit_code,
        output,
        success,
    })
}
