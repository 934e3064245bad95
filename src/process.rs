//! Blocking execution of external programs.
//!
//! [`ProcessRunner`] is the seam the exporter uses to reach the dia binary;
//! tests substitute a fake that records invocations and writes images itself.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::{DiaError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `-1` if the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external programs on behalf of the exporter.
pub trait ProcessRunner: Send + Sync {
    /// Run `program` to completion, capturing stdout and stderr.
    ///
    /// With a `timeout`, a process still running at the deadline is killed
    /// and [`DiaError::Timeout`] is returned.
    fn run(&self, program: &Path, args: &[String], timeout: Option<Duration>)
        -> Result<ProcessOutput>;

    /// Start `program` without waiting for it to exit.
    fn spawn(&self, program: &Path, args: &[String]) -> Result<()>;
}

/// [`ProcessRunner`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub const fn new() -> Self {
        Self
    }
}

fn start_failure(program: &Path, e: &std::io::Error) -> DiaError {
    DiaError::Export {
        tool: program.display().to_string(),
        detail: format!("failed to start: {e}"),
    }
}

fn timed_out(program: &Path, limit: Duration) -> DiaError {
    DiaError::Timeout {
        tool: program.display().to_string(),
        timeout: limit,
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Read `stream` to the end on its own thread and send the text to `tx`.
fn drain<R: Read + Send + 'static>(stream: Option<R>, kind: Stream, tx: Sender<(Stream, String)>) {
    if let Some(mut s) = stream {
        thread::spawn(move || {
            let mut buf = Vec::new();
            // A read error leaves whatever was captured so far.
            let _ = s.read_to_end(&mut buf);
            let _ = tx.send((kind, String::from_utf8_lossy(&buf).into_owned()));
        });
    }
}

/// Wait for the child to exit, polling until `deadline`.
///
/// Returns `None` if the deadline passed first.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return Ok(Some(child.wait()?));
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Collect stdout and stderr once every reader has hung up.
///
/// Descendants of the child can inherit its pipes and keep them open after
/// the child exits, so the wait is bounded by the same deadline. Returns
/// `None` if the deadline passed first.
fn gather(rx: &Receiver<(Stream, String)>, deadline: Option<Instant>) -> Option<(String, String)> {
    let (mut stdout, mut stderr) = (String::new(), String::new());
    loop {
        let received = match deadline {
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        };
        match received {
            Ok((Stream::Stdout, text)) => stdout = text,
            Ok((Stream::Stderr, text)) => stderr = text,
            Err(RecvTimeoutError::Disconnected) => return Some((stdout, stderr)),
            Err(RecvTimeoutError::Timeout) => return None,
        }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput> {
        debug!(program = %program.display(), ?args, ?timeout, "Running process");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| start_failure(program, &e))?;

        // Both pipes are drained concurrently so a chatty child cannot block
        // on a full pipe while we wait on it.
        let (tx, rx) = mpsc::channel();
        drain(child.stdout.take(), Stream::Stdout, tx.clone());
        drain(child.stderr.take(), Stream::Stderr, tx);

        let deadline = timeout.map(|limit| Instant::now() + limit);
        let finished = match wait_until(&mut child, deadline)? {
            Some(status) => gather(&rx, deadline).map(|streams| (status, streams)),
            None => None,
        };

        let Some((status, (stdout, stderr))) = finished else {
            let limit = timeout.unwrap_or_default();
            warn!(program = %program.display(), ?limit, "Process timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(timed_out(program, limit));
        };

        let output = ProcessOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        };
        trace!(
            exit_code = output.exit_code,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "Process finished"
        );
        Ok(output)
    }

    /// The child is reaped by a background thread once it exits.
    fn spawn(&self, program: &Path, args: &[String]) -> Result<()> {
        debug!(program = %program.display(), ?args, "Spawning detached process");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| start_failure(program, &e))?;

        let program = program.to_path_buf();
        thread::spawn(move || match child.wait() {
            Ok(status) => debug!(program = %program.display(), ?status, "Detached process exited"),
            Err(e) => warn!(program = %program.display(), error = %e, "Failed to reap detached process"),
        });
        Ok(())
    }
}
