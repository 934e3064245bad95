//! Fake dia runner for exporter tests.
//!
//! Parses the export arguments the way dia would, renders a PNG of a fixed
//! native size scaled per `--size`, and reports success on stderr with the
//! same line dia prints.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use diacache::error::Result;
use diacache::process::{ProcessOutput, ProcessRunner};
use tracing::debug;

use super::fixtures::write_png;

/// Native size of every diagram the fake renders.
pub const NATIVE_WIDTH: u32 = 400;
pub const NATIVE_HEIGHT: u32 = 200;

/// Noise dia prints regardless of outcome.
pub const XLIB_NOISE: &str = "Xlib:  extension \"RANDR\" missing on display \":0\".";

/// How the fake dia behaves on the next runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Render and print the success line.
    Succeed,
    /// Render but print only noise (Windows-style dia).
    SucceedQuietly,
    /// Exit with the given code without rendering.
    Exit(i32),
    /// Exit 0, print an error message, render nothing.
    ReportError(String),
    /// Exit 0 and print the success line, but write a non-PNG file.
    WriteGarbage,
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
    pub detached: bool,
}

impl Call {
    pub fn size_arg(&self) -> Option<&str> {
        self.args.iter().find_map(|a| a.strip_prefix("--size="))
    }

    pub fn export_arg(&self) -> Option<&str> {
        self.args.iter().find_map(|a| a.strip_prefix("--export="))
    }
}

/// Shared-state fake; clones observe the same calls and behavior.
#[derive(Debug, Clone)]
pub struct FakeDia {
    calls: Arc<Mutex<Vec<Call>>>,
    behavior: Arc<Mutex<Behavior>>,
    delay: Duration,
}

impl Default for FakeDia {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDia {
    #[must_use]
    pub fn new() -> Self {
        Self::with_behavior(Behavior::Succeed)
    }

    #[must_use]
    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            behavior: Arc::new(Mutex::new(behavior)),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long inside every run, to widen race windows.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Output size for a `--size` value, preserving the native aspect ratio.
#[must_use]
pub fn scaled_size(size: Option<&str>) -> (u32, u32) {
    let Some(size) = size else {
        return (NATIVE_WIDTH, NATIVE_HEIGHT);
    };
    let (w, h) = size.split_once('x').expect("size must contain 'x'");
    match (w.parse::<u32>().ok(), h.parse::<u32>().ok()) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, w * NATIVE_HEIGHT / NATIVE_WIDTH),
        (None, Some(h)) => (h * NATIVE_WIDTH / NATIVE_HEIGHT, h),
        (None, None) => panic!("empty size spec"),
    }
}

impl ProcessRunner for FakeDia {
    fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput> {
        let call = Call {
            program: program.to_path_buf(),
            args: args.to_vec(),
            timeout,
            detached: false,
        };
        debug!(?call, "Fake dia invoked");
        self.record(call.clone());

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let output = PathBuf::from(call.export_arg().expect("missing --export"));
        let input = args.last().expect("missing input").clone();
        let success = format!("{input} --> {}", output.display());

        let behavior = self.behavior.lock().unwrap().clone();
        let result = match behavior {
            Behavior::Succeed => {
                let (w, h) = scaled_size(call.size_arg());
                write_png(&output, w, h);
                ProcessOutput {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: format!("{XLIB_NOISE}\n{success}\n"),
                }
            }
            Behavior::SucceedQuietly => {
                let (w, h) = scaled_size(call.size_arg());
                write_png(&output, w, h);
                ProcessOutput {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: format!("{XLIB_NOISE}\n"),
                }
            }
            Behavior::Exit(code) => ProcessOutput {
                exit_code: code,
                stdout: String::new(),
                stderr: "dia: fatal error\n".to_string(),
            },
            Behavior::ReportError(message) => ProcessOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: format!("{XLIB_NOISE}\n{message}\n"),
            },
            Behavior::WriteGarbage => {
                std::fs::write(&output, b"definitely not a png").expect("write garbage");
                ProcessOutput {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: format!("{success}\n"),
                }
            }
        };
        Ok(result)
    }

    fn spawn(&self, program: &Path, args: &[String]) -> Result<()> {
        self.record(Call {
            program: program.to_path_buf(),
            args: args.to_vec(),
            timeout: None,
            detached: true,
        });
        Ok(())
    }
}
