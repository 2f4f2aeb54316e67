//! External Tool Runner
//!
//! Renderers describe an [`Invocation`]; a [`CommandRunner`] executes it and
//! hands back the raw streams. [`classify`] turns those streams into success
//! or an execution error.

use std::fmt;
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;
use wait_timeout::ChildExt;

use crate::drawable::Tool;
use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Invocation {
    Argv { program: String, args: Vec<String> },
    /// Only for command lines that need shell grouping syntax.
    Shell { shell: String, command: String },
}

impl Invocation {
    pub fn argv(program: impl Into<String>, args: Vec<String>) -> Self {
        Self::Argv {
            program: program.into(),
            args,
        }
    }

    pub fn shell(shell: impl Into<String>, command: impl Into<String>) -> Self {
        Self::Shell {
            shell: shell.into(),
            command: command.into(),
        }
    }

    /// Executable that will be spawned.
    pub fn program(&self) -> &str {
        match self {
            Invocation::Argv { program, .. } => program,
            Invocation::Shell { shell, .. } => shell,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Argv { program, args } => write!(f, "{} {}", program, args.join(" ")),
            Invocation::Shell { shell, command } => write!(f, "{} -c {}", shell, command),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok() -> Self {
        Self {
            status: Some(0),
            ..Self::default()
        }
    }

    pub fn with_stderr(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stderr: stderr.into(),
            ..Self::default()
        }
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> RenderResult<ToolOutput>;
}

/// Spawns real processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> RenderResult<ToolOutput> {
        let mut cmd = match invocation {
            Invocation::Argv { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            Invocation::Shell { shell, command } => {
                let mut cmd = Command::new(shell);
                cmd.arg("-c").arg(command);
                cmd
            }
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(command = %invocation, "spawning");
        let spawn_err = |source: io::Error| RenderError::spawn(invocation.program(), source);
        let mut child = cmd.spawn().map_err(spawn_err)?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => match child.wait_timeout(limit).map_err(spawn_err)? {
                Some(status) => status,
                None => {
                    // the drain threads finish once the pipes close
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RenderError::timeout(invocation.program(), limit));
                }
            },
            None => child.wait().map_err(spawn_err)?,
        };

        Ok(ToolOutput {
            status: status.code(),
            stdout: collect(stdout).map_err(spawn_err)?,
            stderr: collect(stderr).map_err(spawn_err)?,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            pipe.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<String> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "stream drain thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// True when `stderr` is a metric value rather than a message.
///
/// Accepts one number, optionally followed by one parenthesised number:
/// `1234`, `0.25 (3.8e-06)`. `inf` counts (PSNR of identical images);
/// `nan`, empty and whitespace-only input do not.
pub fn is_numeric_metric(stderr: &str) -> bool {
    fn number(s: &str) -> bool {
        s.trim().parse::<f64>().map_or(false, |v| !v.is_nan())
    }

    let stderr = stderr.trim();
    match stderr.split_once('(') {
        Some((value, rest)) => rest
            .strip_suffix(')')
            .map_or(false, |normalized| number(value) && number(normalized)),
        None => number(stderr),
    }
}

/// Map a finished process onto success or an execution error for `label`.
pub fn classify(
    tool: Tool,
    label: &str,
    invocation: &Invocation,
    output: &ToolOutput,
) -> RenderResult<()> {
    let stderr = output.stderr.trim();
    let metric = is_numeric_metric(stderr);
    let status_ok = match output.status {
        Some(0) => true,
        // compare exits 1 when the images differ
        Some(1) => tool.reports_metric() && metric,
        _ => false,
    };

    if status_ok && (stderr.is_empty() || metric) {
        return Ok(());
    }

    let message = if !stderr.is_empty() {
        stderr.to_string()
    } else {
        match output.status {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    };
    Err(RenderError::execution(label, invocation.program(), message))
}
