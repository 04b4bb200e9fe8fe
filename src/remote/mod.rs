//! 远程命令执行：multipass / ssh / 本机
//!
//! Every probe in this crate is a shell snippet handed to an [`Executor`].
//! Failures never abort a verification run; [`capture`] folds them into a
//! caller-supplied default instead.

pub mod exec;

use std::fmt;

use crate::utils::Result;

pub use exec::ShellExecutor;

/// Where the probes run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local,
    Multipass { vm: String },
    Ssh { host: String, user: String, port: u16 },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local => write!(f, "local"),
            Target::Multipass { vm } => write!(f, "multipass:{}", vm),
            Target::Ssh { host, user, port } => write!(f, "ssh:{}@{}:{}", user, host, port),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub trait Executor {
    /// Run a shell snippet on the target. `Err` only when the command could
    /// not be started at all; a non-zero exit is still `Ok`.
    fn run(&self, script: &str) -> Result<CommandOutput>;
}

/// Trimmed stdout of `script`, or `default` when the command fails to
/// start, exits non-zero, or prints nothing.
pub fn capture(exec: &dyn Executor, script: &str, default: &str) -> String {
    match exec.run(script) {
        Ok(out) if out.success() => {
            let s = out.stdout.trim();
            if s.is_empty() {
                default.to_string()
            } else {
                s.to_string()
            }
        }
        Ok(out) => {
            tracing::debug!(script, code = out.code, stderr = %out.stderr.trim(), "probe failed");
            default.to_string()
        }
        Err(e) => {
            tracing::debug!(script, error = %e, "probe could not run");
            default.to_string()
        }
    }
}
