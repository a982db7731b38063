// Host mutation plumbing
//
// Every external collaborator (sqlcmd, PowerShell) is reached through `CommandRunner`, so the
// steps can be exercised against a scripted runner in tests.
//
// IMPORTANT:
// - Never put secrets in argv. Secrets travel through `CommandSpec::secret_env`.
// - No timeouts and no retries: each mutation is issued exactly once and awaited to completion.

pub mod service;
pub mod windows;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use crate::utils::logging::mask_arg_for_log;

/// External programs the steps invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub sqlcmd: String,
    pub powershell: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            sqlcmd: "sqlcmd".to_string(),
            powershell: "powershell".to_string(),
        }
    }
}

/// One external command invocation.
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Environment entries carrying secret material to the child.
    pub secret_env: Vec<(String, SecretString)>,
    /// Short stable label (used in messages and by test runners).
    pub operation: &'static str,
}

impl CommandSpec {
    pub fn new(program: &str, args: Vec<String>, operation: &'static str) -> Self {
        Self {
            program: program.to_string(),
            args,
            secret_env: Vec::new(),
            operation,
        }
    }

    pub fn with_secret_env(mut self, name: &str, value: SecretString) -> Self {
        self.secret_env.push((name.to_string(), value));
        self
    }

    /// Masked rendering for messages.
    pub fn describe(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().map(|a| mask_arg_for_log(a)));
        parts.join(" ")
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("operation", &self.operation)
            .field("command", &self.describe())
            .field(
                "secret_env",
                &self.secret_env.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Most useful diagnostic line: last non-empty stderr line, else last stdout line.
    ///
    /// sqlcmd reports SQL errors on stdout, PowerShell on stderr.
    pub fn failure_detail(&self) -> String {
        let last_line = |text: &str| {
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .last()
                .map(|l| l.chars().take(300).collect::<String>())
        };
        last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .unwrap_or_else(|| "no output".to_string())
    }
}

/// Capability to execute external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, capturing stdout/stderr.
    ///
    /// Returns captured output even when the exit code is non-zero (caller decides success).
    /// `Err` means the process could not be started or awaited.
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput>;

    /// Resolve a program on this host; `None` when it is not installed.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (name, value) in &spec.secret_env {
            cmd.env(name, value.expose_secret());
        }

        let output = cmd.output().await?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
