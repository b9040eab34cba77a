//! Host command execution.
//!
//! [`Cmd`] is a small builder for a program invocation. Running it goes through a
//! [`CommandRunner`], so the LVM helpers can be driven against scripted output in
//! tests while [`HostRunner`] spawns the real tools.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// A host program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    error_msg: Option<String>,
    allow_fail: bool,
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdResult {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr, trimmed. Used for diagnostics.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{stdout}\n{stderr}"),
        }
    }
}

/// Executes a [`Cmd`] and captures its output.
pub trait CommandRunner {
    fn run(&self, cmd: &Cmd) -> Result<CmdResult>;
}

/// Runs commands on the host with `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostRunner;

impl CommandRunner for HostRunner {
    fn run(&self, cmd: &Cmd) -> Result<CmdResult> {
        debug!(command = %cmd, "running host command");
        let output = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                program: cmd.program.clone(),
                source,
            })?;

        Ok(CmdResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            error_msg: None,
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    /// Message used as the error headline when the command exits non-zero.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// Hand back non-zero exits to the caller instead of failing.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn run(&self) -> Result<CmdResult> {
        self.run_with(&HostRunner)
    }

    pub fn run_with(&self, runner: &dyn CommandRunner) -> Result<CmdResult> {
        let result = runner.run(self)?;
        if !self.allow_fail && !result.success() {
            return Err(Error::Tool {
                what: self
                    .error_msg
                    .clone()
                    .unwrap_or_else(|| format!("{} failed", self.program)),
                command: self.to_string(),
                status: result.code,
                output: result.combined(),
            });
        }
        Ok(result)
    }
}

impl std::fmt::Display for Cmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_display_joins_program_and_args() {
        let cmd = Cmd::new("lvchange")
            .args(["--activate", "y"])
            .arg_path(Path::new("vg/lv"));
        assert_eq!(cmd.to_string(), "lvchange --activate y vg/lv");
    }

    #[test]
    fn test_combined_output() {
        let result = CmdResult {
            code: Some(1),
            stdout: "  out \n".into(),
            stderr: "err\n".into(),
        };
        assert_eq!(result.combined(), "out\nerr");

        let only_err = CmdResult {
            code: Some(1),
            stdout: "\n".into(),
            stderr: " err".into(),
        };
        assert_eq!(only_err.combined(), "err");
    }

    #[test]
    fn test_non_zero_exit_is_tool_error() {
        let runner = ScriptedRunner::new();
        runner.push("false", 3, "nope");

        let err = Cmd::new("false")
            .error_msg("false failed on purpose")
            .run_with(&runner)
            .unwrap_err();
        match err {
            Error::Tool {
                what,
                status,
                output,
                ..
            } => {
                assert_eq!(what, "false failed on purpose");
                assert_eq!(status, Some(3));
                assert_eq!(output, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_allow_fail_returns_result() {
        let runner = ScriptedRunner::new();
        runner.push("false", 5, "");

        let result = Cmd::new("false").allow_fail().run_with(&runner).unwrap();
        assert!(!result.success());
        assert_eq!(result.code, Some(5));
    }

    #[test]
    fn test_host_runner_captures_stdout() {
        let result = Cmd::new("echo").arg("253;0").run().unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "253;0");
    }

    #[test]
    fn test_host_runner_missing_program() {
        let err = Cmd::new("definitely_not_a_real_command_12345")
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
