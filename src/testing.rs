//! Test doubles for host commands and sleeping.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::lvm::Sleeper;
use crate::process::{Cmd, CmdResult, CommandRunner};

/// Replays queued results per program and records every invocation.
///
/// A program whose queue is empty fails to spawn, like a missing binary.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    queued: RefCell<HashMap<String, VecDeque<CmdResult>>>,
    calls: RefCell<Vec<Cmd>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, program: &str, code: i32, stdout: &str) {
        self.queued
            .borrow_mut()
            .entry(program.to_string())
            .or_default()
            .push_back(CmdResult {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: String::new(),
            });
    }

    /// Queue the same result `times` times.
    pub(crate) fn push_repeated(&self, program: &str, code: i32, stdout: &str, times: usize) {
        for _ in 0..times {
            self.push(program, code, stdout);
        }
    }

    pub(crate) fn calls(&self) -> Vec<Cmd> {
        self.calls.borrow().clone()
    }

    /// Invocations of `program`, rendered as full command lines.
    pub(crate) fn calls_to(&self, program: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|cmd| cmd.program() == program)
            .map(|cmd| cmd.to_string())
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &Cmd) -> Result<CmdResult> {
        self.calls.borrow_mut().push(cmd.clone());
        self.queued
            .borrow_mut()
            .get_mut(cmd.program())
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| Error::Spawn {
                program: cmd.program().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no scripted result"),
            })
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    delays: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.delays.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.borrow_mut().push(duration);
    }
}

pub(crate) fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}
