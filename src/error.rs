//! Error type shared by the resolver, activation, lookup and node modules.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The request itself is unusable. Raised before any host tool runs.
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(String),

    /// The physical volume stayed invisible for the whole retry schedule.
    #[error("could not find volume group for '{}' after {attempts} attempts: {output}", .device.display())]
    ParentNotFound {
        device: PathBuf,
        attempts: u32,
        output: String,
    },

    /// A host tool could not be started at all.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A host tool exited non-zero.
    #[error("{what} (`{command}` exited with {}): {output}", status_label(.status))]
    Tool {
        what: String,
        command: String,
        status: Option<i32>,
        output: String,
    },

    /// A host tool succeeded but printed something we cannot use.
    #[error("unexpected output from `{command}` ({reason}): {output:?}")]
    MalformedOutput {
        command: String,
        reason: String,
        output: String,
    },

    #[error("{what} '{}': {source}", .path.display())]
    Io {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Opening failed after `volume` was activated. Deactivation has already been
    /// issued; `teardown` holds its error if that failed too.
    #[error("opening '{volume}' failed after activation: {cause}{}", teardown_suffix(.teardown))]
    PartialActivation {
        volume: String,
        #[source]
        cause: Box<Error>,
        teardown: Option<Box<Error>>,
    },
}

impl Error {
    pub(crate) fn io(what: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            what,
            path: path.into(),
            source,
        }
    }
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

fn teardown_suffix(teardown: &Option<Box<Error>>) -> String {
    match teardown {
        Some(err) => format!("; deactivation also failed: {err}"),
        None => String::new(),
    }
}
