//! Open/close lifecycle for a logical volume device.
//!
//! `open` walks Idle -> Resolved -> Activated -> Materialized:
//!
//! ```text
//! parent ──pvdisplay──▶ vg ──lvchange -ay──▶ active ──lvdisplay──▶ major:minor ──mknod──▶ node
//! ```
//!
//! Any failure after activation deactivates the volume again before the error is
//! returned, so a failed open never leaves an orphaned active volume. `close`
//! only deactivates.
//!
//! Lifecycle state lives in a caller-owned [`Session`]. Nothing here locks the
//! volume: two hosts opening the same `vg/lv` concurrently will race on
//! `lvchange`, which is not supported.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::HostConfig;
use crate::devnode;
use crate::error::{Error, Result};
use crate::lvm::{self, DeviceNumber, FullyQualifiedVolume, Sleeper};
use crate::process::CommandRunner;

/// Arguments of an `open` request.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenRequest {
    /// Device tree root the node is created under.
    pub devpath: PathBuf,
    /// Parent device name, relative to the configured `dev_root`.
    pub parent: String,
    /// Tree of the stage; accepted for protocol compatibility, not used.
    #[serde(default)]
    pub tree: Option<PathBuf>,
    #[serde(default)]
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LvmInfo {
    pub vg_name: String,
    pub lv_name: String,
}

/// Result of a successful `open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenResult {
    /// Node path relative to the device tree root.
    pub path: PathBuf,
    pub node: DeviceNumber,
    pub lvm: LvmInfo,
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    /// Open succeeded; the volume is active and its node exists.
    Materialized {
        volume: FullyQualifiedVolume,
        node: PathBuf,
    },
    /// Open failed. Any activation has already been undone.
    FailedOpen,
}

/// Per-open state, owned by whoever drives `open` and `close`.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The volume this session activated, if it is still active.
    pub fn active_volume(&self) -> Option<&FullyQualifiedVolume> {
        match &self.state {
            SessionState::Materialized { volume, .. } => Some(volume),
            _ => None,
        }
    }
}

/// Activates logical volumes and exposes them in a device tree.
pub struct LogicalVolumeDevice<'a> {
    config: &'a HostConfig,
    runner: &'a dyn CommandRunner,
    sleeper: &'a dyn Sleeper,
}

impl<'a> LogicalVolumeDevice<'a> {
    pub fn new(
        config: &'a HostConfig,
        runner: &'a dyn CommandRunner,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            config,
            runner,
            sleeper,
        }
    }

    pub fn open(&self, session: &mut Session, request: &OpenRequest) -> Result<OpenResult> {
        if session.state != SessionState::Idle {
            return Err(Error::ProtocolMisuse(
                "open called on a session that was not closed".to_string(),
            ));
        }

        let (parent, lv_name) = validate_request(request)?;
        let parent_path = self.config.dev_root.join(parent);

        match self.open_validated(&parent_path, &request.devpath, &lv_name) {
            Ok((result, volume)) => {
                session.state = SessionState::Materialized {
                    volume,
                    node: result.path.clone(),
                };
                Ok(result)
            }
            Err(err) => {
                warn!(
                    parent = %parent_path.display(),
                    lv = %lv_name,
                    error = %err,
                    "open failed"
                );
                session.state = SessionState::FailedOpen;
                Err(err)
            }
        }
    }

    fn open_validated(
        &self,
        parent_path: &Path,
        tree_root: &Path,
        lv_name: &str,
    ) -> Result<(OpenResult, FullyQualifiedVolume)> {
        let tools = &self.config.tools;

        let vg_name = lvm::resolve_volume_group(
            self.runner,
            &tools.pvdisplay,
            parent_path,
            self.config.resolve_attempts,
            self.sleeper,
        )?;

        let volume = FullyQualifiedVolume::new(vg_name, lv_name);
        lvm::set_active(self.runner, &tools.lvchange, &volume, true)?;

        let result = self.with_activation(&volume, || {
            let node = lvm::device_numbers(
                self.runner,
                &tools.lvdisplay,
                &volume.vg_name,
                &volume.lv_name,
            )?;
            let path = devnode::materialize(tree_root, &volume.vg_name, &volume.lv_name, node)?;
            Ok(OpenResult {
                path,
                node,
                lvm: LvmInfo {
                    vg_name: volume.vg_name.clone(),
                    lv_name: volume.lv_name.clone(),
                },
            })
        })?;

        info!(volume = %volume, path = %result.path.display(), "logical volume opened");
        Ok((result, volume))
    }

    /// Run `f` with `volume` active; deactivate it again if `f` fails.
    fn with_activation<T>(
        &self,
        volume: &FullyQualifiedVolume,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        match f() {
            Ok(value) => Ok(value),
            Err(cause) => {
                warn!(volume = %volume, error = %cause, "deactivating after failed open");
                let lvchange = &self.config.tools.lvchange;
                let teardown = lvm::set_active(self.runner, lvchange, volume, false)
                    .err()
                    .map(Box::new);
                Err(Error::PartialActivation {
                    volume: volume.to_string(),
                    cause: Box::new(cause),
                    teardown,
                })
            }
        }
    }

    /// Deactivate the session's volume. A session without an active volume
    /// closes as a no-op.
    ///
    /// If deactivation fails the session keeps the volume so close can be retried.
    pub fn close(&self, session: &mut Session) -> Result<()> {
        let SessionState::Materialized { volume, node } = std::mem::take(&mut session.state) else {
            return Ok(());
        };

        let lvchange = &self.config.tools.lvchange;
        if let Err(err) = lvm::set_active(self.runner, lvchange, &volume, false) {
            session.state = SessionState::Materialized { volume, node };
            return Err(err);
        }

        info!(volume = %volume, "logical volume closed");
        Ok(())
    }
}

fn validate_request(request: &OpenRequest) -> Result<(&Path, String)> {
    let parent = Path::new(&request.parent);
    if request.parent.is_empty() || parent.is_absolute() {
        return Err(Error::ProtocolMisuse(format!(
            "parent must be a relative device name, got '{}'",
            request.parent
        )));
    }
    if parent
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(Error::ProtocolMisuse(format!(
            "parent '{}' must not contain '.' or '..' components",
            request.parent
        )));
    }

    let lv_name = request
        .options
        .get("volume")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            Error::ProtocolMisuse("options.volume is required and must be a string".to_string())
        })?;
    devnode::validate_component("options.volume", lv_name)?;

    Ok((parent, lv_name.to_string()))
}
