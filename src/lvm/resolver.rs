//! Volume group lookup for a physical device.
//!
//! Right after a loop device or partition appears, LVM's metadata scan may not
//! see the physical volume yet. `pvdisplay` then exits with status 5, and some
//! versions instead exit 0 with blank output. Both are retried on a linear
//! schedule: attempt `n` (from 0) is followed by an `n` second pause.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::lvm::Sleeper;
use crate::process::{Cmd, CommandRunner};

/// `pvdisplay` exit status when the physical volume is not (yet) known.
pub const PV_NOT_FOUND_STATUS: i32 = 5;

/// Default number of `pvdisplay` attempts.
pub const DEFAULT_RESOLVE_ATTEMPTS: u32 = 10;

fn pvdisplay(tool: &str, device: &Path) -> Cmd {
    Cmd::new(tool)
        .args(["-C", "--noheadings", "-o", "vg_name"])
        .arg_path(device)
        .allow_fail()
}

/// Resolve the volume group that contains `device`.
pub fn resolve_volume_group(
    runner: &dyn CommandRunner,
    tool: &str,
    device: &Path,
    attempts: u32,
    sleeper: &dyn Sleeper,
) -> Result<String> {
    let cmd = pvdisplay(tool, device);
    let mut last_output = String::new();

    for attempt in 0..attempts {
        let result = cmd.run_with(runner)?;

        if result.success() {
            let vg_name = result.stdout.trim();
            if !vg_name.is_empty() {
                info!(device = %device.display(), vg = vg_name, attempt, "resolved volume group");
                return Ok(vg_name.to_string());
            }
            debug!(device = %device.display(), attempt, "pvdisplay succeeded with blank output");
        } else if result.code == Some(PV_NOT_FOUND_STATUS) {
            debug!(device = %device.display(), attempt, "physical volume not visible yet");
        } else {
            return Err(Error::Tool {
                what: format!("failed to query volume group of '{}'", device.display()),
                command: cmd.to_string(),
                status: result.code,
                output: result.combined(),
            });
        }

        last_output = result.combined();
        sleeper.sleep(Duration::from_secs(u64::from(attempt)));
    }

    warn!(device = %device.display(), attempts, "giving up on volume group lookup");
    Err(Error::ParentNotFound {
        device: device.to_path_buf(),
        attempts,
        output: last_output,
    })
}
