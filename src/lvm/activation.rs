//! Logical volume activation via `lvchange`.

use tracing::info;

use crate::error::Result;
use crate::lvm::FullyQualifiedVolume;
use crate::process::{Cmd, CommandRunner};

/// Set the active flag of `volume`.
///
/// Activating an active volume (or deactivating an inactive one) is left to
/// `lvchange`; no state check happens here.
pub fn set_active(
    runner: &dyn CommandRunner,
    tool: &str,
    volume: &FullyQualifiedVolume,
    active: bool,
) -> Result<()> {
    let (flag, verb) = if active {
        ("y", "activate")
    } else {
        ("n", "deactivate")
    };

    Cmd::new(tool)
        .args(["--activate", flag])
        .arg(volume.to_string())
        .error_msg(format!("failed to {verb} logical volume '{volume}'"))
        .run_with(runner)?;

    info!(volume = %volume, active, "logical volume state changed");
    Ok(())
}
