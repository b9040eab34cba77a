//! Preflight checks for the LVM2 host tools.
//!
//! Run before serving requests so a missing `lvchange` shows up as one clear
//! message instead of a spawn failure in the middle of an open.
//!
//! # Example
//!
//! ```rust,no_run
//! use lvm_device_host::config::ToolConfig;
//! use lvm_device_host::preflight::check_lvm_tools;
//!
//! if let Err(e) = check_lvm_tools(&ToolConfig::default()) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

use crate::config::ToolConfig;

/// Check if a command exists on the host system.
///
/// Absolute and relative paths are checked directly, bare names are looked up
/// in `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Check that specific tools are available.
///
/// # Arguments
///
/// * `tools` - Slice of (command, package) tuples
///
/// # Returns
///
/// * `Ok(())` if all tools are found
/// * `Err` with list of missing tools and their packages
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check that the configured `pvdisplay`, `lvchange` and `lvdisplay` exist.
pub fn check_lvm_tools(tools: &ToolConfig) -> Result<()> {
    check_required_tools(&tools.required())
}
