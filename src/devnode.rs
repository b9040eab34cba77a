//! Block device nodes inside a synthetic `/dev` tree.
//!
//! The build stage sees its own device directory rather than the host's `/dev`,
//! so an activated logical volume has to be made visible there by hand:
//! `<root>/<vg>/<lv>` is created as a block special file with the numbers the
//! kernel assigned to the volume.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use nix::sys::stat::{makedev, mknod, Mode, SFlag};
use tracing::info;

use crate::error::{Error, Result};
use crate::lvm::DeviceNumber;

/// Mode of created nodes: read/write for everyone.
pub const NODE_MODE: u32 = 0o666;

/// Check that `name` is usable as a single path component under the tree root.
pub fn validate_component(field: &str, name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Ok(()),
        _ => Err(Error::ProtocolMisuse(format!(
            "{field} must be a plain name, got '{name}'"
        ))),
    }
}

/// Create the node for `vg_name/lv_name` under `tree_root`.
///
/// The group directory may already exist; the node itself must not. Returns the
/// node path relative to `tree_root`.
pub fn materialize(
    tree_root: &Path,
    vg_name: &str,
    lv_name: &str,
    number: DeviceNumber,
) -> Result<PathBuf> {
    validate_component("volume group name", vg_name)?;
    validate_component("logical volume name", lv_name)?;

    let group_dir = tree_root.join(vg_name);
    fs::create_dir_all(&group_dir)
        .map_err(|e| Error::io("creating volume group directory", &group_dir, e))?;

    let node = group_dir.join(lv_name);
    if fs::symlink_metadata(&node).is_ok() {
        return Err(Error::io(
            "refusing to replace existing device node",
            &node,
            io::Error::from(io::ErrorKind::AlreadyExists),
        ));
    }

    mknod(
        &node,
        SFlag::S_IFBLK,
        Mode::from_bits_truncate(NODE_MODE),
        makedev(number.major, number.minor),
    )
    .map_err(|errno| Error::io("creating device node", &node, io::Error::from(errno)))?;

    // mknod is subject to the umask
    fs::set_permissions(&node, fs::Permissions::from_mode(NODE_MODE))
        .map_err(|e| Error::io("setting device node permissions", &node, e))?;

    info!(
        node = %node.display(),
        major = number.major,
        minor = number.minor,
        "created device node"
    );
    Ok(Path::new(vg_name).join(lv_name))
}
