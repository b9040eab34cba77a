//! LVM2 command wrappers.
//!
//! Three host tools are involved, each wrapped in its own module:
//!
//! - [`resolver`] - `pvdisplay`, maps a physical device to its volume group
//! - [`activation`] - `lvchange`, toggles a logical volume's active flag
//! - [`numbers`] - `lvdisplay`, reads the kernel major/minor of an active volume
//!
//! The volume group itself is never created or modified here.

pub mod activation;
pub mod numbers;
pub mod resolver;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use activation::set_active;
pub use numbers::device_numbers;
pub use resolver::resolve_volume_group;

/// A logical volume addressed by its group, rendered as `group/volume`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullyQualifiedVolume {
    pub vg_name: String,
    pub lv_name: String,
}

impl FullyQualifiedVolume {
    pub fn new(vg_name: impl Into<String>, lv_name: impl Into<String>) -> Self {
        Self {
            vg_name: vg_name.into(),
            lv_name: lv_name.into(),
        }
    }
}

impl fmt::Display for FullyQualifiedVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vg_name, self.lv_name)
    }
}

/// Kernel block device number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceNumber {
    pub major: u64,
    pub minor: u64,
}

/// Blocking pause between resolver attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_qualified_display() {
        let volume = FullyQualifiedVolume::new("vgroot", "root");
        assert_eq!(volume.to_string(), "vgroot/root");
    }

    #[test]
    fn test_device_number_serializes_as_node() {
        let json = serde_json::to_value(DeviceNumber {
            major: 253,
            minor: 0,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"major": 253, "minor": 0}));
    }
}
