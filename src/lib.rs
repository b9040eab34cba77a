//! Logical volume device host for image build stages.
//!
//! A build stage that works on an LVM disk image needs the logical volumes on
//! that image activated and visible inside its own device tree. This crate
//! handles one volume per session:
//!
//! - **Resolver** - finds the volume group of the parent device, riding out the
//!   window where LVM has not scanned a fresh loop device yet
//! - **Activation** - `lvchange --activate y|n` on `vg/lv`
//! - **Number lookup** - kernel major/minor of the active volume
//! - **Device nodes** - `mknod` of `<vg>/<lv>` under the stage's device tree
//!
//! # Architecture
//!
//! ```text
//! lvm-device-host (bin)
//!     │  JSON lines on stdin/stdout
//!     ▼
//! device::LogicalVolumeDevice ── Session (caller-owned)
//!     │
//!     ├── lvm::resolver    (pvdisplay)
//!     ├── lvm::activation  (lvchange)
//!     ├── lvm::numbers     (lvdisplay)
//!     └── devnode          (mknod)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use lvm_device_host::{HostConfig, HostRunner, LogicalVolumeDevice, OpenRequest, Session, ThreadSleeper};
//!
//! let config = HostConfig::default();
//! let device = LogicalVolumeDevice::new(&config, &HostRunner, &ThreadSleeper);
//! let mut session = Session::new();
//!
//! let request: OpenRequest = serde_json::from_str(
//!     r#"{"devpath": "/run/build/dev", "parent": "loop0", "options": {"volume": "root"}}"#,
//! )?;
//! let opened = device.open(&mut session, &request)?;
//! println!("node at {}", opened.path.display());
//! device.close(&mut session)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod device;
pub mod devnode;
pub mod error;
pub mod lvm;
pub mod preflight;
pub mod process;

#[cfg(test)]
mod testing;

pub use config::{HostConfig, ToolConfig};
pub use device::{LogicalVolumeDevice, OpenRequest, OpenResult, Session, SessionState};
pub use error::{Error, Result};
pub use lvm::{DeviceNumber, FullyQualifiedVolume, Sleeper, ThreadSleeper};
pub use process::{Cmd, CmdResult, CommandRunner, HostRunner};
