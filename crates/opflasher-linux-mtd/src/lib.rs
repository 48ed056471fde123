//! opflasher-linux-mtd - Linux MTD (Memory Technology Device) backend
//!
//! MTD partitions are exposed as `/dev/mtdN` character devices. This crate
//! opens them for the flash engine, answers capacity queries with the
//! `MEMGETINFO` ioctl and erases with `MEMERASE`. Programming is a plain
//! sequential write to the device file.
//!
//! # Example
//!
//! ```ignore
//! use opflasher_core::{FlashConfig, Flasher};
//! use opflasher_linux_mtd::LinuxMtdOpener;
//!
//! let mut flasher = Flasher::new(LinuxMtdOpener, FlashConfig::default());
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with MTD support (`CONFIG_MTD`, `CONFIG_MTD_CHAR`)
//! - Read/write access to `/dev/mtdN` (usually root)
//!
//! # Device Discovery
//!
//! ```bash
//! cat /proc/mtd
//! cat /sys/class/mtd/mtd0/name
//! cat /sys/class/mtd/mtd0/size
//! cat /sys/class/mtd/mtd0/erasesize
//! ```

pub mod device;
pub mod error;
pub mod sysfs;

// Re-exports
pub use device::{LinuxMtdOpener, MtdDevice, MtdFlags, MtdInfo, MtdType};
pub use error::{LinuxMtdError, Result};
pub use sysfs::{read_sysfs_info, SysfsInfo, MTD_SYSFS_ROOT};
