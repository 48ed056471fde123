//! opflasher-core - Erase-then-program flashing engine
//!
//! This crate writes a raw firmware image onto a named, block-erasable
//! storage device. A job resolves a logical target name to a device node,
//! erases the whole device, then copies the image in fixed-size chunks while
//! reporting integer percent progress.
//!
//! The engine is transport agnostic. Device access goes through the
//! [`device::DeviceOpener`] and [`device::EraseDevice`] traits, and progress
//! plus the terminal status go to a [`notify::NotificationSink`].
//!
//! # Example
//!
//! ```ignore
//! use opflasher_core::{FlashConfig, FlashRequest, Flasher};
//! use opflasher_linux_mtd::LinuxMtdOpener;
//!
//! let mut flasher = Flasher::new(LinuxMtdOpener, FlashConfig::default());
//! let request = FlashRequest::new("kernel", "/tmp/image.bin", "session-1");
//! let report = flasher.flash(&request, &mut my_sink)?;
//! println!("Wrote {} bytes", report.bytes_written);
//! ```

#![warn(rust_2018_idioms)]

pub mod config;
pub mod copy;
pub mod device;
pub mod erase;
pub mod error;
pub mod flash;
pub mod notify;
pub mod target;

pub use config::{parse_options, ConfigError, FlashConfig, ShortSourcePolicy};
pub use device::{DeviceOpener, EraseDevice, FileImageOpener, ImageOpener};
pub use error::{CopyError, EraseError, FlashError, Result, UnknownTarget};
pub use flash::{FlashReport, FlashRequest, FlashState, Flasher};
pub use notify::{NotificationSink, NullSink};
pub use target::{resolve, FlashTarget};
