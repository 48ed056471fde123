//! Device access traits
//!
//! The engine never talks to the OS directly. A backend provides a
//! [`DeviceOpener`] that turns a resolved device path into an open handle
//! implementing [`EraseDevice`]. Images come from an [`ImageOpener`], which
//! is the filesystem outside of tests. Errors are plain `io::Error`s so the
//! backend's raw OS codes reach the caller unchanged.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// An open, block-erasable device
///
/// Programming goes through the [`Write`] supertrait and always starts at the
/// handle's current offset.
pub trait EraseDevice: Write {
    /// Total device size in bytes
    fn capacity(&mut self) -> io::Result<u64>;

    /// Erase `len` bytes starting at `offset`
    fn erase(&mut self, offset: u64, len: u64) -> io::Result<()>;
}

/// Opens devices by path for read/write access
pub trait DeviceOpener {
    /// Handle type produced by this opener
    type Device: EraseDevice;

    /// Open the device at `path`
    fn open(&mut self, path: &Path) -> io::Result<Self::Device>;
}

/// Opens the image to be written
///
/// Opening and sizing are separate steps so each failure is reported on its
/// own. The size is taken once and drives the progress percentage.
pub trait ImageOpener {
    /// Readable image handle
    type Image: Read;

    /// Open the image at `path` for reading
    fn open(&mut self, path: &Path) -> io::Result<Self::Image>;

    /// Size of an opened image in bytes
    fn size(&mut self, image: &Self::Image) -> io::Result<u64>;
}

/// Reads images from the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileImageOpener;

impl ImageOpener for FileImageOpener {
    type Image = File;

    fn open(&mut self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn size(&mut self, image: &File) -> io::Result<u64> {
        Ok(image.metadata()?.len())
    }
}
