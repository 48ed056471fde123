//! opflasher-dummy - In-memory flash emulator for testing
//!
//! This crate provides a dummy device that emulates an MTD NOR partition in
//! memory. It's useful for testing and development without real hardware,
//! and can inject failures into the capacity query, the erase and the Nth
//! write.

use log::{debug, warn};
use opflasher_core::config::parse_size;
use opflasher_core::device::{DeviceOpener, EraseDevice};
use std::cell::RefCell;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Largest emulated device (4 GiB, the reach of 32-bit MTD erase requests)
pub const MAX_FLASH_SIZE: u64 = 1 << 32;

/// Configuration for the dummy flash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyConfig {
    /// Flash size in bytes
    pub size: usize,
    /// Fail every capacity query
    pub fail_info: bool,
    /// Fail every erase
    pub fail_erase: bool,
    /// Fail the write after this many successful writes
    pub fail_write_after: Option<usize>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            size: 16 * 1024 * 1024,
            fail_info: false,
            fail_erase: false,
            fail_write_after: None,
        }
    }
}

/// Option parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DummyError {
    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, DummyError> {
    match value {
        "1" | "yes" | "true" => Ok(true),
        "0" | "no" | "false" => Ok(false),
        _ => Err(DummyError::InvalidParameter {
            name,
            message: format!("'{}' is not a boolean", value),
        }),
    }
}

/// Parse dummy options from key-value pairs
///
/// # Supported options
/// - `size=N` - flash size, hex or decimal, `K`/`M` suffix allowed, at most
///   [`MAX_FLASH_SIZE`]
/// - `fail_info=yes|no` - fail the capacity query
/// - `fail_erase=yes|no` - fail the erase
/// - `fail_write_after=N` - fail the write after N successful writes
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig, DummyError> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "size" => {
                let size = parse_size(value).ok_or_else(|| DummyError::InvalidParameter {
                    name: "size",
                    message: format!("'{}' is not a valid size", value),
                })?;
                if size == 0 || size as u64 > MAX_FLASH_SIZE {
                    return Err(DummyError::InvalidParameter {
                        name: "size",
                        message: format!(
                            "{} is out of range (1..={} bytes)",
                            size, MAX_FLASH_SIZE
                        ),
                    });
                }
                config.size = size;
            }
            "fail_info" => config.fail_info = parse_bool("fail_info", value)?,
            "fail_erase" => config.fail_erase = parse_bool("fail_erase", value)?,
            "fail_write_after" => {
                config.fail_write_after =
                    Some(value.parse().map_err(|_| DummyError::InvalidParameter {
                        name: "fail_write_after",
                        message: format!("'{}' is not a valid count", value),
                    })?);
            }
            _ => {
                warn!("Unknown dummy option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

/// Emulated NOR flash contents and operation counters
#[derive(Debug)]
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    info_count: usize,
    erase_count: usize,
    write_count: usize,
}

impl DummyFlash {
    /// Create a new dummy flash with the given configuration
    ///
    /// Contents start as all zeroes so that a missing erase shows up.
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0x00; config.size];
        Self {
            config,
            data,
            info_count: 0,
            erase_count: 0,
            write_count: 0,
        }
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Number of capacity queries seen
    pub fn info_count(&self) -> usize {
        self.info_count
    }

    /// Number of erase commands seen
    pub fn erase_count(&self) -> usize {
        self.erase_count
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    fn program(&mut self, pos: usize, buf: &[u8]) -> io::Result<usize> {
        if self.config.fail_write_after == Some(self.write_count) {
            return Err(io::Error::new(ErrorKind::Other, "injected write failure"));
        }
        if pos >= self.data.len() {
            return Err(io::Error::new(
                ErrorKind::Other,
                "write past end of device",
            ));
        }

        let len = std::cmp::min(buf.len(), self.data.len() - pos);
        // Flash programming: can only change 1 -> 0
        for (cell, &byte) in self.data[pos..pos + len].iter_mut().zip(buf) {
            *cell &= byte;
        }
        self.write_count += 1;
        Ok(len)
    }

    fn erase(&mut self, offset: u64, len: u64) -> io::Result<()> {
        self.erase_count += 1;
        if self.config.fail_erase {
            return Err(io::Error::new(ErrorKind::Other, "injected erase failure"));
        }

        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len() as u64)
            .ok_or_else(|| io::Error::from(ErrorKind::InvalidInput))?;

        // Erase sets all bytes to 0xFF
        self.data[offset as usize..end as usize].fill(0xFF);
        Ok(())
    }
}

/// An open handle on a [`DummyFlash`]
pub struct DummyHandle {
    flash: Rc<RefCell<DummyFlash>>,
    pos: u64,
}

impl Write for DummyHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.flash.borrow_mut().program(self.pos as usize, buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for DummyHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let flash = self.flash.borrow();
        let data = flash.data();
        let start = std::cmp::min(self.pos as usize, data.len());
        let n = std::cmp::min(buf.len(), data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for DummyHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let size = self.flash.borrow().data().len() as i64;
        let new = match pos {
            SeekFrom::Start(off) => off as i64,
            SeekFrom::End(off) => size + off,
            SeekFrom::Current(off) => self.pos as i64 + off,
        };
        if new < 0 {
            return Err(io::Error::from(ErrorKind::InvalidInput));
        }
        self.pos = new as u64;
        Ok(self.pos)
    }
}

impl EraseDevice for DummyHandle {
    fn capacity(&mut self) -> io::Result<u64> {
        let mut flash = self.flash.borrow_mut();
        flash.info_count += 1;
        if flash.config.fail_info {
            return Err(io::Error::new(
                ErrorKind::Unsupported,
                "capacity query not supported",
            ));
        }
        Ok(flash.data.len() as u64)
    }

    fn erase(&mut self, offset: u64, len: u64) -> io::Result<()> {
        debug!("dummy erase: offset={:#x} len={:#x}", offset, len);
        self.flash.borrow_mut().erase(offset, len)
    }
}

/// Hands out handles on a single shared [`DummyFlash`]
///
/// Every path opens the same emulated device; the paths are recorded.
pub struct DummyOpener {
    flash: Rc<RefCell<DummyFlash>>,
    opened: Vec<PathBuf>,
}

impl DummyOpener {
    /// Create an opener backed by a fresh dummy flash
    pub fn new(config: DummyConfig) -> Self {
        Self {
            flash: Rc::new(RefCell::new(DummyFlash::new(config))),
            opened: Vec::new(),
        }
    }

    /// The emulated device
    pub fn flash(&self) -> Rc<RefCell<DummyFlash>> {
        Rc::clone(&self.flash)
    }

    /// Paths opened so far
    pub fn opened(&self) -> &[PathBuf] {
        &self.opened
    }
}

impl DeviceOpener for DummyOpener {
    type Device = DummyHandle;

    fn open(&mut self, path: &Path) -> io::Result<DummyHandle> {
        debug!("dummy open: {}", path.display());
        self.opened.push(path.to_path_buf());
        Ok(DummyHandle {
            flash: Rc::clone(&self.flash),
            pos: 0,
        })
    }
}
