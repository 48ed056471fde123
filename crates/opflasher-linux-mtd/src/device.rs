//! Linux MTD device handle

use crate::error::{LinuxMtdError, Result};
use bitflags::bitflags;
use log::{debug, info, warn};
use nix::errno::Errno;
use opflasher_core::device::{DeviceOpener, EraseDevice};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

bitflags! {
    /// MTD capability flags from `mtd/mtd-abi.h`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MtdFlags: u32 {
        /// Device is writable
        const WRITEABLE = 0x400;
        /// Single bits can be flipped
        const BIT_WRITEABLE = 0x800;
        /// No erase necessary
        const NO_ERASE = 0x1000;
        /// Always locked after reset
        const POWERUP_LOCK = 0x2000;
    }
}

/// MTD device type from `mtd/mtd-abi.h`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtdType {
    Absent,
    Ram,
    Rom,
    NorFlash,
    NandFlash,
    DataFlash,
    UbiVolume,
    MlcNandFlash,
    Unknown(u8),
}

impl From<u8> for MtdType {
    fn from(raw: u8) -> Self {
        match raw {
            0 => Self::Absent,
            1 => Self::Ram,
            2 => Self::Rom,
            3 => Self::NorFlash,
            4 => Self::NandFlash,
            6 => Self::DataFlash,
            7 => Self::UbiVolume,
            8 => Self::MlcNandFlash,
            other => Self::Unknown(other),
        }
    }
}

/// Device information reported by `MEMGETINFO`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtdInfo {
    /// Device type
    pub mtd_type: MtdType,
    /// Capability flags
    pub flags: MtdFlags,
    /// Total size in bytes
    pub size: u32,
    /// Erase block size in bytes
    pub erase_size: u32,
}

/// MEMGETINFO ioctl argument structure
/// Matches struct mtd_info_user from mtd/mtd-abi.h
#[repr(C)]
#[derive(Default)]
#[allow(dead_code)] // filled in by the kernel
struct MtdInfoUser {
    mtd_type: u8,
    flags: u32,
    size: u32,
    erasesize: u32,
    writesize: u32,
    oobsize: u32,
    padding: u64,
}

/// MEMERASE ioctl argument structure
/// Matches struct erase_info_user from mtd/mtd-abi.h
#[repr(C)]
struct EraseInfo {
    start: u32,
    length: u32,
}

// MEMGETINFO = _IOR('M', 1, struct mtd_info_user)
nix::ioctl_read!(memgetinfo, b'M', 1, MtdInfoUser);
// MEMERASE = _IOW('M', 2, struct erase_info_user)
nix::ioctl_write_ptr!(memerase, b'M', 2, EraseInfo);

/// An open MTD character device (`/dev/mtdN`)
///
/// Writes go straight to the device file from the current offset. The
/// device must be erased first; see [`EraseDevice::erase`].
pub struct MtdDevice {
    /// Device file handle
    file: File,
    /// Path the device was opened from
    path: PathBuf,
    /// Erase block size, known after the first capacity query
    erase_size: Option<u32>,
}

impl MtdDevice {
    /// Open an MTD device node for read/write
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        info!("Opened {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            erase_size: None,
        })
    }

    /// Path this handle was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Query device geometry with `MEMGETINFO`
    pub fn info(&self) -> Result<MtdInfo> {
        self.query_info().map_err(LinuxMtdError::InfoFailed)
    }

    fn query_info(&self) -> std::result::Result<MtdInfo, Errno> {
        let mut raw = MtdInfoUser::default();

        // SAFETY: valid open file descriptor and a properly sized, writable
        // mtd_info_user struct
        unsafe {
            memgetinfo(self.file.as_raw_fd(), &mut raw)?;
        }

        let info = MtdInfo {
            mtd_type: MtdType::from(raw.mtd_type),
            flags: MtdFlags::from_bits_retain(raw.flags),
            size: raw.size,
            erase_size: raw.erasesize,
        };
        debug!(
            "{}: type={:?}, flags={:?}, size={}, erase_size={}, write_size={}",
            self.path.display(),
            info.mtd_type,
            info.flags,
            info.size,
            info.erase_size,
            raw.writesize
        );
        Ok(info)
    }
}

impl Write for MtdDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl EraseDevice for MtdDevice {
    fn capacity(&mut self) -> io::Result<u64> {
        let info = self.info()?;
        if !info.flags.contains(MtdFlags::WRITEABLE) {
            warn!("{} is not flagged writable", self.path.display());
        }
        self.erase_size = Some(info.erase_size);
        Ok(u64::from(info.size))
    }

    fn erase(&mut self, offset: u64, len: u64) -> io::Result<()> {
        // erase_info_user carries 32-bit fields
        let start = u32::try_from(offset).map_err(|_| io::Error::from(Errno::EINVAL))?;
        let length = u32::try_from(len).map_err(|_| io::Error::from(Errno::EINVAL))?;
        if let Some(block) = self.erase_size.filter(|&b| b > 0) {
            if start % block != 0 || length % block != 0 {
                warn!(
                    "{}: erase {:#x}+{:#x} is not aligned to {:#x} byte blocks",
                    self.path.display(),
                    start,
                    length,
                    block
                );
                return Err(io::Error::from(Errno::EINVAL));
            }
        }
        let erase_info = EraseInfo { start, length };

        debug!(
            "MEMERASE {}: start={:#x} length={:#x}",
            self.path.display(),
            start,
            length
        );

        // SAFETY: We're calling an ioctl with a valid file descriptor and
        // a properly initialized EraseInfo struct
        unsafe {
            memerase(self.file.as_raw_fd(), &erase_info)?;
        }

        Ok(())
    }
}

/// Opens `/dev/mtdN` nodes for the flash engine
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxMtdOpener;

impl DeviceOpener for LinuxMtdOpener {
    type Device = MtdDevice;

    fn open(&mut self, path: &Path) -> io::Result<MtdDevice> {
        MtdDevice::open(path)
    }
}
