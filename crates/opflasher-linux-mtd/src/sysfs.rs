//! MTD attributes from sysfs

use crate::error::{LinuxMtdError, Result};
use std::path::Path;

/// Sysfs root for MTD devices
pub const MTD_SYSFS_ROOT: &str = "/sys/class/mtd";

/// Information about an MTD device read from sysfs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsInfo {
    /// Partition name
    pub name: String,
    /// Device type string (e.g. "nor", "nand")
    pub dev_type: String,
    /// Total size in bytes
    pub total_size: u64,
    /// Erase block size in bytes
    pub erase_size: u64,
}

/// Read a string from a sysfs file and sanitize it
fn read_sysfs_string(sysfs_path: &Path, filename: &str) -> Result<String> {
    let path = sysfs_path.join(filename);
    let content = std::fs::read_to_string(&path).map_err(|e| LinuxMtdError::SysfsRead {
        path: path.display().to_string(),
        source: e,
    })?;

    // Sanitize: remove non-printable characters and trailing whitespace
    let sanitized: String = content
        .chars()
        .take_while(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();
    Ok(sanitized.trim_end().to_string())
}

/// Read an integer from a sysfs file
fn read_sysfs_int(sysfs_path: &Path, filename: &str) -> Result<u64> {
    let value_str = read_sysfs_string(sysfs_path, filename)?;

    // Support hex (0x...) and decimal
    let value = if let Some(hex) = value_str
        .strip_prefix("0x")
        .or_else(|| value_str.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else {
        value_str.parse::<u64>()
    };

    value.map_err(|_| LinuxMtdError::SysfsParse {
        path: sysfs_path.join(filename).display().to_string(),
        value: value_str,
    })
}

/// Read sysfs attributes for a device node such as `/dev/mtd2`
///
/// Looks up `<sysfs_root>/<node name>`.
pub fn read_sysfs_info(sysfs_root: &Path, dev_path: &Path) -> Result<SysfsInfo> {
    let dev_name = dev_path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| n.starts_with("mtd"))
        .ok_or_else(|| LinuxMtdError::NotMtdDevice(dev_path.display().to_string()))?;

    let sysfs_path = sysfs_root.join(dev_name);

    Ok(SysfsInfo {
        name: read_sysfs_string(&sysfs_path, "name")?,
        dev_type: read_sysfs_string(&sysfs_path, "type")?,
        total_size: read_sysfs_int(&sysfs_path, "size")?,
        erase_size: read_sysfs_int(&sysfs_path, "erasesize")?,
    })
}
