//! Error types for Linux MTD operations

use std::io;
use thiserror::Error;

/// Linux MTD-specific errors
#[derive(Debug, Error)]
pub enum LinuxMtdError {
    /// Path does not name an MTD character device
    #[error("Not an MTD device node: {0}")]
    NotMtdDevice(String),

    /// Failed to read sysfs attribute
    #[error("Failed to read sysfs attribute '{path}': {source}")]
    SysfsRead {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse sysfs attribute
    #[error("Failed to parse sysfs attribute '{path}': {value}")]
    SysfsParse { path: String, value: String },

    /// MEMGETINFO ioctl failed
    #[error("MEMGETINFO failed: {0}")]
    InfoFailed(#[source] nix::errno::Errno),
}

impl From<LinuxMtdError> for io::Error {
    fn from(err: LinuxMtdError) -> Self {
        match err {
            LinuxMtdError::InfoFailed(errno) => io::Error::from(errno),
            LinuxMtdError::SysfsRead { source, .. } => source,
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}

/// Result type for Linux MTD operations
pub type Result<T> = std::result::Result<T, LinuxMtdError>;
