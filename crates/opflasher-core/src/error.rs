//! Error types for opflasher-core
//!
//! Every error is terminal for the job that produced it. Nothing here is
//! retried; the orchestrator reports the error once through the notification
//! sink and hands it back to the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The requested target name is not in the device table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown flash target: '{0}'")]
pub struct UnknownTarget(pub String);

/// Errors raised while erasing the device
#[derive(Debug, Error)]
pub enum EraseError {
    /// Capacity query is unsupported or failed
    #[error("could not get device size: {0}")]
    InfoUnavailable(#[source] io::Error),

    /// The device refused the erase command
    #[error("erase of {length:#x} bytes rejected by device: {source}")]
    DeviceRejected {
        /// Number of bytes the erase covered
        length: u64,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the copy engine
#[derive(Debug, Error)]
pub enum CopyError {
    /// Copy was invoked with nothing to copy
    #[error("refusing to copy a zero-length image")]
    ZeroLength,

    /// Reading from the source image failed
    #[error("read from image failed at offset {offset:#x}: {source}")]
    ReadFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// Writing a chunk to the device failed or was short
    #[error("flash write of {len} bytes failed at offset {offset:#x}: {source}")]
    WriteFailed {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },
}

/// Errors surfaced by a flash job
#[derive(Debug, Error)]
pub enum FlashError {
    /// Target name did not resolve
    #[error(transparent)]
    UnknownTarget(#[from] UnknownTarget),

    /// Could not open the device for read/write
    #[error("failed to open device {}: {source}", .path.display())]
    DeviceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Could not open the image for reading
    #[error("failed to open image {}: {source}", .path.display())]
    SourceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Could not read the image size
    #[error("failed to get size of image {}: {source}", .path.display())]
    SourceStatFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The image is empty
    #[error("image {} is empty", .path.display())]
    EmptySource { path: PathBuf },

    /// Erase failed
    #[error(transparent)]
    Erase(#[from] EraseError),

    /// Copy failed
    #[error(transparent)]
    Copy(#[from] CopyError),

    /// The image ended before its reported size was copied
    #[error("image ended early: copied {copied} of {expected} bytes")]
    ShortSource { expected: u64, copied: u64 },
}

/// Result type for flash operations
pub type Result<T> = std::result::Result<T, FlashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erase_error_keeps_os_code() {
        let err = FlashError::from(EraseError::DeviceRejected {
            length: 0x10000,
            source: io::Error::from_raw_os_error(5),
        });
        match &err {
            FlashError::Erase(EraseError::DeviceRejected { source, .. }) => {
                assert_eq!(source.raw_os_error(), Some(5));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().starts_with("erase of 0x10000 bytes rejected"));
    }

    #[test]
    fn test_unknown_target_message() {
        let err = FlashError::from(UnknownTarget("unknown-widget".into()));
        assert_eq!(err.to_string(), "unknown flash target: 'unknown-widget'");
    }

    #[test]
    fn test_short_source_message() {
        let err = FlashError::ShortSource {
            expected: 100,
            copied: 40,
        };
        assert_eq!(err.to_string(), "image ended early: copied 40 of 100 bytes");
    }
}
