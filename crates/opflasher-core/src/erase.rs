//! Full-device erase

use crate::device::EraseDevice;
use crate::error::EraseError;
use log::{debug, info};

/// Erase the entire device
///
/// Queries the device size and issues a single erase covering offset 0
/// through the full reported size, regardless of how much of the device the
/// image will occupy. Returns the number of bytes erased.
///
/// # Errors
/// - [`EraseError::InfoUnavailable`] if the size query fails. No erase is
///   attempted.
/// - [`EraseError::DeviceRejected`] if the erase command fails. The OS error
///   is passed through untouched.
pub fn erase_chip<D: EraseDevice + ?Sized>(device: &mut D) -> Result<u64, EraseError> {
    let size = device.capacity().map_err(EraseError::InfoUnavailable)?;
    debug!("Device reports {} bytes", size);

    info!("Erasing {} bytes (may take a while)...", size);
    device
        .erase(0, size)
        .map_err(|source| EraseError::DeviceRejected {
            length: size,
            source,
        })?;
    info!("Erase done");

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};

    /// Mock device recording every erase request
    struct MockDevice {
        memory: Vec<u8>,
        erases: Vec<(u64, u64)>,
        capacity_result: Option<i32>,
        erase_result: Option<i32>,
    }

    impl MockDevice {
        fn new(size: usize) -> Self {
            Self {
                memory: vec![0x00; size],
                erases: Vec::new(),
                capacity_result: None,
                erase_result: None,
            }
        }
    }

    impl Write for MockDevice {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl EraseDevice for MockDevice {
        fn capacity(&mut self) -> io::Result<u64> {
            match self.capacity_result {
                Some(code) => Err(io::Error::from_raw_os_error(code)),
                None => Ok(self.memory.len() as u64),
            }
        }

        fn erase(&mut self, offset: u64, len: u64) -> io::Result<()> {
            self.erases.push((offset, len));
            if let Some(code) = self.erase_result {
                return Err(io::Error::from_raw_os_error(code));
            }
            let start = offset as usize;
            let end = start + len as usize;
            for byte in &mut self.memory[start..end] {
                *byte = 0xFF;
            }
            Ok(())
        }
    }

    #[test]
    fn test_erases_whole_device() {
        let mut dev = MockDevice::new(0x4000);
        let erased = erase_chip(&mut dev).unwrap();
        assert_eq!(erased, 0x4000);
        assert_eq!(dev.erases, vec![(0, 0x4000)]);
        assert!(dev.memory.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_erase_twice_is_idempotent() {
        let mut dev = MockDevice::new(0x1000);
        erase_chip(&mut dev).unwrap();
        let first = dev.memory.clone();
        erase_chip(&mut dev).unwrap();
        assert_eq!(dev.memory, first);
        assert_eq!(dev.erases.len(), 2);
    }

    #[test]
    fn test_info_unavailable_skips_erase() {
        let mut dev = MockDevice::new(0x1000);
        dev.capacity_result = Some(25); // ENOTTY
        let err = erase_chip(&mut dev).unwrap_err();
        match err {
            EraseError::InfoUnavailable(e) => assert_eq!(e.raw_os_error(), Some(25)),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(dev.erases.is_empty());
    }

    #[test]
    fn test_device_rejected_propagates_code() {
        let mut dev = MockDevice::new(0x1000);
        dev.erase_result = Some(5); // EIO
        let err = erase_chip(&mut dev).unwrap_err();
        match err {
            EraseError::DeviceRejected { length, source } => {
                assert_eq!(length, 0x1000);
                assert_eq!(source.raw_os_error(), Some(5));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
