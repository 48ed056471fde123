//! Chunked image copy with percent progress

use crate::error::CopyError;
use log::{debug, trace};
use std::io::{self, ErrorKind, Read, Write};

/// Default copy chunk size (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 0x10000;

/// Byte and percent bookkeeping for one copy
///
/// `bytes_written` only grows and never passes `total_bytes`. A percent
/// value is handed out at most once, and values only go up.
#[derive(Debug, Clone)]
pub struct ProgressState {
    bytes_written: u64,
    total_bytes: u64,
    last_reported_percent: u8,
}

impl ProgressState {
    /// Start tracking a copy of `total_bytes` (must be non-zero)
    pub fn new(total_bytes: u64) -> Self {
        debug_assert!(total_bytes > 0);
        Self {
            bytes_written: 0,
            total_bytes,
            last_reported_percent: 0,
        }
    }

    /// Bytes recorded so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Bytes still to be copied
    pub fn remaining(&self) -> u64 {
        self.total_bytes - self.bytes_written
    }

    /// Last percent value handed out
    pub fn last_reported_percent(&self) -> u8 {
        self.last_reported_percent
    }

    /// Record `len` more bytes
    ///
    /// Returns the new percent if it differs from the last one reported.
    pub fn advance(&mut self, len: u64) -> Option<u8> {
        self.bytes_written = self
            .bytes_written
            .saturating_add(len)
            .min(self.total_bytes);

        let percent = (self.bytes_written as u128 * 100 / self.total_bytes as u128) as u8;
        if percent != self.last_reported_percent {
            self.last_reported_percent = percent;
            Some(percent)
        } else {
            None
        }
    }
}

/// Copy `total_bytes` from `source` into `dest` in `chunk_size` pieces
///
/// Writes start at `dest`'s current position and go strictly forward. After
/// each chunk the integer percent complete is computed and `on_progress` is
/// called when it changed.
///
/// Never reads more than `total_bytes` from `source`, even if more is
/// available. A zero-length read ends the copy early without error; the
/// returned count tells the caller how much was actually copied.
///
/// # Errors
/// - [`CopyError::ZeroLength`] if `total_bytes` is 0.
/// - [`CopyError::ReadFailed`] if reading the source fails.
/// - [`CopyError::WriteFailed`] if a chunk write fails or is short. The copy
///   stops immediately. Only `Interrupted` reads and writes are retried.
pub fn copy<R, W, F>(
    source: &mut R,
    dest: &mut W,
    total_bytes: u64,
    chunk_size: usize,
    mut on_progress: F,
) -> Result<u64, CopyError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: FnMut(u8),
{
    if total_bytes == 0 {
        return Err(CopyError::ZeroLength);
    }

    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut progress = ProgressState::new(total_bytes);

    while progress.remaining() > 0 {
        let want = std::cmp::min(buf.len() as u64, progress.remaining()) as usize;
        let offset = progress.bytes_written();

        let len = match source.read(&mut buf[..want]) {
            Ok(0) => {
                debug!(
                    "Image ended after {} of {} bytes",
                    offset, total_bytes
                );
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => return Err(CopyError::ReadFailed { offset, source }),
        };

        loop {
            match dest.write(&buf[..len]) {
                Ok(n) if n == len => break,
                Ok(n) => {
                    return Err(CopyError::WriteFailed {
                        offset,
                        len,
                        source: io::Error::new(
                            ErrorKind::WriteZero,
                            format!("short write: {} of {} bytes", n, len),
                        ),
                    })
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => return Err(CopyError::WriteFailed { offset, len, source }),
            }
        }
        trace!("Wrote {} bytes at {:#x}", len, offset);

        if let Some(percent) = progress.advance(len as u64) {
            on_progress(percent);
        }
    }

    Ok(progress.bytes_written())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Writer that fails once a number of writes have succeeded
    struct FailingWriter {
        data: Vec<u8>,
        writes: usize,
        fail_after: Option<usize>,
        short_by: usize,
    }

    impl FailingWriter {
        fn new() -> Self {
            Self {
                data: Vec::new(),
                writes: 0,
                fail_after: None,
                short_by: 0,
            }
        }
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_after == Some(self.writes) {
                return Err(io::Error::from_raw_os_error(28)); // ENOSPC
            }
            self.writes += 1;
            let n = buf.len() - self.short_by.min(buf.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Reader that reports `Interrupted` before every real read
    struct InterruptingReader {
        inner: Cursor<Vec<u8>>,
        interrupt_next: bool,
    }

    impl Read for InterruptingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.interrupt_next = true;
            self.inner.read(buf)
        }
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    #[test]
    fn test_progress_state_dedups() {
        let mut state = ProgressState::new(1000);
        assert_eq!(state.advance(5), None);
        assert_eq!(state.advance(5), Some(1));
        assert_eq!(state.advance(1), None);
        assert_eq!(state.advance(989), Some(100));
        assert_eq!(state.last_reported_percent(), 100);
    }

    #[test]
    fn test_progress_state_saturates() {
        let mut state = ProgressState::new(10);
        assert_eq!(state.advance(50), Some(100));
        assert_eq!(state.bytes_written(), 10);
        assert_eq!(state.remaining(), 0);
    }

    #[test]
    fn test_copy_round_trip() {
        let image = pattern(1_048_576);
        let mut dest = FailingWriter::new();
        let mut ticks = Vec::new();
        let copied = copy(
            &mut Cursor::new(image.clone()),
            &mut dest,
            image.len() as u64,
            DEFAULT_CHUNK_SIZE,
            |p| ticks.push(p),
        )
        .unwrap();

        assert_eq!(copied, image.len() as u64);
        assert_eq!(dest.data, image);
        assert_eq!(dest.writes, 16);
        assert_eq!(ticks.last(), Some(&100));
    }

    #[test]
    fn test_many_chunks_report_at_most_100_increasing() {
        let image = pattern(10_000);
        let mut dest = FailingWriter::new();
        let mut ticks: Vec<u8> = Vec::new();
        copy(&mut Cursor::new(image.clone()), &mut dest, 10_000, 7, |p| {
            ticks.push(p)
        })
        .unwrap();

        assert!(ticks.len() <= 100);
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ticks.first(), Some(&1));
        assert_eq!(ticks.last(), Some(&100));
    }

    #[test]
    fn test_clamps_to_total_bytes() {
        let image = pattern(1000);
        let mut source = Cursor::new(image.clone());
        let mut dest = FailingWriter::new();
        let copied = copy(&mut source, &mut dest, 300, 256, |_| {}).unwrap();

        assert_eq!(copied, 300);
        assert_eq!(dest.data, &image[..300]);
        // Nothing past total_bytes was consumed from the source
        assert_eq!(source.position(), 300);
    }

    #[test]
    fn test_short_source_ends_without_error() {
        let image = pattern(100);
        let mut dest = FailingWriter::new();
        let mut ticks = Vec::new();
        let copied = copy(&mut Cursor::new(image), &mut dest, 400, 50, |p| {
            ticks.push(p)
        })
        .unwrap();

        assert_eq!(copied, 100);
        assert_eq!(ticks, vec![12, 25]);
    }

    #[test]
    fn test_write_failure_stops_progress() {
        // 10 chunks, the 4th write fails
        let image = pattern(160);
        let mut dest = FailingWriter::new();
        dest.fail_after = Some(3);
        let mut ticks = Vec::new();
        let err = copy(&mut Cursor::new(image), &mut dest, 160, 16, |p| {
            ticks.push(p)
        })
        .unwrap_err();

        match err {
            CopyError::WriteFailed {
                offset,
                len,
                source,
            } => {
                assert_eq!(offset, 48);
                assert_eq!(len, 16);
                assert_eq!(source.raw_os_error(), Some(28));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(ticks, vec![10, 20, 30]);
        assert_eq!(dest.writes, 3);
    }

    #[test]
    fn test_short_write_is_fatal() {
        let image = pattern(64);
        let mut dest = FailingWriter::new();
        dest.short_by = 1;
        let err = copy(&mut Cursor::new(image), &mut dest, 64, 32, |_| {}).unwrap_err();

        match err {
            CopyError::WriteFailed { offset, source, .. } => {
                assert_eq!(offset, 0);
                assert_eq!(source.kind(), ErrorKind::WriteZero);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(dest.writes, 1);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let image = pattern(256);
        let mut source = InterruptingReader {
            inner: Cursor::new(image.clone()),
            interrupt_next: true,
        };
        let mut dest = FailingWriter::new();
        let copied = copy(&mut source, &mut dest, 256, 64, |_| {}).unwrap();

        assert_eq!(copied, 256);
        assert_eq!(dest.data, image);
    }

    /// Writer that reports `Interrupted` before every real write
    struct InterruptingWriter {
        data: Vec<u8>,
        interrupts: usize,
        interrupt_next: bool,
    }

    impl Write for InterruptingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                self.interrupts += 1;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.interrupt_next = true;
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_interrupted_write_is_retried() {
        let image = pattern(256);
        let mut dest = InterruptingWriter {
            data: Vec::new(),
            interrupts: 0,
            interrupt_next: true,
        };
        let mut ticks = Vec::new();
        let copied = copy(&mut Cursor::new(image.clone()), &mut dest, 256, 64, |p| {
            ticks.push(p)
        })
        .unwrap();

        assert_eq!(copied, 256);
        assert_eq!(dest.data, image);
        assert_eq!(dest.interrupts, 4);
        assert_eq!(ticks, vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut dest = FailingWriter::new();
        let mut called = false;
        let err = copy(&mut Cursor::new(Vec::new()), &mut dest, 0, 64, |_| {
            called = true
        })
        .unwrap_err();

        assert!(matches!(err, CopyError::ZeroLength));
        assert!(!called);
        assert_eq!(dest.writes, 0);
    }
}
