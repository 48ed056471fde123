//! Flash orchestration
//!
//! A job walks `Idle -> DeviceOpened -> Erased -> Copied -> Done`. Any failure
//! ends it in `Failed`. There are no retries and no rollback: a copy failure
//! after a successful erase leaves the device erased or partially written.

use crate::config::{FlashConfig, ShortSourcePolicy};
use crate::copy::copy;
use crate::device::{DeviceOpener, FileImageOpener, ImageOpener};
use crate::erase::erase_chip;
use crate::error::{CopyError, FlashError, Result};
use crate::notify::NotificationSink;
use crate::target::{resolve, FlashTarget};
use log::{debug, error, info, warn};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;

/// What the caller asked for
#[derive(Debug, Clone)]
pub struct FlashRequest {
    /// Target name, canonical or alias
    pub target: String,
    /// Image to write
    pub source: PathBuf,
    /// Caller/session identifier, only used to route the terminal status
    pub session: String,
}

impl FlashRequest {
    /// Create a new request
    pub fn new(
        target: impl Into<String>,
        source: impl Into<PathBuf>,
        session: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
            session: session.into(),
        }
    }
}

/// A resolved job
#[derive(Debug, Clone)]
pub struct FlashJob {
    /// Resolved target
    pub target: FlashTarget,
    /// Device node for the target
    pub device_path: PathBuf,
    /// Image path
    pub source_path: PathBuf,
    /// Image size, read once from metadata
    pub source_size: u64,
}

/// Summary of a successful job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashReport {
    /// Target that was flashed
    pub target: FlashTarget,
    /// Device node that was written
    pub device_path: PathBuf,
    /// Bytes erased (whole device)
    pub erased_bytes: u64,
    /// Bytes programmed
    pub bytes_written: u64,
}

/// Job progress through the erase-then-program sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashState {
    /// Nothing done yet
    Idle,
    /// Device handle open
    DeviceOpened,
    /// Whole device erased
    Erased,
    /// Image copied
    Copied,
    /// Job finished successfully
    Done,
    /// Job failed
    Failed,
}

impl fmt::Display for FlashState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::DeviceOpened => "device-opened",
            Self::Erased => "erased",
            Self::Copied => "copied",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-job state tracker
struct JobState<'a> {
    session: &'a str,
    state: FlashState,
}

impl<'a> JobState<'a> {
    fn new(session: &'a str) -> Self {
        Self {
            session,
            state: FlashState::Idle,
        }
    }

    fn advance(&mut self, next: FlashState) {
        debug!("[{}] {} -> {}", self.session, self.state, next);
        self.state = next;
    }
}

/// Apply the short image policy to a finished copy
pub fn check_copied(expected: u64, copied: u64, policy: ShortSourcePolicy) -> Result<()> {
    if copied >= expected {
        return Ok(());
    }
    match policy {
        ShortSourcePolicy::Error => Err(FlashError::ShortSource { expected, copied }),
        ShortSourcePolicy::Accept => {
            warn!(
                "Image ended early: copied {} of {} bytes, accepting",
                copied, expected
            );
            Ok(())
        }
    }
}

/// Runs flash jobs against devices provided by a [`DeviceOpener`]
///
/// Images are read from the filesystem unless another [`ImageOpener`] is
/// supplied with [`Flasher::with_images`].
pub struct Flasher<O: DeviceOpener, I: ImageOpener = FileImageOpener> {
    opener: O,
    images: I,
    config: FlashConfig,
}

impl<O: DeviceOpener> Flasher<O> {
    /// Create a flasher using `opener` to reach devices
    pub fn new(opener: O, config: FlashConfig) -> Self {
        Self::with_images(opener, FileImageOpener, config)
    }
}

impl<O: DeviceOpener, I: ImageOpener> Flasher<O, I> {
    /// Create a flasher reading images through `images`
    pub fn with_images(opener: O, images: I, config: FlashConfig) -> Self {
        Self {
            opener,
            images,
            config,
        }
    }

    /// Job configuration
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// The device opener
    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Run one flash job
    ///
    /// Progress is forwarded to `sink` as it happens. Exactly one terminal
    /// notification is sent: `on_done` if this returns `Ok`, `on_error` if it
    /// returns `Err`. Device and image handles are closed before returning.
    pub fn flash<S: NotificationSink>(
        &mut self,
        request: &FlashRequest,
        mut sink: S,
    ) -> Result<FlashReport> {
        let mut job = JobState::new(&request.session);

        let result = self.run(request, &mut job, &mut sink);
        match &result {
            Ok(report) => {
                info!(
                    "[{}] Flash done: {} bytes written to {} ({})",
                    request.session,
                    report.bytes_written,
                    report.device_path.display(),
                    report.target
                );
                sink.on_done();
            }
            Err(e) => {
                job.advance(FlashState::Failed);
                error!("[{}] Flash error: {}", request.session, e);
                sink.on_error(&e.to_string());
            }
        }
        result
    }

    fn run<S: NotificationSink>(
        &mut self,
        request: &FlashRequest,
        job: &mut JobState<'_>,
        sink: &mut S,
    ) -> Result<FlashReport> {
        let target = resolve(&request.target)?;
        let device_path = target.device_path();
        info!(
            "[{}] Flashing {} ({}) from {}",
            request.session,
            target,
            device_path.display(),
            request.source.display()
        );

        let mut device =
            self.opener
                .open(device_path)
                .map_err(|source| FlashError::DeviceOpenFailed {
                    path: device_path.to_path_buf(),
                    source,
                })?;
        job.advance(FlashState::DeviceOpened);

        let mut image =
            self.images
                .open(&request.source)
                .map_err(|source| FlashError::SourceOpenFailed {
                    path: request.source.clone(),
                    source,
                })?;
        let source_size =
            self.images
                .size(&image)
                .map_err(|source| FlashError::SourceStatFailed {
                    path: request.source.clone(),
                    source,
                })?;

        let flash_job = FlashJob {
            target,
            device_path: device_path.to_path_buf(),
            source_path: request.source.clone(),
            source_size,
        };
        debug!("[{}] {:?}", request.session, flash_job);

        if flash_job.source_size == 0 {
            return Err(FlashError::EmptySource {
                path: flash_job.source_path,
            });
        }

        let erased_bytes = erase_chip(&mut device)?;
        job.advance(FlashState::Erased);

        let bytes_written = copy(
            &mut image,
            &mut device,
            flash_job.source_size,
            self.config.chunk_size,
            |percent| sink.on_progress(percent),
        )?;
        device.flush().map_err(|source| CopyError::WriteFailed {
            offset: bytes_written,
            len: 0,
            source,
        })?;
        job.advance(FlashState::Copied);

        check_copied(
            flash_job.source_size,
            bytes_written,
            self.config.short_source,
        )?;
        job.advance(FlashState::Done);

        Ok(FlashReport {
            target,
            device_path: flash_job.device_path,
            erased_bytes,
            bytes_written,
        })
    }
}
