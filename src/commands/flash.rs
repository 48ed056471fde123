//! Flash command and the console notification sink

use crate::programmers::{open_backend, parse_option_list, Backend};
use indicatif::{ProgressBar, ProgressStyle};
use opflasher_core::{
    parse_options, DeviceOpener, FlashConfig, FlashError, FlashReport, FlashRequest, Flasher,
    NotificationSink,
};

/// Create the percent progress bar style
fn create_progress_bar_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
        .progress_chars("#>-"))
}

/// Notification sink that draws an indicatif bar and leaves the terminal
/// status, tagged with the caller's session, as the bar's final message
///
/// The engine already logs the outcome, so nothing is logged here.
pub struct ConsoleSink {
    session: String,
    bar: ProgressBar,
}

impl ConsoleSink {
    pub fn new(session: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(create_progress_bar_style().unwrap_or_else(|_| ProgressStyle::default_bar()));
        bar.set_message("Writing");
        Self {
            session: session.to_string(),
            bar,
        }
    }
}

impl NotificationSink for ConsoleSink {
    fn on_progress(&mut self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_done(&mut self) {
        self.bar.finish_with_message(format!("{}: done", self.session));
    }

    fn on_error(&mut self, message: &str) {
        self.bar
            .abandon_with_message(format!("{}: error: {}", self.session, message));
    }
}

/// Run one job and print a summary
pub fn flash_with<O: DeviceOpener>(
    flasher: &mut Flasher<O>,
    request: &FlashRequest,
) -> Result<FlashReport, FlashError> {
    let report = flasher.flash(request, ConsoleSink::new(&request.session))?;
    println!(
        "Wrote {} bytes to {} ({}), erased {} bytes",
        report.bytes_written,
        report.device_path.display(),
        report.target,
        report.erased_bytes
    );
    Ok(report)
}

/// `opflasher flash`
pub fn run(
    programmer: &str,
    options: Option<&str>,
    request: &FlashRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match options {
        Some(opts) => parse_options(&parse_option_list(opts)?)?,
        None => FlashConfig::default(),
    };
    log::debug!("Flash config: {:?}", config);

    match open_backend(programmer)? {
        #[cfg(feature = "linux-mtd")]
        Backend::LinuxMtd(opener) => {
            flash_with(&mut Flasher::new(opener, config), request)?;
        }
        #[cfg(feature = "dummy")]
        Backend::Dummy(opener) => {
            let mut flasher = Flasher::new(opener, config);
            flash_with(&mut flasher, request)?;
            let flash = flasher.opener().flash();
            let flash = flash.borrow();
            println!(
                "Dummy flash: {} erase(s), {} write(s)",
                flash.erase_count(),
                flash.write_count()
            );
        }
    }

    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use opflasher_core::{CopyError, EraseError};
    use opflasher_dummy::{DummyConfig, DummyOpener};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn image_file(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file
    }

    fn dummy(config: DummyConfig) -> Flasher<DummyOpener> {
        Flasher::new(DummyOpener::new(config), FlashConfig::default())
    }

    #[test]
    fn test_flash_round_trip() {
        let image: Vec<u8> = (0..300_000).map(|i| (i % 253) as u8).collect();
        let file = image_file(&image);
        let mut flasher = dummy(DummyConfig {
            size: 512 * 1024,
            ..Default::default()
        });

        let request = FlashRequest::new("kernel", file.path(), "/org/openbmc/test");
        let report = flash_with(&mut flasher, &request).unwrap();
        assert_eq!(report.bytes_written, image.len() as u64);

        let flash = flasher.opener().flash();
        let flash = flash.borrow();
        assert_eq!(&flash.data()[..image.len()], &image[..]);
        assert!(flash.data()[image.len()..].iter().all(|&b| b == 0xFF));
        assert_eq!(flash.erase_count(), 1);
        assert_eq!(flasher.opener().opened().len(), 1);
    }

    #[test]
    fn test_unknown_target_never_opens() {
        let file = image_file(b"data");
        let mut flasher = dummy(DummyConfig::default());

        let request = FlashRequest::new("unknown-widget", file.path(), "s");
        let err = flash_with(&mut flasher, &request).unwrap_err();
        assert!(matches!(err, FlashError::UnknownTarget(_)));
        assert!(flasher.opener().opened().is_empty());
        assert_eq!(flasher.opener().flash().borrow().info_count(), 0);
    }

    #[test]
    fn test_capacity_failure_writes_nothing() {
        let file = image_file(&[0xAA; 1024]);
        let mut flasher = dummy(DummyConfig {
            size: 4096,
            fail_info: true,
            ..Default::default()
        });

        let request = FlashRequest::new("primary", file.path(), "s");
        let err = flash_with(&mut flasher, &request).unwrap_err();
        assert!(matches!(
            err,
            FlashError::Erase(EraseError::InfoUnavailable(_))
        ));
        let flash = flasher.opener().flash();
        assert_eq!(flash.borrow().erase_count(), 0);
        assert_eq!(flash.borrow().write_count(), 0);
    }

    #[test]
    fn test_erase_rejected() {
        let file = image_file(&[0xAA; 1024]);
        let mut flasher = dummy(DummyConfig {
            size: 4096,
            fail_erase: true,
            ..Default::default()
        });

        let request = FlashRequest::new("ramdisk", file.path(), "s");
        let err = flash_with(&mut flasher, &request).unwrap_err();
        assert!(matches!(
            err,
            FlashError::Erase(EraseError::DeviceRejected { length: 4096, .. })
        ));
        assert_eq!(flasher.opener().flash().borrow().write_count(), 0);
    }

    #[test]
    fn test_image_larger_than_device() {
        let file = image_file(&[0x55; 200]);
        let mut flasher = dummy(DummyConfig {
            size: 100,
            ..Default::default()
        });

        let request = FlashRequest::new("kernel", file.path(), "s");
        let err = flash_with(&mut flasher, &request).unwrap_err();
        // The device takes the first 100 bytes and then reports a short write
        assert!(matches!(
            err,
            FlashError::Copy(CopyError::WriteFailed { offset: 0, .. })
        ));
    }

    #[test]
    fn test_run_rejects_bad_options() {
        let file = image_file(b"data");
        let request = FlashRequest::new("kernel", file.path(), "s");
        assert!(run("dummy", Some("chunk=0"), &request).is_err());
        assert!(run("dummy", Some("chunk"), &request).is_err());
    }

    #[test]
    fn test_run_with_dummy_backend() {
        let file = image_file(&[0x11; 4096]);
        let request = FlashRequest::new("alt-firmware", file.path(), "s");
        run("dummy:size=64K", Some("chunk=1K"), &request).unwrap();
    }
}
