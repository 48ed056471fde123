//! Notification sink
//!
//! The transport that carries progress and completion to the listener is not
//! part of the engine. Anything implementing [`NotificationSink`] can receive
//! them: an in-process callback, a message queue, an RPC client.

/// Receiver for job progress and the terminal status
///
/// For one job the engine calls `on_progress` zero or more times with
/// strictly increasing values, then exactly one of `on_done` or `on_error`.
pub trait NotificationSink {
    /// Integer percent complete (0-100)
    fn on_progress(&mut self, percent: u8);

    /// The job finished successfully
    fn on_done(&mut self);

    /// The job failed; `message` is human readable
    fn on_error(&mut self, message: &str);
}

impl<S: NotificationSink + ?Sized> NotificationSink for &mut S {
    fn on_progress(&mut self, percent: u8) {
        (**self).on_progress(percent)
    }

    fn on_done(&mut self) {
        (**self).on_done()
    }

    fn on_error(&mut self, message: &str) {
        (**self).on_error(message)
    }
}

/// A sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn on_progress(&mut self, _percent: u8) {}
    fn on_done(&mut self) {}
    fn on_error(&mut self, _message: &str) {}
}
