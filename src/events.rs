use log::{debug, info, warn};

/// Structured logging seam injected into every component at construction.
///
/// The library never writes to a process-global logger directly; components
/// report their intent through this trait. The default [`LogSink`] forwards
/// to the `log` facade, while tests can inject a capturing sink and assert
/// on exactly what was reported (for example the duplicate-trigger warnings
/// emitted by `Job::invoke`).
pub trait EventSink: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

/// Forwards events to the `log` crate.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn debug(&self, message: &str) {
        debug!("{message}");
    }

    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }
}
