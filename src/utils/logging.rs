use log::{log_enabled, Level};
use std::time::Instant;

/// Simple scoped timer for profiling critical sections.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Option<Instant>,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        let start = if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
            Some(Instant::now())
        } else {
            None
        };
        Self { label, start }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            log::trace!("end {} ({} µs)", self.label, start.elapsed().as_micros());
        }
    }
}

/// Logs a message only the first time `flag` flips from `false` to `true`.
pub fn log_once(flag: &mut bool, level: Level, message: std::fmt::Arguments<'_>) {
    if !*flag {
        *flag = true;
        log::log!(level, "{message}");
    }
}
