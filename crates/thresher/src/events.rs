//! Lifecycle notifications for a batch run

use std::error::Error;

/// Receives lifecycle notifications from [`crate::optimizer::Optimizer`].
/// Every method defaults to doing nothing.
pub trait Observer {
    fn on_start(&self) {}

    fn on_file_start(&self, _source: &str) {}

    /// Percent of input consumed, 0 to 100. Never decreases within a run
    fn on_progress(&self, _percent: u8) {}

    fn on_file_finish(&self, _source: &str) {}

    fn on_fatal_error(&self, _error: &dyn Error) {}

    fn on_finish(&self) {}
}

/// Discards every notification
#[derive(Copy, Clone, Debug, Default)]
pub struct Silent;

impl Observer for Silent {}

/// Converts bytes consumed into percent-complete notifications, emitting only
/// when the integer percentage increases
#[derive(Debug)]
pub struct Progress {
    total: u64,
    consumed: u64,
    last: Option<u8>,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            consumed: 0,
            last: None,
        }
    }

    fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        (self.consumed.min(self.total) * 100 / self.total) as u8
    }

    fn emit(&mut self, percent: u8, observer: &dyn Observer) {
        if self.last.map_or(true, |last| percent > last) {
            self.last = Some(percent);
            observer.on_progress(percent);
        }
    }

    /// Emit 0%
    pub fn start(&mut self, observer: &dyn Observer) {
        self.emit(0, observer);
    }

    /// Record that `bytes` more input bytes have been consumed
    pub fn advance(&mut self, bytes: u64, observer: &dyn Observer) {
        self.consumed = self.consumed.saturating_add(bytes);
        let percent = self.percent();
        self.emit(percent, observer);
    }

    /// Emit 100%, regardless of how many bytes were reported
    pub fn finish(&mut self, observer: &dyn Observer) {
        self.consumed = self.total;
        self.emit(100, observer);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u8>>);

    impl Observer for Recorder {
        fn on_progress(&self, percent: u8) {
            self.0.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn monotone_progress() {
        let recorder = Recorder::default();
        let mut progress = Progress::new(1000);
        progress.start(&recorder);
        progress.advance(5, &recorder);
        progress.advance(5, &recorder);
        progress.advance(490, &recorder);
        progress.advance(2, &recorder);
        progress.advance(5000, &recorder);
        progress.finish(&recorder);
        assert_eq!(*recorder.0.lock().unwrap(), vec![0, 1, 50, 100]);
    }

    #[test]
    fn empty_input() {
        let recorder = Recorder::default();
        let mut progress = Progress::new(0);
        progress.start(&recorder);
        progress.advance(10, &recorder);
        progress.finish(&recorder);
        assert_eq!(*recorder.0.lock().unwrap(), vec![0, 100]);
    }
}
