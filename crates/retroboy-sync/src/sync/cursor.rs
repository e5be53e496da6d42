/// Audio-clock time at which the next produced buffer must start.
///
/// Start times are derived from the previous start plus the previous
/// buffer's duration, never from the time `advance` happens to run, so
/// late timer wake-ups do not accumulate into drift.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScheduleCursor {
    next_start_time: Option<f64>,
}

impl ScheduleCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the start time for a buffer of `duration` seconds and moves
    /// the cursor to that buffer's end.
    ///
    /// An uninitialized cursor starts at `now`.
    pub fn advance(&mut self, now: f64, duration: f64) -> f64 {
        let start_time = self.next_start_time.unwrap_or(now);
        self.next_start_time = Some(start_time + duration);
        start_time
    }

    /// Forget the running position; the next buffer starts at "now"
    pub fn reset(&mut self) {
        self.next_start_time = None;
    }

    pub fn next_start_time(&self) -> Option<f64> {
        self.next_start_time
    }

    pub fn is_initialized(&self) -> bool {
        self.next_start_time.is_some()
    }
}
