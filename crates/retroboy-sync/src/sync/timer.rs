use crate::sync::session::SessionId;
use std::time::Duration;

/// Tag carried by an armed step timer.
///
/// `serial` is unique per arm, so a timer armed before a resume or inside an
/// earlier session never matches the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepTimer {
    pub session: SessionId,
    pub serial: u64,
}

/// Host facility that calls back after a delay.
///
/// The host hands each due timer back through
/// [`PlaybackController::on_timer`](crate::sync::controller::PlaybackController::on_timer).
/// Timers are never cancelled; stale ones are filtered when they fire.
pub trait StepTimers {
    fn arm(&mut self, delay: Duration, timer: StepTimer);
}

impl<T: StepTimers + ?Sized> StepTimers for Box<T> {
    fn arm(&mut self, delay: Duration, timer: StepTimer) {
        (**self).arm(delay, timer)
    }
}
