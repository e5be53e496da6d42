use crate::emulation::{EmulationCore, SampleBuffer};
use crate::error::PlaybackError;
use crate::sink::AudioSink;
use crate::sync::controller::PlaybackController;
use crate::sync::session::SessionId;
use crate::sync::timer::{StepTimer, StepTimers};
use std::time::Duration;

/// Decides when the core is asked for its next slice of audio.
///
/// After a buffer is scheduled, a single timer is armed to fire
/// `lookahead_gap` before that buffer starts. Only the most recently armed
/// timer is live; anything else that fires is stale.
#[derive(Debug, Clone)]
pub struct StepTrigger {
    lookahead_gap_ms: f64,
    armed: Option<StepTimer>,
    next_serial: u64,
}

impl StepTrigger {
    pub fn new(lookahead_gap_ms: f64) -> Self {
        Self {
            lookahead_gap_ms,
            armed: None,
            next_serial: 0,
        }
    }

    /// `(start_time - now) * 1000 - gap` milliseconds, floored at zero
    pub fn wait_before_next_step(&self, start_time: f64, now: f64) -> Duration {
        let wait_ms = (start_time - now) * 1000.0 - self.lookahead_gap_ms;
        if wait_ms.is_finite() && wait_ms > 0.0 {
            Duration::from_secs_f64(wait_ms / 1000.0)
        } else {
            Duration::ZERO
        }
    }

    /// Tag a new timer for `session`; it replaces whatever was live
    pub fn arm(&mut self, session: SessionId) -> StepTimer {
        let timer = StepTimer {
            session,
            serial: self.next_serial,
        };
        self.next_serial = self.next_serial.wrapping_add(1);
        self.armed = Some(timer);
        timer
    }

    /// Consume `timer` if it is the live one
    pub fn claim(&mut self, timer: StepTimer) -> bool {
        if self.armed == Some(timer) {
            self.armed = None;
            true
        } else {
            false
        }
    }

    /// Make every outstanding timer stale
    pub fn disarm(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn armed(&self) -> Option<StepTimer> {
        self.armed
    }
}

impl<C, S, T> PlaybackController<C, S, T>
where
    C: EmulationCore,
    S: AudioSink,
    T: StepTimers,
{
    /// Prime the pipeline with one synchronous step if the session is
    /// playing. A reset requested earlier is applied first.
    pub(crate) fn on_session_start(&mut self) -> Result<(), PlaybackError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        if session.pending_reset {
            self.apply_reset();
            return Ok(());
        }
        if session.is_playing() {
            self.step_core()?;
        }
        Ok(())
    }

    /// Runs when a step timer fires
    pub(crate) fn request_next_step(&mut self, timer: StepTimer) -> Result<(), PlaybackError> {
        let live = self.session.as_ref().is_some_and(|s| s.id == timer.session);
        if !live || !self.trigger.claim(timer) {
            log::trace!(
                "Discarding stale step timer (session {}, serial {})",
                timer.session,
                timer.serial
            );
            self.stats.stale_timers += 1;
            return Ok(());
        }

        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        if session.pending_reset {
            self.apply_reset();
        } else if session.is_playing() {
            self.step_core()?;
        } else {
            log::trace!("Session {} paused, not pre-fetching audio", session.id);
        }
        Ok(())
    }

    fn step_core(&mut self) -> Result<(), PlaybackError> {
        self.stats.steps_requested += 1;
        self.core.step_until_next_audio_buffer();

        while let Some(buffer) = self.samples.take() {
            self.on_buffer_produced(buffer)?;
        }
        Ok(())
    }

    pub(crate) fn on_buffer_produced(&mut self, buffer: SampleBuffer) -> Result<(), PlaybackError> {
        if buffer.is_empty() {
            log::trace!("Core produced no audio this step");
            self.stats.empty_buffers += 1;
            return Ok(());
        }
        let Some(session_id) = self.session.as_ref().map(|s| s.id) else {
            log::debug!("Dropping buffer produced outside a session");
            return Ok(());
        };
        let Some(sink) = self.sink.as_mut() else {
            log::debug!("Dropping buffer, no audio output open");
            return Ok(());
        };

        let duration = buffer.duration(sink.sample_rate());
        let now = sink.now();
        let start_time = self.cursor.advance(now, duration);

        if let Err(e) = sink.schedule_buffer(&buffer.left, &buffer.right, start_time) {
            return Err(self.halt(e));
        }

        self.stats.buffers_scheduled += 1;
        if start_time < now {
            self.stats.late_buffers += 1;
            log::warn!(
                "Buffer scheduled {:.1} ms late, audio will glitch",
                (now - start_time) * 1000.0
            );
        }
        log::trace!(
            "Scheduled {} frames at {:.4}s (clock {:.4}s)",
            buffer.frame_count(),
            start_time,
            now
        );

        let wait = self.trigger.wait_before_next_step(start_time, sink.now());
        let timer = self.trigger.arm(session_id);
        self.timers.arm(wait, timer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_subtracts_gap() {
        let trigger = StepTrigger::new(15.0);
        let wait = trigger.wait_before_next_step(10.5, 10.0);
        assert!((wait.as_secs_f64() - 0.485).abs() < 1e-6);
    }

    #[test]
    fn wait_never_negative() {
        let trigger = StepTrigger::new(15.0);

        // Buffer starts right now
        assert_eq!(trigger.wait_before_next_step(10.0, 10.0), Duration::ZERO);
        // Buffer starts within the gap
        assert_eq!(trigger.wait_before_next_step(10.01, 10.0), Duration::ZERO);
        // Buffer should already have started
        assert_eq!(trigger.wait_before_next_step(9.5, 10.0), Duration::ZERO);
    }

    #[test]
    fn zero_gap_waits_until_start() {
        let trigger = StepTrigger::new(0.0);
        let wait = trigger.wait_before_next_step(2.5, 2.0);
        assert!((wait.as_secs_f64() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn only_latest_timer_is_live() {
        let mut trigger = StepTrigger::new(15.0);
        let session = SessionId::default();

        let first = trigger.arm(session);
        let second = trigger.arm(session);
        assert_ne!(first, second);

        assert!(!trigger.claim(first));
        assert!(trigger.claim(second));
        // Claimed timers cannot fire twice
        assert!(!trigger.claim(second));
        assert!(!trigger.is_armed());
    }

    #[test]
    fn disarm_makes_timer_stale() {
        let mut trigger = StepTrigger::new(15.0);
        let timer = trigger.arm(SessionId::default());
        trigger.disarm();
        assert!(!trigger.claim(timer));
    }

    #[test]
    fn serials_survive_disarm() {
        let mut trigger = StepTrigger::new(15.0);
        let session = SessionId::default();
        let before = trigger.arm(session);
        trigger.disarm();
        let after = trigger.arm(session);
        assert_ne!(before, after);
        assert!(!trigger.claim(before));
        assert_eq!(trigger.armed(), Some(after));
    }
}
