use crate::emulation::EmulationCore;
use crate::sink::AudioSink;
use crate::sync::controller::{PlaybackController, ResetOutcome};
use crate::sync::session::PlaybackSession;
use crate::sync::timer::StepTimers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetDecision {
    /// Wait for the next step timer, the next safe point
    Defer,
    /// A reset is already waiting for the safe point
    AlreadyPending,
    ApplyNow,
}

/// Keeps a reset from landing while the core is mid-production.
///
/// While playing, the request is parked in the session's `pending_reset`
/// flag and picked up by the next step timer. A boolean rather than a
/// counter, so repeated requests collapse into a single core reset.
pub struct ResetCoordinator;

impl ResetCoordinator {
    /// `timer_armed` tells whether a step timer is outstanding. Without one
    /// no safe point is coming, so the reset is applied straight away.
    pub fn decide(session: Option<&PlaybackSession>, timer_armed: bool) -> ResetDecision {
        match session {
            Some(session) if session.pending_reset => ResetDecision::AlreadyPending,
            Some(session) if session.is_playing() && timer_armed => ResetDecision::Defer,
            _ => ResetDecision::ApplyNow,
        }
    }
}

impl<C, S, T> PlaybackController<C, S, T>
where
    C: EmulationCore,
    S: AudioSink,
    T: StepTimers,
{
    pub(crate) fn request_reset(&mut self) -> ResetOutcome {
        let decision = ResetCoordinator::decide(self.session.as_ref(), self.trigger.is_armed());
        match decision {
            ResetDecision::Defer => {
                if let Some(session) = self.session.as_mut() {
                    session.pending_reset = true;
                    log::debug!("Reset deferred until session {} reaches a safe point", session.id);
                }
                ResetOutcome::Deferred
            }
            ResetDecision::AlreadyPending => {
                // A paused session resets immediately, taking the parked
                // request with it
                if self.session.as_ref().is_some_and(|s| !s.is_playing()) {
                    self.apply_reset();
                    return ResetOutcome::Applied;
                }
                ResetOutcome::Deferred
            }
            ResetDecision::ApplyNow => {
                self.apply_reset();
                ResetOutcome::Applied
            }
        }
    }

    /// Reset the core and return to Idle. Only called between buffer
    /// productions; buffers already handed to the sink play out.
    pub(crate) fn apply_reset(&mut self) {
        self.core.reset();
        self.stats.resets_applied += 1;
        if let Some(session) = self.session.as_ref() {
            log::info!("Session {} reset", session.id);
        } else {
            log::debug!("Core reset while idle");
        }
        self.end_session();
        self.cartridge = None;
    }
}
