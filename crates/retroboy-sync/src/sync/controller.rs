use crate::config::SyncConfig;
use crate::emulation::{EmulationCore, EmulatorSettings, RomMetadata, SampleMailbox};
use crate::error::{PlaybackError, SinkError};
use crate::sink::AudioSink;
use crate::sync::cursor::ScheduleCursor;
use crate::sync::session::{PlaybackSession, PlaybackStatus, SessionId};
use crate::sync::stats::PlaybackStats;
use crate::sync::timer::{StepTimer, StepTimers};
use crate::sync::trigger::StepTrigger;

/// Opens the audio output the first time a session starts
pub type SinkFactory<S> = Box<dyn FnMut() -> Result<S, SinkError> + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The core was reset and the controller is Idle
    Applied,
    /// The reset runs at the next step timer
    Deferred,
}

/// Idle / Playing / Paused state machine driving an [`EmulationCore`] from
/// the clock of an [`AudioSink`].
///
/// Single-threaded: the host calls the transition methods and hands every
/// fired timer to [`on_timer`](Self::on_timer) from the same thread.
pub struct PlaybackController<C, S, T> {
    pub(crate) core: C,
    pub(crate) samples: SampleMailbox,
    pub(crate) sink: Option<S>,
    open_sink: SinkFactory<S>,
    pub(crate) timers: T,

    pub(crate) session: Option<PlaybackSession>,
    next_session_id: SessionId,
    pub(crate) cursor: ScheduleCursor,
    pub(crate) trigger: StepTrigger,

    pub(crate) cartridge: Option<RomMetadata>,
    pub(crate) stats: PlaybackStats,
}

impl<C, S, T> PlaybackController<C, S, T>
where
    C: EmulationCore,
    S: AudioSink,
    T: StepTimers,
{
    pub fn new<F>(
        mut core: C,
        timers: T,
        open_sink: F,
        config: SyncConfig,
    ) -> Result<Self, PlaybackError>
    where
        F: FnMut() -> Result<S, SinkError> + 'static,
    {
        config.validate()?;

        let samples = SampleMailbox::new();
        core.register_sample_callback(samples.callback());

        Ok(Self {
            core,
            samples,
            sink: None,
            open_sink: Box::new(open_sink),
            timers,
            session: None,
            next_session_id: SessionId::default(),
            cursor: ScheduleCursor::new(),
            trigger: StepTrigger::new(config.lookahead_gap_ms),
            cartridge: None,
            stats: PlaybackStats::default(),
        })
    }

    /// Hand a cartridge image to the core. Only allowed while Idle.
    pub fn load(
        &mut self,
        rom: &[u8],
        settings: &EmulatorSettings,
    ) -> Result<RomMetadata, PlaybackError> {
        self.expect_status(PlaybackStatus::Idle, "load a cartridge")?;

        self.cartridge = None;
        let metadata = self.core.initialize(rom, settings)?;
        log::info!(
            "Cartridge loaded: \"{}\" ({:?}, {} Hz)",
            metadata.title,
            settings.mode,
            settings.audio_sample_rate
        );
        self.cartridge = Some(metadata.clone());
        Ok(metadata)
    }

    /// Idle -> Playing
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        self.expect_status(PlaybackStatus::Idle, "play")?;
        if self.cartridge.is_none() {
            return Err(PlaybackError::NoCartridge);
        }

        if self.sink.is_none() {
            let sink = (self.open_sink)().map_err(PlaybackError::SinkOpen)?;
            log::info!("Audio output open at {} Hz", sink.sample_rate());
            self.sink = Some(sink);
        }

        let id = self.next_session_id;
        self.next_session_id = id.next();
        self.session = Some(PlaybackSession::start(id));
        self.cursor.reset();
        self.trigger.disarm();
        self.samples.clear();
        log::info!("Session {} started", id);

        self.on_session_start()
    }

    /// Playing -> Paused. Timers already armed still fire and do nothing.
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.expect_status(PlaybackStatus::Playing, "pause")?;
        if let Some(session) = self.session.as_mut() {
            session.status = PlaybackStatus::Paused;
            log::debug!("Session {} paused", session.id);
        }
        Ok(())
    }

    /// Paused -> Playing. Scheduling restarts from the sink's current time
    /// since no audio was produced while paused.
    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        self.expect_status(PlaybackStatus::Paused, "resume")?;
        if let Some(session) = self.session.as_mut() {
            session.status = PlaybackStatus::Playing;
            log::debug!("Session {} resumed", session.id);
        }
        self.cursor.reset();
        self.trigger.disarm();

        self.on_session_start()
    }

    /// Back to Idle, deferred while a buffer is in flight
    pub fn reset(&mut self) -> Result<ResetOutcome, PlaybackError> {
        Ok(self.request_reset())
    }

    /// Entry point for every timer armed through `StepTimers`
    pub fn on_timer(&mut self, timer: StepTimer) -> Result<(), PlaybackError> {
        self.request_next_step(timer)
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session
            .as_ref()
            .map_or(PlaybackStatus::Idle, |s| s.status)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn pending_reset(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.pending_reset)
    }

    pub fn cursor(&self) -> &ScheduleCursor {
        &self.cursor
    }

    pub fn cartridge(&self) -> Option<&RomMetadata> {
        self.cartridge.as_ref()
    }

    pub fn stats(&self) -> PlaybackStats {
        self.stats
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut C {
        &mut self.core
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    fn expect_status(
        &self,
        expected: PlaybackStatus,
        action: &'static str,
    ) -> Result<(), PlaybackError> {
        let status = self.status();
        if status != expected {
            return Err(PlaybackError::InvalidTransition { status, action });
        }
        Ok(())
    }

    pub(crate) fn end_session(&mut self) {
        self.session = None;
        self.trigger.disarm();
        self.cursor.reset();
        self.samples.clear();
    }

    /// Tear the session down after the sink failed. The sink is dropped so
    /// the next `play()` opens a fresh one.
    pub(crate) fn halt(&mut self, error: SinkError) -> PlaybackError {
        match self.session.as_ref() {
            Some(session) => log::warn!("Session {} halted: {}", session.id, error),
            None => log::warn!("Playback halted: {}", error),
        }
        self.stats.halts += 1;
        self.end_session();
        self.sink = None;
        PlaybackError::Halted(error)
    }
}
