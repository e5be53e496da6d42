//! Recording stand-ins for the core, the sink and the timer host
use crate::emulation::{EmulationCore, EmulatorSettings, RomMetadata, SampleCallback};
use crate::error::{CoreError, SinkError};
use crate::sink::AudioSink;
use crate::sync::controller::SinkFactory;
use crate::sync::timer::{StepTimer, StepTimers};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Core that replays a script of buffer sizes.
///
/// Each step pops one entry: `Some(frames)` delivers a buffer of that many
/// frames (zero included), `None` delivers nothing. An exhausted script
/// delivers nothing.
#[derive(Default)]
pub struct ScriptedCore {
    script: VecDeque<Option<usize>>,
    callback: Option<SampleCallback>,
    init_error: Option<String>,
    pub steps: usize,
    pub resets: usize,
    pub initializations: usize,
    pub callback_registrations: usize,
    pub last_settings: Option<EmulatorSettings>,
}

impl ScriptedCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `count` buffers of `frames` frames each
    pub fn with_buffers(count: usize, frames: usize) -> Self {
        let mut core = Self::new();
        core.push_buffers(count, frames);
        core
    }

    pub fn failing(message: &str) -> Self {
        Self {
            init_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn push_buffers(&mut self, count: usize, frames: usize) {
        self.script.extend(std::iter::repeat_n(Some(frames), count));
    }

    pub fn push_silence(&mut self) {
        self.script.push_back(None);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl EmulationCore for ScriptedCore {
    fn initialize(
        &mut self,
        rom: &[u8],
        settings: &EmulatorSettings,
    ) -> Result<RomMetadata, CoreError> {
        self.initializations += 1;
        self.last_settings = Some(settings.clone());
        if let Some(message) = &self.init_error {
            return Err(CoreError::new(message.clone()));
        }
        Ok(RomMetadata::new(format!("SCRIPTED {}", rom.len()), false))
    }

    fn register_sample_callback(&mut self, callback: SampleCallback) {
        self.callback_registrations += 1;
        self.callback = Some(callback);
    }

    fn step_until_next_audio_buffer(&mut self) {
        self.steps += 1;
        if let Some(Some(frames)) = self.script.pop_front()
            && let Some(callback) = self.callback.as_mut()
        {
            let left = vec![0.25; frames];
            let right = vec![-0.25; frames];
            callback(&left, &right);
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBuffer {
    pub start_time: f64,
    pub frames: usize,
}

#[derive(Default)]
struct SinkState {
    scheduled: Vec<ScheduledBuffer>,
    failures: VecDeque<SinkError>,
    opens: usize,
}

/// Shared view of every [`ManualSink`] opened from one factory, plus the
/// clock they all read.
#[derive(Clone)]
pub struct SinkProbe {
    clock: Rc<Cell<f64>>,
    sample_rate: u32,
    state: Rc<RefCell<SinkState>>,
}

impl SinkProbe {
    pub fn new(start_time: f64, sample_rate: u32) -> Self {
        Self {
            clock: Rc::new(Cell::new(start_time)),
            sample_rate,
            state: Rc::new(RefCell::new(SinkState::default())),
        }
    }

    /// Sink factory for [`PlaybackController::new`](crate::PlaybackController::new)
    pub fn factory(&self) -> SinkFactory<ManualSink> {
        let probe = self.clone();
        Box::new(move || {
            probe.state.borrow_mut().opens += 1;
            Ok(ManualSink {
                probe: probe.clone(),
            })
        })
    }

    pub fn now(&self) -> f64 {
        self.clock.get()
    }

    pub fn set_time(&self, time: f64) {
        self.clock.set(time);
    }

    pub fn advance(&self, seconds: f64) {
        self.clock.set(self.clock.get() + seconds);
    }

    /// The next `schedule_buffer` call fails with `error`
    pub fn fail_next(&self, error: SinkError) {
        self.state.borrow_mut().failures.push_back(error);
    }

    pub fn scheduled(&self) -> Vec<ScheduledBuffer> {
        self.state.borrow().scheduled.clone()
    }

    pub fn start_times(&self) -> Vec<f64> {
        self.state
            .borrow()
            .scheduled
            .iter()
            .map(|b| b.start_time)
            .collect()
    }

    pub fn opens(&self) -> usize {
        self.state.borrow().opens
    }
}

pub struct ManualSink {
    probe: SinkProbe,
}

impl AudioSink for ManualSink {
    fn now(&self) -> f64 {
        self.probe.now()
    }

    fn sample_rate(&self) -> u32 {
        self.probe.sample_rate
    }

    fn schedule_buffer(
        &mut self,
        left: &[f32],
        right: &[f32],
        start_time: f64,
    ) -> Result<(), SinkError> {
        let mut state = self.probe.state.borrow_mut();
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        debug_assert_eq!(left.len(), right.len());
        state.scheduled.push(ScheduledBuffer {
            start_time,
            frames: left.len(),
        });
        Ok(())
    }
}

/// Timer host that only records; the test decides when timers fire
#[derive(Debug, Default)]
pub struct ManualTimers {
    armed: VecDeque<(Duration, StepTimer)>,
    pub total_armed: usize,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest timer still waiting to fire
    pub fn pop(&mut self) -> Option<(Duration, StepTimer)> {
        self.armed.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.armed.len()
    }
}

impl StepTimers for ManualTimers {
    fn arm(&mut self, delay: Duration, timer: StepTimer) {
        self.total_armed += 1;
        self.armed.push_back((delay, timer));
    }
}
