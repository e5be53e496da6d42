use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Receives one stereo slice of generated audio (left, right)
pub type SampleCallback = Box<dyn FnMut(&[f32], &[f32]) + 'static>;

/// The emulation engine being paced.
///
/// Everything behind this trait (CPU, picture and audio generation, save
/// states) is opaque to the scheduler. The scheduler only relies on:
///
/// - `step_until_next_audio_buffer` running synchronously and invoking the
///   registered sample callback zero or one time before it returns
/// - `register_sample_callback` being called exactly once, before any step
pub trait EmulationCore {
    /// Load a cartridge image. The scheduler will not start a session
    /// unless this succeeded.
    fn initialize(&mut self, rom: &[u8], settings: &EmulatorSettings)
    -> Result<RomMetadata, CoreError>;

    fn register_sample_callback(&mut self, callback: SampleCallback);

    /// Run enough instructions to fill one audio buffer
    fn step_until_next_audio_buffer(&mut self);

    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    #[serde(rename = "DMG")]
    Dmg,
    #[serde(rename = "CGB")]
    Cgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorSettings {
    pub mode: Mode,
    pub audio_sample_rate: u32,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Dmg,
            audio_sample_rate: 48_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomMetadata {
    pub title: String,
    pub has_battery: bool,
}

impl RomMetadata {
    pub fn new(title: impl Into<String>, has_battery: bool) -> Self {
        Self {
            title: title.into(),
            has_battery,
        }
    }
}

/// One stereo chunk of audio produced by a single core step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl SampleBuffer {
    /// Build a buffer from the two channel slices handed to the sample
    /// callback. Channels of unequal length are cut to the shorter one.
    pub fn from_channels(left: &[f32], right: &[f32]) -> Self {
        let frames = left.len().min(right.len());
        if left.len() != right.len() {
            log::warn!(
                "Sample channels differ in length (left={}, right={}), keeping {} frames",
                left.len(),
                right.len(),
                frames
            );
        }
        Self {
            left: left[..frames].to_vec(),
            right: right[..frames].to_vec(),
        }
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Playback length in seconds at `sample_rate`
    pub fn duration(&self, sample_rate: u32) -> f64 {
        self.frame_count() as f64 / sample_rate as f64
    }
}

/// Controller-scoped landing spot for buffers delivered through the
/// registered sample callback. Drained after every step.
#[derive(Clone, Default)]
pub(crate) struct SampleMailbox {
    queue: Rc<RefCell<VecDeque<SampleBuffer>>>,
}

impl SampleMailbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn callback(&self) -> SampleCallback {
        let queue = self.queue.clone();
        Box::new(move |left: &[f32], right: &[f32]| {
            queue
                .borrow_mut()
                .push_back(SampleBuffer::from_channels(left, right));
        })
    }

    pub(crate) fn take(&self) -> Option<SampleBuffer> {
        self.queue.borrow_mut().pop_front()
    }

    pub(crate) fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}
