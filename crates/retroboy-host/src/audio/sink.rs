use crate::audio::driver::AudioDriver;
use crate::audio::mixer::{AudioClock, Clip, ScheduledMixer, SharedClock};
use crossbeam_channel::Sender;
use retroboy_sync::prelude::*;
use std::sync::{Arc, Mutex};

/// First error reported by the output stream
#[derive(Debug, Default)]
pub struct StreamFault {
    message: Mutex<Option<String>>,
}

impl StreamFault {
    pub fn raise(&self, message: String) {
        let mut slot = self.message.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(message);
        }
    }

    pub fn message(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// [`AudioSink`] over a cpal stream. Buffers become [`Clip`]s placed on the
/// stream's own frame clock.
pub struct CpalSink {
    clips_tx: Sender<Clip>,
    clock: SharedClock,
    fault: Arc<StreamFault>,

    // keep-alive
    _stream: cpal::Stream,
}

impl CpalSink {
    pub fn open(driver: &AudioDriver) -> anyhow::Result<Self> {
        let (clips_tx, clips_rx) = crossbeam_channel::unbounded();
        let clock = Arc::new(AudioClock::new(driver.sample_rate()));
        let fault = Arc::new(StreamFault::default());

        let mixer = ScheduledMixer::new(clips_rx, clock.clone(), driver.channels() as usize);
        let stream = driver.start(mixer, fault.clone())?;

        Ok(Self {
            clips_tx,
            clock,
            fault,
            _stream: stream,
        })
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }
}

impl AudioSink for CpalSink {
    fn now(&self) -> f64 {
        self.clock.seconds()
    }

    fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    fn schedule_buffer(
        &mut self,
        left: &[f32],
        right: &[f32],
        start_time: f64,
    ) -> Result<(), SinkError> {
        if let Some(message) = self.fault.message() {
            return Err(SinkError::Device(message));
        }
        if left.len() != right.len() {
            return Err(SinkError::InvalidBuffer(format!(
                "channel lengths differ (left={}, right={})",
                left.len(),
                right.len()
            )));
        }

        let clip = Clip {
            start_frame: self.clock.frame_at(start_time),
            left: left.to_vec(),
            right: right.to_vec(),
        };
        self.clips_tx.send(clip).map_err(|_| SinkError::Closed)
    }
}
