use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Frames rendered by the output stream so far.
///
/// Written only by the audio callback, read by the scheduler thread. This is
/// the clock every scheduled start time refers to.
#[derive(Debug)]
pub struct AudioClock {
    frames: AtomicU64,
    sample_rate: u32,
}

impl AudioClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate: sample_rate.max(1),
        }
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Frame index of a point on this clock's timeline
    pub fn frame_at(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate as f64).round().max(0.0) as u64
    }

    fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Release);
    }
}

pub type SharedClock = Arc<AudioClock>;

/// One scheduled buffer waiting for (or in the middle of) playback
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub start_frame: u64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl Clip {
    #[inline]
    pub fn len(&self) -> u64 {
        self.left.len().min(self.right.len()) as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.len()
    }
}

/// Audio-callback side of the native sink.
///
/// Clips arrive over a channel tagged with the frame they must start on.
/// Each callback mixes whatever overlaps the block being rendered, then moves
/// the shared clock forward by the block length.
pub struct ScheduledMixer {
    clips_rx: Receiver<Clip>,
    active: Vec<Clip>,
    clock: SharedClock,
    channels: usize,

    scratch_left: Vec<f32>,
    scratch_right: Vec<f32>,
    late_clips: u64,
}

impl ScheduledMixer {
    pub fn new(clips_rx: Receiver<Clip>, clock: SharedClock, channels: usize) -> Self {
        Self {
            clips_rx,
            active: Vec::new(),
            clock,
            channels: channels.max(1),
            scratch_left: Vec::new(),
            scratch_right: Vec::new(),
            late_clips: 0,
        }
    }

    /// Fill one interleaved output block
    pub fn render<T>(&mut self, data: &mut [T])
    where
        T: Sample + SizedSample + FromSample<f32>,
    {
        let channels = self.channels;
        let frames = data.len() / channels;
        let now = self.clock.frames();

        self.receive(now);
        self.mix(now, frames);

        for (i, frame) in data.chunks_exact_mut(channels).enumerate() {
            let left = self.scratch_left[i].clamp(-1.0, 1.0);
            let right = self.scratch_right[i].clamp(-1.0, 1.0);
            match frame {
                [mono] => *mono = T::from_sample((left + right) * 0.5),
                [l, r, rest @ ..] => {
                    *l = T::from_sample(left);
                    *r = T::from_sample(right);
                    for out in rest {
                        *out = T::EQUILIBRIUM;
                    }
                }
                [] => {}
            }
        }
        // Trailing samples of a partial frame
        for out in data.chunks_exact_mut(channels).into_remainder() {
            *out = T::EQUILIBRIUM;
        }

        self.clock.advance(frames as u64);
    }

    /// Clips received so far that were already due when they arrived
    pub fn late_clips(&self) -> u64 {
        self.late_clips
    }

    pub fn active_clips(&self) -> usize {
        self.active.len()
    }

    fn receive(&mut self, now: u64) {
        while let Ok(mut clip) = self.clips_rx.try_recv() {
            if clip.is_empty() {
                continue;
            }
            // Play late clips right away rather than dropping their head
            if clip.start_frame < now {
                clip.start_frame = now;
                self.late_clips += 1;
            }
            self.active.push(clip);
        }
    }

    fn mix(&mut self, now: u64, frames: usize) {
        self.scratch_left.clear();
        self.scratch_left.resize(frames, 0.0);
        self.scratch_right.clear();
        self.scratch_right.resize(frames, 0.0);

        let end = now + frames as u64;
        for clip in &self.active {
            if clip.start_frame >= end {
                continue;
            }
            let from = clip.start_frame.max(now);
            let out_offset = (from - now) as usize;
            let clip_offset = (from - clip.start_frame) as usize;
            let count = (clip.len() as usize - clip_offset).min(frames - out_offset);

            let left = &clip.left[clip_offset..clip_offset + count];
            let right = &clip.right[clip_offset..clip_offset + count];
            for (out, s) in self.scratch_left[out_offset..].iter_mut().zip(left) {
                *out += s;
            }
            for (out, s) in self.scratch_right[out_offset..].iter_mut().zip(right) {
                *out += s;
            }
        }

        self.active.retain(|clip| clip.end_frame() > end);
    }
}
