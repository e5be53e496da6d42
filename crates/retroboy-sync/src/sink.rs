use crate::error::SinkError;

/// Host audio output with its own clock.
///
/// All times are seconds in the sink's clock domain. The clock must be
/// monotonic; it does not need to start at zero.
pub trait AudioSink {
    fn now(&self) -> f64;

    fn sample_rate(&self) -> u32;

    /// Queue a stereo buffer to start playing at `start_time`. A start time
    /// already in the past plays immediately. `left` and `right` have the
    /// same length, which is the buffer's frame count.
    fn schedule_buffer(&mut self, left: &[f32], right: &[f32], start_time: f64)
    -> Result<(), SinkError>;
}

/// Lets a boxed sink stand in wherever a concrete sink is expected
impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn schedule_buffer(
        &mut self,
        left: &[f32],
        right: &[f32],
        start_time: f64,
    ) -> Result<(), SinkError> {
        (**self).schedule_buffer(left, right, start_time)
    }
}
