use crate::audio::mixer::ScheduledMixer;
use crate::audio::sink::StreamFault;
use anyhow::{Context, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::Arc;

/// The default output device and the stream format it prefers
pub struct AudioDriver {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
}

impl AudioDriver {
    pub fn init() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device available")?;
        let config = device
            .default_output_config()
            .context("Failed to query the default output config")?;

        log::debug!(
            "Output device: {} channel(s), {} Hz, {:?}",
            config.channels(),
            config.sample_rate(),
            config.sample_format()
        );
        Ok(Self { device, config })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    /// Start a stream rendering `mixer`. Stream errors are logged and parked
    /// in `fault` for the scheduler thread to pick up.
    pub fn start(&self, mixer: ScheduledMixer, fault: Arc<StreamFault>) -> anyhow::Result<Stream> {
        let config: StreamConfig = self.config.clone().into();
        let stream = match self.config.sample_format() {
            SampleFormat::F32 => self.build::<f32>(&config, mixer, fault)?,
            SampleFormat::I16 => self.build::<i16>(&config, mixer, fault)?,
            SampleFormat::U16 => self.build::<u16>(&config, mixer, fault)?,
            other => bail!("Unsupported sample format: {other:?}"),
        };
        stream.play().context("Failed to start the output stream")?;
        Ok(stream)
    }

    fn build<T>(
        &self,
        config: &StreamConfig,
        mut mixer: ScheduledMixer,
        fault: Arc<StreamFault>,
    ) -> anyhow::Result<Stream>
    where
        T: Sample + SizedSample + FromSample<f32>,
    {
        let stream = self
            .device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| mixer.render(data),
                move |err| {
                    log::error!("Audio stream error: {}", err);
                    fault.raise(err.to_string());
                },
                None,
            )
            .context("Failed to build the output stream")?;
        Ok(stream)
    }
}
