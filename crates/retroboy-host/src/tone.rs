use retroboy_sync::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// DMG master clock; edges are placed on this timeline
const CLOCK_HZ: f64 = 4_194_304.0;

const TITLE: Range<usize> = 0x134..0x144;
const CGB_FLAG_INDEX: usize = 15;
const CARTRIDGE_TYPE: usize = 0x147;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub frequency_hz: f64,
    /// 0.0 - 1.0
    pub volume: f32,
    /// Frames delivered per step
    pub buffer_frames: usize,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            volume: 0.2,
            buffer_frames: 1024,
        }
    }
}

impl ToneConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.frequency_hz.is_finite() || self.frequency_hz <= 0.0 {
            anyhow::bail!("tone frequency must be positive (got {})", self.frequency_hz);
        }
        if !(0.0..=1.0).contains(&self.volume) {
            anyhow::bail!("tone volume must be within 0.0-1.0 (got {})", self.volume);
        }
        if self.buffer_frames == 0 {
            anyhow::bail!("tone buffer_frames must be non-zero");
        }
        Ok(())
    }
}

/// Stand-in emulation core: a band-limited square wave.
///
/// Exercises the whole scheduling path (fixed-size buffers, one callback per
/// step, reset) without an emulator behind it.
pub struct ToneCore {
    config: ToneConfig,
    blip: blip_buf::BlipBuf,
    callback: Option<SampleCallback>,
    loaded: bool,

    amplitude: i32,
    level: i32,
    next_edge: f64,

    scratch_i16: Vec<i16>,
    samples: Vec<f32>,
}

impl ToneCore {
    pub fn new(config: ToneConfig) -> Self {
        let frames = config.buffer_frames.max(1);
        let mut blip = blip_buf::BlipBuf::new((frames * 2) as u32);
        blip.set_rates(CLOCK_HZ, 48_000.0);

        Self {
            amplitude: (config.volume.clamp(0.0, 1.0) * 16_384.0) as i32,
            config,
            blip,
            callback: None,
            loaded: false,
            level: 0,
            next_edge: 0.0,
            scratch_i16: vec![0; frames],
            samples: Vec::with_capacity(frames),
        }
    }

    fn synthesize(&mut self, clocks: u32) {
        let half_period = CLOCK_HZ / (2.0 * self.config.frequency_hz);
        let end = clocks as f64;

        let mut t = self.next_edge;
        while t < end {
            let target = if self.level > 0 {
                -self.amplitude
            } else {
                self.amplitude
            };
            self.blip.add_delta(t as u32, target - self.level);
            self.level = target;
            t += half_period;
        }
        self.next_edge = t - end;
    }

    fn clear_waveform(&mut self) {
        self.blip.clear();
        self.level = 0;
        self.next_edge = 0.0;
    }
}

impl EmulationCore for ToneCore {
    fn initialize(
        &mut self,
        rom: &[u8],
        settings: &EmulatorSettings,
    ) -> Result<RomMetadata, CoreError> {
        if settings.audio_sample_rate == 0 {
            return Err(CoreError::new("audio sample rate must be non-zero"));
        }
        self.blip
            .set_rates(CLOCK_HZ, settings.audio_sample_rate as f64);
        self.clear_waveform();
        self.loaded = true;

        let metadata = read_header(rom).unwrap_or_else(|| RomMetadata::new("TONE", false));
        log::debug!(
            "Tone core ready: {} Hz square at {} Hz ({:?})",
            self.config.frequency_hz,
            settings.audio_sample_rate,
            settings.mode
        );
        Ok(metadata)
    }

    fn register_sample_callback(&mut self, callback: SampleCallback) {
        self.callback = Some(callback);
    }

    fn step_until_next_audio_buffer(&mut self) {
        if !self.loaded {
            return;
        }

        let frames = self.config.buffer_frames;
        let available = self.blip.samples_avail();
        if available < frames as u32 {
            let clocks = self.blip.clocks_needed(frames as u32 - available);
            self.synthesize(clocks);
            self.blip.end_frame(clocks);
        }

        let got = self
            .blip
            .read_samples(&mut self.scratch_i16[..frames], false);

        // Scale to [-1.0, 1.0)
        self.samples.clear();
        self.samples
            .extend(self.scratch_i16[..got].iter().map(|&s| s as f32 / 32768.0));

        if let Some(callback) = self.callback.as_mut() {
            callback(&self.samples, &self.samples);
        }
    }

    fn reset(&mut self) {
        self.clear_waveform();
        self.loaded = false;
    }
}

/// Title and battery flag from a cartridge header, if the image has one
fn read_header(rom: &[u8]) -> Option<RomMetadata> {
    let type_code = *rom.get(CARTRIDGE_TYPE)?;
    let title: String = rom[TITLE]
        .iter()
        .enumerate()
        .take_while(|&(i, &b)| b != 0 && !(i == CGB_FLAG_INDEX && (b == 0x80 || b == 0xC0)))
        .map(|(_, &b)| b as char)
        .collect();

    let has_battery = matches!(type_code, 0x03 | 0x06 | 0x09 | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E);
    Some(RomMetadata::new(title.trim_end(), has_battery))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_core(config: ToneConfig) -> (ToneCore, Rc<RefCell<Vec<Vec<f32>>>>) {
        let buffers = Rc::new(RefCell::new(Vec::new()));
        let sink = buffers.clone();
        let mut core = ToneCore::new(config);
        core.register_sample_callback(Box::new(move |left: &[f32], right: &[f32]| {
            assert_eq!(left, right);
            sink.borrow_mut().push(left.to_vec());
        }));
        (core, buffers)
    }

    fn header(title: &[u8], type_code: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x150];
        rom[TITLE.start..TITLE.start + title.len()].copy_from_slice(title);
        rom[CARTRIDGE_TYPE] = type_code;
        rom
    }

    #[test]
    fn one_full_buffer_per_step() {
        let (mut core, buffers) = recording_core(ToneConfig {
            buffer_frames: 800,
            ..ToneConfig::default()
        });
        core.initialize(&[], &EmulatorSettings::default()).unwrap();

        for _ in 0..5 {
            core.step_until_next_audio_buffer();
        }

        let buffers = buffers.borrow();
        assert_eq!(buffers.len(), 5);
        assert!(buffers.iter().all(|b| b.len() == 800));
    }

    #[test]
    fn square_wave_is_audible_and_bounded() {
        let (mut core, buffers) = recording_core(ToneConfig {
            volume: 0.5,
            ..ToneConfig::default()
        });
        core.initialize(&[], &EmulatorSettings::default()).unwrap();
        for _ in 0..4 {
            core.step_until_next_audio_buffer();
        }

        let peak = buffers
            .borrow()
            .iter()
            .flatten()
            .fold(0.0f32, |peak, s| peak.max(s.abs()));
        assert!(peak > 0.2, "peak {peak}");
        assert!(peak < 0.5, "peak {peak}");
    }

    #[test]
    fn silent_until_loaded() {
        let (mut core, buffers) = recording_core(ToneConfig::default());
        core.step_until_next_audio_buffer();
        assert!(buffers.borrow().is_empty());
    }

    #[test]
    fn reset_unloads() {
        let (mut core, buffers) = recording_core(ToneConfig::default());
        core.initialize(&[], &EmulatorSettings::default()).unwrap();
        core.reset();
        core.step_until_next_audio_buffer();
        assert!(buffers.borrow().is_empty());
    }

    #[test]
    fn zero_sample_rate_rejected() {
        let mut core = ToneCore::new(ToneConfig::default());
        let settings = EmulatorSettings {
            audio_sample_rate: 0,
            ..EmulatorSettings::default()
        };
        assert!(core.initialize(&[], &settings).is_err());
    }

    #[test]
    fn empty_image_is_named_tone() {
        let mut core = ToneCore::new(ToneConfig::default());
        let metadata = core.initialize(&[], &EmulatorSettings::default()).unwrap();
        assert_eq!(metadata, RomMetadata::new("TONE", false));
    }

    #[test]
    fn header_title_and_battery() {
        let rom = header(b"POKEMON RED", 0x13);
        assert_eq!(
            read_header(&rom),
            Some(RomMetadata::new("POKEMON RED", true))
        );

        let rom = header(b"TETRIS", 0x00);
        assert_eq!(read_header(&rom), Some(RomMetadata::new("TETRIS", false)));
    }

    #[test]
    fn cgb_flag_is_not_part_of_title() {
        let mut title = *b"ABCDEFGHIJKLMNOP";
        title[CGB_FLAG_INDEX] = 0x80;
        let rom = header(&title, 0x1B);
        assert_eq!(
            read_header(&rom),
            Some(RomMetadata::new("ABCDEFGHIJKLMNO", true))
        );
    }

    #[test]
    fn config_validation() {
        assert!(ToneConfig::default().validate().is_ok());
        let bad = ToneConfig {
            volume: 1.5,
            ..ToneConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = ToneConfig {
            buffer_frames: 0,
            ..ToneConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
