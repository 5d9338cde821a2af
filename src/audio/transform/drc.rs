use super::DynamicRangeProcessor;
use crate::audio::constants::{INT16_MAX_F, INT16_MIN_F, INT16_SCALE};
use crate::common::{SsrError, SsrResult};

fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.max(1e-10).log10()
}

/// Feed-forward compressor shared across all channels of a frame.
///
/// The envelope follows the loudest channel so the spatial image is
/// preserved: every channel of a frame receives the same gain.
pub struct EnvelopeDrc {
    channels: usize,
    sample_rate: u32,
    threshold_db: f32,
    ratio: f32,
    attack_secs: f32,
    release_secs: f32,
    makeup_db: f32,

    envelope: f32,
}

impl EnvelopeDrc {
    pub fn new(channels: usize, sample_rate: u32) -> SsrResult<Self> {
        if channels == 0 || sample_rate == 0 {
            return Err(SsrError::LibraryInit {
                library: "drc processor",
                code: -22,
            });
        }
        Ok(Self {
            channels,
            sample_rate,
            threshold_db: -12.0,
            ratio: 4.0,
            attack_secs: 0.005,
            release_secs: 0.1,
            makeup_db: 0.0,
            envelope: 0.0,
        })
    }

    /// Apply one `key = value` entry from a DRC tuning file.
    pub fn apply_tuning(&mut self, key: &str, value: &str) -> bool {
        let Ok(v) = value.parse::<f32>() else {
            return false;
        };
        if !v.is_finite() {
            return false;
        }
        match key {
            "threshold_db" => self.threshold_db = v.min(0.0),
            "ratio" => self.ratio = v.max(1.0),
            "attack_ms" => self.attack_secs = (v / 1000.0).max(0.0001),
            "release_ms" => self.release_secs = (v / 1000.0).max(0.001),
            "makeup_db" => self.makeup_db = v,
            _ => return false,
        }
        true
    }

    fn coefficient(&self, secs: f32) -> f32 {
        (-1.0 / (secs * self.sample_rate as f32)).exp()
    }
}

impl DynamicRangeProcessor for EnvelopeDrc {
    fn process(&mut self, samples: &mut [i16]) -> SsrResult<()> {
        if samples.len() % self.channels != 0 {
            return Err(SsrError::Transform(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                self.channels
            )));
        }

        let attack_coef = self.coefficient(self.attack_secs);
        let release_coef = self.coefficient(self.release_secs);
        let makeup_gain = db_to_gain(self.makeup_db);

        for frame in samples.chunks_exact_mut(self.channels) {
            let peak = frame
                .iter()
                .map(|&s| (s as f32 / INT16_SCALE).abs())
                .fold(0.0f32, f32::max);

            let coef = if peak > self.envelope {
                attack_coef
            } else {
                release_coef
            };
            self.envelope = coef * (self.envelope - peak) + peak;

            let envelope_db = gain_to_db(self.envelope);
            let reduction_db = if envelope_db > self.threshold_db {
                (self.threshold_db - envelope_db) * (1.0 - 1.0 / self.ratio)
            } else {
                0.0
            };
            let gain = db_to_gain(reduction_db) * makeup_gain;

            for sample in frame.iter_mut() {
                *sample = (*sample as f32 * gain).clamp(INT16_MIN_F, INT16_MAX_F) as i16;
            }
        }
        Ok(())
    }
}
