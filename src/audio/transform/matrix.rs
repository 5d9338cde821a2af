use super::SurroundProcessor;
use crate::audio::constants::{
    INT16_MAX_F, INT16_MIN_F, NUM_IN_CHANNELS, SSR_CHANNEL_OUTPUT_NUM, SSR_STEREO_OUTPUT_NUM,
};
use crate::common::{SsrError, SsrResult};

const PARAM_GAIN: &str = "ssr.gain";
const PARAM_WIDTH: &str = "ssr.width";
const PARAM_NAMES: &[&str] = &[PARAM_GAIN, PARAM_WIDTH];

const MAX_GAIN_DB: f32 = 24.0;

/// One-pole smoothing coefficient for the LFE feed.
const LFE_SMOOTHING: f32 = 0.05;

/// LFE channel index in the 5.1 layout (FL, FR, FC, LFE, BL, BR).
const LFE_INDEX: usize = 3;

fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Fixed-matrix beamformer for a left/right/back microphone triangle.
///
/// Each output channel is a weighted sum of the three capsules; `ssr.width`
/// moves the front pair between mono (0.0) and fully separated (1.0) and
/// `ssr.gain` applies a make-up gain in dB.
pub struct MatrixSurround {
    out_channels: usize,
    gain_db: f32,
    width: f32,
    weights: Vec<[f32; NUM_IN_CHANNELS]>,
    lfe_state: f32,
}

impl MatrixSurround {
    pub fn new(in_channels: usize, out_channels: usize) -> SsrResult<Self> {
        if in_channels != NUM_IN_CHANNELS {
            return Err(SsrError::LibraryInit {
                library: "surround processor",
                code: -22,
            });
        }
        if out_channels != SSR_CHANNEL_OUTPUT_NUM && out_channels != SSR_STEREO_OUTPUT_NUM {
            return Err(SsrError::LibraryInit {
                library: "surround processor",
                code: -22,
            });
        }

        let mut surround = Self {
            out_channels,
            gain_db: 0.0,
            width: 1.0,
            weights: Vec::new(),
            lfe_state: 0.0,
        };
        surround.rebuild_weights();
        Ok(surround)
    }

    fn rebuild_weights(&mut self) {
        let g = db_to_gain(self.gain_db);
        let near = 0.5 + self.width / 2.0;
        let far = 0.5 - self.width / 2.0;

        let rows: Vec<[f32; NUM_IN_CHANNELS]> = if self.out_channels == SSR_STEREO_OUTPUT_NUM {
            vec![[near, far, 0.0], [far, near, 0.0]]
        } else {
            vec![
                [near, far, 0.0],
                [far, near, 0.0],
                [0.5, 0.5, 0.0],
                [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
                [0.3, 0.0, 0.7],
                [0.0, 0.3, 0.7],
            ]
        };

        self.weights = rows
            .into_iter()
            .map(|row| [row[0] * g, row[1] * g, row[2] * g])
            .collect();
    }
}

impl SurroundProcessor for MatrixSurround {
    fn process(&mut self, input: &[i16], output: &mut [i16]) {
        let frames = (input.len() / NUM_IN_CHANNELS).min(output.len() / self.out_channels);

        for (mics, out) in input
            .chunks_exact(NUM_IN_CHANNELS)
            .zip(output.chunks_exact_mut(self.out_channels))
            .take(frames)
        {
            for (ch, (sample, w)) in out.iter_mut().zip(&self.weights).enumerate() {
                let mut acc =
                    mics[0] as f32 * w[0] + mics[1] as f32 * w[1] + mics[2] as f32 * w[2];
                if self.out_channels == SSR_CHANNEL_OUTPUT_NUM && ch == LFE_INDEX {
                    self.lfe_state += LFE_SMOOTHING * (acc - self.lfe_state);
                    acc = self.lfe_state;
                }
                *sample = acc.clamp(INT16_MIN_F, INT16_MAX_F) as i16;
            }
        }

        output[frames * self.out_channels..].fill(0);
    }

    fn param_names(&self) -> &'static [&'static str] {
        PARAM_NAMES
    }

    fn set_param(&mut self, name: &str, value: &str) -> bool {
        let Ok(parsed) = value.trim().parse::<f32>() else {
            return false;
        };
        if !parsed.is_finite() {
            return false;
        }

        match name {
            PARAM_GAIN => self.gain_db = parsed.clamp(-MAX_GAIN_DB, MAX_GAIN_DB),
            PARAM_WIDTH => self.width = parsed.clamp(0.0, 1.0),
            _ => return false,
        }
        self.rebuild_weights();
        true
    }

    fn get_param(&self, name: &str) -> Option<String> {
        match name {
            PARAM_GAIN => Some(self.gain_db.to_string()),
            PARAM_WIDTH => Some(self.width.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(MatrixSurround::new(2, 6).is_err());
        assert!(MatrixSurround::new(3, 5).is_err());
    }

    #[test]
    fn test_stereo_full_width_separates_front_mics() {
        let mut surround = MatrixSurround::new(3, 2).unwrap();
        let input = [1000, -1000, 500, 2000, 0, 0];
        let mut output = [0i16; 4];
        surround.process(&input, &mut output);
        assert_eq!(output, [1000, -1000, 2000, 0]);
    }

    #[test]
    fn test_zero_width_is_mono() {
        let mut surround = MatrixSurround::new(3, 2).unwrap();
        assert!(surround.set_param("ssr.width", "0"));
        let input = [1000, 0, 0];
        let mut output = [0i16; 2];
        surround.process(&input, &mut output);
        assert_eq!(output, [500, 500]);
    }

    #[test]
    fn test_output_clamps() {
        let mut surround = MatrixSurround::new(3, 2).unwrap();
        assert!(surround.set_param("ssr.gain", "24"));
        let input = [i16::MAX, i16::MAX, 0];
        let mut output = [0i16; 2];
        surround.process(&input, &mut output);
        assert_eq!(output, [i16::MAX, i16::MAX]);
    }

    #[test]
    fn test_six_channel_layout() {
        let mut surround = MatrixSurround::new(3, 6).unwrap();
        let input = [0, 0, 1000];
        let mut output = [0i16; 6];
        surround.process(&input, &mut output);
        // Back mic only reaches the rear pair and the (smoothed) LFE.
        assert_eq!(output[0], 0);
        assert_eq!(output[1], 0);
        assert_eq!(output[2], 0);
        assert!(output[3] > 0 && output[3] < 100);
        assert!((699..=700).contains(&output[4]));
        assert_eq!(output[4], output[5]);
    }

    #[test]
    fn test_short_input_zero_fills_output() {
        let mut surround = MatrixSurround::new(3, 2).unwrap();
        let input = [100, 100, 100];
        let mut output = [7i16; 6];
        surround.process(&input, &mut output);
        assert_eq!(output, [100, 100, 0, 0, 0, 0]);
    }

    #[test]
    fn test_params() {
        let mut surround = MatrixSurround::new(3, 6).unwrap();
        assert_eq!(surround.param_names(), &["ssr.gain", "ssr.width"]);
        assert!(!surround.set_param("ssr.gain", "loud"));
        assert!(!surround.set_param("ssr.unknown", "1"));
        assert!(surround.set_param("ssr.width", "3"));
        assert_eq!(surround.get_param("ssr.width").as_deref(), Some("1"));
        assert_eq!(surround.get_param("ssr.gain").as_deref(), Some("0"));
        assert_eq!(surround.get_param("ssr.unknown"), None);
    }
}
