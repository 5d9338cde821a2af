use serde::{Deserialize, Serialize};

use crate::audio::constants::{
    DEFAULT_DRC_CFG_DIR, DEFAULT_DUMP_DIR, DEFAULT_SURROUND_CFG_DIR, NUM_IN_BUFS, NUM_IN_CHANNELS,
    NUM_OUT_BUFS, SSR_PERIOD_SIZE,
};
use crate::common::{SsrError, SsrResult};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SsrConfig {
    /// Whether the device supports surround record at all.
    #[serde(default)]
    pub enabled: bool,
    /// Dump raw and processed PCM to `dump_dir`.
    #[serde(default)]
    pub pcm_dump: bool,
    #[serde(default = "default_dump_dir")]
    pub dump_dir: String,
    /// Run the DRC stage after the surround transform when it is available.
    #[serde(default = "default_true")]
    pub drc: bool,
    #[serde(default = "default_period_size")]
    pub period_size: usize,
    #[serde(default = "default_input_channels")]
    pub input_channels: usize,
    #[serde(default = "default_input_buffers")]
    pub input_buffers: usize,
    #[serde(default = "default_output_buffers")]
    pub output_buffers: usize,
    #[serde(default = "default_surround_cfg_dir")]
    pub surround_cfg_dir: String,
    #[serde(default = "default_drc_cfg_dir")]
    pub drc_cfg_dir: String,
}

impl SsrConfig {
    pub fn validate(&self) -> SsrResult<()> {
        if self.period_size == 0 {
            return Err(SsrError::Config("ssr.period_size must be non-zero".into()));
        }
        if self.input_channels == 0 {
            return Err(SsrError::Config(
                "ssr.input_channels must be non-zero".into(),
            ));
        }
        if self.input_buffers == 0 || self.output_buffers == 0 {
            return Err(SsrError::Config(
                "ssr.input_buffers and ssr.output_buffers must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Bytes in one raw multi-mic capture period.
    pub fn input_period_bytes(&self) -> usize {
        self.period_size * self.input_channels * std::mem::size_of::<i16>()
    }
}

impl Default for SsrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pcm_dump: false,
            dump_dir: default_dump_dir(),
            drc: true,
            period_size: default_period_size(),
            input_channels: default_input_channels(),
            input_buffers: default_input_buffers(),
            output_buffers: default_output_buffers(),
            surround_cfg_dir: default_surround_cfg_dir(),
            drc_cfg_dir: default_drc_cfg_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_dump_dir() -> String {
    DEFAULT_DUMP_DIR.to_string()
}

fn default_period_size() -> usize {
    SSR_PERIOD_SIZE
}

fn default_input_channels() -> usize {
    NUM_IN_CHANNELS
}

fn default_input_buffers() -> usize {
    NUM_IN_BUFS
}

fn default_output_buffers() -> usize {
    NUM_OUT_BUFS
}

fn default_surround_cfg_dir() -> String {
    DEFAULT_SURROUND_CFG_DIR.to_string()
}

fn default_drc_cfg_dir() -> String {
    DEFAULT_DRC_CFG_DIR.to_string()
}
