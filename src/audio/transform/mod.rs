//! Processing capability behind surround record.
//!
//! The worker thread drives two stages per period:
//!
//! | Stage | Trait | Required |
//! |---|---|---|
//! | 3-mic → 2/6 channel beamforming | [`SurroundProcessor`] | yes |
//! | dynamic range control, in place | [`DynamicRangeProcessor`] | no |
//!
//! Both are built by a [`TransformProvider`] chosen when the session context
//! is created. [`BuiltinTransforms`] ships software implementations;
//! [`UnavailableTransforms`] is the null provider that leaves the feature
//! disabled.

pub mod drc;
pub mod matrix;

pub use drc::EnvelopeDrc;
pub use matrix::MatrixSurround;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::audio::constants::{
    DRC_CFG_5_1, DRC_CFG_AZ, SSR_CHANNEL_OUTPUT_NUM, SSR_STEREO_OUTPUT_NUM, SURROUND_CFG_5_1,
    SURROUND_CFG_AZ,
};
use crate::common::{SsrError, SsrResult};

// ─── Processor traits ─────────────────────────────────────────────────────────

/// Turns one period of interleaved multi-mic PCM into multi-channel output.
pub trait SurroundProcessor: Send {
    /// `input` holds `period * in_channels` samples, `output` holds
    /// `period * out_channels` samples.
    fn process(&mut self, input: &[i16], output: &mut [i16]);

    /// Parameter keys this processor answers to, in a stable order.
    fn param_names(&self) -> &'static [&'static str];

    /// Apply a parameter. Returns `false` for unknown keys or unparsable values.
    fn set_param(&mut self, name: &str, value: &str) -> bool;

    fn get_param(&self, name: &str) -> Option<String>;
}

/// Applies gain control to interleaved PCM in place.
pub trait DynamicRangeProcessor: Send {
    fn process(&mut self, samples: &mut [i16]) -> SsrResult<()>;
}

pub type BoxedSurround = Box<dyn SurroundProcessor>;
pub type BoxedDrc = Box<dyn DynamicRangeProcessor>;

// ─── Provider ─────────────────────────────────────────────────────────────────

/// Geometry handed to a provider when a session is set up.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    pub in_channels: usize,
    pub out_channels: usize,
    pub period_size: usize,
    pub sample_rate: u32,
    /// Tuning file for the stage, when one exists for `out_channels`.
    pub cfg_path: Option<PathBuf>,
}

/// Capability interface for the processing stages.
pub trait TransformProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn surround(&self, spec: &TransformSpec) -> SsrResult<BoxedSurround>;

    fn drc(&self, spec: &TransformSpec) -> SsrResult<BoxedDrc>;
}

/// Tuning file for the surround stage.
pub fn surround_cfg_file(out_channels: usize) -> Option<&'static str> {
    match out_channels {
        SSR_CHANNEL_OUTPUT_NUM => Some(SURROUND_CFG_5_1),
        SSR_STEREO_OUTPUT_NUM => Some(SURROUND_CFG_AZ),
        _ => None,
    }
}

/// Tuning file for the DRC stage.
pub fn drc_cfg_file(out_channels: usize) -> Option<&'static str> {
    match out_channels {
        SSR_CHANNEL_OUTPUT_NUM => Some(DRC_CFG_5_1),
        SSR_STEREO_OUTPUT_NUM => Some(DRC_CFG_AZ),
        _ => None,
    }
}

/// Read `key = value` lines from a tuning file. `#` starts a comment.
///
/// A missing file yields no entries.
pub fn read_tuning_file(path: &Path) -> SsrResult<Vec<(String, String)>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("tuning file {} not found, using defaults", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect())
}

// ─── Providers ────────────────────────────────────────────────────────────────

/// Software beamformer and DRC.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTransforms;

impl TransformProvider for BuiltinTransforms {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn surround(&self, spec: &TransformSpec) -> SsrResult<BoxedSurround> {
        let mut surround = MatrixSurround::new(spec.in_channels, spec.out_channels)?;
        if let Some(path) = &spec.cfg_path {
            for (key, value) in read_tuning_file(path)? {
                if !surround.set_param(&key, &value) {
                    debug!("ignoring tuning entry {}={}", key, value);
                }
            }
        }
        Ok(Box::new(surround))
    }

    fn drc(&self, spec: &TransformSpec) -> SsrResult<BoxedDrc> {
        let mut drc = EnvelopeDrc::new(spec.out_channels, spec.sample_rate)?;
        if let Some(path) = &spec.cfg_path {
            for (key, value) in read_tuning_file(path)? {
                if !drc.apply_tuning(&key, &value) {
                    debug!("ignoring tuning entry {}={}", key, value);
                }
            }
        }
        Ok(Box::new(drc))
    }
}

/// Null provider: no stage can be built, so surround record stays off.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableTransforms;

impl TransformProvider for UnavailableTransforms {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn surround(&self, _spec: &TransformSpec) -> SsrResult<BoxedSurround> {
        Err(SsrError::LibraryUnavailable("surround processor"))
    }

    fn drc(&self, _spec: &TransformSpec) -> SsrResult<BoxedDrc> {
        Err(SsrError::LibraryUnavailable("drc processor"))
    }
}
