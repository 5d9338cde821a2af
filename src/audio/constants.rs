//! Central constants for the surround record pipeline.
//!
//! Every fixed number the pipeline and the transforms rely on lives here so
//! the defaults in `SsrConfig` and the processors stay consistent.

// ── Capture geometry ─────────────────────────────────────────────────────────

/// Frames per capture period handed to the surround transform.
pub const SSR_PERIOD_SIZE: usize = 240;

/// Microphone capsules captured for surround record.
pub const NUM_IN_CHANNELS: usize = 3;

/// Output channel count of the 5.1 layout.
pub const SSR_CHANNEL_OUTPUT_NUM: usize = 6;

/// Output channel count of the stereo (AZ) layout.
pub const SSR_STEREO_OUTPUT_NUM: usize = 2;

// ── Buffer pools ─────────────────────────────────────────────────────────────

/// Raw capture buffers circulating between the reader and the worker.
pub const NUM_IN_BUFS: usize = 4;

/// Processed output buffers circulating between the worker and the reader.
pub const NUM_OUT_BUFS: usize = 4;

// ── Parameter keys ───────────────────────────────────────────────────────────

/// `str_parms` key toggling SSR mode (`ssrOn=true`).
pub const AUDIO_PARAMETER_SSRMODE_ON: &str = "ssrOn";

/// `str_parms` key asking for every processor parameter at once.
pub const AUDIO_PARAMETER_SSR_ALL: &str = "ssr.all";

// ── Filesystem layout ────────────────────────────────────────────────────────

pub const DEFAULT_SURROUND_CFG_DIR: &str = "/system/etc/surround_sound_3mic";
pub const DEFAULT_DRC_CFG_DIR: &str = "/system/etc/drc";
pub const DEFAULT_DUMP_DIR: &str = "/data/misc/audio";

pub const SURROUND_CFG_5_1: &str = "surround_sound_rec_5.1.cfg";
pub const SURROUND_CFG_AZ: &str = "surround_sound_rec_AZ.cfg";
pub const DRC_CFG_5_1: &str = "drc_cfg_5.1.txt";
pub const DRC_CFG_AZ: &str = "drc_cfg_AZ.txt";

pub const INPUT_DUMP_FILE: &str = "ssr_input_3ch.pcm";
pub const OUTPUT_DUMP_FILE_6CH: &str = "ssr_output_6ch.pcm";
pub const OUTPUT_DUMP_FILE_2CH: &str = "ssr_output_2ch.pcm";
/// Periods the PCM dump may queue ahead of its writer.
pub const DUMP_QUEUE_PERIODS: usize = NUM_IN_BUFS * 4;

// ── Worker ───────────────────────────────────────────────────────────────────

pub const PROCESS_THREAD_NAME: &str = "ssr-process";
pub const DUMP_THREAD_NAME: &str = "ssr-pcm-dump";

// ── i16 PCM clip boundaries ──────────────────────────────────────────────────

pub const INT16_MAX_F: f32 = 32_767.0;
pub const INT16_MIN_F: f32 = -32_768.0;
pub const INT16_SCALE: f32 = 32_768.0;
