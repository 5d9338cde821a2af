use std::path::PathBuf;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;
use surroundrec::audio::transform::{BoxedDrc, BoxedSurround};
use surroundrec::audio::{BuiltinTransforms, ToneCapture, TransformProvider, TransformSpec};
use surroundrec::common::{AudioSource, InputDevice, InputStream};
use surroundrec::configs::{Config, SsrConfig};
use surroundrec::{AudioExtension, ExtensionSet, SsrError, SsrResult, StrParms, SurroundRecord};

/// Software surround stage on a device without a DRC library.
struct SurroundOnly;

impl TransformProvider for SurroundOnly {
    fn name(&self) -> &'static str {
        "surround-only"
    }

    fn surround(&self, spec: &TransformSpec) -> SsrResult<BoxedSurround> {
        BuiltinTransforms.surround(spec)
    }

    fn drc(&self, _spec: &TransformSpec) -> SsrResult<BoxedDrc> {
        Err(SsrError::LibraryUnavailable("drc processor"))
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("surroundrec-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn enabled(dump_dir: Option<&PathBuf>) -> SsrConfig {
    SsrConfig {
        enabled: true,
        pcm_dump: dump_dir.is_some(),
        dump_dir: dump_dir
            .map(|d| d.display().to_string())
            .unwrap_or_default(),
        ..SsrConfig::default()
    }
}

fn camcorder(channels: usize) -> InputStream {
    InputStream::new(11, InputDevice::BuiltinMic, AudioSource::Camcorder).with_channels(channels)
}

fn rms(bytes: &[u8], channels: usize, channel: usize) -> f64 {
    let mut samples = vec![0i16; bytes.len() / 2];
    LittleEndian::read_i16_into(bytes, &mut samples);
    let frames = samples.len() / channels;
    let sum: f64 = samples
        .chunks_exact(channels)
        .map(|f| (f[channel] as f64).powi(2))
        .sum();
    (sum / frames as f64).sqrt()
}

#[test]
fn tone_through_six_channel_session() {
    let ssr = Arc::new(Mutex::new(SurroundRecord::with_builtin(enabled(None))));
    let mut extensions = ExtensionSet::new();
    extensions.register(ssr.clone());
    extensions.set_parameters(&StrParms::parse("ssrOn=true"));

    let mut stream = camcorder(6);
    ssr.lock().check_and_set_usecase(&mut stream).unwrap();
    assert_eq!(stream.config.channels, 3);

    let mut capture = ToneCapture::new(3, stream.config.rate, 1_000.0);
    let mut out = vec![0u8; 240 * 6 * 2];

    for _ in 0..4 {
        assert_eq!(ssr.lock().read(&mut capture, &mut out).unwrap(), out.len());
        assert!(out.iter().all(|&b| b == 0), "priming period not silent");
    }

    let mut heard = false;
    for _ in 0..8 {
        ssr.lock().read(&mut capture, &mut out).unwrap();
        heard |= rms(&out, 6, 0) > 100.0;
    }
    assert!(heard, "processed tone never reached the output");

    let stats = ssr.lock().stats().unwrap();
    assert_eq!(stats.input_total(), 4);
    assert_eq!(stats.output_total(), 4);

    let reply = extensions.get_parameters(&StrParms::parse("ssr.all"));
    assert!(reply.has_key("ssr.gain"));
    assert!(reply.has_key("ssr.width"));

    ssr.lock().deinit();
    assert!(!ssr.lock().is_active());
}

#[test]
fn session_parameters_go_through_extension_set() {
    let ssr = Arc::new(Mutex::new(SurroundRecord::with_builtin(enabled(None))));
    let mut extensions = ExtensionSet::new();
    extensions.register(ssr.clone());

    // Mode off: nothing starts.
    let mut stream = camcorder(2);
    assert!(matches!(
        ssr.lock().check_and_set_usecase(&mut stream),
        Err(SsrError::Disabled)
    ));

    extensions.set_parameters(&StrParms::parse("ssrOn=true"));
    ssr.lock().check_and_set_usecase(&mut stream).unwrap();

    extensions.set_parameters(&StrParms::parse("ssr.width=0.25"));
    let reply = extensions.get_parameters(&StrParms::parse("ssr.width"));
    assert_eq!(reply.get("ssr.width"), Some("0.25"));
}

#[test]
fn pcm_dump_records_every_processed_period() {
    let dir = scratch_dir("session-dump");
    let mut ssr = SurroundRecord::with_builtin(enabled(Some(&dir)));
    ssr.set_parameters(&StrParms::parse("ssrOn=true"));

    let mut stream = camcorder(2);
    ssr.check_and_set_usecase(&mut stream).unwrap();

    let mut capture = ToneCapture::new(3, stream.config.rate, 440.0);
    let mut out = vec![0u8; 240 * 2 * 2];
    for _ in 0..10 {
        ssr.read(&mut capture, &mut out).unwrap();
    }
    let processed = ssr.stats().unwrap().processed as usize;
    ssr.deinit();

    let input = std::fs::read(dir.join("ssr_input_3ch.pcm")).unwrap();
    let output = std::fs::read(dir.join("ssr_output_2ch.pcm")).unwrap();
    assert!(processed > 0);
    assert!(input.len() >= processed * 240 * 3 * 2);
    assert_eq!(input.len() / (240 * 3 * 2), output.len() / (240 * 2 * 2));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn default_config_file_enables_session() {
    let config = Config::from_path("config.default.toml").unwrap();
    assert!(config.ssr.enabled);
    assert_eq!(config.ssr.period_size, 240);
    assert_eq!(config.ssr.input_period_bytes(), 1440);

    let mut ssr = SurroundRecord::with_builtin(config.ssr);
    ssr.set_parameters(&StrParms::parse("ssrOn=true"));
    let mut stream = camcorder(6);
    ssr.check_and_set_usecase(&mut stream).unwrap();
    assert!(ssr.is_active());
}

#[test]
fn session_runs_without_drc_library() {
    let config = enabled(None);
    assert!(config.drc);
    let mut ssr = SurroundRecord::new(config, Arc::new(SurroundOnly));
    ssr.set_parameters(&StrParms::parse("ssrOn=true"));

    let mut stream = camcorder(2);
    ssr.check_and_set_usecase(&mut stream).unwrap();
    assert!(ssr.is_active());

    let mut capture = ToneCapture::new(3, stream.config.rate, 440.0);
    let mut out = vec![0u8; 240 * 2 * 2];
    let mut heard = false;
    for _ in 0..8 {
        assert_eq!(ssr.read(&mut capture, &mut out).unwrap(), out.len());
        heard |= rms(&out, 2, 0) > 100.0;
    }
    assert!(heard);
    assert!(ssr.stats().unwrap().processed >= 4);
}
