//! Surround sound record session context.
//!
//! `SurroundRecord` decides whether an input stream qualifies for surround
//! record, owns the running [`SsrPipeline`] for that stream, and speaks the
//! HAL parameter protocol for the feature. One context per audio device; it
//! is passed explicitly to every entry point.

use std::{io::Read, path::Path, sync::Arc};

use tracing::{debug, error, info, warn};

use crate::audio::{
    constants::{AUDIO_PARAMETER_SSR_ALL, AUDIO_PARAMETER_SSRMODE_ON},
    dump::PcmDump,
    pipeline::{PipelineSpec, PipelineStats, SsrPipeline},
    transform::{
        BoxedDrc, BuiltinTransforms, TransformProvider, TransformSpec, drc_cfg_file,
        surround_cfg_file,
    },
};
use crate::common::{
    AudioSource, InputStream, SampleFormat, SsrError, SsrResult, StreamId,
};
use crate::configs::SsrConfig;
use crate::extension::AudioExtension;
use crate::params::StrParms;

struct Session {
    stream: StreamId,
    out_channels: usize,
    pipeline: SsrPipeline,
    /// One raw capture period, refilled on every read.
    raw: Vec<u8>,
}

pub struct SurroundRecord {
    config: SsrConfig,
    provider: Arc<dyn TransformProvider>,
    supported: bool,
    mode_on: bool,
    session: Option<Session>,
}

impl SurroundRecord {
    pub fn new(config: SsrConfig, provider: Arc<dyn TransformProvider>) -> Self {
        info!(
            "surround record {} (transforms: {})",
            if config.enabled {
                "supported"
            } else {
                "not supported"
            },
            provider.name()
        );
        Self {
            supported: config.enabled,
            config,
            provider,
            mode_on: false,
            session: None,
        }
    }

    /// Context backed by the software transforms.
    pub fn with_builtin(config: SsrConfig) -> Self {
        Self::new(config, Arc::new(BuiltinTransforms))
    }

    /// Re-read device support from a property value; anything starting with
    /// `true` enables it.
    pub fn update_enabled(&mut self, property: &str) {
        self.supported = property.starts_with("true");
        debug!(
            "surround sound recording is {}supported",
            if self.supported { "" } else { "not " }
        );
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_mode_on(&self) -> bool {
        self.mode_on
    }

    /// Supported on this device and requested by the client.
    pub fn is_enabled(&self) -> bool {
        self.supported && self.mode_on
    }

    /// Stream currently routed through surround record.
    pub fn stream(&self) -> Option<StreamId> {
        self.session.as_ref().map(|s| s.stream)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn pipeline(&self) -> Option<&SsrPipeline> {
        self.session.as_ref().map(|s| &s.pipeline)
    }

    pub fn stats(&self) -> Option<PipelineStats> {
        self.pipeline().map(SsrPipeline::stats)
    }

    /// Take `stream` over if it is a surround record use case: stereo or 5.1,
    /// a mic or camcorder source on a three-capsule device, 16-bit PCM.
    pub fn check_and_set_usecase(&mut self, stream: &mut InputStream) -> SsrResult<()> {
        if !self.is_enabled() {
            return Err(SsrError::Disabled);
        }
        validate_usecase(stream)?;

        debug!(
            "found SSR use case on stream {}, channel count {}",
            stream.id, stream.channel_count
        );
        let out_channels = stream.channel_count;
        self.init(stream, out_channels).inspect_err(|e| {
            error!("unable to start SSR record session: {}", e);
        })
    }

    /// Start a session for `stream` producing `out_channels` channels and
    /// reconfigure the stream for raw three-mic capture.
    pub fn init(&mut self, stream: &mut InputStream, out_channels: usize) -> SsrResult<()> {
        debug!("ssr case, sample rate {}", stream.config.rate);

        if self.session.is_some() {
            debug!("reinitializing surround sound session");
            self.deinit();
        }
        if !self.is_enabled() {
            error!("rejecting SSR: init called without enabling SSR");
            return Err(SsrError::Disabled);
        }

        let surround_spec = self.transform_spec(
            stream.config.rate,
            out_channels,
            surround_cfg_file(out_channels),
            &self.config.surround_cfg_dir,
        );
        if surround_spec.cfg_path.is_none() {
            error!("no surround cfg file for {} output channels", out_channels);
        }
        let surround = self.provider.surround(&surround_spec).inspect_err(|e| {
            error!("surround processor init failed: {}", e);
        })?;

        let drc = if self.config.drc {
            let drc_spec = self.transform_spec(
                stream.config.rate,
                out_channels,
                drc_cfg_file(out_channels),
                &self.config.drc_cfg_dir,
            );
            self.build_drc(&drc_spec)
        } else {
            None
        };

        let dump = if self.config.pcm_dump {
            PcmDump::open(&self.config.dump_dir, out_channels)
        } else {
            None
        };

        let spec = PipelineSpec::from_config(&self.config, out_channels);
        let pipeline = SsrPipeline::start(spec, surround, drc, dump)?;

        stream.config.channels = self.config.input_channels;
        stream.config.period_size = self.config.period_size;
        stream.config.period_count = stream.config.channels * std::mem::size_of::<i16>();
        stream.config.format = SampleFormat::Pcm16;

        self.session = Some(Session {
            stream: stream.id,
            out_channels,
            pipeline,
            raw: vec![0; spec.in_bytes()],
        });

        info!(
            "SSR session started on stream {}: {}ch @ {}Hz",
            stream.id, out_channels, stream.config.rate
        );
        Ok(())
    }

    fn transform_spec(
        &self,
        rate: u32,
        out_channels: usize,
        cfg_file: Option<&str>,
        cfg_dir: &str,
    ) -> TransformSpec {
        TransformSpec {
            in_channels: self.config.input_channels,
            out_channels,
            period_size: self.config.period_size,
            sample_rate: rate,
            cfg_path: cfg_file.map(|f| Path::new(cfg_dir).join(f)),
        }
    }

    fn build_drc(&self, spec: &TransformSpec) -> Option<BoxedDrc> {
        match self.provider.drc(spec) {
            Ok(drc) => Some(drc),
            Err(e) => {
                warn!("DRC unavailable, continuing without it: {}", e);
                None
            }
        }
    }

    /// Tear the session down. SSR mode is left as is: a device switch closes
    /// the session without the client turning the feature off.
    pub fn deinit(&mut self) {
        if let Some(session) = self.session.take() {
            session.pipeline.stop();
            info!(
                "SSR session on stream {} closed ({}ch)",
                session.stream, session.out_channels
            );
        }
    }

    /// Capture one raw period from `capture` and return one processed period
    /// in `out`. Returns the number of bytes written to `out`.
    pub fn read<R>(&mut self, capture: &mut R, out: &mut [u8]) -> SsrResult<usize>
    where
        R: Read + ?Sized,
    {
        let Some(session) = self.session.as_mut() else {
            error!("surround record read without a session");
            return Err(SsrError::NotInitialized);
        };

        let expected = session.raw.len();
        let actual = read_full(capture, &mut session.raw)?;
        if actual < expected {
            error!("short capture read: {}/{} bytes", actual, expected);
            return Err(SsrError::ShortRead { expected, actual });
        }

        session.pipeline.read(&session.raw, out)
    }
}

impl AudioExtension for SurroundRecord {
    fn name(&self) -> &'static str {
        "ssr"
    }

    fn set_parameters(&mut self, parms: &StrParms) {
        match &self.session {
            None => {
                if let Some(value) = parms.get(AUDIO_PARAMETER_SSRMODE_ON) {
                    self.mode_on = value == "true";
                    debug!("SSR mode set to {}", self.mode_on);
                }
            }
            Some(session) => {
                let mut surround = session.pipeline.surround();
                for &name in surround.param_names() {
                    if let Some(value) = parms.get(name) {
                        debug!("set {} to {}", name, value);
                        if !surround.set_param(name, value) {
                            warn!("surround processor rejected {}={}", name, value);
                        }
                    }
                }
            }
        }
    }

    fn get_parameters(&self, query: &StrParms, reply: &mut StrParms) {
        let Some(session) = &self.session else {
            return;
        };

        let get_all = query.has_key(AUDIO_PARAMETER_SSR_ALL);
        let surround = session.pipeline.surround();
        for &name in surround.param_names() {
            if get_all || query.has_key(name) {
                if let Some(value) = surround.get_param(name) {
                    reply.add_str(name, value);
                }
            }
        }
    }
}

impl Drop for SurroundRecord {
    fn drop(&mut self) {
        self.deinit();
    }
}

fn validate_usecase(stream: &InputStream) -> SsrResult<()> {
    if stream.channel_count != 2 && stream.channel_count != 6 {
        return Err(SsrError::UnsupportedUsecase(format!(
            "{} channels requested, need 2 or 6",
            stream.channel_count
        )));
    }
    if !matches!(stream.source, AudioSource::Mic | AudioSource::Camcorder) {
        return Err(SsrError::UnsupportedUsecase(format!(
            "source {:?} is not mic or camcorder",
            stream.source
        )));
    }
    if !stream.device.has_three_mics() {
        return Err(SsrError::UnsupportedUsecase(format!(
            "device {:?} has no three-mic path",
            stream.device
        )));
    }
    if stream.format != SampleFormat::Pcm16 {
        return Err(SsrError::UnsupportedUsecase(format!(
            "format {:?} is not 16-bit PCM",
            stream.format
        )));
    }
    Ok(())
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> SsrResult<usize>
where
    R: Read + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::transform::UnavailableTransforms;
    use crate::common::InputDevice;

    fn enabled_config() -> SsrConfig {
        SsrConfig {
            enabled: true,
            ..SsrConfig::default()
        }
    }

    fn mic_stream(channels: usize) -> InputStream {
        InputStream::new(7, InputDevice::BuiltinMic, AudioSource::Mic).with_channels(channels)
    }

    fn ssr_on(ssr: &mut SurroundRecord) {
        ssr.set_parameters(&StrParms::parse("ssrOn=true"));
    }

    #[test]
    fn test_update_enabled() {
        let mut ssr = SurroundRecord::with_builtin(SsrConfig::default());
        assert!(!ssr.is_supported());
        ssr.update_enabled("true");
        assert!(ssr.is_supported());
        ssr.update_enabled("0");
        assert!(!ssr.is_supported());
    }

    #[test]
    fn test_enabled_needs_mode_on() {
        let mut ssr = SurroundRecord::with_builtin(enabled_config());
        assert!(!ssr.is_enabled());
        ssr_on(&mut ssr);
        assert!(ssr.is_enabled());
        ssr.set_parameters(&StrParms::parse("ssrOn=false"));
        assert!(!ssr.is_enabled());
    }

    #[test]
    fn test_validate_usecase() {
        assert!(validate_usecase(&mic_stream(2)).is_ok());
        assert!(validate_usecase(&mic_stream(6)).is_ok());
        assert!(validate_usecase(&mic_stream(4)).is_err());

        let mut camcorder =
            InputStream::new(1, InputDevice::BackMic, AudioSource::Camcorder).with_channels(6);
        assert!(validate_usecase(&camcorder).is_ok());
        camcorder.format = SampleFormat::Pcm24;
        assert!(validate_usecase(&camcorder).is_err());

        let headset = InputStream::new(2, InputDevice::WiredHeadset, AudioSource::Mic);
        assert!(validate_usecase(&headset).is_err());

        let voip =
            InputStream::new(3, InputDevice::BuiltinMic, AudioSource::VoiceCommunication);
        assert!(validate_usecase(&voip).is_err());
    }

    #[test]
    fn test_usecase_rejected_when_disabled() {
        let mut ssr = SurroundRecord::with_builtin(enabled_config());
        let mut stream = mic_stream(6);
        assert!(matches!(
            ssr.check_and_set_usecase(&mut stream),
            Err(SsrError::Disabled)
        ));
        assert!(ssr.stream().is_none());
    }

    #[test]
    fn test_usecase_starts_session_and_reconfigures_stream() {
        let mut ssr = SurroundRecord::with_builtin(enabled_config());
        ssr_on(&mut ssr);

        let mut stream = mic_stream(6);
        ssr.check_and_set_usecase(&mut stream).unwrap();

        assert_eq!(ssr.stream(), Some(StreamId(7)));
        assert_eq!(stream.config.channels, 3);
        assert_eq!(stream.config.period_size, 240);
        assert_eq!(stream.config.period_count, 6);
        assert_eq!(stream.config.period_bytes(), 240 * 3 * 2);

        ssr.deinit();
        assert!(ssr.stream().is_none());
        // Closing the session leaves the mode alone.
        assert!(ssr.is_mode_on());
    }

    #[test]
    fn test_unavailable_transforms_disable_feature() {
        let mut ssr = SurroundRecord::new(enabled_config(), Arc::new(UnavailableTransforms));
        ssr_on(&mut ssr);

        let mut stream = mic_stream(2);
        assert!(matches!(
            ssr.check_and_set_usecase(&mut stream),
            Err(SsrError::LibraryUnavailable(_))
        ));
        assert!(!ssr.is_active());

        let mut out = [0u8; 16];
        let err = ssr.read(&mut std::io::empty(), &mut out).unwrap_err();
        assert!(matches!(err, SsrError::NotInitialized));
        assert_eq!(err.code(), -12);
    }

    #[test]
    fn test_short_capture_is_reported() {
        let mut ssr = SurroundRecord::with_builtin(enabled_config());
        ssr_on(&mut ssr);
        let mut stream = mic_stream(2);
        ssr.check_and_set_usecase(&mut stream).unwrap();

        let raw = vec![0u8; 100];
        let mut out = vec![0u8; 960];
        assert!(matches!(
            ssr.read(&mut raw.as_slice(), &mut out),
            Err(SsrError::ShortRead {
                expected: 1440,
                actual: 100
            })
        ));
    }

    #[test]
    fn test_mode_is_frozen_during_session() {
        let mut ssr = SurroundRecord::with_builtin(enabled_config());
        ssr_on(&mut ssr);
        let mut stream = mic_stream(2);
        ssr.check_and_set_usecase(&mut stream).unwrap();

        ssr.set_parameters(&StrParms::parse("ssrOn=false"));
        assert!(ssr.is_mode_on());
    }

    #[test]
    fn test_parameters_forwarded_to_processor() {
        let mut ssr = SurroundRecord::with_builtin(enabled_config());
        ssr_on(&mut ssr);

        let mut reply = StrParms::new();
        ssr.get_parameters(&StrParms::parse("ssr.all"), &mut reply);
        assert!(reply.is_empty());

        let mut stream = mic_stream(6);
        ssr.check_and_set_usecase(&mut stream).unwrap();
        ssr.set_parameters(&StrParms::parse("ssr.gain=-6;unrelated=1"));

        let mut reply = StrParms::new();
        ssr.get_parameters(&StrParms::parse("ssr.gain"), &mut reply);
        assert_eq!(reply.to_string(), "ssr.gain=-6");

        let mut reply = StrParms::new();
        ssr.get_parameters(&StrParms::parse("ssr.all"), &mut reply);
        assert_eq!(reply.to_string(), "ssr.gain=-6;ssr.width=1");
    }
}
