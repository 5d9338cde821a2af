use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;
use surroundrec::{
    ExtensionSet, StrParms, SurroundRecord,
    audio::ToneCapture,
    common::{AnyResult, AudioSource, InputDevice, InputStream, logger},
    configs::Config,
};
use tracing::{error, info, warn};

const DEFAULT_PERIODS: usize = 200;
const TONE_HZ: f32 = 440.0;

fn main() -> AnyResult<()> {
    let config = Config::load()?;
    logger::init(config.logging.as_ref());
    info!(
        "surroundrec {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT")
    );

    let periods = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .unwrap_or(DEFAULT_PERIODS);

    let ssr = Arc::new(Mutex::new(SurroundRecord::with_builtin(config.ssr.clone())));
    let mut extensions = ExtensionSet::new();
    extensions.register(ssr.clone());

    extensions.set_parameters(&StrParms::parse("ssrOn=true"));

    let mut stream =
        InputStream::new(1, InputDevice::BuiltinMic, AudioSource::Camcorder).with_channels(6);
    if let Err(e) = ssr.lock().check_and_set_usecase(&mut stream) {
        error!("stream {} not eligible for surround record: {}", stream.id, e);
        return Err(e.into());
    }

    let out_channels = stream.channel_count;
    let out_bytes = config.ssr.period_size * out_channels * std::mem::size_of::<i16>();
    let mut capture = ToneCapture::new(stream.config.channels, stream.config.rate, TONE_HZ);
    let mut out = vec![0u8; out_bytes];
    let mut samples = vec![0i16; out_bytes / 2];
    let mut energy = vec![0f64; out_channels];

    info!(
        "Running {} periods of {}Hz tone through surround record",
        periods, TONE_HZ
    );
    for _ in 0..periods {
        let n = ssr.lock().read(&mut capture, &mut out)?;
        if n < out_bytes {
            warn!("short output period: {}/{} bytes", n, out_bytes);
        }
        LittleEndian::read_i16_into(&out, &mut samples);
        for frame in samples.chunks_exact(out_channels) {
            for (acc, &s) in energy.iter_mut().zip(frame) {
                *acc += (s as f64) * (s as f64);
            }
        }
    }

    let frames = (periods * config.ssr.period_size).max(1) as f64;
    for (ch, acc) in energy.iter().enumerate() {
        info!("channel {} rms {:.1}", ch, (acc / frames).sqrt());
    }

    let reply = extensions.get_parameters(&StrParms::parse("ssr.all"));
    info!("processor parameters: {}", reply);

    let mut ssr = ssr.lock();
    if let Some(stats) = ssr.stats() {
        info!(
            "pipeline: {} periods processed, in {}/{} free/active, out {}/{} free/active",
            stats.processed, stats.in_free, stats.in_active, stats.out_free, stats.out_active
        );
    }
    ssr.deinit();

    Ok(())
}
