use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use parking_lot::{Mutex, MutexGuard};
use tracing::{Level, debug, error, span, trace};

use super::{PipelineSpec, Shared};
use crate::audio::{
    buffer::PcmBuffer,
    dump::PcmDump,
    transform::{BoxedDrc, BoxedSurround},
};

/// Everything the worker runs between popping and pushing a buffer pair.
pub(super) struct Stages {
    surround: Arc<Mutex<BoxedSurround>>,
    drc: Option<BoxedDrc>,
    dump: Option<PcmDump>,
    in_samples: Vec<i16>,
    out_samples: Vec<i16>,
}

impl Stages {
    pub(super) fn new(
        spec: PipelineSpec,
        surround: Arc<Mutex<BoxedSurround>>,
        drc: Option<BoxedDrc>,
        dump: Option<PcmDump>,
    ) -> Self {
        Self {
            surround,
            drc,
            dump,
            in_samples: vec![0; spec.period_size * spec.in_channels],
            out_samples: vec![0; spec.period_size * spec.out_channels],
        }
    }

    /// Run one period: surround transform, then DRC, then dump.
    fn process(&mut self, input: &PcmBuffer, output: &mut PcmBuffer) {
        LittleEndian::read_i16_into(input.as_bytes(), &mut self.in_samples);

        self.surround
            .lock()
            .process(&self.in_samples, &mut self.out_samples);

        if let Some(drc) = self.drc.as_mut() {
            trace!("running DRC");
            if let Err(e) = drc.process(&mut self.out_samples) {
                error!("DRC process failed: {}", e);
            }
        }

        LittleEndian::write_i16_into(&self.out_samples, output.as_mut_bytes());
        output.set_len(output.capacity());

        if let Some(dump) = &self.dump {
            dump.write_period(input.as_bytes(), output.as_bytes());
        }
    }
}

/// Marks the pipeline stopped when the worker exits for any reason, so a
/// panicking stage turns blocked callers into `SsrError::Stopped` instead of
/// leaving them waiting on a thread that is gone.
struct ExitGuard<'a> {
    shared: &'a Shared,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if std::thread::panicking() {
            error!(
                "SSR process thread panicked after {} periods, stopping pipeline",
                state.processed
            );
            // The buffers held by the worker were dropped while unwinding.
            state.in_processing = 0;
            state.out_processing = 0;
        }
        state.stop = true;
        self.shared.cond_process.notify_all();
        self.shared.cond_read.notify_all();
    }
}

/// Worker loop: wait for an active input and a free output, transform
/// outside the lock, then hand both buffers back.
pub(super) fn run(shared: Arc<Shared>, mut stages: Stages) {
    let _span = span!(Level::DEBUG, "ssr_process").entered();
    debug!("SSR process thread started");

    let _exit = ExitGuard { shared: &shared };
    let mut state = shared.state.lock();
    loop {
        while !state.stop && (state.out_free.is_empty() || state.in_active.is_empty()) {
            trace!("waiting for buffers");
            shared.cond_process.wait(&mut state);
        }
        if state.stop {
            break;
        }

        let Some(mut out_buf) = state.out_free.pop() else {
            continue;
        };
        let Some(in_buf) = state.in_active.pop() else {
            state.out_free.push(out_buf);
            continue;
        };
        state.in_processing += 1;
        state.out_processing += 1;

        MutexGuard::unlocked(&mut state, || stages.process(&in_buf, &mut out_buf));

        state.in_processing -= 1;
        state.out_processing -= 1;
        state.processed += 1;
        state.out_active.push(out_buf);
        state.in_free.push(in_buf);

        shared.cond_read.notify_all();
    }
    drop(state);

    if let Some(mut dump) = stages.dump.take() {
        dump.close();
    }
    debug!("SSR process thread exiting");
}
