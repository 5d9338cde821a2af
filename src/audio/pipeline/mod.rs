//! Bounded buffer pipeline between the capture thread and
//! the surround worker.
//!
//! ```text
//!            acquire_input                      worker
//!  capture ───────────────► in_active ───────────────────► in_free ──┐
//!     ▲                                    │                         │
//!     └──────────────── in_free ◄──────────┼─────────────────────────┘
//!                                          ▼
//!  reader ◄─── out_active ◄────────── transform ◄───────── out_free ◄─ consume_output
//! ```
//!
//! All four queues sit behind one mutex. The worker waits on `cond_process`
//! for an active input and a free output; callers wait on `cond_read`. The
//! output pool starts out on `out_active` filled with silence, so the first
//! `out_buffers` reads return silence while the worker catches up.

mod worker;

use std::{sync::Arc, thread::JoinHandle};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::audio::{
    buffer::{BufferQueue, PcmBuffer},
    constants::PROCESS_THREAD_NAME,
    dump::PcmDump,
    transform::{BoxedDrc, BoxedSurround},
};
use crate::common::{SsrError, SsrResult};
use crate::configs::SsrConfig;

use worker::Stages;

/// Pool geometry for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSpec {
    pub in_channels: usize,
    pub out_channels: usize,
    pub period_size: usize,
    pub in_buffers: usize,
    pub out_buffers: usize,
}

impl PipelineSpec {
    pub fn from_config(config: &SsrConfig, out_channels: usize) -> Self {
        Self {
            in_channels: config.input_channels,
            out_channels,
            period_size: config.period_size,
            in_buffers: config.input_buffers,
            out_buffers: config.output_buffers,
        }
    }

    pub fn in_bytes(&self) -> usize {
        self.period_size * self.in_channels * std::mem::size_of::<i16>()
    }

    pub fn out_bytes(&self) -> usize {
        self.period_size * self.out_channels * std::mem::size_of::<i16>()
    }

    fn validate(&self) -> SsrResult<()> {
        if self.in_bytes() == 0 || self.out_bytes() == 0 {
            return Err(SsrError::Config("pipeline buffers must be non-empty".into()));
        }
        if self.in_buffers == 0 || self.out_buffers == 0 {
            return Err(SsrError::Config("pipeline pools must be non-empty".into()));
        }
        Ok(())
    }
}

/// Queue occupancy at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub in_free: usize,
    pub in_active: usize,
    pub out_free: usize,
    pub out_active: usize,
    /// Input/output buffers currently held by the worker (0 or 1 each).
    pub in_processing: usize,
    pub out_processing: usize,
    /// Periods run through the transform since start.
    pub processed: u64,
    pub stopped: bool,
}

impl PipelineStats {
    pub fn input_total(&self) -> usize {
        self.in_free + self.in_active + self.in_processing
    }

    pub fn output_total(&self) -> usize {
        self.out_free + self.out_active + self.out_processing
    }
}

/// Slot ids per queue, in FIFO order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub in_free: Vec<usize>,
    pub in_active: Vec<usize>,
    pub out_free: Vec<usize>,
    pub out_active: Vec<usize>,
}

pub(crate) struct QueueState {
    in_free: BufferQueue,
    in_active: BufferQueue,
    out_free: BufferQueue,
    out_active: BufferQueue,
    in_processing: usize,
    out_processing: usize,
    processed: u64,
    stop: bool,
}

pub(crate) struct Shared {
    state: Mutex<QueueState>,
    cond_process: Condvar,
    cond_read: Condvar,
}

pub struct SsrPipeline {
    spec: PipelineSpec,
    shared: Arc<Shared>,
    surround: Arc<Mutex<BoxedSurround>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SsrPipeline {
    /// Allocate both pools and spawn the worker.
    pub fn start(
        spec: PipelineSpec,
        surround: BoxedSurround,
        drc: Option<BoxedDrc>,
        dump: Option<PcmDump>,
    ) -> SsrResult<Self> {
        spec.validate()?;

        let mut state = QueueState {
            in_free: BufferQueue::with_capacity(spec.in_buffers),
            in_active: BufferQueue::with_capacity(spec.in_buffers),
            out_free: BufferQueue::with_capacity(spec.out_buffers),
            out_active: BufferQueue::with_capacity(spec.out_buffers),
            in_processing: 0,
            out_processing: 0,
            processed: 0,
            stop: false,
        };
        for slot in 0..spec.in_buffers {
            state.in_free.push(PcmBuffer::new(slot, spec.in_bytes()));
        }
        for slot in 0..spec.out_buffers {
            state
                .out_active
                .push(PcmBuffer::new(spec.in_buffers + slot, spec.out_bytes()));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            cond_process: Condvar::new(),
            cond_read: Condvar::new(),
        });
        let surround = Arc::new(Mutex::new(surround));

        let stages = Stages::new(spec, surround.clone(), drc, dump);
        let worker_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name(PROCESS_THREAD_NAME.into())
            .spawn(move || worker::run(worker_shared, stages))?;

        info!(
            "SSR pipeline started: {}x{}B in, {}x{}B out, {}ch -> {}ch",
            spec.in_buffers,
            spec.in_bytes(),
            spec.out_buffers,
            spec.out_bytes(),
            spec.in_channels,
            spec.out_channels
        );

        Ok(Self {
            spec,
            shared,
            surround,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    /// Lock the surround processor, e.g. to forward parameters to it.
    /// The worker cannot transform while the guard is held.
    pub fn surround(&self) -> MutexGuard<'_, BoxedSurround> {
        self.surround.lock()
    }

    /// Block on `cond_read` until `ready` holds or the pipeline stops.
    fn wait_until<F>(&self, state: &mut MutexGuard<'_, QueueState>, ready: F) -> SsrResult<()>
    where
        F: Fn(&QueueState) -> bool,
    {
        loop {
            if state.stop {
                return Err(SsrError::Stopped);
            }
            if ready(&**state) {
                return Ok(());
            }
            debug!("SSR reader waiting for buffers");
            self.shared.cond_read.wait(state);
        }
    }

    /// Copy one captured period into a free input buffer and queue it for the
    /// worker. Returns the number of bytes taken from `data`.
    pub fn acquire_input(&self, data: &[u8]) -> SsrResult<usize> {
        let mut state = self.shared.state.lock();
        self.wait_until(&mut state, |s| !s.in_free.is_empty())?;

        let mut buf = state.in_free.pop().ok_or(SsrError::Stopped)?;
        let n = buf.fill_from(data);
        state.in_active.push(buf);

        self.shared.cond_process.notify_one();
        Ok(n)
    }

    /// Copy the oldest processed period into `out` and recycle its buffer.
    /// Returns the number of bytes written to `out`.
    pub fn consume_output(&self, out: &mut [u8]) -> SsrResult<usize> {
        let mut state = self.shared.state.lock();
        self.wait_until(&mut state, |s| !s.out_active.is_empty())?;

        let buf = state.out_active.pop().ok_or(SsrError::Stopped)?;
        let n = buf.copy_to(out);
        state.out_free.push(buf);

        self.shared.cond_process.notify_one();
        Ok(n)
    }

    /// Queue `raw` and hand back the oldest processed period in a single
    /// critical section, the way a HAL read call drives the pipeline.
    pub fn read(&self, raw: &[u8], out: &mut [u8]) -> SsrResult<usize> {
        let mut state = self.shared.state.lock();
        self.wait_until(&mut state, |s| {
            !s.in_free.is_empty() && !s.out_active.is_empty()
        })?;

        let mut in_buf = state.in_free.pop().ok_or(SsrError::Stopped)?;
        let Some(out_buf) = state.out_active.pop() else {
            state.in_free.push(in_buf);
            return Err(SsrError::Stopped);
        };

        in_buf.fill_from(raw);
        state.in_active.push(in_buf);

        let n = out_buf.copy_to(out);
        state.out_free.push(out_buf);

        self.shared.cond_process.notify_one();
        Ok(n)
    }

    pub fn stats(&self) -> PipelineStats {
        let state = self.shared.state.lock();
        PipelineStats {
            in_free: state.in_free.len(),
            in_active: state.in_active.len(),
            out_free: state.out_free.len(),
            out_active: state.out_active.len(),
            in_processing: state.in_processing,
            out_processing: state.out_processing,
            processed: state.processed,
            stopped: state.stop,
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.shared.state.lock();
        QueueSnapshot {
            in_free: state.in_free.slots(),
            in_active: state.in_active.slots(),
            out_free: state.out_free.slots(),
            out_active: state.out_active.slots(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.shared.state.lock().stop
    }

    /// Stop the worker and release every buffer. Blocked callers return
    /// `SsrError::Stopped`. Safe to call more than once.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            state.stop = true;
            self.shared.cond_process.notify_all();
            self.shared.cond_read.notify_all();
        }

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("SSR process thread panicked");
            }
            let mut state = self.shared.state.lock();
            state.in_free.clear();
            state.in_active.clear();
            state.out_free.clear();
            state.out_active.clear();
            info!("SSR pipeline stopped after {} periods", state.processed);
        }
    }
}

impl Drop for SsrPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::transform::SurroundProcessor;

    /// Copies the first input sample of each period across the whole output.
    struct Tagger;

    impl SurroundProcessor for Tagger {
        fn process(&mut self, input: &[i16], output: &mut [i16]) {
            let tag = input.first().copied().unwrap_or(0);
            output.fill(tag);
        }

        fn param_names(&self) -> &'static [&'static str] {
            &[]
        }

        fn set_param(&mut self, _name: &str, _value: &str) -> bool {
            false
        }

        fn get_param(&self, _name: &str) -> Option<String> {
            None
        }
    }

    fn spec() -> PipelineSpec {
        PipelineSpec {
            in_channels: 3,
            out_channels: 2,
            period_size: 4,
            in_buffers: 4,
            out_buffers: 4,
        }
    }

    #[test]
    fn test_initial_layout() {
        let pipeline = SsrPipeline::start(spec(), Box::new(Tagger), None, None).unwrap();
        let snapshot = pipeline.snapshot();
        assert_eq!(snapshot.in_free, vec![0, 1, 2, 3]);
        assert!(snapshot.in_active.is_empty());
        assert!(snapshot.out_free.is_empty());
        assert_eq!(snapshot.out_active, vec![4, 5, 6, 7]);
        assert_eq!(pipeline.spec().in_bytes(), 24);
        assert_eq!(pipeline.spec().out_bytes(), 16);
    }

    #[test]
    fn test_priming_reads_are_silent() {
        let pipeline = SsrPipeline::start(spec(), Box::new(Tagger), None, None).unwrap();
        let raw = [9u8; 24];
        let mut out = [0xffu8; 16];
        assert_eq!(pipeline.read(&raw, &mut out).unwrap(), 16);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rejects_empty_pools() {
        let mut bad = spec();
        bad.out_buffers = 0;
        assert!(matches!(
            SsrPipeline::start(bad, Box::new(Tagger), None, None),
            Err(SsrError::Config(_))
        ));
    }

    #[test]
    fn test_stop_is_idempotent_and_fails_callers() {
        let pipeline = SsrPipeline::start(spec(), Box::new(Tagger), None, None).unwrap();
        pipeline.stop();
        pipeline.stop();
        assert!(!pipeline.is_running());
        assert!(pipeline.stats().stopped);
        assert_eq!(pipeline.stats().input_total(), 0);

        let mut out = [0u8; 16];
        assert!(matches!(
            pipeline.consume_output(&mut out),
            Err(SsrError::Stopped)
        ));
        assert!(matches!(
            pipeline.acquire_input(&[0u8; 24]),
            Err(SsrError::Stopped)
        ));
    }
}
