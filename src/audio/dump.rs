//! Raw/processed PCM capture to disk for tuning sessions.
//!
//! The worker hands copies of each period to a writer thread over a bounded
//! `flume` channel so file I/O never stalls the processing loop. When the
//! disk falls behind, whole periods are dropped rather than queued.

use std::{
    fs::File,
    sync::atomic::{AtomicU64, Ordering},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread::JoinHandle,
};

use flume::{Sender, TrySendError};
use tracing::{debug, error, info, warn};

use crate::audio::constants::{
    DUMP_QUEUE_PERIODS, DUMP_THREAD_NAME, INPUT_DUMP_FILE, OUTPUT_DUMP_FILE_2CH,
    OUTPUT_DUMP_FILE_6CH, SSR_CHANNEL_OUTPUT_NUM,
};

/// One period as it entered and left the worker.
struct DumpChunk {
    input: Vec<u8>,
    output: Vec<u8>,
}

/// Output file name for the given processed channel count.
pub fn output_dump_file(out_channels: usize) -> &'static str {
    if out_channels == SSR_CHANNEL_OUTPUT_NUM {
        OUTPUT_DUMP_FILE_6CH
    } else {
        OUTPUT_DUMP_FILE_2CH
    }
}

pub struct PcmDump {
    tx: Option<Sender<DumpChunk>>,
    handle: Option<JoinHandle<()>>,
    dropped: AtomicU64,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl PcmDump {
    /// Create both dump files under `dir` and start the writer thread.
    ///
    /// Returns `None` (after logging) if either file cannot be created.
    pub fn open(dir: impl AsRef<Path>, out_channels: usize) -> Option<Self> {
        Self::with_depth(dir, out_channels, DUMP_QUEUE_PERIODS)
    }

    /// Like [`PcmDump::open`], queueing at most `depth` periods for the writer.
    pub fn with_depth(dir: impl AsRef<Path>, out_channels: usize, depth: usize) -> Option<Self> {
        let dir = dir.as_ref();
        let input_path = dir.join(INPUT_DUMP_FILE);
        let output_path = dir.join(output_dump_file(out_channels));

        let (input, output) = match (File::create(&input_path), File::create(&output_path)) {
            (Ok(i), Ok(o)) => (BufWriter::new(i), BufWriter::new(o)),
            (i, o) => {
                error!(
                    "PCM dump open failed: input {} ({}), output {} ({})",
                    input_path.display(),
                    i.err().map_or_else(|| "ok".to_string(), |e| e.to_string()),
                    output_path.display(),
                    o.err().map_or_else(|| "ok".to_string(), |e| e.to_string()),
                );
                return None;
            }
        };

        let (tx, rx) = flume::bounded::<DumpChunk>(depth.max(1));
        let handle = std::thread::Builder::new()
            .name(DUMP_THREAD_NAME.into())
            .spawn(move || {
                let mut input = input;
                let mut output = output;
                while let Ok(chunk) = rx.recv() {
                    let res = input
                        .write_all(&chunk.input)
                        .and_then(|_| output.write_all(&chunk.output));
                    if let Err(e) = res {
                        warn!("PCM dump write failed, stopping dump: {}", e);
                        return;
                    }
                }
                let _ = input.flush();
                let _ = output.flush();
                debug!("PCM dump writer finished");
            });

        let handle = match handle {
            Ok(h) => h,
            Err(e) => {
                error!("failed to spawn PCM dump writer: {}", e);
                return None;
            }
        };

        info!(
            "Dumping SSR PCM to {} and {}",
            input_path.display(),
            output_path.display()
        );

        Some(Self {
            tx: Some(tx),
            handle: Some(handle),
            dropped: AtomicU64::new(0),
            input_path,
            output_path,
        })
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Periods skipped because the writer queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queue one period for both files. Never blocks.
    pub fn write_period(&self, input: &[u8], output: &[u8]) {
        let Some(tx) = &self.tx else {
            return;
        };
        let chunk = DumpChunk {
            input: input.to_vec(),
            output: output.to_vec(),
        };
        match tx.try_send(chunk) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("PCM dump writer behind, dropped period ({} total)", dropped);
            }
            // The writer only goes away after a write error it already logged.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Flush and close both files, waiting for queued chunks to land.
    pub fn close(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("PCM dump writer panicked");
            }
        }
    }
}

impl Drop for PcmDump {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_dump_file(6), "ssr_output_6ch.pcm");
        assert_eq!(output_dump_file(2), "ssr_output_2ch.pcm");
    }

    #[test]
    fn test_writes_both_streams() {
        let dir = std::env::temp_dir().join(format!("surroundrec-dump-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut dump = PcmDump::open(&dir, 2).unwrap();
        dump.write_period(&[1, 2, 3], &[4, 5]);
        dump.write_period(&[6], &[7]);
        dump.close();

        assert_eq!(std::fs::read(dump.input_path()).unwrap(), vec![1, 2, 3, 6]);
        assert_eq!(std::fs::read(dump.output_path()).unwrap(), vec![4, 5, 7]);
        assert_eq!(dump.dropped(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_fails_on_missing_dir() {
        assert!(PcmDump::open("/nonexistent/surroundrec/dump", 6).is_none());
    }

    #[test]
    fn test_full_queue_drops_whole_periods() {
        let dir =
            std::env::temp_dir().join(format!("surroundrec-dump-full-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut dump = PcmDump::with_depth(&dir, 6, 1).unwrap();
        let periods = 2_000u64;
        for i in 0..periods {
            dump.write_period(&[i as u8; 64], &[i as u8; 128]);
        }
        dump.close();

        let input = std::fs::read(dump.input_path()).unwrap();
        let output = std::fs::read(dump.output_path()).unwrap();
        let written = (input.len() / 64) as u64;
        assert_eq!(output.len() as u64, written * 128);
        assert_eq!(written + dump.dropped(), periods);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
