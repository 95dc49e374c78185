//! [`MediaEngine`] over Symphonia + Rubato + CPAL.
//!
//! `prepare_async` spawns a worker thread that owns the CPAL stream for the rest of
//! the session. Transport calls only touch the shared [`Transport`] atomics, so they
//! never wait on the worker.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use focus_player::{EngineEvents, LoadError, MediaEngine, SourceRef};

use crate::config::EngineConfig;
use crate::output::Transport;
use crate::{decode, device, output, resample};

/// Messages handled by the engine worker after the stream is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerMsg {
    Completed,
    Shutdown,
}

struct Worker {
    tx: Sender<WorkerMsg>,
    join: thread::JoinHandle<()>,
}

/// State shared between the engine handle and its worker thread.
struct Shared {
    transport: Arc<Transport>,
    handler: Mutex<Option<Arc<dyn EngineEvents>>>,
    released: AtomicBool,
}

impl Shared {
    fn handler(&self) -> Option<Arc<dyn EngineEvents>> {
        lock(&self.handler).clone()
    }
}

/// Local-file playback engine writing to a CPAL output device.
pub struct CpalEngine {
    config: EngineConfig,
    source: Mutex<Option<PathBuf>>,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl CpalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            source: Mutex::new(None),
            shared: Arc::new(Shared {
                transport: Arc::new(Transport::default()),
                handler: Mutex::new(None),
                released: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Track length in milliseconds once prepared, `0` before.
    pub fn duration_ms(&self) -> u64 {
        self.shared.transport.duration_ms()
    }

    fn report_error(&self, err: LoadError) {
        tracing::error!(error = %err, "engine prepare failed");
        if let Some(handler) = self.shared.handler() {
            handler.on_error(err);
        }
    }
}

impl Default for CpalEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MediaEngine for CpalEngine {
    fn set_source(&self, source: &SourceRef) -> Result<(), LoadError> {
        if self.shared.released.load(Ordering::Acquire) {
            return Err(LoadError::Prepare("engine already released".to_string()));
        }
        let path = source.to_local_path()?;
        let info = decode::probe_source(&path)?;
        tracing::info!(
            path = ?path,
            codec = info.codec.as_deref().unwrap_or("unknown"),
            rate_hz = info.sample_rate,
            channels = info.channels,
            duration_ms = ?info.duration_ms,
            "source accepted"
        );
        *lock(&self.source) = Some(path);
        Ok(())
    }

    fn prepare_async(&self) {
        let Some(path) = lock(&self.source).clone() else {
            self.report_error(LoadError::InvalidSource(
                "prepare requested before a source was set".to_string(),
            ));
            return;
        };
        let mut worker = lock(&self.worker);
        if worker.is_some() || self.shared.released.load(Ordering::Acquire) {
            tracing::warn!(path = ?path, "prepare ignored; engine busy or released");
            return;
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        let shared = self.shared.clone();
        let config = self.config.clone();
        let tx_worker = tx.clone();
        let spawned = thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || worker_main(path, config, shared, tx_worker, rx));
        match spawned {
            Ok(join) => *worker = Some(Worker { tx, join }),
            Err(e) => {
                drop(worker);
                self.report_error(LoadError::prepare(format!("spawn engine worker: {e}")));
            }
        }
    }

    fn set_event_handler(&self, handler: Arc<dyn EngineEvents>) {
        *lock(&self.shared.handler) = Some(handler);
    }

    fn seek_to(&self, position_ms: u64) {
        self.shared.transport.seek_ms(position_ms);
    }

    fn start(&self) {
        if !self.shared.released.load(Ordering::Acquire) {
            self.shared.transport.start();
        }
    }

    fn pause(&self) {
        self.shared.transport.pause();
    }

    fn is_playing(&self) -> bool {
        self.shared.transport.is_playing()
    }

    fn current_position(&self) -> u64 {
        self.shared.transport.position_ms()
    }

    fn release(&self) {
        self.shared.released.store(true, Ordering::Release);
        self.shared.transport.pause();
        let Some(worker) = lock(&self.worker).take() else {
            return;
        };
        let _ = worker.tx.send(WorkerMsg::Shutdown);
        // Releasing from an engine event runs on the worker itself; it exits on its own.
        if is_current_thread(&worker.join) {
            return;
        }
        if worker.join.join().is_err() {
            tracing::warn!("engine worker panicked");
        }
        tracing::debug!("engine released");
    }
}

impl Drop for CpalEngine {
    fn drop(&mut self) {
        self.release();
    }
}

fn worker_main(
    path: PathBuf,
    config: EngineConfig,
    shared: Arc<Shared>,
    tx: Sender<WorkerMsg>,
    rx: Receiver<WorkerMsg>,
) {
    let stream = match open_stream(&path, &config, &shared.transport, tx) {
        Ok(stream) => stream,
        Err(e) => {
            let err = LoadError::prepare(e);
            tracing::error!(path = ?path, error = %err, "engine prepare failed");
            if let Some(handler) = shared.handler() {
                handler.on_error(err);
            }
            return;
        }
    };

    if shared.released.load(Ordering::Acquire) {
        return;
    }
    if let Some(handler) = shared.handler() {
        handler.on_prepared();
    }

    while let Ok(msg) = rx.recv() {
        match msg {
            WorkerMsg::Completed => {
                tracing::debug!(path = ?path, "end of track");
                if let Some(handler) = shared.handler() {
                    handler.on_completion();
                }
            }
            WorkerMsg::Shutdown => break,
        }
    }
    drop(stream);
}

/// Decode, pick an output, resample if needed and start a (silent) output stream.
fn open_stream(
    path: &Path,
    config: &EngineConfig,
    transport: &Arc<Transport>,
    tx: Sender<WorkerMsg>,
) -> Result<cpal::Stream> {
    let (track, info) = decode::decode_track(path, config.max_decoded_samples())
        .with_context(|| format!("decode {:?}", path))?;

    let host = cpal::default_host();
    let device = device::pick_device(&host, config.device.as_deref())?;
    let supported = device::pick_output_config(&device, info.sample_rate)?;
    let mut stream_config: cpal::StreamConfig = supported.config();
    if let Some(size) = device::pick_buffer_size(&supported) {
        stream_config.buffer_size = size;
    }
    tracing::info!(
        device = %device.description()?,
        rate_hz = stream_config.sample_rate,
        channels = stream_config.channels,
        format = ?supported.sample_format(),
        "output selected"
    );

    let track = resample::resample_track(track, stream_config.sample_rate, config.chunk_frames)?;
    transport.load(track.frames() as u64, track.rate);

    let stream = output::build_output_stream(
        &device,
        &stream_config,
        supported.sample_format(),
        Arc::new(track),
        transport.clone(),
        move || {
            let _ = tx.send(WorkerMsg::Completed);
        },
    )?;
    stream.play().context("start output stream")?;
    Ok(stream)
}

fn is_current_thread(join: &thread::JoinHandle<()>) -> bool {
    join.thread().id() == thread::current().id()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
