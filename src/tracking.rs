// src/tracking.rs - Capture-and-infer loop feeding the gesture interpreter
use crate::config::CaptureConfig;
use crate::detector::HandDetector;
use crate::error::CaptureError;
use crate::gesture::{GestureInterpreter, Interpretation};
use crate::video::FrameSource;
use anyhow::{Context, Result};
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

const TEARDOWN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Initializing,
    Active,
    /// Terminal: camera denied or detector failed. No retry is attempted.
    Unavailable(String),
    Stopped,
}

/// Invalidates in-flight work once the session is torn down.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct StatusCell(Arc<Mutex<CaptureStatus>>);

impl StatusCell {
    fn lock(&self) -> MutexGuard<'_, CaptureStatus> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self) -> CaptureStatus {
        self.lock().clone()
    }

    /// Moves Initializing to Active; leaves terminal states alone.
    fn mark_active(&self) {
        let mut status = self.lock();
        if *status == CaptureStatus::Initializing {
            *status = CaptureStatus::Active;
        }
    }

    /// The first failure wins; later ones are only logged at debug.
    fn mark_unavailable(&self, token: &CancellationToken, reason: String) {
        let mut status = self.lock();
        if matches!(*status, CaptureStatus::Unavailable(_)) {
            debug!("gesture capture already unavailable, ignoring: {reason}");
        } else {
            warn!("gesture capture unavailable: {reason}");
            *status = CaptureStatus::Unavailable(reason);
        }
        token.cancel();
    }

    fn mark_stopped(&self) {
        let mut status = self.lock();
        if !matches!(*status, CaptureStatus::Unavailable(_)) {
            *status = CaptureStatus::Stopped;
        }
    }
}

struct EngineState {
    detector: Option<Box<dyn HandDetector>>,
    interpreter: GestureInterpreter,
    released: bool,
}

/// Detector and interpreter behind one lock. A detection step holds it from
/// `detect` through `interpret`, so [`InferenceEngine::release`] waits out
/// whatever is in flight before dropping the detector.
#[derive(Clone)]
struct InferenceEngine(Arc<Mutex<EngineState>>);

impl InferenceEngine {
    fn new(interpreter: GestureInterpreter) -> Self {
        Self(Arc::new(Mutex::new(EngineState {
            detector: None,
            interpreter,
            released: false,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds the detector under the lock. Returns `Ok(false)` when the
    /// session was released first.
    fn init<F>(&self, make_detector: F) -> Result<bool, CaptureError>
    where
        F: FnOnce() -> Result<Box<dyn HandDetector>, CaptureError>,
    {
        let mut state = self.lock();
        if state.released {
            return Ok(false);
        }
        state.detector = Some(make_detector()?);
        Ok(true)
    }

    /// One detect-then-interpret step. `None` once released or cancelled;
    /// a detection that finishes after cancellation is dropped unapplied.
    fn process(
        &self,
        frame: &DynamicImage,
        token: &CancellationToken,
    ) -> Option<Result<Interpretation, CaptureError>> {
        let mut state = self.lock();
        let EngineState {
            detector,
            interpreter,
            released,
        } = &mut *state;
        if *released || token.is_cancelled() {
            return None;
        }
        let landmarks = match detector.as_mut()?.detect(frame) {
            Ok(landmarks) => landmarks,
            Err(e) => return Some(Err(e)),
        };
        if token.is_cancelled() {
            debug!("discarding detection completed after teardown");
            return None;
        }
        Some(Ok(interpreter.interpret(&landmarks, Instant::now())))
    }

    /// Blocks until no step is running, then drops the detector.
    fn release(&self) {
        let mut state = self.lock();
        state.released = true;
        if state.detector.take().is_some() {
            debug!("hand detector released");
        }
    }
}

/// Owns the camera thread and the inference runtime. Dropping it tears both down.
pub struct GestureSession {
    status: StatusCell,
    token: CancellationToken,
    shutdown: watch::Sender<bool>,
    engine: InferenceEngine,
    runtime: Option<tokio::runtime::Runtime>,
    capture_thread: Option<JoinHandle<()>>,
}

impl GestureSession {
    pub fn start<F>(
        config: CaptureConfig,
        interpreter: GestureInterpreter,
        make_detector: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn HandDetector>, CaptureError> + Send + 'static,
    {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("gesture-infer")
            .enable_all()
            .build()
            .context("Failed to start inference runtime")?;

        let status = StatusCell(Arc::new(Mutex::new(CaptureStatus::Initializing)));
        let token = CancellationToken::default();
        let engine = InferenceEngine::new(interpreter);
        let (shutdown, shutdown_rx) = watch::channel(false);
        // One slot: the camera waits for inference to take a frame before grabbing the next.
        let (frame_tx, frame_rx) = mpsc::channel::<DynamicImage>(1);

        runtime.spawn(run_inference(
            frame_rx,
            shutdown_rx,
            token.clone(),
            status.clone(),
            engine.clone(),
            make_detector,
        ));

        let capture_thread = {
            let token = token.clone();
            let status = status.clone();
            std::thread::Builder::new()
                .name("gesture-capture".to_string())
                .spawn(move || capture_loop(config, frame_tx, token, status))
                .context("Failed to spawn capture thread")?
        };

        info!("gesture session started");
        Ok(Self {
            status,
            token,
            shutdown,
            engine,
            runtime: Some(runtime),
            capture_thread: Some(capture_thread),
        })
    }

    pub fn status(&self) -> CaptureStatus {
        self.status.get()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Synchronously stops capture and releases the detector. Idempotent.
    pub fn stop(&mut self) {
        if self.runtime.is_none() && self.capture_thread.is_none() {
            return;
        }

        self.token.cancel();
        let _ = self.shutdown.send(true);

        // Waits for a running detection to finish; its result is discarded.
        self.engine.release();

        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(TEARDOWN_GRACE);
        }
        if let Some(handle) = self.capture_thread.take() {
            if handle.join().is_err() {
                error!("capture thread panicked");
            }
        }

        self.status.mark_stopped();
        info!("gesture session stopped");
    }
}

impl Drop for GestureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    config: CaptureConfig,
    frames: mpsc::Sender<DynamicImage>,
    token: CancellationToken,
    status: StatusCell,
) {
    let mut source = match FrameSource::open(&config) {
        Ok(source) => source,
        Err(e) => {
            status.mark_unavailable(&token, e.to_string());
            return;
        }
    };

    let mut failures = 0u32;
    while !token.is_cancelled() {
        match source.read_frame() {
            Ok(frame) => {
                failures = 0;
                if frames.blocking_send(frame).is_err() {
                    break;
                }
            }
            Err(e) => {
                failures += 1;
                debug!("frame read failed ({failures}): {e}");
                if failures >= config.max_frame_failures {
                    status.mark_unavailable(&token, e.to_string());
                    break;
                }
            }
        }
    }
    debug!("capture loop finished");
}

async fn run_inference<F>(
    mut frames: mpsc::Receiver<DynamicImage>,
    mut shutdown: watch::Receiver<bool>,
    token: CancellationToken,
    status: StatusCell,
    engine: InferenceEngine,
    make_detector: F,
) where
    F: FnOnce() -> Result<Box<dyn HandDetector>, CaptureError> + Send + 'static,
{
    let init = {
        let engine = engine.clone();
        tokio::task::spawn_blocking(move || engine.init(make_detector))
    };
    match init.await {
        Ok(Ok(true)) => {}
        Ok(Ok(false)) => return,
        Ok(Err(e)) => {
            status.mark_unavailable(&token, e.to_string());
            return;
        }
        Err(e) => {
            status.mark_unavailable(&token, format!("detector setup panicked: {e}"));
            return;
        }
    }

    loop {
        let frame = tokio::select! {
            _ = shutdown.changed() => break,
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        status.mark_active();

        let job = {
            let engine = engine.clone();
            let token = token.clone();
            tokio::task::spawn_blocking(move || engine.process(&frame, &token))
        };
        let outcome = tokio::select! {
            _ = shutdown.changed() => break,
            joined = job => match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    status.mark_unavailable(&token, format!("detector panicked: {e}"));
                    break;
                }
            },
        };

        match outcome {
            Some(Ok(_)) => {}
            Some(Err(e)) => warn!("skipping frame: {e}"),
            None => break,
        }
    }
    debug!("inference task finished");
}
