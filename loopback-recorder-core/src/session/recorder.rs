use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;

use crate::models::error::RecorderError;
use crate::models::options::SessionOptions;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::RecorderState;
use crate::models::stats::{SessionStats, StatsSnapshot};
use crate::processing::handoff_queue::{HandoffQueue, DEFAULT_QUEUE_CAPACITY};
use crate::processing::pause_gate::PauseGate;
use crate::processing::stop_signal::StopSignal;
use crate::session::capture::{CaptureLoop, PUSH_TIMEOUT};
use crate::session::writer::WriterLoop;
use crate::storage::metadata;
use crate::storage::wav_writer::WavFileWriter;
use crate::traits::delegate::RecorderDelegate;
use crate::traits::frame_source::LoopbackProvider;
use crate::traits::sink::SinkReport;

/// How long teardown waits for the writer to flush and finalize before it
/// gives up and reports the situation instead of hanging the caller.
pub const WRITER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Wall-clock accounting that excludes paused stretches from the reported
/// recording duration.
struct PauseClock {
    started_at: Instant,
    paused_total: Duration,
    paused_since: Option<Instant>,
}

impl PauseClock {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            paused_total: Duration::ZERO,
            paused_since: None,
        }
    }

    fn pause(&mut self) {
        if self.paused_since.is_none() {
            self.paused_since = Some(Instant::now());
        }
    }

    fn resume(&mut self) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += since.elapsed();
        }
    }

    fn active_secs(&self) -> f64 {
        let paused = self.paused_total
            + self
                .paused_since
                .map(|since| since.elapsed())
                .unwrap_or(Duration::ZERO);
        self.started_at.elapsed().saturating_sub(paused).as_secs_f64()
    }
}

struct WriterLink {
    handle: thread::JoinHandle<()>,
    done: Receiver<Result<SinkReport, RecorderError>>,
}

/// Aggregate state for one start-to-stop cycle. Created on `start`,
/// released when `start` returns; the signals inside are the only state
/// shared across the session's threads.
struct Session {
    path: PathBuf,
    options: SessionOptions,
    queue: Arc<HandoffQueue>,
    gate: Arc<PauseGate>,
    stop: Arc<StopSignal>,
    stats: Arc<SessionStats>,
    /// Also serializes gate mutations against shutdown, so a racing
    /// `pause` can never close the gate after teardown reopened it.
    state: Mutex<RecorderState>,
    clock: Mutex<PauseClock>,
    writer: Mutex<Option<WriterLink>>,
    outcome: Mutex<Option<Result<RecordingResult, RecorderError>>>,
}

impl Session {
    fn new(path: PathBuf, options: SessionOptions) -> Self {
        Self {
            path,
            options,
            queue: Arc::new(HandoffQueue::new(DEFAULT_QUEUE_CAPACITY)),
            gate: Arc::new(PauseGate::new()),
            stop: Arc::new(StopSignal::new()),
            stats: Arc::new(SessionStats::default()),
            state: Mutex::new(RecorderState::Idle),
            clock: Mutex::new(PauseClock::new()),
            writer: Mutex::new(None),
            outcome: Mutex::new(None),
        }
    }
}

/// Public facade over the capture/writer pipeline.
///
/// `start` runs the capture loop on the calling thread until the session
/// ends, exactly like the shell-facing contract expects; a GUI runs it on a
/// worker thread and drives `pause`/`resume`/`stop` from its event handlers.
/// One session may be active per recorder instance.
pub struct SystemAudioRecorder<P: LoopbackProvider> {
    provider: P,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    session: Mutex<Option<Arc<Session>>>,
}

impl<P: LoopbackProvider> SystemAudioRecorder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            delegate: None,
            session: Mutex::new(None),
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    /// Record to `path` until `stop` is called or the device fails.
    ///
    /// The writer thread is started first so the sink is ready before
    /// capture can enqueue anything; an unwritable destination fails here,
    /// before any audio is captured. Blocks are then captured on the
    /// calling thread until shutdown, after which the finalized result is
    /// returned.
    pub fn start(
        &self,
        path: impl Into<PathBuf>,
        options: SessionOptions,
    ) -> Result<RecordingResult, RecorderError> {
        options.validate().map_err(RecorderError::InvalidOptions)?;

        let session = {
            let mut slot = self.session.lock();
            if slot.is_some() {
                return Err(RecorderError::AlreadyActive);
            }
            let session = Arc::new(Session::new(path.into(), options));
            *slot = Some(Arc::clone(&session));
            session
        };

        let result = self.run_session(&session);
        *self.session.lock() = None;
        result
    }

    /// Close the pause gate. Harmless no-op when already paused, stopped,
    /// or idle.
    pub fn pause(&self) {
        let Some(session) = self.current() else {
            return;
        };
        let changed = {
            let mut state = session.state.lock();
            if !session.stop.is_closed() && session.gate.close() {
                session.clock.lock().pause();
                *state = RecorderState::Paused;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify_state(RecorderState::Paused);
            self.report("Recording paused");
        }
    }

    /// Reopen the pause gate. Harmless no-op when already running, stopped,
    /// or idle.
    pub fn resume(&self) {
        let Some(session) = self.current() else {
            return;
        };
        let changed = {
            let mut state = session.state.lock();
            if !session.stop.is_closed() && session.gate.open() {
                session.clock.lock().resume();
                *state = RecorderState::Recording;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify_state(RecorderState::Recording);
            self.report("Recording resumed");
        }
    }

    /// End the active session: close the stop signal, enqueue the
    /// end-of-stream sentinel, and wait (bounded) for the writer to flush
    /// and finalize the file. Idempotent; with no active session this is a
    /// no-op.
    pub fn stop(&self) -> Result<(), RecorderError> {
        let Some(session) = self.current() else {
            return Ok(());
        };
        self.finalize(&session).map(|_| ())
    }

    /// Observable state of the active session, `Idle` when none.
    pub fn state(&self) -> RecorderState {
        self.current()
            .map(|session| *session.state.lock())
            .unwrap_or(RecorderState::Idle)
    }

    /// Counters of the active session, zeroes when none.
    pub fn stats(&self) -> StatsSnapshot {
        self.current()
            .map(|session| session.stats.snapshot())
            .unwrap_or_default()
    }

    fn current(&self) -> Option<Arc<Session>> {
        self.session.lock().clone()
    }

    fn run_session(&self, session: &Arc<Session>) -> Result<RecordingResult, RecorderError> {
        self.report("Starting system audio recording");

        let ready_rx = self.spawn_writer(session)?;
        if let Err(err) = self.await_sink_ready(session, ready_rx) {
            self.report_error(&err);
            return Err(err);
        }

        let source = match self
            .provider
            .open(session.options.sample_rate, session.options.channels)
        {
            Ok(source) => source,
            Err(err) => {
                self.report_error(&err);
                // The writer already holds an open sink; tear down so the
                // file is finalized rather than abandoned.
                let _ = self.finalize(session);
                return Err(err);
            }
        };
        self.report("Loopback capture stream opened");
        self.transition(session, RecorderState::Recording);

        let capture = CaptureLoop {
            source,
            block_size: session.options.block_size,
            queue: Arc::clone(&session.queue),
            gate: Arc::clone(&session.gate),
            stop: Arc::clone(&session.stop),
            stats: Arc::clone(&session.stats),
            delegate: self.delegate.clone(),
            push_timeout: PUSH_TIMEOUT,
        };
        let capture_outcome = capture.run();

        let outcome = self.finalize(session);
        self.transition(session, RecorderState::Idle);

        match capture_outcome {
            Err(device_err) => Err(device_err),
            Ok(()) => outcome,
        }
    }

    /// Spawn the writer thread; it opens the sink and reports readiness
    /// over the returned bounded channel before consuming the queue.
    fn spawn_writer(
        &self,
        session: &Arc<Session>,
    ) -> Result<Receiver<Result<(), RecorderError>>, RecorderError> {
        let (ready_tx, ready_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);

        let path = session.path.clone();
        let options = session.options;
        let writer = WriterLoop {
            queue: Arc::clone(&session.queue),
            stats: Arc::clone(&session.stats),
            delegate: self.delegate.clone(),
        };

        let handle = thread::Builder::new()
            .name("audio-writer".into())
            .spawn(move || {
                let sink = match WavFileWriter::create(path, &options) {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(()));
                        sink
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = done_tx.send(writer.run(sink));
            })
            .map_err(|e| RecorderError::Sink(format!("failed to spawn writer thread: {}", e)))?;

        *session.writer.lock() = Some(WriterLink {
            handle,
            done: done_rx,
        });
        Ok(ready_rx)
    }

    fn await_sink_ready(
        &self,
        session: &Arc<Session>,
        ready_rx: Receiver<Result<(), RecorderError>>,
    ) -> Result<(), RecorderError> {
        let readiness = ready_rx.recv().unwrap_or_else(|_| {
            Err(RecorderError::Sink(
                "writer thread terminated before opening the sink".into(),
            ))
        });
        if let Err(err) = readiness {
            // The writer never reached its loop; reap it and record the
            // outcome so a racing `stop` sees the same failure.
            session.stop.close();
            if let Some(link) = session.writer.lock().take() {
                let _ = link.handle.join();
            }
            *session.outcome.lock() = Some(Err(err.clone()));
            return Err(err);
        }
        Ok(())
    }

    /// Teardown runs exactly once per session no matter which thread
    /// triggers it; later callers block until it completes and then see the
    /// same outcome.
    fn finalize(&self, session: &Arc<Session>) -> Result<RecordingResult, RecorderError> {
        let mut outcome_slot = session.outcome.lock();
        if let Some(cached) = outcome_slot.as_ref() {
            return cached.clone();
        }
        let outcome = self.teardown(session);
        *outcome_slot = Some(outcome.clone());
        outcome
    }

    fn teardown(&self, session: &Arc<Session>) -> Result<RecordingResult, RecorderError> {
        {
            let mut state = session.state.lock();
            session.stop.close();
            // Reopen the gate so a paused capture loop can observe the stop
            // signal; the state lock keeps a racing pause from re-closing it.
            session.gate.open();
            *state = RecorderState::Stopping;
        }
        self.notify_state(RecorderState::Stopping);
        self.report("Stopping recording");

        session.queue.push_sentinel();

        let Some(link) = session.writer.lock().take() else {
            return Err(RecorderError::Sink("writer thread is not running".into()));
        };
        let report = match link.done.recv_timeout(WRITER_JOIN_TIMEOUT) {
            Ok(Ok(report)) => {
                let _ = link.handle.join();
                report
            }
            Ok(Err(err)) => {
                let _ = link.handle.join();
                self.report_error(&err);
                return Err(err);
            }
            Err(RecvTimeoutError::Timeout) => {
                let err = RecorderError::Sink(format!(
                    "writer did not finish within {} s, abandoning join",
                    WRITER_JOIN_TIMEOUT.as_secs()
                ));
                self.report_error(&err);
                return Err(err);
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = link.handle.join();
                let err = RecorderError::Sink("writer thread terminated unexpectedly".into());
                self.report_error(&err);
                return Err(err);
            }
        };

        let stats = session.stats.snapshot();
        let duration_secs = session.clock.lock().active_secs();
        let checksum = report.checksum.clone().unwrap_or_default();
        let recording_metadata = RecordingMetadata::new(
            &session.path.to_string_lossy(),
            &session.options,
            duration_secs,
            stats,
            &checksum,
        );
        let result = RecordingResult {
            file_path: session.path.clone(),
            duration_secs,
            stats,
            checksum,
            metadata: recording_metadata,
        };

        if let Err(err) = metadata::write_sidecar(&result.metadata, &session.path) {
            log::warn!("failed to write metadata sidecar: {}", err);
        }

        self.report(&format!("Saved recording to: {}", session.path.display()));
        if let Some(delegate) = &self.delegate {
            delegate.on_finished(&result);
        }
        Ok(result)
    }

    fn transition(&self, session: &Arc<Session>, new_state: RecorderState) {
        let changed = {
            let mut state = session.state.lock();
            if *state == new_state {
                false
            } else {
                *state = new_state;
                true
            }
        };
        if changed {
            self.notify_state(new_state);
        }
    }

    fn notify_state(&self, state: RecorderState) {
        log::debug!("recorder state: {:?}", state);
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(state);
        }
    }

    fn report(&self, message: &str) {
        log::info!("{}", message);
        if let Some(delegate) = &self.delegate {
            delegate.on_status(message);
        }
    }

    fn report_error(&self, error: &RecorderError) {
        log::error!("{}", error);
        if let Some(delegate) = &self.delegate {
            delegate.on_error(error);
            delegate.on_status(&format!("Recorder error: {}", error));
        }
    }
}
