//! Per-session playback state machine and pacing task.
//!
//! Ported from the light-control backend's `LightControlConsumer` playback
//! loop: a cooperative real-time task that emits one archive frame per
//! period, skipping ahead when the scheduler falls behind instead of
//! replaying stale frames. State (current frame, bound slave, play/pause)
//! lives behind a single mutex that also serializes emission against
//! `pause`/`stop`, so a transition can never interleave with a frame
//! already in flight.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use nodelink_archive::{PxldReader, SlaveEntry};
use tokio::{task::JoinHandle, time::Instant};

use crate::{
    error::PlaybackError,
    messages::{OutboundEvent, SlaveFrame},
};

/// A session's place in the init/play/pause/stop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No archive opened yet.
    Uninitialized,
    /// Archive opened; pacing task not running.
    Ready,
    /// Pacing task emitting frames.
    Playing,
    /// Pacing task halted, position retained.
    Paused,
}

/// Callback a session publishes its outbound events through. In practice
/// this forwards to a [`crate::hub::BroadcastHub`] group.
pub type EventSink = Arc<dyn Fn(OutboundEvent) + Send + Sync>;

struct Inner {
    reader: Option<Arc<PxldReader>>,
    slave_id: i32,
    fps: u8,
    total_frames: u32,
    total_slaves: u16,
    current_frame: u32,
    state: State,
}

/// One connection's playback state machine.
///
/// Not `Clone`; a session is driven sequentially by its owning adapter.
/// The pacing task spawned by `play` holds its own `Arc` clones of the
/// shared state and stop flag, independent of this handle's lifetime.
pub struct PlaybackSession {
    inner: Arc<Mutex<Inner>>,
    stop_request: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    base_dir: PathBuf,
    sink: EventSink,
}

impl PlaybackSession {
    /// Create a session rooted at `base_dir`, publishing events through `sink`.
    pub fn new(base_dir: impl Into<PathBuf>, sink: EventSink) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                reader: None,
                slave_id: -1,
                fps: 0,
                total_frames: 0,
                total_slaves: 0,
                current_frame: 0,
                state: State::Uninitialized,
            })),
            stop_request: Arc::new(AtomicBool::new(false)),
            task: None,
            base_dir: base_dir.into(),
            sink,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.lock().expect("playback session mutex poisoned").state
    }

    /// Open `filename`, enumerate frame-0 slave ids, and move to `Ready`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Archive`] if the archive cannot be opened or
    /// its frame-0 slave table cannot be read.
    pub async fn init(&mut self, filename: &str, slave_id: i32) -> Result<(), PlaybackError> {
        self.cancel_task().await;

        let path = self.base_dir.join(filename);
        let reader = Arc::new(PxldReader::open(&path)?);
        let fps = reader.header().fps();
        let total_frames = reader.total_frames();
        let total_slaves = reader.header().total_slaves();

        let entries = reader.slave_entries(0)?;
        let mut slave_ids: Vec<u8> = entries.iter().map(SlaveEntry::slave_id).collect();
        slave_ids.sort_unstable();

        {
            let mut guard = self.inner.lock().expect("playback session mutex poisoned");
            guard.reader = Some(reader);
            guard.slave_id = slave_id;
            guard.fps = fps;
            guard.total_frames = total_frames;
            guard.total_slaves = total_slaves;
            guard.current_frame = 0;
            guard.state = State::Ready;
        }

        (self.sink)(OutboundEvent::Ready {
            filename: filename.to_owned(),
            slave_id,
            total_frames,
            fps,
            total_slaves,
            slave_ids,
        });
        Ok(())
    }

    /// Cancel any active pacing task, set the starting frame, and spawn a
    /// fresh pacing task.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::NotInitialized`] if called before `init`.
    pub async fn play(&mut self, frame: Option<u32>) -> Result<(), PlaybackError> {
        self.cancel_task().await;

        let (start_frame, fps) = {
            let mut guard = self.inner.lock().expect("playback session mutex poisoned");
            if guard.reader.is_none() {
                return Err(PlaybackError::NotInitialized);
            }
            if let Some(requested) = frame {
                guard.current_frame = requested.min(guard.total_frames.saturating_sub(1));
            }
            guard.state = State::Playing;
            (guard.current_frame, guard.fps)
        };

        self.stop_request.store(false, Ordering::Release);
        let inner = Arc::clone(&self.inner);
        let stop_request = Arc::clone(&self.stop_request);
        let sink = Arc::clone(&self.sink);
        self.task = Some(tokio::spawn(pacing_loop(inner, stop_request, sink)));

        (self.sink)(OutboundEvent::Started { frame: start_frame, fps });
        Ok(())
    }

    /// Set the stop-request flag, cancel the pacing task, and broadcast the
    /// current position. Position is retained.
    pub async fn pause(&mut self) {
        self.stop_request.store(true, Ordering::Release);
        self.cancel_task().await;

        let frame = {
            let mut guard = self.inner.lock().expect("playback session mutex poisoned");
            guard.state = State::Paused;
            guard.current_frame
        };
        (self.sink)(OutboundEvent::Paused { frame });
    }

    /// Set the stop-request flag, cancel the pacing task, reset position to
    /// frame 0, and broadcast `stopped`.
    pub async fn stop(&mut self) {
        self.stop_request.store(true, Ordering::Release);
        self.cancel_task().await;

        let mut guard = self.inner.lock().expect("playback session mutex poisoned");
        guard.current_frame = 0;
        if guard.reader.is_some() {
            guard.state = State::Ready;
        }
        drop(guard);
        (self.sink)(OutboundEvent::Stopped);
    }

    /// Clamp `frame` into range, set it as current, and emit it once.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::NotInitialized`] if called before `init`, or
    /// an archive error if the frame cannot be read.
    pub async fn seek(&mut self, frame: u32, slave_id: Option<i32>) -> Result<(), PlaybackError> {
        let (reader, frame, slave_id) = {
            let mut guard = self.inner.lock().expect("playback session mutex poisoned");
            let reader = guard.reader.clone().ok_or(PlaybackError::NotInitialized)?;
            let clamped = frame.min(guard.total_frames.saturating_sub(1));
            guard.current_frame = clamped;
            if let Some(sid) = slave_id {
                guard.slave_id = sid;
            }
            (reader, clamped, guard.slave_id)
        };
        let event = build_frame_event(&reader, frame, slave_id)?;
        (self.sink)(event);
        Ok(())
    }

    /// Emit `frame` without changing session state.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::NotInitialized`] if called before `init`, or
    /// an archive error if the frame cannot be read.
    pub async fn get_frame(&self, frame: u32, slave_id: Option<i32>) -> Result<(), PlaybackError> {
        let (reader, slave_id) = {
            let guard = self.inner.lock().expect("playback session mutex poisoned");
            let reader = guard.reader.clone().ok_or(PlaybackError::NotInitialized)?;
            (reader, slave_id.unwrap_or(guard.slave_id))
        };
        let event = build_frame_event(&reader, frame, slave_id)?;
        (self.sink)(event);
        Ok(())
    }

    async fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

/// Target period for one frame at `fps`. Treats `fps == 0` (malformed
/// archive) as 1 fps rather than dividing by zero.
fn frame_period(fps: u8) -> Duration {
    if fps == 0 { Duration::from_secs(1) } else { Duration::from_secs_f64(1.0 / f64::from(fps)) }
}

/// Result of one pacing decision: the next frame to emit, how long to
/// sleep before emitting it, and how many frames this decision skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PaceOutcome {
    next_frame: u32,
    sleep_for: Duration,
    skipped: u32,
}

/// Compute the next frame and sleep duration after emitting `current_frame`,
/// given `elapsed` time spent on this iteration so far. When `elapsed`
/// exceeds one `period`, frames are skipped rather than replayed so the
/// session catches back up to wall-clock pace.
fn pace(current_frame: u32, total_frames: u32, period: Duration, elapsed: Duration) -> PaceOutcome {
    let total_frames = total_frames.max(1);
    let next = (current_frame + 1) % total_frames;

    if period.is_zero() || elapsed <= period {
        return PaceOutcome { next_frame: next, sleep_for: period.saturating_sub(elapsed), skipped: 0 };
    }

    let lag = elapsed - period;
    let extra = (lag.as_secs_f64() / period.as_secs_f64()).floor() as u32;
    let next_frame = next.saturating_add(extra).min(total_frames - 1);
    PaceOutcome { next_frame, sleep_for: Duration::ZERO, skipped: extra }
}

async fn pacing_loop(inner: Arc<Mutex<Inner>>, stop_request: Arc<AtomicBool>, sink: EventSink) {
    let mut iterations: u64 = 0;
    let mut skipped_total: u64 = 0;

    loop {
        if stop_request.load(Ordering::Acquire) {
            break;
        }

        let iter_start = Instant::now();
        let step = {
            let mut guard = inner.lock().expect("playback session mutex poisoned");
            if stop_request.load(Ordering::Acquire) {
                break;
            }
            let Some(reader) = guard.reader.clone() else { break };
            let frame = guard.current_frame;
            let slave_id = guard.slave_id;
            let total_frames = guard.total_frames;
            let fps = guard.fps;

            match build_frame_event(&reader, frame, slave_id) {
                Ok(event) => sink(event),
                Err(error) => sink(OutboundEvent::Error { message: error.to_string() }),
            }

            let outcome = pace(frame, total_frames, frame_period(fps), iter_start.elapsed());
            guard.current_frame = outcome.next_frame;
            (outcome, fps)
        };

        let (outcome, fps) = step;
        skipped_total += u64::from(outcome.skipped);
        iterations += 1;
        if fps > 0 && iterations % u64::from(fps) == 0 {
            tracing::debug!(iterations, skipped_total, fps, "playback pacing checkpoint");
        }

        if !outcome.sleep_for.is_zero() {
            tokio::time::sleep(outcome.sleep_for).await;
        }
    }
}

fn build_frame_event(reader: &PxldReader, frame: u32, slave_id: i32) -> Result<OutboundEvent, PlaybackError> {
    let entries = reader.slave_entries(frame)?;

    if slave_id == -1 {
        let mut ids: Vec<u8> = entries.iter().map(SlaveEntry::slave_id).collect();
        ids.sort_unstable();

        let mut slaves = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = entries.iter().find(|e| e.slave_id() == id);
            let pixel_count = entry.map_or(0, SlaveEntry::pixel_count);
            let bytes = reader.slave_rgbw(frame, i32::from(id))?;
            slaves.push(SlaveFrame { slave_id: id, rgbw_b64: base64_encode(&bytes), pixel_count });
        }
        let total_slaves = slaves.len();
        return Ok(OutboundEvent::FrameDataAll { frame, slaves, total_slaves });
    }

    let entry = entries
        .iter()
        .find(|e| i32::from(e.slave_id()) == slave_id)
        .ok_or(PlaybackError::SlaveNotPresent { slave_id, frame })?;
    let bytes = reader.slave_rgbw(frame, slave_id)?;
    Ok(OutboundEvent::FrameData {
        frame,
        slave_id: entry.slave_id(),
        rgbw_b64: base64_encode(&bytes),
        pixel_count: entry.pixel_count(),
    })
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
