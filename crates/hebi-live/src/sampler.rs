//! Periodic frame capture and push

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::capture::FrameSource;
use crate::config::SessionConfig;
use crate::frame::{EncodedFrame, encode_jpeg};
use crate::session::{ConnectionState, FrameDisposition, SessionAdapter};
use crate::transport::LiveTransport;

/// Running counters, shared with whoever wants to report them
#[derive(Debug, Default)]
pub struct SamplerStats {
    captured: AtomicU64,
    sent: AtomicU64,
    dropped_busy: AtomicU64,
    dropped_closed: AtomicU64,
    send_failures: AtomicU64,
    capture_failures: AtomicU64,
    encode_failures: AtomicU64,
}

/// Point-in-time copy of [`SamplerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerSnapshot {
    pub captured: u64,
    pub sent: u64,
    pub dropped_busy: u64,
    pub dropped_closed: u64,
    pub send_failures: u64,
    pub capture_failures: u64,
    pub encode_failures: u64,
}

impl SamplerStats {
    pub fn snapshot(&self) -> SamplerSnapshot {
        SamplerSnapshot {
            captured: self.captured.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
        }
    }

    fn record(&self, disposition: FrameDisposition) {
        let counter = match disposition {
            FrameDisposition::Sent => &self.sent,
            FrameDisposition::Busy => &self.dropped_busy,
            FrameDisposition::NotOpen => &self.dropped_closed,
            FrameDisposition::Failed => &self.send_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of one sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Capture, encode and send handed to a background task
    Dispatched,
    SkippedClosed,
    SkippedBusy,
}

/// Captures from a [`FrameSource`] at a fixed rate and pushes each frame
/// into the session. Never queues: a tick that finds the previous frame
/// still being captured, encoded or sent is skipped. Capture and encode run
/// on the blocking pool so a slow source never holds up the timer.
pub struct FrameSampler<S: FrameSource> {
    source: Arc<Mutex<S>>,
    resolution: (u32, u32),
    interval: Duration,
    jpeg_quality: f32,
    busy: Arc<AtomicBool>,
    stats: Arc<SamplerStats>,
}

impl<S: FrameSource> FrameSampler<S> {
    pub fn new(source: S, config: &SessionConfig) -> Self {
        Self {
            resolution: source.resolution(),
            source: Arc::new(Mutex::new(source)),
            interval: config.frame_interval(),
            jpeg_quality: config.jpeg_quality,
            busy: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(SamplerStats::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> Arc<SamplerStats> {
        Arc::clone(&self.stats)
    }

    /// True while a frame is anywhere between capture and the wire
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run until the task is aborted
    pub fn spawn<T: LiveTransport>(self, session: SessionAdapter<T>) -> JoinHandle<()> {
        tokio::spawn(self.run(session))
    }

    pub async fn run<T: LiveTransport>(mut self, session: SessionAdapter<T>) {
        log::info!(
            "Sampling frames every {} ms at {}x{}",
            self.interval.as_millis(),
            self.resolution.0,
            self.resolution.1
        );
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.sample(&session);
        }
    }

    /// Start capturing, encoding and sending one frame. Returns immediately;
    /// must be called inside a tokio runtime.
    pub fn sample<T: LiveTransport>(&mut self, session: &SessionAdapter<T>) -> SampleOutcome {
        if session.state() != ConnectionState::Open {
            self.stats.dropped_closed.fetch_add(1, Ordering::Relaxed);
            return SampleOutcome::SkippedClosed;
        }
        if session.is_sending() || self.busy.swap(true, Ordering::AcqRel) {
            self.stats.dropped_busy.fetch_add(1, Ordering::Relaxed);
            return SampleOutcome::SkippedBusy;
        }
        let busy = Busy(Arc::clone(&self.busy));

        let source = Arc::clone(&self.source);
        let quality = self.jpeg_quality;
        let session = session.clone();
        let stats = Arc::clone(&self.stats);
        tokio::spawn(async move {
            let _busy = busy;
            let encoded = tokio::task::spawn_blocking({
                let stats = Arc::clone(&stats);
                move || capture_and_encode(&source, quality, &stats)
            })
            .await;

            match encoded {
                Ok(Some(frame)) => stats.record(session.send_frame(frame).await),
                Ok(None) => {}
                Err(err) => log::warn!("Frame capture task failed: {}", err),
            }
        });
        SampleOutcome::Dispatched
    }
}

fn capture_and_encode<S: FrameSource>(
    source: &Mutex<S>,
    quality: f32,
    stats: &SamplerStats,
) -> Option<EncodedFrame> {
    let captured = match source.lock() {
        Ok(mut source) => source.capture(),
        Err(poisoned) => poisoned.into_inner().capture(),
    };
    let image = match captured {
        Ok(image) => image,
        Err(err) => {
            stats.capture_failures.fetch_add(1, Ordering::Relaxed);
            log::warn!("Frame capture failed: {}", err);
            return None;
        }
    };

    match encode_jpeg(&image, quality) {
        Ok(frame) => {
            stats.captured.fetch_add(1, Ordering::Relaxed);
            log::trace!("Encoded {} byte frame", frame.jpeg_bytes);
            Some(frame)
        }
        Err(err) => {
            stats.encode_failures.fetch_add(1, Ordering::Relaxed);
            log::warn!("Dropping frame: {}", err);
            None
        }
    }
}

/// Clears the sampler's busy flag when the frame pipeline finishes
struct Busy(Arc<AtomicBool>);

impl Drop for Busy {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
