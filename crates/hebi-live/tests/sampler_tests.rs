//! Frame sampler against an in-memory transport

mod common;

use image::RgbImage;
use std::time::Duration;
use tokio::time::timeout;

use hebi_live::{
    CameraError, FrameSampler, FrameSource, SampleOutcome, SessionConfig, TestPatternSource,
};

use common::*;

fn sampler() -> FrameSampler<TestPatternSource> {
    let config = SessionConfig {
        capture_width: 64,
        capture_height: 48,
        ..SessionConfig::default()
    };
    let source = TestPatternSource::new(config.capture_width, config.capture_height).unwrap();
    FrameSampler::new(source, &config)
}

#[tokio::test]
async fn test_skips_when_session_closed() {
    let (transport, session, _channels) = new_session();
    let mut sampler = sampler();

    assert_eq!(sampler.sample(&session), SampleOutcome::SkippedClosed);
    assert_eq!(sampler.stats().snapshot().dropped_closed, 1);
    assert!(transport.frames().is_empty());
}

#[tokio::test]
async fn test_dispatches_jpeg_frames() {
    let (transport, session, _channels) = open_session().await;
    let mut sampler = sampler();
    let stats = sampler.stats();

    assert_eq!(sampler.sample(&session), SampleOutcome::Dispatched);
    timeout(WAIT, async {
        while stats.snapshot().sent == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("frame never sent");

    let frames = transport.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].mime_type, "image/jpeg");
    assert!(!frames[0].data.is_empty());
    assert_eq!(stats.snapshot().captured, 1);
}

#[tokio::test]
async fn test_skips_while_previous_frame_in_flight() {
    let (transport, session, _channels) = open_session().await;
    let gate = transport.gate_frames();
    let mut sampler = sampler();
    let stats = sampler.stats();

    assert_eq!(sampler.sample(&session), SampleOutcome::Dispatched);
    wait_until_sending(&session).await;
    assert_eq!(sampler.sample(&session), SampleOutcome::SkippedBusy);
    assert_eq!(sampler.sample(&session), SampleOutcome::SkippedBusy);

    gate.add_permits(1);
    timeout(WAIT, async {
        while stats.snapshot().sent == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("frame never sent");

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.captured, 1);
    assert_eq!(snapshot.dropped_busy, 2);
    assert_eq!(transport.frames().len(), 1);
}

#[tokio::test]
async fn test_interval_follows_frame_rate() {
    let config = SessionConfig {
        frame_rate: 4.0,
        ..SessionConfig::default()
    };
    let source = TestPatternSource::new(8, 8).unwrap();
    let sampler = FrameSampler::new(source, &config);
    assert_eq!(sampler.interval(), Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_spawned_sampler_pushes_periodically() {
    let (transport, session, _channels) = open_session().await;
    let sampler = sampler();
    let stats = sampler.stats();
    let handle = sampler.spawn(session.clone());

    tokio::time::sleep(Duration::from_millis(1600)).await;
    handle.abort();

    // Ticks at 0, 500, 1000 and 1500 ms
    let sent = stats.snapshot().sent;
    assert!((2..=4).contains(&sent), "sent {}", sent);
    assert_eq!(transport.frames().len() as u64, sent);
}

/// Takes `delay` of wall-clock time per frame, like a sluggish camera
struct SlowSource {
    delay: Duration,
}

impl FrameSource for SlowSource {
    fn resolution(&self) -> (u32, u32) {
        (16, 16)
    }

    fn capture(&mut self) -> Result<RgbImage, CameraError> {
        std::thread::sleep(self.delay);
        Ok(RgbImage::new(16, 16))
    }
}

struct BrokenSource;

impl FrameSource for BrokenSource {
    fn resolution(&self) -> (u32, u32) {
        (16, 16)
    }

    fn capture(&mut self) -> Result<RgbImage, CameraError> {
        Err(CameraError::Capture("device unplugged".to_string()))
    }
}

#[tokio::test]
async fn test_slow_capture_does_not_stall_the_timer() {
    let (transport, session, _channels) = open_session().await;
    let config = SessionConfig {
        frame_rate: 20.0,
        ..SessionConfig::default()
    };
    let sampler = FrameSampler::new(
        SlowSource {
            delay: Duration::from_millis(300),
        },
        &config,
    );
    let stats = sampler.stats();
    let handle = sampler.spawn(session.clone());

    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.abort();

    // The 50 ms ticker kept firing while the first capture was running
    let snapshot = stats.snapshot();
    assert!(snapshot.dropped_busy >= 3, "{:?}", snapshot);
    assert!(snapshot.captured <= 2, "{:?}", snapshot);
    assert!(transport.frames().len() <= 2);
}

#[tokio::test]
async fn test_sample_returns_before_capture_finishes() {
    let (_transport, session, _channels) = open_session().await;
    let config = SessionConfig::default();
    let mut sampler = FrameSampler::new(
        SlowSource {
            delay: Duration::from_millis(200),
        },
        &config,
    );

    let started = std::time::Instant::now();
    assert_eq!(sampler.sample(&session), SampleOutcome::Dispatched);
    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(sampler.is_busy());
    assert_eq!(sampler.sample(&session), SampleOutcome::SkippedBusy);

    timeout(WAIT, async {
        while sampler.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("capture never finished");
    assert_eq!(sampler.stats().snapshot().sent, 1);
}

#[tokio::test]
async fn test_capture_failure_is_counted_and_cleared() {
    let (transport, session, _channels) = open_session().await;
    let mut sampler = FrameSampler::new(BrokenSource, &SessionConfig::default());
    let stats = sampler.stats();

    assert_eq!(sampler.sample(&session), SampleOutcome::Dispatched);
    timeout(WAIT, async {
        while sampler.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("capture never finished");

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.capture_failures, 1);
    assert_eq!(snapshot.captured, 0);
    assert!(transport.frames().is_empty());
}
