//! End-to-end runs of the headless app

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use hebi::{App, AppConfig, RunOptions};
use hebi_live::{
    FunctionResponse, InboundEvents, LiveTransport, MediaChunk, POSITION_TOOL, ServerEvent,
    SessionSetup, ToolInvocation, TransportError, TransportEvent,
};

/// Accepts the handshake and reports one fingertip position right away
#[derive(Default)]
struct ScriptedTransport {
    inbound: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    acks: Mutex<Vec<String>>,
    frames: AtomicUsize,
    closed: AtomicUsize,
}

#[async_trait]
impl LiveTransport for ScriptedTransport {
    async fn open(&self, _setup: &SessionSetup) -> Result<InboundEvents, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(TransportEvent::Message(ServerEvent::SetupComplete))
            .unwrap();
        tx.send(TransportEvent::Message(ServerEvent::ToolCall(vec![
            ToolInvocation {
                id: "t1".to_string(),
                name: POSITION_TOOL.to_string(),
                args: json!({ "x": 0.2, "y": 0.5 }),
            },
        ])))
        .unwrap();
        *self.inbound.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn send_frame(&self, _chunk: MediaChunk) -> Result<(), TransportError> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn acknowledge(&self, response: FunctionResponse) -> Result<(), TransportError> {
        self.acks.lock().unwrap().push(response.id);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inbound.lock().unwrap().take();
        Ok(())
    }
}

fn options(ticks: u64, tick_rate: f32) -> RunOptions {
    RunOptions {
        offline: true,
        ticks: Some(ticks),
        seed: 7,
        tick_rate,
        report_every: 0,
        ..RunOptions::default()
    }
}

fn small_capture() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.capture_width = 32;
    config.session.capture_height = 24;
    config.session.frame_rate = 20.0;
    config
}

#[tokio::test(start_paused = true)]
async fn test_offline_run_wanders() {
    let app = App::new(AppConfig::default(), options(120, 1000.0)).unwrap();
    let summary = app.run(std::future::pending()).await.unwrap();

    assert_eq!(summary.ticks, 120);
    assert_eq!(summary.tracked_ticks, 0);
    assert_eq!(summary.tracking_losses, 0);
    assert!(summary.length >= 20);
    assert!(summary.frames.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_missing_credential_runs_offline() {
    let mut opts = options(10, 1000.0);
    opts.offline = false;
    let app = App::new(AppConfig::default(), opts).unwrap();
    let summary = app.run(std::future::pending()).await.unwrap();

    assert_eq!(summary.ticks, 10);
    assert!(summary.frames.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_the_loop() {
    let mut opts = options(0, 60.0);
    opts.ticks = None;
    let app = App::new(AppConfig::default(), opts).unwrap();
    let summary = app
        .run(tokio::time::sleep(Duration::from_millis(100)))
        .await
        .unwrap();

    assert!(summary.ticks > 0);
    assert!(summary.ticks < 20, "ran {} ticks", summary.ticks);
}

#[tokio::test(start_paused = true)]
async fn test_same_seed_same_run() {
    let first = App::new(AppConfig::default(), options(600, 1000.0))
        .unwrap()
        .run(std::future::pending())
        .await
        .unwrap();
    let second = App::new(AppConfig::default(), options(600, 1000.0))
        .unwrap()
        .run(std::future::pending())
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_live_session_steers_and_acks() {
    let transport = Arc::new(ScriptedTransport::default());
    let mut opts = options(60, 200.0);
    opts.offline = false;

    let app = App::new(small_capture(), opts).unwrap();
    let summary = app
        .run_with(Some(Arc::clone(&transport)), std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.ticks, 60);
    assert!(summary.tracked_ticks > 0);
    assert_eq!(*transport.acks.lock().unwrap(), vec!["t1".to_string()]);
    assert!(summary.frames.is_some());
    assert!(transport.closed.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = AppConfig::default();
    config.body.initial_length = 0;
    assert!(App::new(config, RunOptions::default()).is_err());
}

#[test]
fn test_unusable_frame_rate_rejected() {
    let mut config = AppConfig::default();
    config.session.frame_rate = 1e12;
    assert!(App::new(config, RunOptions::default()).is_err());
}
