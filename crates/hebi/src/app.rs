//! Headless game runner
//!
//! Ticks the [`GameLoop`] at the display rate and, when a credential is
//! available, runs the live tracking session beside it. The only thing the
//! two share is the latest [`FingerSignal`].

use anyhow::Result;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use web_time::Instant;

use hebi_core::{FingerSignal, GameLoop, SourceTransition, TargetSource, TickReport};
use hebi_live::{
    CameraError, FrameSampler, FrameSource, ImageDirSource, LiveTransport, SamplerSnapshot,
    SamplerStats, SessionAdapter, SessionEvent, SessionSetup, TestPatternSource,
    WebSocketTransport,
};

use crate::config::AppConfig;

/// Run options that come from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Never open a session; the snake only wanders
    pub offline: bool,
    /// Replay still images instead of the synthetic pattern
    pub frames_dir: Option<PathBuf>,
    /// Stop after this many ticks
    pub ticks: Option<u64>,
    pub seed: u64,
    /// Ticks per second
    pub tick_rate: f32,
    /// Log a status line every N ticks (0 disables)
    pub report_every: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            offline: false,
            frames_dir: None,
            ticks: None,
            seed: 0,
            tick_rate: 60.0,
            report_every: 300,
        }
    }
}

impl RunOptions {
    pub fn tick_interval(&self) -> Duration {
        if self.tick_rate.is_finite() && self.tick_rate > 0.0 {
            Duration::from_secs_f32(1.0 / self.tick_rate)
        } else {
            Duration::from_secs_f32(1.0 / 60.0)
        }
    }
}

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub tracked_ticks: u64,
    pub score: u32,
    pub pickups: u32,
    pub length: usize,
    pub tracking_losses: u32,
    /// Frame counters, if a sampler ran
    pub frames: Option<SamplerSnapshot>,
}

impl RunSummary {
    fn record(&mut self, report: &TickReport) {
        self.ticks = report.tick;
        if report.target.source == TargetSource::Tracked {
            self.tracked_ticks += 1;
        }
        if report.transition == Some(SourceTransition::Lost) {
            self.tracking_losses += 1;
        }
        if report.pickup.is_some() {
            self.pickups += 1;
        }
        self.score = report.score;
        self.length = report.length;
    }
}

/// Session-side tasks that live as long as a run
struct LiveSide<T: LiveTransport> {
    session: SessionAdapter<T>,
    signals: watch::Receiver<Option<FingerSignal>>,
    sampler: Option<(JoinHandle<()>, Arc<SamplerStats>)>,
    status_log: JoinHandle<()>,
}

pub struct App {
    config: AppConfig,
    options: RunOptions,
}

impl App {
    pub fn new(config: AppConfig, options: RunOptions) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, options })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run against the hosted backend (or offline) until `shutdown`
    /// resolves or the tick limit is reached
    pub async fn run<F>(self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let transport = if self.options.offline {
            log::info!("Offline mode: the snake will wander");
            None
        } else if !self.config.has_credential() {
            log::warn!(
                "No session credential (HEBI_SESSION__API_KEY or {}); running offline",
                crate::config::CREDENTIAL_ENV
            );
            None
        } else {
            Some(WebSocketTransport::new(&self.config.session))
        };
        self.run_with(transport, shutdown).await
    }

    /// Run with an explicit transport; `None` runs offline
    pub async fn run_with<T, F>(self, transport: Option<T>, shutdown: F) -> Result<RunSummary>
    where
        T: LiveTransport,
        F: Future<Output = ()>,
    {
        let mut live = match transport {
            Some(transport) => Some(self.start_live(transport).await),
            None => None,
        };

        let mut game = GameLoop::new(self.config.game(), self.options.seed);
        game.start();
        log::info!(
            "Ticking at {:.0} Hz (seed {})",
            self.options.tick_rate,
            self.options.seed
        );

        let mut summary = RunSummary::default();
        let mut ticker = time::interval(self.options.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let signal = live.as_mut().and_then(|l| *l.signals.borrow_and_update());
                    let Some(report) = game.tick(signal.as_ref(), Instant::now()) else {
                        break;
                    };
                    summary.record(&report);
                    self.report(&report, live.as_ref());

                    if self.options.ticks.is_some_and(|limit| report.tick >= limit) {
                        break;
                    }
                }
            }
        }

        if let Some(live) = live.take() {
            summary.frames = live.stop().await;
        }
        game.reset();
        log::info!(
            "Finished after {} ticks: score {}, length {}, tracked {} ticks",
            summary.ticks,
            summary.score,
            summary.length,
            summary.tracked_ticks
        );
        Ok(summary)
    }

    async fn start_live<T: LiveTransport>(&self, transport: T) -> LiveSide<T> {
        let setup = SessionSetup::finger_tracking(&self.config.session);
        let (session, channels) = SessionAdapter::new(transport, setup);
        let status_log = tokio::spawn(log_session_events(channels.events));

        if let Err(err) = session.connect().await {
            // Status already reported; the game keeps running on wander
            log::debug!("Session unavailable: {}", err);
        }

        let sampler = match self.frame_source() {
            Ok(source) => {
                let sampler = FrameSampler::new(source, &self.config.session);
                let stats = sampler.stats();
                Some((sampler.spawn(session.clone()), stats))
            }
            Err(err) => {
                log::warn!("{} ({})", err.user_message(), err);
                None
            }
        };

        LiveSide {
            session,
            signals: channels.signals,
            sampler,
            status_log,
        }
    }

    fn frame_source(&self) -> Result<Box<dyn FrameSource>, CameraError> {
        let session = &self.config.session;
        Ok(match &self.options.frames_dir {
            Some(dir) => Box::new(ImageDirSource::open(
                dir,
                session.capture_width,
                session.capture_height,
            )?),
            None => Box::new(TestPatternSource::new(
                session.capture_width,
                session.capture_height,
            )?),
        })
    }

    fn report<T: LiveTransport>(&self, report: &TickReport, live: Option<&LiveSide<T>>) {
        if let Some(pickup) = &report.pickup {
            log::debug!("Tick {}: ate food, score {}", report.tick, pickup.score);
        }
        if self.options.report_every == 0 || report.tick % self.options.report_every != 0 {
            return;
        }

        let source = match report.target.source {
            TargetSource::Tracked => "tracked",
            TargetSource::Wander => "wander",
        };
        let session = live
            .map(|l| l.session.state().to_string())
            .unwrap_or_else(|| "offline".to_string());
        log::info!(
            "tick {} | score {} | length {} | target {} ({:.0}, {:.0}) | session {}",
            report.tick,
            report.score,
            report.length,
            source,
            report.target.position.x,
            report.target.position.y,
            session
        );
        if let Some((_, stats)) = live.and_then(|l| l.sampler.as_ref()) {
            let frames = stats.snapshot();
            log::info!(
                "frames: {} sent, {} dropped busy, {} dropped closed",
                frames.sent,
                frames.dropped_busy,
                frames.dropped_closed
            );
        }
    }
}

impl<T: LiveTransport> LiveSide<T> {
    async fn stop(self) -> Option<SamplerSnapshot> {
        let frames = self.sampler.map(|(handle, stats)| {
            handle.abort();
            stats.snapshot()
        });
        self.session.disconnect().await;
        // Let the final status line through before stopping the logger
        tokio::task::yield_now().await;
        self.status_log.abort();
        frames
    }
}

async fn log_session_events(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Status { state, message } => {
                log::info!("[session:{}] {}", state, message)
            }
            SessionEvent::Error { message } => log::error!("[session] {}", message),
        }
    }
}
