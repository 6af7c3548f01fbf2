//! Application configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `hebi.ron` file (if exists), or the file given on the command line
//! 3. Environment variables prefixed with `HEBI_`
//!
//! Example environment variable: `HEBI_STEERING__TURN_RATE=0.2`
//!
//! The session credential may also come from `GEMINI_API_KEY`.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use hebi_core::{Arena, BodyConfig, FoodConfig, GameConfig, SteeringConfig, TrackingConfig};
use hebi_live::SessionConfig;

/// Fallback variable for the session credential
pub const CREDENTIAL_ENV: &str = "GEMINI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub arena: Arena,

    #[serde(default)]
    pub steering: SteeringConfig,

    #[serde(default)]
    pub body: BodyConfig,

    #[serde(default)]
    pub food: FoodConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

/// Debug/development settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DebugConfig {
    /// Raise the default log filter to `debug`
    pub verbose_logging: bool,
}

impl AppConfig {
    /// Load from defaults, `hebi.ron` and `HEBI_*` variables
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], reading `file` (which must exist) instead of
    /// the optional `hebi.ron`
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).format(FileFormat::Ron).required(true),
            None => File::with_name("hebi").format(FileFormat::Ron).required(false),
        };

        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("arena.width", 800.0)?
            .set_default("arena.height", 600.0)?
            .set_default("steering.turn_rate", 0.15)?
            .set_default("steering.move_speed", 3.0)?
            .set_default("steering.deadband", 10.0)?
            .set_default("body.segment_spacing", 5.0)?
            .set_default("body.initial_length", 20_i64)?
            .set_default("body.growth_segments", 5_i64)?
            .set_default("food.pickup_radius", 20.0)?
            .set_default("food.growth_score", 10_i64)?
            .set_default("food.spawn_margin", 50.0)?
            .set_default("tracking.liveness_timeout_ms", 2000_i64)?
            .set_default("tracking.wander_resample_chance", 0.02)?
            .set_default("tracking.mirror_x", true)?
            .set_default("session.endpoint", hebi_live::config::DEFAULT_ENDPOINT)?
            .set_default("session.model", "models/gemini-2.0-flash-exp")?
            .set_default("session.response_modality", "AUDIO")?
            .set_default("session.frame_rate", 2.0)?
            .set_default("session.jpeg_quality", 0.5)?
            .set_default("session.capture_width", 320_i64)?
            .set_default("session.capture_height", 240_i64)?
            .set_default("debug.verbose_logging", false)?
            // Layer 2: Config file
            .add_source(file_source)
            // Layer 3: Environment variables (HEBI_STEERING__TURN_RATE, etc.)
            .add_source(
                Environment::with_prefix("HEBI")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config = builder.build().context("Failed to build configuration")?;

        let mut app: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if app.session.api_key.is_none() {
            app.session.api_key = std::env::var(CREDENTIAL_ENV).ok();
        }

        app.validate()?;
        Ok(app)
    }

    /// Check both the simulation and the session settings
    pub fn validate(&self) -> Result<()> {
        self.game()
            .validate()
            .context("Invalid simulation settings")?;
        self.session
            .validate()
            .context("Invalid session settings")?;
        Ok(())
    }

    /// Simulation half of the configuration
    pub fn game(&self) -> GameConfig {
        GameConfig {
            arena: self.arena,
            steering: self.steering.clone(),
            body: self.body.clone(),
            food: self.food.clone(),
            tracking: self.tracking.clone(),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.session.url().is_some()
    }

    /// Pretty RON with the credential masked
    pub fn to_ron(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.session.api_key.is_some() {
            shown.session.api_key = Some("<redacted>".to_string());
        }
        ron::ser::to_string_pretty(&shown, PrettyConfig::default())
            .context("Failed to serialize configuration")
    }
}
