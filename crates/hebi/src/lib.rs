//! hebi: a snake steered by your fingertip
//!
//! A live multimodal session watches the camera and reports where the index
//! finger is; the snake heads there, and wanders when tracking drops out.

pub mod app;
pub mod config;

pub use app::{App, RunOptions, RunSummary};
pub use config::{AppConfig, DebugConfig};
