//! Live session settings

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default bidirectional streaming endpoint
pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Shortest time between frame pushes
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Rejected session settings
#[derive(Debug, Error, PartialEq)]
pub enum SessionConfigError {
    #[error("frame rate must be positive and at most 1000 fps, got {0}")]
    FrameRate(f32),
    #[error("jpeg quality must be in (0, 1], got {0}")]
    JpegQuality(f32),
    #[error("capture size must be positive, got {width}x{height}")]
    CaptureSize { width: u32, height: u32 },
}

/// Everything needed to open a session and feed it frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub endpoint: String,
    pub model: String,
    /// Credential appended to the endpoint; never logged
    pub api_key: Option<String>,
    pub response_modality: String,
    /// Frames pushed per second
    pub frame_rate: f32,
    /// JPEG quality in 0..1
    pub jpeg_quality: f32,
    pub capture_width: u32,
    pub capture_height: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: "models/gemini-2.0-flash-exp".to_string(),
            api_key: None,
            response_modality: "AUDIO".to_string(),
            frame_rate: 2.0,
            jpeg_quality: 0.5,
            capture_width: 320,
            capture_height: 240,
        }
    }
}

impl SessionConfig {
    /// Time between frame pushes; rates at or below zero fall back to 1 Hz,
    /// and the period never drops below [`MIN_FRAME_INTERVAL`]
    pub fn frame_interval(&self) -> Duration {
        if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            Duration::from_secs_f64(1.0 / f64::from(self.frame_rate)).max(MIN_FRAME_INTERVAL)
        } else {
            Duration::from_secs(1)
        }
    }

    /// Check the values the sampler and encoder rely on
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        let max_rate = 1.0 / MIN_FRAME_INTERVAL.as_secs_f32();
        if !(self.frame_rate > 0.0 && self.frame_rate <= max_rate) {
            return Err(SessionConfigError::FrameRate(self.frame_rate));
        }
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(SessionConfigError::JpegQuality(self.jpeg_quality));
        }
        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(SessionConfigError::CaptureSize {
                width: self.capture_width,
                height: self.capture_height,
            });
        }
        Ok(())
    }

    /// Endpoint with the credential attached, if one is configured
    pub fn url(&self) -> Option<String> {
        let key = self.api_key.as_deref().filter(|k| !k.trim().is_empty())?;
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        Some(format!("{}{}key={}", self.endpoint, separator, key.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval() {
        let config = SessionConfig::default();
        assert_eq!(config.frame_interval(), Duration::from_millis(500));

        let stalled = SessionConfig {
            frame_rate: 0.0,
            ..SessionConfig::default()
        };
        assert_eq!(stalled.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_huge_frame_rate_keeps_nonzero_interval() {
        let config = SessionConfig {
            frame_rate: 1e12,
            ..SessionConfig::default()
        };
        assert_eq!(config.frame_interval(), MIN_FRAME_INTERVAL);
    }

    #[test]
    fn test_validate_defaults() {
        assert_eq!(SessionConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_frame_rate() {
        for rate in [0.0, -2.0, f32::NAN, f32::INFINITY, 1e12] {
            let config = SessionConfig {
                frame_rate: rate,
                ..SessionConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(SessionConfigError::FrameRate(_))),
                "accepted {}",
                rate
            );
        }
    }

    #[test]
    fn test_validate_jpeg_quality() {
        for quality in [0.0, 1.5, f32::NAN] {
            let config = SessionConfig {
                jpeg_quality: quality,
                ..SessionConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(SessionConfigError::JpegQuality(_))
            ));
        }
    }

    #[test]
    fn test_validate_capture_size() {
        let config = SessionConfig {
            capture_height: 0,
            ..SessionConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SessionConfigError::CaptureSize {
                width: 320,
                height: 0
            })
        );
    }

    #[test]
    fn test_url_requires_key() {
        let mut config = SessionConfig::default();
        assert_eq!(config.url(), None);

        config.api_key = Some("   ".to_string());
        assert_eq!(config.url(), None);

        config.api_key = Some("secret".to_string());
        let url = config.url().unwrap();
        assert!(url.starts_with("wss://"));
        assert!(url.ends_with("BidiGenerateContent?key=secret"));
    }
}
