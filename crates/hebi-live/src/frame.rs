//! JPEG encoding of captured frames

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;

use crate::protocol::{FRAME_MIME_TYPE, MediaChunk};

#[derive(Debug, Error)]
pub enum FrameEncodeError {
    #[error("cannot encode an empty {width}x{height} frame")]
    Empty { width: u32, height: u32 },

    #[error("jpeg encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// A frame ready for the wire
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    /// Base64 of the JPEG bytes
    pub data: String,
    pub width: u32,
    pub height: u32,
    /// Size of the raw JPEG
    pub jpeg_bytes: usize,
}

impl EncodedFrame {
    pub fn into_chunk(self) -> MediaChunk {
        MediaChunk {
            mime_type: FRAME_MIME_TYPE.to_string(),
            data: self.data,
        }
    }
}

/// Map a 0..1 quality onto the encoder's 1..=100 scale
pub fn quality_percent(quality: f32) -> u8 {
    if !quality.is_finite() {
        return 50;
    }
    (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8
}

/// Encode `image` as base64 JPEG at `quality` (0..1)
pub fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<EncodedFrame, FrameEncodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(FrameEncodeError::Empty { width, height });
    }

    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality_percent(quality));
    encoder.encode_image(image)?;

    Ok(EncodedFrame {
        data: BASE64.encode(&jpeg),
        width,
        height,
        jpeg_bytes: jpeg.len(),
    })
}
