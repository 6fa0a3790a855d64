//! Image downsampling before upload.
//!
//! The codec sits behind [`ImageCodec`] so the resize rules can be tested
//! and swapped independently of the `image` crate.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::{debug, warn};

use crate::config::ImageRules;
use crate::{BlobError, BlobResult};

/// A decoded image and the format it came in
pub struct DecodedImage {
    pub format: ImageFormat,
    pub pixels: DynamicImage,
}

impl DecodedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Decode to pixels, encode back to bytes
pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8], content_type: &str) -> BlobResult<DecodedImage>;

    fn encode(&self, image: &DecodedImage, quality: u8) -> BlobResult<Vec<u8>>;
}

/// Codec backed by the `image` crate
#[derive(Debug, Clone, Default)]
pub struct RasterCodec;

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8], content_type: &str) -> BlobResult<DecodedImage> {
        let format = image::guess_format(bytes)
            .ok()
            .or_else(|| ImageFormat::from_mime_type(content_type))
            .ok_or_else(|| BlobError::image(format!("unrecognized image data for {}", content_type)))?;

        let pixels = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| BlobError::image(e.to_string()))?;

        Ok(DecodedImage { format, pixels })
    }

    fn encode(&self, image: &DecodedImage, quality: u8) -> BlobResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());

        match image.format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.pixels.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
                rgb.write_with_encoder(encoder)
                    .map_err(|e| BlobError::image(e.to_string()))?;
            }
            format => {
                image
                    .pixels
                    .write_to(&mut out, format)
                    .map_err(|e| BlobError::image(e.to_string()))?;
            }
        }

        Ok(out.into_inner())
    }
}

/// Target size when `width` must not exceed `max_width`, keeping the aspect ratio.
pub fn fit_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (u64::from(height) * u64::from(max_width) + u64::from(width) / 2) / u64::from(width);
    (max_width, scaled.max(1) as u32)
}

/// What came out of the transform
#[derive(Debug)]
pub enum TransformOutcome {
    /// Re-encoded image replacing the original payload
    Transformed {
        bytes: Bytes,
        content_type: String,
        width: u32,
        height: u32,
    },
    /// Payload is not something we can decode; upload as-is
    Passthrough(Bytes),
}

/// Downsamples wide images and re-encodes at the configured quality
#[derive(Clone)]
pub struct ImageTransform {
    codec: Arc<dyn ImageCodec>,
    rules: ImageRules,
}

impl ImageTransform {
    pub fn new(rules: ImageRules) -> Self {
        Self::with_codec(rules, RasterCodec)
    }

    pub fn with_codec<C: ImageCodec + 'static>(rules: ImageRules, codec: C) -> Self {
        Self {
            codec: Arc::new(codec),
            rules,
        }
    }

    /// Applies only to `image/*` payloads.
    pub fn applies_to(&self, content_type: &str) -> bool {
        self.rules.enabled && content_type.starts_with("image/")
    }

    /// Synchronous and CPU bound; run it on the blocking pool.
    pub fn apply(&self, bytes: Bytes, content_type: &str) -> BlobResult<TransformOutcome> {
        let decoded = match self.codec.decode(&bytes, content_type) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(content_type, error = %e, "image not decodable, uploading unchanged");
                return Ok(TransformOutcome::Passthrough(bytes));
            }
        };

        let (width, height) = decoded.dimensions();
        let (target_width, target_height) = fit_width(width, height, self.rules.max_width);

        let resized = if (target_width, target_height) != (width, height) {
            DecodedImage {
                format: decoded.format,
                pixels: decoded
                    .pixels
                    .resize_exact(target_width, target_height, FilterType::Lanczos3),
            }
        } else {
            decoded
        };

        let encoded = match self.codec.encode(&resized, self.rules.quality) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(content_type, error = %e, "image not re-encodable, uploading unchanged");
                return Ok(TransformOutcome::Passthrough(bytes));
            }
        };
        debug!(
            from = %format!("{}x{}", width, height),
            to = %format!("{}x{}", target_width, target_height),
            before = bytes.len(),
            after = encoded.len(),
            "image re-encoded"
        );

        Ok(TransformOutcome::Transformed {
            bytes: Bytes::from(encoded),
            content_type: resized.format.to_mime_type().to_string(),
            width: target_width,
            height: target_height,
        })
    }
}
