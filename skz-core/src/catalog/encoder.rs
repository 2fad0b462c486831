// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The external face-encoding capability.
//!
//! The control plane never runs inference itself; it hands image bytes to
//! whatever encoder the deployment provides and stores the resulting
//! vector. [`MockFaceEncoder`] stands in for tests and stub deployments.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("unsupported image format")]
    UnsupportedImage,

    #[error("no face detected in image")]
    NoFaceDetected,

    #[error("encoder failed: {0}")]
    EncoderFailure(String),
}

/// Image container formats accepted for photo ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

/// Sniffs JPEG/PNG magic bytes. Anything else is unsupported.
pub fn sniff_image_format(bytes: &[u8]) -> Result<ImageFormat, EncodeError> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(ImageFormat::Jpeg);
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Ok(ImageFormat::Png);
    }
    Err(EncodeError::UnsupportedImage)
}

/// Result of encoding one photo.
#[derive(Debug, Clone)]
pub struct EncodedFace {
    /// D floats, L2-normalized by the encoder.
    pub vector: Vec<f32>,
    /// Set when the image contained more than one face and the encoder
    /// selected the first. The operation still succeeds.
    pub multiple_faces: bool,
}

/// Face-encoding capability consumed by the catalog store.
pub trait FaceEncoder: Send + Sync {
    /// Encodes the (already format-checked) image bytes into a feature
    /// vector of the configured dimension.
    fn encode(&self, image: &[u8]) -> Result<EncodedFace, EncodeError>;
}

/// Deterministic stand-in encoder: derives a vector from a digest of the
/// image bytes. Recognizes two control prefixes used by tests:
/// images starting with `NOFACE` report no face, `TWOFACES` reports a
/// multi-face image.
pub struct MockFaceEncoder {
    dim: usize,
}

impl MockFaceEncoder {
    pub fn new(dim: usize) -> Self {
        MockFaceEncoder { dim }
    }
}

impl FaceEncoder for MockFaceEncoder {
    fn encode(&self, image: &[u8]) -> Result<EncodedFace, EncodeError> {
        // Control prefixes live after the magic bytes in test fixtures.
        let body = &image[8.min(image.len())..];
        if body.starts_with(b"NOFACE") {
            return Err(EncodeError::NoFaceDetected);
        }
        let multiple_faces = body.starts_with(b"TWOFACES");

        let digest = crate::index::hash_bytes(image);
        let seed_bytes = digest.as_bytes();
        let mut vector: Vec<f32> = (0..self.dim)
            .map(|i| f32::from(seed_bytes[i % seed_bytes.len()]) / 255.0)
            .collect();
        // L2-normalize like a real encoder would.
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(EncodedFace {
            vector,
            multiple_faces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

    fn jpeg_with(body: &[u8]) -> Vec<u8> {
        let mut bytes = JPEG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0xE0, 0x00, 0x10, 0x4A, 0x46]);
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn sniffing_accepts_jpeg_and_png_only() {
        assert_eq!(
            sniff_image_format(&jpeg_with(b"x")).unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(
            sniff_image_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1]).unwrap(),
            ImageFormat::Png
        );
        assert!(matches!(
            sniff_image_format(b"GIF89a"),
            Err(EncodeError::UnsupportedImage)
        ));
        assert!(matches!(
            sniff_image_format(&[]),
            Err(EncodeError::UnsupportedImage)
        ));
    }

    #[test]
    fn mock_encoder_is_deterministic_and_normalized() {
        let encoder = MockFaceEncoder::new(128);
        let a = encoder.encode(&jpeg_with(b"face-1")).unwrap();
        let b = encoder.encode(&jpeg_with(b"face-1")).unwrap();
        let c = encoder.encode(&jpeg_with(b"face-2")).unwrap();
        assert_eq!(a.vector, b.vector);
        assert_ne!(a.vector, c.vector);
        assert_eq!(a.vector.len(), 128);

        let norm: f32 = a.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mock_encoder_control_prefixes() {
        let encoder = MockFaceEncoder::new(16);
        assert!(matches!(
            encoder.encode(&jpeg_with(b"NOFACE rest")),
            Err(EncodeError::NoFaceDetected)
        ));
        let two = encoder.encode(&jpeg_with(b"TWOFACES rest")).unwrap();
        assert!(two.multiple_faces);
    }
}
