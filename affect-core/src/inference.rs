//! Emotion inference pipeline — face detection followed by classification
//!
//! Provides the `EmotionPredictor` trait plus the shared preprocessing steps:
//! decode the upload, find a face, crop it from the color image, resize to
//! the classifier's 48x48 input, and flatten to a raw-pixel tensor. The
//! production implementation lives in [`crate::onnx_predictor`].

use async_trait::async_trait;
use image::{imageops, imageops::FilterType, DynamicImage, RgbImage};
use thiserror::Error;

/// The classifier's fixed output categories, in model output order.
pub const EMOTION_LABELS: [&str; 7] = [
    "Angry", "Disgust", "Fear", "Happy", "Sad", "Surprise", "Neutral",
];

/// Side length of the classifier input (pixels).
pub const MODEL_INPUT_SIZE: u32 = 48;

// ============================================================================
// EmotionPredictor trait
// ============================================================================

/// Abstraction over the detect-then-classify pipeline.
#[async_trait]
pub trait EmotionPredictor: Send + Sync {
    /// Run the full pipeline on raw encoded image bytes.
    async fn predict(&self, image: &[u8]) -> Result<EmotionPrediction, InferenceError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// A successful pipeline result: one label from [`EMOTION_LABELS`] and its
/// raw softmax score.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionPrediction {
    pub emotion: String,
    pub confidence: f32,
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("model file not found at {path}")]
    ModelNotFound { path: String },

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("invalid or unreadable image: {0}")]
    InvalidImage(String),

    #[error("no face detected")]
    NoFaceDetected,

    #[error("ONNX inference error: {0}")]
    OnnxInference(String),

    #[error("classifier returned {actual} scores, expected {expected}")]
    InvalidOutput { expected: usize, actual: usize },
}

// ============================================================================
// Preprocessing helpers
// ============================================================================

/// Decode raw upload bytes into a pixel image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, InferenceError> {
    image::load_from_memory(bytes).map_err(|e| InferenceError::InvalidImage(e.to_string()))
}

/// Clamp a detector bounding box to image bounds. Returns `None` if nothing
/// of the box remains inside the image.
pub fn clamp_region(
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    img_w: u32,
    img_h: u32,
) -> Option<(u32, u32, u32, u32)> {
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    if x0 >= img_w || y0 >= img_h {
        return None;
    }
    // Shrink by however much the origin was clamped, then fit to the image.
    let w = w.saturating_sub((x0 as i64 - x as i64) as u32).min(img_w - x0);
    let h = h.saturating_sub((y0 as i64 - y as i64) as u32).min(img_h - y0);
    if w == 0 || h == 0 {
        return None;
    }
    Some((x0, y0, w, h))
}

/// Crop the face region from the color image and resize it to the model
/// input size with bilinear filtering.
pub fn crop_face(rgb: &RgbImage, x: u32, y: u32, w: u32, h: u32) -> RgbImage {
    let roi = imageops::crop_imm(rgb, x, y, w, h).to_image();
    imageops::resize(
        &roi,
        MODEL_INPUT_SIZE,
        MODEL_INPUT_SIZE,
        FilterType::Triangle,
    )
}

/// Flatten a 48x48 RGB face into the classifier's `[1, 48, 48, 3]` tensor
/// data. Raw 0-255 values; the model carries its own rescaling layer.
pub fn face_input(face: &RgbImage) -> Vec<f32> {
    face.as_raw().iter().map(|&p| p as f32).collect()
}

/// Index and value of the highest score.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_labels_are_seven_and_unique() {
        assert_eq!(EMOTION_LABELS.len(), 7);
        let mut sorted = EMOTION_LABELS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 7);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        match err {
            InferenceError::InvalidImage(_) => {}
            other => panic!("Expected InvalidImage, got: {other:?}"),
        }
    }

    #[test]
    fn test_decode_accepts_png() {
        let img = DynamicImage::new_rgb8(4, 4);
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        let decoded = decode_image(buf.get_ref()).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);
    }

    #[test]
    fn test_clamp_region_inside() {
        assert_eq!(clamp_region(10, 10, 20, 20, 100, 100), Some((10, 10, 20, 20)));
    }

    #[test]
    fn test_clamp_region_negative_origin() {
        assert_eq!(clamp_region(-5, -5, 30, 30, 100, 100), Some((0, 0, 25, 25)));
    }

    #[test]
    fn test_clamp_region_overhanging_edge() {
        let (x, y, w, h) = clamp_region(90, 95, 30, 30, 100, 100).unwrap();
        assert_eq!((x, y), (90, 95));
        assert_eq!((w, h), (10, 5));
    }

    #[test]
    fn test_clamp_region_fully_outside() {
        assert_eq!(clamp_region(200, 200, 30, 30, 100, 100), None);
    }

    #[test]
    fn test_crop_face_resizes_to_model_input() {
        let rgb = RgbImage::from_pixel(96, 96, Rgb([128, 64, 32]));
        let face = crop_face(&rgb, 8, 8, 64, 64);
        assert_eq!(face.width(), MODEL_INPUT_SIZE);
        assert_eq!(face.height(), MODEL_INPUT_SIZE);
    }

    #[test]
    fn test_face_input_is_raw_unscaled_hwc() {
        let rgb = RgbImage::from_pixel(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, Rgb([255, 0, 7]));
        let data = face_input(&rgb);
        assert_eq!(data.len(), (MODEL_INPUT_SIZE * MODEL_INPUT_SIZE * 3) as usize);
        // First pixel, RGB channel order, no 1/255 normalization.
        assert_eq!(&data[..3], &[255.0, 0.0, 7.0]);
    }

    #[test]
    fn test_argmax_picks_top_score() {
        let scores = [0.01, 0.02, 0.9, 0.03, 0.01, 0.02, 0.01];
        assert_eq!(argmax(&scores), Some((2, 0.9)));
    }

    #[test]
    fn test_argmax_empty_is_none() {
        assert_eq!(argmax(&[]), None);
    }
}
