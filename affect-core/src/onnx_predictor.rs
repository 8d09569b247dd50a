//! ONNX emotion classifier pipeline — detect, crop, classify
//!
//! Uses the `ort` crate for ONNX Runtime and `rustface` for face detection.
//! The classifier expects a 48x48 RGB face and emits seven softmax scores.

use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::config::{DetectorConfig, ModelConfig};
use crate::face::SeetaFaceDetector;
use crate::inference::{
    argmax, crop_face, clamp_region, decode_image, face_input, EmotionPrediction,
    EmotionPredictor, InferenceError, EMOTION_LABELS, MODEL_INPUT_SIZE,
};

/// Production detect-then-classify pipeline backed by ONNX Runtime.
pub struct OnnxEmotionPredictor {
    session: Arc<Mutex<Session>>,
    input_name: String,
    detector: SeetaFaceDetector,
}

impl std::fmt::Debug for OnnxEmotionPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmotionPredictor")
            .field("input_name", &self.input_name)
            .field("detector", &self.detector)
            .finish_non_exhaustive()
    }
}

impl OnnxEmotionPredictor {
    /// Load both model assets from the configured paths.
    ///
    /// Returns `InferenceError::ModelNotFound` if either file is missing —
    /// a fatal condition at startup, never a silent fallback.
    pub fn new(model: &ModelConfig, detector: DetectorConfig) -> Result<Self, InferenceError> {
        if !Path::new(&model.classifier_path).exists() {
            return Err(InferenceError::ModelNotFound {
                path: model.classifier_path.clone(),
            });
        }

        let detector = SeetaFaceDetector::new(&model.detector_path, detector)?;

        let session = Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(1)?))
            .and_then(|mut b| b.commit_from_file(&model.classifier_path))
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or_else(|| InferenceError::ModelLoad("classifier has no inputs".to_string()))?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            detector,
        })
    }
}

#[async_trait]
impl EmotionPredictor for OnnxEmotionPredictor {
    async fn predict(&self, image: &[u8]) -> Result<EmotionPrediction, InferenceError> {
        // Decode + detect + classify are all CPU-bound — run on the blocking
        // thread pool.
        let session = Arc::clone(&self.session);
        let input_name = self.input_name.clone();
        let detector = self.detector.clone();
        let bytes = image.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut session_guard = session
                .lock()
                .map_err(|e| InferenceError::OnnxInference(format!("session lock poisoned: {e}")))?;
            predict_sync(&detector, &mut session_guard, &input_name, &bytes)
        })
        .await
        .map_err(|e| InferenceError::OnnxInference(format!("spawn_blocking join error: {e}")))?
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Run the full pipeline synchronously.
fn predict_sync(
    detector: &SeetaFaceDetector,
    session: &mut Session,
    input_name: &str,
    bytes: &[u8],
) -> Result<EmotionPrediction, InferenceError> {
    // 1. Decode
    let image = decode_image(bytes)?;
    let rgb = image.to_rgb8();
    let gray = image.to_luma8();

    // 2. Detect faces on the grayscale image
    let faces = detector.detect(gray.as_raw(), gray.width(), gray.height());
    // First region in detector return order; no largest-area tie-break.
    let face = faces.first().ok_or(InferenceError::NoFaceDetected)?;
    tracing::debug!(
        "face at ({}, {}) {}x{} score={:.2} ({} total)",
        face.x,
        face.y,
        face.width,
        face.height,
        face.score,
        faces.len()
    );

    let (x, y, w, h) = clamp_region(
        face.x,
        face.y,
        face.width,
        face.height,
        rgb.width(),
        rgb.height(),
    )
    .ok_or(InferenceError::NoFaceDetected)?;

    // 3. Crop from the color image, resize, flatten to [1, 48, 48, 3]
    let face_rgb = crop_face(&rgb, x, y, w, h);
    let data = face_input(&face_rgb);
    let shape = vec![
        1i64,
        MODEL_INPUT_SIZE as i64,
        MODEL_INPUT_SIZE as i64,
        3i64,
    ];

    let input_tensor = Tensor::from_array((shape, data))
        .map_err(|e| InferenceError::OnnxInference(e.to_string()))?;

    // 4. Run session
    let outputs = session
        .run(ort::inputs![input_name => input_tensor])
        .map_err(|e| InferenceError::OnnxInference(e.to_string()))?;

    // 5. Extract the softmax scores. Expected shape: [1, 7].
    let (_out_shape, scores) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| InferenceError::OnnxInference(e.to_string()))?;

    if scores.len() != EMOTION_LABELS.len() {
        return Err(InferenceError::InvalidOutput {
            expected: EMOTION_LABELS.len(),
            actual: scores.len(),
        });
    }

    // 6. Argmax over the seven categories
    let (idx, confidence) = argmax(scores).ok_or(InferenceError::InvalidOutput {
        expected: EMOTION_LABELS.len(),
        actual: 0,
    })?;

    Ok(EmotionPrediction {
        emotion: EMOTION_LABELS[idx].to_string(),
        confidence,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_not_found_returns_error() {
        let model = ModelConfig {
            classifier_path: "/nonexistent/emotion.onnx".to_string(),
            detector_path: "/nonexistent/seeta.bin".to_string(),
        };

        let result = OnnxEmotionPredictor::new(&model, DetectorConfig::default());
        assert!(result.is_err());
        match result.unwrap_err() {
            InferenceError::ModelNotFound { path } => {
                assert!(path.contains("emotion.onnx"), "path was: {path}");
            }
            other => panic!("Expected ModelNotFound, got: {other:?}"),
        }
    }
}
