//! Face detection via the SeetaFace frontal-face model (`rustface` crate).

use std::io::BufReader;
use std::path::Path;

use crate::config::DetectorConfig;
use crate::inference::InferenceError;

/// Bounding box of a detected face, in pixel coordinates of the source image.
#[derive(Debug, Clone)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Detector score. Kept for logging only; region selection is
    /// first-in-return-order, not highest-score.
    pub score: f64,
}

/// Frontal face detector. Holds the parsed SeetaFace model; a detector
/// instance is built per call because `rustface::Detector` is not `Sync`.
#[derive(Clone)]
pub struct SeetaFaceDetector {
    model: rustface::Model,
    config: DetectorConfig,
}

impl std::fmt::Debug for SeetaFaceDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeetaFaceDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SeetaFaceDetector {
    /// Load the detector model from disk. Returns
    /// `InferenceError::ModelNotFound` if the file is missing.
    pub fn new(path: &str, config: DetectorConfig) -> Result<Self, InferenceError> {
        if !Path::new(path).exists() {
            return Err(InferenceError::ModelNotFound {
                path: path.to_string(),
            });
        }
        let file = std::fs::File::open(path)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;
        Ok(Self { model, config })
    }

    /// Detect faces in a row-major grayscale buffer of `width` x `height`
    /// bytes. Regions come back in the detector's own return order.
    pub fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceRegion> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.config.min_face_size);
        detector.set_score_thresh(self.config.score_thresh);
        detector.set_pyramid_scale_factor(self.config.pyramid_scale_factor);
        detector.set_slide_window_step(self.config.slide_window_step, self.config.slide_window_step);

        let faces = detector.detect(&rustface::ImageData::new(gray, width, height));

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRegion {
                    x: bbox.x(),
                    y: bbox.y(),
                    width: bbox.width(),
                    height: bbox.height(),
                    score: face.score(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_model_not_found() {
        let result = SeetaFaceDetector::new("/nonexistent/seeta.bin", DetectorConfig::default());
        match result.unwrap_err() {
            InferenceError::ModelNotFound { path } => {
                assert!(path.contains("nonexistent"), "path was: {path}");
            }
            other => panic!("Expected ModelNotFound, got: {other:?}"),
        }
    }
}
