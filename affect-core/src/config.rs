use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AffectConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Paths to the model assets loaded at startup. Both must exist or the
/// process refuses to start.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// ONNX emotion classifier (48x48 RGB input, 7 softmax outputs).
    pub classifier_path: String,
    /// SeetaFace frontal face detector model.
    pub detector_path: String,
}

/// Face detector tuning knobs, passed straight to rustface.
#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    /// Minimum detectable face size in pixels (side length).
    pub min_face_size: u32,
    /// Detector score threshold; lower finds more (and noisier) faces.
    pub score_thresh: f64,
    /// Image pyramid scale factor in (0, 1).
    pub pyramid_scale_factor: f32,
    /// Sliding window step in x and y.
    pub slide_window_step: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_face_size: 30,
            score_thresh: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl AffectConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_defaults_match_cascade_settings() {
        let d = DetectorConfig::default();
        assert_eq!(d.min_face_size, 30);
        assert!(d.pyramid_scale_factor > 0.0 && d.pyramid_scale_factor < 1.0);
    }

    #[test]
    fn test_http_defaults() {
        let h = HttpConfig::default();
        assert_eq!(h.port, 8000);
        assert_eq!(h.host, "127.0.0.1");
    }
}
