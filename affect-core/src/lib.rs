pub mod config;
pub mod db;
pub mod face;
pub mod inference;
pub mod models;
pub mod onnx_predictor;

pub use config::AffectConfig;
pub use inference::{
    EmotionPrediction, EmotionPredictor, InferenceError, EMOTION_LABELS, MODEL_INPUT_SIZE,
};
pub use onnx_predictor::OnnxEmotionPredictor;
