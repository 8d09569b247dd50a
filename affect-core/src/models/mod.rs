mod prediction;

pub use prediction::PredictionRecord;
