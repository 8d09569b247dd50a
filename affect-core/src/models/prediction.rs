use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted prediction outcome. Written once per successful inference
/// call, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PredictionRecord {
    pub id: i64,
    pub emotion: String,
    pub confidence: f32,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}
