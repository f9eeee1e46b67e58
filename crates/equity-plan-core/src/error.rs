use thiserror::Error;

#[derive(Debug, Error)]
pub enum EquityPlanError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Stale response: request #{received} superseded by #{latest}")]
    StaleResponse { received: u64, latest: u64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for EquityPlanError {
    fn from(e: serde_json::Error) -> Self {
        EquityPlanError::SerializationError(e.to_string())
    }
}
