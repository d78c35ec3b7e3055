use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Load failure: {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    #[error("Unparseable display value '{text}': {reason}")]
    Parse { text: String, reason: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AuditError {
    /// Load-time failures end the run; everything else is recorded per cell.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuditError::Load { .. })
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::SerializationError(e.to_string())
    }
}
