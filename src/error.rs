use thiserror::Error;

/// Errors surfaced by the data layer.
///
/// Not-found is never an error: absent keys and records come back as
/// `None`, defaults or no-ops.
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Storage error: {0}")]
  Io(String),

  #[error("Failed to decode {key}: {source}")]
  Decode {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Failed to encode {key}: {source}")]
  Encode {
    key: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("Invalid {entity}: {reason}")]
  Validation { entity: &'static str, reason: String },

  #[error("Duplicate {entity} id: {id}")]
  DuplicateId { entity: &'static str, id: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
  pub fn io(err: impl std::fmt::Display) -> Self {
    StoreError::Io(err.to_string())
  }

  pub fn validation(entity: &'static str, reason: impl Into<String>) -> Self {
    StoreError::Validation {
      entity,
      reason: reason.into(),
    }
  }
}

impl From<rusqlite::Error> for StoreError {
  fn from(err: rusqlite::Error) -> Self {
    StoreError::Io(err.to_string())
  }
}
