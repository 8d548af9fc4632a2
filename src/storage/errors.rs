use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("record encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("player not found: {0}")]
    NotFound(String),
    #[error("player already exists: {0}")]
    AlreadyExists(String),
}
