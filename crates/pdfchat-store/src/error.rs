use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
