use pdfchat_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    UnknownThread(#[from] StoreError),

    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("A question is already awaiting a response")]
    Busy,

    /// Transport, quota or provider failure. Nothing was appended for the
    /// turn, so the same question can be submitted again.
    #[error("Error generating response: {0:#}")]
    LlmInvocation(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
