use thiserror::Error;

#[derive(Error, Debug)]
pub enum DekhoError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("AI gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl DekhoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
