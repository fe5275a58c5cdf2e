use thiserror::Error;

pub type Result<T> = std::result::Result<T, LockError>;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("empty value range: lower bound {low} is above upper bound {high}")]
    EmptyRange { low: String, high: String },

    #[error("hashing error: {0}")]
    Hash(#[from] qadmit_core::error::Error),
}
