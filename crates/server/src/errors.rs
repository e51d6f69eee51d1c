use service::auth::AuthError;
use thiserror::Error;

/// The request body could not be bound to the expected shape.
#[derive(Debug, Error)]
#[error("invalid request body: {0}")]
pub struct BindingError(#[from] pub serde_json::Error);

/// Everything that can end a dispatched call with an error.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    /// Returned by the auth gateway, kept verbatim.
    #[error(transparent)]
    Gateway(#[from] AuthError),
}

impl DispatchError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            DispatchError::Binding(_) => 1000,
            DispatchError::Gateway(e) => e.code(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
