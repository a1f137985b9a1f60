use thiserror::Error;

/// Failures raised by the simulation core.
#[derive(Debug, Error)]
pub enum SimError {
    /// A construction precondition does not hold.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Rejection sampling found no in-bounds position within the allowed attempts.
    #[error("no in-bounds move found after {attempts} attempts")]
    Configuration { attempts: usize },

    /// A rendering or export collaborator failed.
    #[error("collaborator failed")]
    Collaborator(#[source] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
