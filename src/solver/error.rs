use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    /// A variable of the head or of a negative body literal does not occur
    /// in the positive body.
    #[error("Unsafe rule: {0}")]
    UnsafeRule(String),

    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    #[error("Too many choice atoms: {found} exceeds the limit of {limit}")]
    TooManyChoices { found: usize, limit: usize },

    #[error("Internal solver error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
