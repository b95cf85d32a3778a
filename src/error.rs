use crate::bind::BindError;
use crate::config::LoadError;
use thiserror::Error;

/// Top-level error type for the confbind library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Load(#[from] LoadError),

    #[error("binding error: {0}")]
    Bind(#[from] BindError),
}
