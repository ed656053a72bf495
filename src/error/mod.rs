pub mod eval_error;

use std::io;

use thiserror::Error as ThisError;

use crate::error::eval_error::EvalError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serde_json error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    EvalError(#[from] EvalError),
}

impl Error {
    pub fn as_eval(&self) -> Option<&EvalError> {
        match self {
            Error::EvalError(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
