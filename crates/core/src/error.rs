use thiserror::Error;

/// Fatal run errors. Anything recoverable per key is a `KeyStatus`, never an
/// error — one bad key must not end the run.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("input file not found: {0}")]
    InputNotFound(String),

    #[error("required column '{0}' not found in input")]
    MissingColumn(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("browser session error: {0}")]
    Session(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
