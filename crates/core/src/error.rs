use thiserror::Error;

#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config value for {key}: {value} ({reason})")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}
