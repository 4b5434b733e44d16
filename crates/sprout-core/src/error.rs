use thiserror::Error;

#[derive(Debug, Error)]
pub enum SproutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read env file {path}: {reason}")]
    EnvFile { path: String, reason: String },

    #[error("Variable {key} not found in {path}")]
    MissingKey { key: String, path: String },

    #[error("Cannot read prompt file {path}: {source}")]
    Prompt {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SproutError>;
