use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CareError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The HTTP client could not be set up.
    #[error("network error: {0}")]
    Network(String),

    #[error("realtime error: {0}")]
    Realtime(String),

    #[error("search error: {0}")]
    Search(String),

    #[error("unknown record category: {0}")]
    UnknownCategory(String),
}
