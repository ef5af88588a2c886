use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubtransError {
    #[error("No translatable subtitles found in {0}")]
    NoSubtitles(String),

    #[error("Translation returned an empty result")]
    EmptyTranslation,

    #[error("Translation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Translation failed: {0}")]
    Translation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Translation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SubtransError>;
