use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnogenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Resolve error: {0}")]
    Resolve(String),

    #[error("Patch error in {}: {message}", path.display())]
    Patch { path: PathBuf, message: String },

    /// The rewritten buffer is not valid source; `buffer` holds the content before formatting.
    #[error("Format error in {}: {message}", path.display())]
    Format {
        path: PathBuf,
        message: String,
        buffer: Vec<u8>,
    },

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Plugin {plugin} failed: {message}")]
    Plugin { plugin: String, message: String },
}

impl AnnogenError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        AnnogenError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn patch(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        AnnogenError::Patch {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnogenError>;
