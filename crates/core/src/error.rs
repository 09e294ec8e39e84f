use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("replay I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("replay log is empty")]
    EmptyFile,

    /// The file ended without a newline terminating the last line.
    #[error("incomplete replay log line at line {line}")]
    IncompleteLine { line: usize },

    #[error("invalid replay header at line {line}: {message}")]
    InvalidHeader { line: usize, message: String },

    #[error("invalid replay entry at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },

    #[error("failed to encode replay record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("replay file name '{0}' must not contain '/' or '\\'")]
    InvalidFileName(String),

    #[error("no replay log has been written yet")]
    NoLogWritten,

    #[error("can't save replay to '{}': {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("a replay session is already active")]
    SessionActive,

    #[error("failed to start replay map '{path}': {message}")]
    MapStart { path: String, message: String },

    #[error("invalid replay config: {0}")]
    Config(#[from] toml::de::Error),
}
