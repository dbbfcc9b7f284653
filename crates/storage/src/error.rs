use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("storage key '{key}' is invalid: {reason}"))]
    InvalidKey {
        stage: &'static str,
        key: String,
        reason: &'static str,
    },
    #[snafu(display("failed to create storage directory at {path:?}"))]
    CreateDirectory {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to read storage entry '{key}' from {path:?}"))]
    ReadEntry {
        stage: &'static str,
        key: String,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to write storage entry '{key}' to {path:?}"))]
    WriteEntry {
        stage: &'static str,
        key: String,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to replace storage entry from {from:?} to {to:?}"))]
    RenameEntry {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to remove storage entry '{key}' at {path:?}"))]
    RemoveEntry {
        stage: &'static str,
        key: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
