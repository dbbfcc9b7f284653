use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, ensure};

use super::KeyValueStore;
use super::error::{
    CreateDirectorySnafu, InvalidKeySnafu, ReadEntrySnafu, RemoveEntrySnafu, RenameEntrySnafu,
    StorageResult, WriteEntrySnafu,
};

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "json.tmp";

/// Directory-backed store holding one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{ENTRY_EXTENSION}")))
    }

    fn ensure_root(&self) -> StorageResult<()> {
        if self.root.as_os_str().is_empty() {
            return Ok(());
        }

        std::fs::create_dir_all(&self.root).context(CreateDirectorySnafu {
            stage: "create-storage-root",
            path: self.root.clone(),
        })
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.entry_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error).context(ReadEntrySnafu {
                stage: "read-storage-entry",
                key,
                path,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.entry_path(key)?;
        self.ensure_root()?;

        // Rename over the target so readers only ever observe complete blobs.
        let temp_path = path.with_extension(TEMP_EXTENSION);
        std::fs::write(&temp_path, value).context(WriteEntrySnafu {
            stage: "write-temporary-storage-entry",
            key,
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &path).context(RenameEntrySnafu {
            stage: "rename-temporary-storage-entry",
            from: temp_path,
            to: path.clone(),
        })?;

        tracing::debug!(key, path = ?path, bytes = value.len(), "stored entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.entry_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).context(RemoveEntrySnafu {
                stage: "remove-storage-entry",
                key,
                path,
            }),
        }
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    ensure!(
        !key.is_empty(),
        InvalidKeySnafu {
            stage: "validate-storage-key",
            key,
            reason: "key must not be empty",
        }
    );
    ensure!(
        !key.starts_with('.'),
        InvalidKeySnafu {
            stage: "validate-storage-key",
            key,
            reason: "key must not start with '.'",
        }
    );
    ensure!(
        key.chars()
            .all(|character| character.is_ascii_alphanumeric()
                || matches!(character, '-' | '_' | '.')),
        InvalidKeySnafu {
            stage: "validate-storage-key",
            key,
            reason: "key may only contain ASCII letters, digits, '-', '_' and '.'",
        }
    );
    Ok(())
}
