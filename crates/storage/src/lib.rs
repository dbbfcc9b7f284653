pub mod error;
pub mod file;
pub mod memory;
pub mod settings;

pub use error::{StorageError, StorageResult};
pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use settings::load_json_settings;

/// String-keyed blob storage, the local persistence medium for client state.
///
/// Writes replace the whole value; there is no merge.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}
