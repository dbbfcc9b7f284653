use std::path::Path;

use figment::{
    Figment,
    providers::{Format, Json, Serialized},
};
use serde::{Serialize, de::DeserializeOwned};

/// Reads `path` as JSON layered over `T::default()`, so the file may set any
/// subset of fields.
///
/// Settings are never fatal: an absent file yields the defaults, and so does
/// one that fails to parse, after a warning.
pub fn load_json_settings<T>(path: &Path) -> T
where
    T: Serialize + DeserializeOwned + Default,
{
    if !path.exists() {
        tracing::info!(path = %path.display(), "no settings file, using defaults");
        return T::default();
    }

    Figment::from(Serialized::defaults(T::default()))
        .merge(Json::file(path))
        .extract()
        .unwrap_or_else(|error| {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "ignoring unparsable settings file"
            );
            T::default()
        })
}
