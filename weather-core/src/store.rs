//! Durable string-keyed storage for the current location and the last
//! weather report.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    fmt::Debug,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;

use crate::error::Result;

pub const LOCATION_KEY: &str = "location";
pub const WEATHER_KEY: &str = "weather";

/// An edit applied atomically to the stored mapping.
pub type Mutator = Box<dyn FnOnce(&mut HashMap<String, String>) + Send>;

#[async_trait]
pub trait PersistentStore: Send + Sync + Debug {
    /// Snapshot of the whole mapping.
    async fn read(&self) -> Result<HashMap<String, String>>;

    async fn write(&self, mutator: Mutator) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { data: Mutex::new(data) }
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn read(&self) -> Result<HashMap<String, String>> {
        Ok(self.data.lock().await.clone())
    }

    async fn write(&self, mutator: Mutator) -> Result<()> {
        let mut data = self.data.lock().await;
        mutator(&mut *data);
        Ok(())
    }
}

/// Mapping kept as one JSON object in a file.
///
/// Writes are serialized and land via a temp file + rename, so a reader never
/// observes a half-written file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PersistentStore for FileStore {
    async fn read(&self) -> Result<HashMap<String, String>> {
        self.load().await
    }

    async fn write(&self, mutator: Mutator) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        // a corrupt file is replaced rather than blocking every later write
        let mut data = match self.load().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable store");
                HashMap::new()
            }
        };
        mutator(&mut data);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&data)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeatherError;

    #[tokio::test]
    async fn memory_store_applies_mutations() {
        let store = MemoryStore::new();
        store
            .write(Box::new(|m: &mut HashMap<String, String>| {
                m.insert(LOCATION_KEY.into(), "a".into());
            }))
            .await
            .unwrap();
        store
            .write(Box::new(|m: &mut HashMap<String, String>| {
                m.insert(WEATHER_KEY.into(), "b".into());
            }))
            .await
            .unwrap();

        let data = store.read().await.unwrap();
        assert_eq!(data.get(LOCATION_KEY).map(String::as_str), Some("a"));
        assert_eq!(data.get(WEATHER_KEY).map(String::as_str), Some("b"));
    }

    #[tokio::test]
    async fn file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("prefs.json"));
        assert!(store.read().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = FileStore::new(&path);
        store
            .write(Box::new(|m: &mut HashMap<String, String>| {
                m.insert(LOCATION_KEY.into(), r#"{"lat":1.0,"lon":2.0}"#.into());
            }))
            .await
            .unwrap();

        let reopened = FileStore::new(&path);
        let data = reopened.read().await.unwrap();
        assert_eq!(data.get(LOCATION_KEY).map(String::as_str), Some(r#"{"lat":1.0,"lon":2.0}"#));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn file_store_corrupt_file_is_an_error_then_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.read().await, Err(WeatherError::Deserialization(_))));

        store
            .write(Box::new(|m: &mut HashMap<String, String>| {
                m.insert(WEATHER_KEY.into(), "w".into());
            }))
            .await
            .unwrap();
        let data = store.read().await.unwrap();
        assert_eq!(data.len(), 1);
    }
}
