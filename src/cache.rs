use crate::constants::{PRODUCT_FILE_NAME, SERIALIZATION_FORMAT_VERSION, SOURCE_URL_FILE_NAME};
use crate::errors::{ClientError, ErrorKind};
use crate::model::config::{entry_from_cached_json, ProductEntry};
use crate::utils::sha1;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// A key-value store API used to persist the last known configuration.
pub trait ConfigStore: Sync + Send {
    /// Gets the value identified by the given `key`, `None` if nothing is stored under it.
    fn read(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Writes the given `value` under the given `key`.
    ///
    /// Implementations must replace the previous value as a whole, readers must never see
    /// a partially written value.
    fn write(&self, key: &str, value: &str) -> Result<(), ClientError>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for Arc<T> {
    fn read(&self, key: &str) -> Result<Option<String>, ClientError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ClientError> {
        (**self).write(key, value)
    }
}

/// [`ConfigStore`] that keeps the values in memory, for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Creates an empty [`InMemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for InMemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, ClientError> {
        let values = self.values.lock().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = self.values.lock().map_err(|_| poisoned())?;
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

fn poisoned() -> ClientError {
    ClientError::new(
        ErrorKind::Storage,
        "In-memory store lock is poisoned.".to_owned(),
    )
}

/// [`ConfigStore`] that keeps each value in a file named after its key inside a directory.
///
/// Each write goes to its own uniquely named temporary file in the same directory, which then
/// replaces the previous value, so concurrent writers of one key never share a file.
///
/// # Examples
///
/// ```no_run
/// use toggle::{FileStore, Toggle};
///
/// let toggle = Toggle::builder()
///     .source_url("https://example.com/toggle/config.json")
///     .store(Box::new(FileStore::new("/var/cache/myapp/toggle")))
///     .build()
///     .unwrap();
/// ```
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a [`FileStore`] that keeps its files in `dir`, created on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ConfigStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, ClientError> {
        match fs::read_to_string(self.dir.join(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(None),
            Err(err) => Err(ClientError::new(
                ErrorKind::Storage,
                format!("Failed to read cache entry '{key}'. {err}"),
            )),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let to_err = |err: std::io::Error| {
            ClientError::new(
                ErrorKind::Storage,
                format!("Failed to write cache entry '{key}'. {err}"),
            )
        };
        fs::create_dir_all(&self.dir).map_err(to_err)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(to_err)?;
        tmp.write_all(value.as_bytes()).map_err(to_err)?;
        tmp.persist(self.dir.join(key))
            .map(|_| ())
            .map_err(|err| to_err(err.error))
    }
}

/// Persists and restores the last good [`ProductEntry`] and the URL it was fetched from.
pub struct CacheGateway {
    store: Box<dyn ConfigStore>,
    product_key: String,
    source_url_key: String,
}

impl CacheGateway {
    /// Creates a gateway over `store` whose keys are derived from `namespace`.
    pub fn new(store: Box<dyn ConfigStore>, namespace: &str) -> Self {
        Self {
            store,
            product_key: cache_key(namespace, PRODUCT_FILE_NAME),
            source_url_key: cache_key(namespace, SOURCE_URL_FILE_NAME),
        }
    }

    /// Serializes and writes `entry`.
    pub fn store(&self, entry: &ProductEntry) -> Result<(), ClientError> {
        let serialized = entry.serialize()?;
        self.store.write(&self.product_key, serialized.as_str())
    }

    /// Reads the persisted entry, `None` if nothing was stored yet.
    pub fn load(&self) -> Result<Option<ProductEntry>, ClientError> {
        match self.store.read(&self.product_key)? {
            Some(cached) if !cached.is_empty() => Ok(Some(entry_from_cached_json(&cached)?)),
            _ => Ok(None),
        }
    }

    /// Writes the URL the config is fetched from.
    pub fn store_source_url(&self, url: &str) -> Result<(), ClientError> {
        self.store.write(&self.source_url_key, url)
    }

    /// Reads the persisted source URL.
    pub fn source_url(&self) -> Result<Option<String>, ClientError> {
        Ok(self
            .store
            .read(&self.source_url_key)?
            .filter(|url| !url.is_empty()))
    }
}

fn cache_key(namespace: &str, file_name: &str) -> String {
    sha1(format!("{namespace}_{file_name}_{SERIALIZATION_FORMAT_VERSION}").as_str())
}

#[cfg(test)]
mod cache_tests {
    use super::*;
    use crate::constants::test_constants::SAMPLE_PRODUCT_JSON;
    use crate::model::config::product_from_json;
    use chrono::{DateTime, Utc};
    use std::env::temp_dir;

    fn sample_entry() -> ProductEntry {
        ProductEntry::new(
            product_from_json(SAMPLE_PRODUCT_JSON).unwrap(),
            DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap(),
        )
    }

    fn test_dir(name: &str) -> PathBuf {
        temp_dir().join(format!("toggle-{name}-{}", std::process::id()))
    }

    #[test]
    fn cache_key_generation() {
        assert_eq!(cache_key("default", PRODUCT_FILE_NAME).len(), 40);
        assert_ne!(
            cache_key("default", PRODUCT_FILE_NAME),
            cache_key("other", PRODUCT_FILE_NAME)
        );
        assert_ne!(
            cache_key("default", PRODUCT_FILE_NAME),
            cache_key("default", SOURCE_URL_FILE_NAME)
        );
    }

    #[test]
    fn in_memory_store() {
        let store = InMemoryStore::new();
        assert_eq!(store.read("key").unwrap(), None);
        store.write("key", "value1").unwrap();
        store.write("key", "value2").unwrap();
        assert_eq!(store.read("key").unwrap().as_deref(), Some("value2"));
    }

    #[test]
    fn file_store() {
        let dir = test_dir("file-store");
        _ = fs::remove_dir_all(&dir);
        let store = FileStore::new(&dir);
        assert_eq!(store.read("key").unwrap(), None);
        store.write("key", "value1").unwrap();
        store.write("key", "value2").unwrap();
        assert_eq!(store.read("key").unwrap().as_deref(), Some("value2"));
        let files: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec!["key"]);
        _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn file_store_concurrent_writes() {
        let dir = test_dir("file-store-concurrent");
        _ = fs::remove_dir_all(&dir);
        let store = FileStore::new(&dir);
        let large = "A".repeat(2 * 1024 * 1024);
        let small = "B".repeat(1024 * 1024);
        let (large, small) = (&large, &small);

        std::thread::scope(|s| {
            for i in 0..4 {
                let (store, value) = (&store, if i % 2 == 0 { large } else { small });
                s.spawn(move || {
                    for _ in 0..30 {
                        store.write("key", value).unwrap();
                        let read = store.read("key").unwrap().unwrap();
                        assert!(read == *large || read == *small, "mixed value of length {}", read.len());
                    }
                });
            }
        });

        let read = store.read("key").unwrap().unwrap();
        assert!(read == *large || read == *small);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
        _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn file_store_write_failure() {
        let dir = test_dir("file-store-blocked");
        _ = fs::remove_dir_all(&dir);
        fs::write(&dir, "not a directory").unwrap();
        let err = FileStore::new(&dir).write("key", "value").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        _ = fs::remove_file(dir);
    }

    #[test]
    fn gateway_round_trip() {
        let gateway = CacheGateway::new(Box::new(InMemoryStore::new()), "default");
        assert!(gateway.load().unwrap().is_none());
        assert!(gateway.source_url().unwrap().is_none());

        let entry = sample_entry();
        gateway.store(&entry).unwrap();
        gateway.store_source_url("https://example.com/config.json").unwrap();

        let loaded = gateway.load().unwrap().unwrap();
        assert_eq!(loaded.fetch_time, entry.fetch_time);
        assert_eq!(loaded.config().feature_names(), vec!["video", "mixpanel", "speech"]);
        assert_eq!(
            gateway.source_url().unwrap().as_deref(),
            Some("https://example.com/config.json")
        );
    }

    #[test]
    fn gateway_corrupt_entry() {
        let store = InMemoryStore::new();
        store
            .write(&cache_key("default", PRODUCT_FILE_NAME), "1700000000000\n{")
            .unwrap();
        let gateway = CacheGateway::new(Box::new(store), "default");
        assert_eq!(gateway.load().unwrap_err().kind, ErrorKind::MalformedDocument);
    }
}
