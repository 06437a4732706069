//! Object-store seam for work items.
//!
//! The admission-control core never processes item content; it only lists,
//! copies, and deletes items between lifecycle areas and reads/writes a small
//! set of string attributes on them. This trait is that contract. Production
//! deployments back it with a bucket store; tests use [`MemoryObjectStore`].

use crate::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Errors from the work-item object store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ObjectStoreError {
    /// The requested key does not exist.
    #[error("object not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },
    /// The backend rejected or failed the operation.
    #[error("object store backend error: {message}")]
    Backend {
        /// Backend-supplied detail.
        message: String,
    },
}

/// Listing entry for an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full object key.
    pub key: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Object size in bytes.
    pub size: u64,
}

/// Contract with the external work-item store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists objects under a key prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, ObjectStoreError>;

    /// Copies `src` to `dst`, carrying attributes over and then applying
    /// `attribute_overrides` on the copy.
    async fn copy(
        &self,
        src: &str,
        dst: &str,
        attribute_overrides: &HashMap<String, String>,
    ) -> Result<(), ObjectStoreError>;

    /// Deletes an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// Reads the attributes of an object.
    async fn attributes(&self, key: &str) -> Result<HashMap<String, String>, ObjectStoreError>;
}

#[derive(Debug, Clone)]
struct StoredObject {
    attrs: HashMap<String, String>,
    last_modified: DateTime<Utc>,
    size: u64,
}

/// In-memory object store for tests.
///
/// Keys are held in a sorted map so prefix listings come back in a stable
/// order; `last_modified` is taken from the injected clock at put/copy time.
/// Copy failures can be injected per destination prefix to exercise
/// failed-move paths.
#[derive(Clone)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    clock: Arc<dyn Clock>,
    fail_copy_to_prefix: Arc<Mutex<Option<String>>>,
    fail_delete_of: Arc<Mutex<Option<String>>>,
}

impl MemoryObjectStore {
    /// Creates an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            clock,
            fail_copy_to_prefix: Arc::new(Mutex::new(None)),
            fail_delete_of: Arc::new(Mutex::new(None)),
        }
    }

    /// Inserts an object with the given attributes and size.
    pub fn put(&self, key: &str, attrs: HashMap<String, String>, size: u64) {
        let mut objects = self.objects.lock().unwrap();
        objects.insert(
            key.to_string(),
            StoredObject {
                attrs,
                last_modified: self.clock.now(),
                size,
            },
        );
    }

    /// Returns true if the key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Total number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }

    /// All keys currently under `prefix`.
    pub fn keys_under(&self, prefix: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Makes every copy into `prefix` fail until cleared with `None`.
    pub fn fail_copies_to(&self, prefix: Option<&str>) {
        *self.fail_copy_to_prefix.lock().unwrap() = prefix.map(str::to_string);
    }

    /// Makes deletes of exactly `key` fail until cleared with `None`.
    pub fn fail_delete_of(&self, key: Option<&str>) {
        *self.fail_delete_of.lock().unwrap() = key.map(str::to_string);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, ObjectStoreError> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                last_modified: obj.last_modified,
                size: obj.size,
            })
            .collect())
    }

    async fn copy(
        &self,
        src: &str,
        dst: &str,
        attribute_overrides: &HashMap<String, String>,
    ) -> Result<(), ObjectStoreError> {
        if let Some(prefix) = self.fail_copy_to_prefix.lock().unwrap().as_deref() {
            if dst.starts_with(prefix) {
                return Err(ObjectStoreError::Backend {
                    message: format!("injected copy failure for {dst}"),
                });
            }
        }

        let mut objects = self.objects.lock().unwrap();
        let source = objects
            .get(src)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound {
                key: src.to_string(),
            })?;

        let mut attrs = source.attrs;
        for (name, value) in attribute_overrides {
            attrs.insert(name.clone(), value.clone());
        }

        objects.insert(
            dst.to_string(),
            StoredObject {
                attrs,
                last_modified: self.clock.now(),
                size: source.size,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        if let Some(target) = self.fail_delete_of.lock().unwrap().as_deref() {
            if key == target {
                return Err(ObjectStoreError::Backend {
                    message: format!("injected delete failure for {key}"),
                });
            }
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn attributes(&self, key: &str) -> Result<HashMap<String, String>, ObjectStoreError> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(key)
            .map(|obj| obj.attrs.clone())
            .ok_or_else(|| ObjectStoreError::NotFound {
                key: key.to_string(),
            })
    }
}
