//! Revocable in-memory blob locators.
//!
//! The decoders resolve external resources by locator string only, so
//! bytes that already live in memory are published under a short-lived
//! `blob:` locator for the duration of one decode. Every created handle
//! revokes its entry exactly once when dropped, which holds on decode
//! failure paths as well. The store keeps creation and revocation
//! counts so tests can assert that no handle leaks an entry.

use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    sync::{Arc, Mutex},
};

use uuid::Uuid;

pub const BLOB_SCHEME: &str = "blob:";

#[derive(Default)]
struct StoreInner {
    entries: HashMap<String, Arc<Vec<u8>>>,
    created: u64,
    revoked: u64,
}

#[derive(Clone, Default)]
pub struct BlobStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl Debug for BlobStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("BlobStore")
            .field("live", &inner.entries.len())
            .field("created", &inner.created)
            .field("revoked", &inner.revoked)
            .finish()
    }
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `data` under a fresh `blob:` locator.
    pub fn create(&self, data: Vec<u8>) -> BlobHandle {
        let locator = format!("{}{}", BLOB_SCHEME, Uuid::new_v4());
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(locator.clone(), Arc::new(data));
        inner.created += 1;
        BlobHandle {
            locator,
            store: self.clone(),
        }
    }

    pub fn resolve(&self, locator: &str) -> Option<Arc<Vec<u8>>> {
        self.inner.lock().unwrap().entries.get(locator).cloned()
    }

    fn revoke(&self, locator: &str) {
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.remove(locator).is_some() {
            inner.revoked += 1;
        }
    }

    /// Number of handles created over the lifetime of the store.
    pub fn created(&self) -> u64 {
        self.inner.lock().unwrap().created
    }

    /// Number of entries revoked over the lifetime of the store.
    pub fn revoked(&self) -> u64 {
        self.inner.lock().unwrap().revoked
    }

    pub fn live(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }
}

/// Guard for one published blob entry.
///
/// Dropping the handle revokes the locator; resolving it afterwards
/// returns `None`.
pub struct BlobHandle {
    locator: String,
    store: BlobStore,
}

impl Debug for BlobHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlobHandle").field(&self.locator).finish()
    }
}

impl BlobHandle {
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        self.store.revoke(&self.locator);
    }
}
