use std::collections::HashMap;

use sha2::{Digest, Sha256};

use super::error::DataResult;
use super::model::Table;

/// Identity of an upload: SHA-256 of its bytes plus the declared filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: String,
    filename: String,
}

impl CacheKey {
    pub fn new(bytes: &[u8], filename: &str) -> Self {
        CacheKey {
            digest: format!("{:x}", Sha256::digest(bytes)),
            filename: filename.to_string(),
        }
    }

    /// Hex SHA-256 of the upload.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Digest prefix used in log lines.
    fn short_digest(&self) -> &str {
        self.digest.get(..12).unwrap_or(&self.digest)
    }
}

/// Memoised cleaned tables for one session.
///
/// Invalidation rule: inserting a table for a new key evicts every other
/// entry, so re-uploading the same file is free while a different upload
/// always starts from a fresh load.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: HashMap<CacheKey, Table>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&Table> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Return the cached table for `key`, or build it with `load`.
    ///
    /// A failed load leaves the cache empty: the previous upload is already
    /// invalidated by the attempt.
    pub fn get_or_try_insert_with(
        &mut self,
        key: CacheKey,
        load: impl FnOnce() -> DataResult<Table>,
    ) -> DataResult<&Table> {
        if self.entries.contains_key(&key) {
            log::debug!("cache hit for {} ({})", key.filename, key.short_digest());
        } else {
            if !self.entries.is_empty() {
                log::debug!("new upload {}: invalidating {} cached table(s)", key.filename, self.entries.len());
                self.entries.clear();
            }
            log::debug!("cache miss for {} ({})", key.filename, key.short_digest());
            let table = load()?;
            self.entries.insert(key.clone(), table);
        }
        Ok(&self.entries[&key])
    }
}
