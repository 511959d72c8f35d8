//! Process registry (C8): an in-memory slug -> record map with an atomic
//! "does it exist already?" check against insertion.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use smartmob_domain::{ProcessRecord, Slug};

#[derive(Default)]
pub struct Registry {
    records: RwLock<HashMap<Slug, Arc<ProcessRecord>>>,
}

/// Returned by [`Registry::insert_unique`] when the slug is already taken.
pub struct DuplicateSlug;

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` iff no record with the same slug exists yet. The
    /// check-then-insert happens under a single write lock so CREATE's
    /// uniqueness guarantee (invariant 1) holds under concurrent requests.
    pub fn insert_unique(&self, record: ProcessRecord) -> Result<Arc<ProcessRecord>, DuplicateSlug> {
        let mut records = self.records.write();
        if records.contains_key(&record.slug) {
            return Err(DuplicateSlug);
        }
        let slug = record.slug.clone();
        let record = Arc::new(record);
        records.insert(slug, record.clone());
        Ok(record)
    }

    pub fn get(&self, slug: &Slug) -> Option<Arc<ProcessRecord>> {
        self.records.read().get(slug).cloned()
    }

    pub fn remove(&self, slug: &Slug) -> Option<Arc<ProcessRecord>> {
        self.records.write().remove(slug)
    }

    /// A point-in-time snapshot; callers do not observe later mutations.
    pub fn list(&self) -> Vec<Arc<ProcessRecord>> {
        self.records.read().values().cloned().collect()
    }
}
