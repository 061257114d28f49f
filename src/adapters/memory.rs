//! In-memory storage adapter.
//!
//! Implements [`StoragePort`] with a mutex-guarded vector.  Used by tests
//! and by dry runs that should leave nothing on disk.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::app::ports::{Record, RecordKind, StorageError, StoragePort};
use crate::vision::photo::{Photo, PhotoRef};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
    photos: Mutex<HashMap<PhotoRef, Photo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record in append order.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn photo(&self, reference: &PhotoRef) -> Option<Photo> {
        self.photos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
            .cloned()
    }

    pub fn photo_count(&self) -> usize {
        self.photos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl StoragePort for MemoryStore {
    fn append(&self, record: &Record) -> Result<(), StorageError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn recent(&self, kind: RecordKind, limit: usize) -> Result<Vec<Record>, StorageError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.kind() == kind)
            .take(limit)
            .cloned()
            .collect())
    }

    fn store_photo(&self, photo: &Photo) -> Result<PhotoRef, StorageError> {
        let reference = photo.digest();
        self.photos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.clone(), photo.clone());
        Ok(reference)
    }
}
