//! In-memory gallery with per-client like deduplication

use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::gallery::record::{GalleryEntry, GenerationRecord, SortOrder};

/// Append-only gallery of generation records.
///
/// Records, the id index and the like ledger sit behind one lock so a like
/// check-and-increment is atomic.
#[derive(Default)]
pub struct GalleryStore {
    inner: RwLock<GalleryInner>,
}

#[derive(Default)]
struct GalleryInner {
    records: Vec<GenerationRecord>,
    index: HashMap<String, usize>,
    /// client id -> record ids liked by that client
    likes: HashMap<String, HashSet<String>>,
}

impl GalleryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Append a record, assigning an id when empty and resetting its likes.
    /// Returns the stored record.
    pub fn append(&self, mut record: GenerationRecord) -> Result<GenerationRecord> {
        let mut inner = self.inner.write();

        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        if inner.index.contains_key(&record.id) {
            return Err(AppError::DuplicateRecord(record.id));
        }
        record.likes = 0;

        let position = inner.records.len();
        inner.index.insert(record.id.clone(), position);
        inner.records.push(record.clone());

        debug!(id = %record.id, size = position + 1, "Appended gallery record");
        Ok(record)
    }

    /// Snapshot of the gallery in the requested order
    pub fn list(&self, order: SortOrder, client_id: &str) -> Vec<GalleryEntry> {
        let inner = self.inner.read();
        let liked = inner.likes.get(client_id);

        let mut positioned: Vec<(usize, &GenerationRecord)> =
            inner.records.iter().enumerate().collect();
        positioned.sort_by(|a, b| compare(order, a, b));

        positioned
            .into_iter()
            .map(|(_, record)| GalleryEntry {
                user_liked: liked.is_some_and(|ids| ids.contains(&record.id)),
                record: record.clone(),
            })
            .collect()
    }

    /// Like a record once per client, returning the new like count
    pub fn like(&self, record_id: &str, client_id: &str) -> Result<u64> {
        let mut inner = self.inner.write();
        let GalleryInner { records, index, likes } = &mut *inner;

        let position = *index
            .get(record_id)
            .ok_or_else(|| AppError::RecordNotFound(record_id.to_string()))?;

        let liked = likes.entry(client_id.to_string()).or_default();
        if !liked.insert(record_id.to_string()) {
            return Err(AppError::AlreadyLiked(record_id.to_string()));
        }

        let record = &mut records[position];
        record.likes += 1;

        debug!(id = %record_id, client = %client_id, likes = record.likes, "Recorded like");
        Ok(record.likes)
    }

    /// Current snapshot of one record
    pub fn get(&self, record_id: &str) -> Result<GenerationRecord> {
        let inner = self.inner.read();
        inner
            .index
            .get(record_id)
            .map(|&position| inner.records[position].clone())
            .ok_or_else(|| AppError::RecordNotFound(record_id.to_string()))
    }

    /// One record plus whether `client_id` has liked it
    pub fn get_for_client(&self, record_id: &str, client_id: &str) -> Result<GalleryEntry> {
        let inner = self.inner.read();
        let position = *inner
            .index
            .get(record_id)
            .ok_or_else(|| AppError::RecordNotFound(record_id.to_string()))?;

        Ok(GalleryEntry {
            record: inner.records[position].clone(),
            user_liked: inner
                .likes
                .get(client_id)
                .is_some_and(|ids| ids.contains(record_id)),
        })
    }

    /// Whether `client_id` has liked `record_id`
    pub fn has_liked(&self, record_id: &str, client_id: &str) -> bool {
        self.inner
            .read()
            .likes
            .get(client_id)
            .is_some_and(|ids| ids.contains(record_id))
    }
}

fn newest_first(a: &(usize, &GenerationRecord), b: &(usize, &GenerationRecord)) -> Ordering {
    b.1.created_at.cmp(&a.1.created_at).then(b.0.cmp(&a.0))
}

fn compare(order: SortOrder, a: &(usize, &GenerationRecord), b: &(usize, &GenerationRecord)) -> Ordering {
    match order {
        SortOrder::Newest => newest_first(a, b),
        SortOrder::Oldest => a.1.created_at.cmp(&b.1.created_at).then(a.0.cmp(&b.0)),
        SortOrder::Likes => b.1.likes.cmp(&a.1.likes).then_with(|| newest_first(a, b)),
    }
}
