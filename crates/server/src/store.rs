//! Finished results kept for the result page, `/dl` and `/meta`.
//!
//! Records expire after a TTL and the oldest are evicted past a capacity.
//! Callers receive evicted records so their output files can be removed.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use vidcompress_transcoder::record::ResultRecord;

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert a record, returning whatever had to be evicted to make room.
    async fn put(&self, record: ResultRecord) -> Vec<ResultRecord>;

    /// Look up a live (unexpired) record.
    async fn get(&self, id: &str) -> Option<ResultRecord>;

    async fn delete(&self, id: &str) -> Option<ResultRecord>;

    /// Drop every expired record and return them.
    async fn purge_expired(&self) -> Vec<ResultRecord>;

    async fn len(&self) -> usize;
}

/// 24 hex chars from 12 random bytes.
pub fn new_result_id() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

struct Entry {
    stored_at: Instant,
    record: ResultRecord,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
}

pub struct MemoryResultStore {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl MemoryResultStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.stored_at) >= self.ttl
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn put(&self, record: ResultRecord) -> Vec<ResultRecord> {
        let mut inner = self.inner.lock().await;
        let mut evicted = Vec::new();

        if let Some(old) = inner.entries.remove(&record.id) {
            inner.order.retain(|id| id != &record.id);
            evicted.push(old.record);
        }

        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            if let Some(entry) = inner.entries.remove(&oldest) {
                evicted.push(entry.record);
            }
        }

        inner.order.push_back(record.id.clone());
        inner.entries.insert(
            record.id.clone(),
            Entry {
                stored_at: Instant::now(),
                record,
            },
        );
        evicted
    }

    async fn get(&self, id: &str) -> Option<ResultRecord> {
        let inner = self.inner.lock().await;
        let entry = inner.entries.get(id)?;
        if self.is_expired(entry, Instant::now()) {
            return None;
        }
        Some(entry.record.clone())
    }

    async fn delete(&self, id: &str) -> Option<ResultRecord> {
        let mut inner = self.inner.lock().await;
        let entry = inner.entries.remove(id)?;
        inner.order.retain(|k| k != id);
        Some(entry.record)
    }

    async fn purge_expired(&self) -> Vec<ResultRecord> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| self.is_expired(e, now))
            .map(|(id, _)| id.clone())
            .collect();

        let mut out = Vec::with_capacity(expired.len());
        for id in &expired {
            if let Some(entry) = inner.entries.remove(id) {
                out.push(entry.record);
            }
        }
        inner.order.retain(|id| !expired.contains(id));
        out
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}

/// Delete the output files of records that left the store.
pub async fn remove_outputs(records: &[ResultRecord]) {
    for record in records {
        match tokio::fs::remove_file(&record.file_path).await {
            Ok(()) => debug!(id = %record.id, path = %record.file_path.display(), "removed result file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(id = %record.id, error = %e, "failed to remove result file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use vidcompress_core::types::{EncodeRequest, ModeDecider, SpeedMode};
    use vidcompress_transcoder::profile::EncodeProfile;
    use vidcompress_transcoder::service::CompressOutcome;

    fn record(id: &str, path: PathBuf) -> ResultRecord {
        let outcome = CompressOutcome {
            profile: EncodeProfile::new(&EncodeRequest::default(), SpeedMode::Balanced),
            decider: ModeDecider::Auto,
            attempts: 1,
            output_bytes: 4096,
            elapsed: Duration::from_millis(10),
            throughput_mb_s: 1.0,
        };
        ResultRecord::new(id.into(), path, 8192, &outcome)
    }

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryResultStore::new(8, Duration::from_secs(60));
        assert!(store.put(record("a", PathBuf::from("a.mp4"))).await.is_empty());
        assert_eq!(store.get("a").await.map(|r| r.id), Some("a".to_string()));
        assert!(store.get("missing").await.is_none());

        assert!(store.delete("a").await.is_some());
        assert!(store.get("a").await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let store = MemoryResultStore::new(2, Duration::from_secs(60));
        store.put(record("a", PathBuf::from("a.mp4"))).await;
        store.put(record("b", PathBuf::from("b.mp4"))).await;
        let evicted = store.put(record("c", PathBuf::from("c.mp4"))).await;

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "a");
        assert!(store.get("a").await.is_none());
        assert!(store.get("b").await.is_some());
        assert!(store.get("c").await.is_some());
    }

    #[tokio::test]
    async fn expired_records_are_hidden_and_purged() {
        let store = MemoryResultStore::new(8, Duration::from_millis(20));
        store.put(record("a", PathBuf::from("a.mp4"))).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        store.put(record("b", PathBuf::from("b.mp4"))).await;

        assert!(store.get("a").await.is_none());
        let purged = store.purge_expired().await;
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].id, "a");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn remove_outputs_deletes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        tokio::fs::write(&path, b"data").await.unwrap();

        let gone = vec![record("a", path.clone()), record("b", dir.path().join("nope.mp4"))];
        remove_outputs(&gone).await;
        assert!(!path.exists());
    }

    #[test]
    fn result_ids_are_24_hex_chars() {
        let id = new_result_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_result_id());
    }
}
