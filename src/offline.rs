use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::constants::OFFLINE_QUEUE_KEY;
use crate::error::{Result, TrackerError};
use crate::storage::{get_json_lenient, LocalStore};
use crate::store::Fields;

/// One pending submission awaiting replay: the create payload in wire form
/// plus a locally generated correlation id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QueuedRecord {
    #[serde(rename = "_localId")]
    pub local_id: String,
    pub payload: Fields,
}

/// Durable append-only queue of offline submissions.
///
/// Entries leave the queue only through `drain_all`, and only as an atomic
/// whole-queue replace after every entry replayed successfully. A corrupt
/// stored queue reads as empty rather than blocking the operator.
pub struct OfflineQueue {
    local: Arc<dyn LocalStore>,
}

impl OfflineQueue {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self { local }
    }

    /// Current queue contents in FIFO order, without consuming anything.
    pub fn peek_all(&self) -> Vec<QueuedRecord> {
        match get_json_lenient(self.local.as_ref(), OFFLINE_QUEUE_KEY) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Discarding unreadable offline queue: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.peek_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peek_all().is_empty()
    }

    /// Append one payload, assigning its correlation id.
    pub fn enqueue(&self, payload: Fields) -> Result<QueuedRecord> {
        let entry = QueuedRecord {
            local_id: next_local_id(),
            payload,
        };
        let mut entries = self.peek_all();
        entries.push(entry.clone());
        self.persist(&entries)?;
        debug!(
            local_id = %entry.local_id,
            queued = entries.len(),
            "Submission queued offline"
        );
        Ok(entry)
    }

    /// Replay every entry in FIFO order through `replay`.
    ///
    /// Any entry failing aborts the rest and leaves the whole queue in place;
    /// the next connectivity edge (or a manual trigger) retries from the
    /// start, so a replayed-but-uncleared entry can be created twice. Only
    /// after every entry succeeded is the queue replaced with empty.
    pub async fn drain_all<F, Fut>(&self, mut replay: F) -> Result<usize>
    where
        F: FnMut(QueuedRecord) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let entries = self.peek_all();
        if entries.is_empty() {
            return Ok(0);
        }
        let attempted = entries.len();
        for (index, entry) in entries.into_iter().enumerate() {
            let local_id = entry.local_id.clone();
            if let Err(e) = replay(entry).await {
                warn!(
                    local_id = %local_id,
                    completed = index,
                    attempted,
                    "Offline drain aborted; queue left intact: {e}"
                );
                return Err(TrackerError::Sync {
                    attempted,
                    completed: index,
                    message: e.to_string(),
                });
            }
        }
        self.persist(&[]).map_err(|e| TrackerError::Sync {
            attempted,
            completed: attempted,
            message: format!("queue clear failed: {e}"),
        })?;
        Ok(attempted)
    }

    fn persist(&self, entries: &[QueuedRecord]) -> Result<()> {
        let raw = serde_json::to_string(entries)
            .map_err(|e| TrackerError::store(format!("failed to encode offline queue: {e}")))?;
        self.local.set(OFFLINE_QUEUE_KEY, &raw)
    }
}

fn next_local_id() -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), rand::random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLocalStore;
    use serde_json::json;

    fn payload(vehicle: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("vehicleId".into(), json!(vehicle));
        fields
    }

    #[test]
    fn test_enqueue_survives_reopen() {
        let local: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let queue = OfflineQueue::new(local.clone());
        queue.enqueue(payload("v1")).unwrap();
        queue.enqueue(payload("v2")).unwrap();

        let reopened = OfflineQueue::new(local);
        let entries = reopened.peek_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].payload["vehicleId"], json!("v1"));
        assert_eq!(entries[1].payload["vehicleId"], json!("v2"));
        assert_ne!(entries[0].local_id, entries[1].local_id);
    }

    #[test]
    fn test_corrupt_queue_reads_empty() {
        let local: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        local.set(OFFLINE_QUEUE_KEY, "{broken").unwrap();
        let queue = OfflineQueue::new(local);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_drain_replays_fifo_then_clears() {
        let queue = OfflineQueue::new(Arc::new(MemoryLocalStore::new()));
        for vehicle in ["v1", "v2", "v3"] {
            queue.enqueue(payload(vehicle)).unwrap();
        }
        let seen = std::sync::Mutex::new(Vec::new());
        let drained = queue
            .drain_all(|entry| {
                seen.lock()
                    .unwrap()
                    .push(entry.payload["vehicleId"].as_str().unwrap().to_string());
                async { Ok(()) }
            })
            .await
            .unwrap();
        assert_eq!(drained, 3);
        assert_eq!(*seen.lock().unwrap(), vec!["v1", "v2", "v3"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_failed_drain_keeps_whole_queue() {
        let queue = OfflineQueue::new(Arc::new(MemoryLocalStore::new()));
        for vehicle in ["v1", "v2", "v3"] {
            queue.enqueue(payload(vehicle)).unwrap();
        }
        let mut calls = 0;
        let err = queue
            .drain_all(|_entry| {
                calls += 1;
                let fail = calls == 2;
                async move {
                    if fail {
                        Err(TrackerError::store("backend unavailable"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap_err();
        match err {
            TrackerError::Sync {
                attempted,
                completed,
                ..
            } => {
                assert_eq!(attempted, 3);
                assert_eq!(completed, 1);
            }
            other => panic!("expected sync error, got {other:?}"),
        }
        // No partial removal: all three entries still queued
        assert_eq!(queue.len(), 3);
    }

    #[tokio::test]
    async fn test_drain_of_empty_queue_is_noop() {
        let queue = OfflineQueue::new(Arc::new(MemoryLocalStore::new()));
        let mut calls = 0;
        let drained = queue
            .drain_all(|_entry| {
                calls += 1;
                async { Ok(()) }
            })
            .await
            .unwrap();
        assert_eq!(drained, 0);
        assert_eq!(calls, 0);
    }
}
