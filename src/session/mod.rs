//! Message-passing execution adapter.
//!
//! Both adapters run the same engine with identical matching semantics:
//! calling [`crate::scan::ScanCoordinator::scan`] directly, or spawning an
//! [`EngineSession`] task that communicates over channels, which keeps the
//! caller's thread free while progress and results arrive as discrete
//! messages. Only responsiveness characteristics differ.

use crate::corpus::CorpusMeta;
use crate::query::{parse_and_compile, CompileOptions};
use crate::scan::{CancelFlag, ScanCoordinator, ScanOutcome, ScanProgress, ScanResult};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Commands accepted by the engine task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineRequest {
    /// Parse, compile and run a query against the corpus
    Scan { query: String, whole_words: bool },
    /// Stop the engine task after the current request
    Shutdown,
}

/// Events emitted by the engine task.
#[derive(Debug)]
pub enum EngineEvent {
    Progress(ScanProgress),
    Completed(ScanResult),
    /// Terminal state of a cancelled scan; no partial result is delivered
    Cancelled,
    /// Query syntax error; the scan never started
    Error { message: String },
}

/// Handle to a spawned engine task.
pub struct EngineSession {
    requests: mpsc::Sender<EngineRequest>,
    events: mpsc::Receiver<EngineEvent>,
    cancel: CancelFlag,
}

impl EngineSession {
    /// Spawn the engine task. The session owns the only event receiver.
    pub fn spawn(coordinator: ScanCoordinator, meta: CorpusMeta) -> Self {
        let (req_tx, mut req_rx) = mpsc::channel::<EngineRequest>(8);
        // Progress events are ephemeral and may be dropped under
        // backpressure; terminal events always get through.
        let (evt_tx, evt_rx) = mpsc::channel::<EngineEvent>(64);
        let cancel = CancelFlag::new();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            while let Some(request) = req_rx.recv().await {
                match request {
                    EngineRequest::Scan { query, whole_words } => {
                        let matcher =
                            match parse_and_compile(&query, CompileOptions { whole_words }) {
                                Ok(matcher) => matcher,
                                Err(err) => {
                                    let _ = evt_tx
                                        .send(EngineEvent::Error {
                                            message: err.to_string(),
                                        })
                                        .await;
                                    continue;
                                }
                            };

                        task_cancel.reset();
                        let progress_tx = evt_tx.clone();
                        let outcome = coordinator
                            .scan(&matcher, &meta, &task_cancel, |progress| {
                                let _ = progress_tx.try_send(EngineEvent::Progress(progress));
                            })
                            .await;

                        let terminal = match outcome {
                            ScanOutcome::Complete(result) => EngineEvent::Completed(result),
                            ScanOutcome::Cancelled => EngineEvent::Cancelled,
                        };
                        if evt_tx.send(terminal).await.is_err() {
                            break;
                        }
                    }
                    EngineRequest::Shutdown => break,
                }
            }
            debug!("engine session task stopped");
        });

        Self {
            requests: req_tx,
            events: evt_rx,
            cancel,
        }
    }

    /// Queue a scan request. Returns false if the engine task is gone.
    pub async fn submit(&self, query: &str, whole_words: bool) -> bool {
        self.requests
            .send(EngineRequest::Scan {
                query: query.to_string(),
                whole_words,
            })
            .await
            .is_ok()
    }

    /// Set the cooperative cancellation flag for the in-flight scan.
    /// Takes effect immediately; it is not queued behind other requests.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Receive the next engine event; `None` once the task has stopped and
    /// the channel drained.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.events.recv().await
    }

    pub async fn shutdown(&self) {
        let _ = self.requests.send(EngineRequest::Shutdown).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ShardCache;
    use crate::corpus::{FetchedShard, Record, RecordId, ShardFetcher, ShardIndex};
    use crate::scan::ScanOptions;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct SlowFetcher {
        shards: HashMap<ShardIndex, Vec<Record>>,
        delay: Duration,
    }

    #[async_trait]
    impl ShardFetcher for SlowFetcher {
        async fn fetch(&self, index: ShardIndex) -> FetchedShard {
            tokio::time::sleep(self.delay).await;
            match self.shards.get(&index) {
                Some(records) => FetchedShard {
                    index,
                    records: records.clone(),
                    failed: false,
                },
                None => FetchedShard {
                    index,
                    records: Vec::new(),
                    failed: true,
                },
            }
        }
    }

    fn corpus() -> HashMap<ShardIndex, Vec<Record>> {
        (0..4u32)
            .map(|i| {
                (
                    i,
                    vec![Record {
                        id: RecordId::Int(i as u64),
                        text: format!("shard {i} mentions an eagle"),
                    }],
                )
            })
            .collect()
    }

    fn session(delay: Duration) -> (tempfile::TempDir, EngineSession) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(ShardCache::open(dir.path().join("shards")).unwrap());
        let fetcher = Arc::new(SlowFetcher {
            shards: corpus(),
            delay,
        });
        let coordinator = ScanCoordinator::new(
            cache,
            fetcher,
            ScanOptions {
                track_term_frequency: true,
                cache_enabled: false,
            },
        );
        let meta = CorpusMeta {
            total_shards: 4,
            data_version: "v1".to_string(),
        };
        (dir, EngineSession::spawn(coordinator, meta))
    }

    #[tokio::test]
    async fn test_scan_delivers_progress_then_result() {
        let (_dir, mut session) = session(Duration::ZERO);
        assert!(session.submit("eagle", true).await);

        let mut saw_progress = false;
        loop {
            match session.next_event().await.expect("engine task alive") {
                EngineEvent::Progress(_) => saw_progress = true,
                EngineEvent::Completed(result) => {
                    assert_eq!(result.counts.len(), 4);
                    break;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert!(saw_progress);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_syntax_error_reported_without_scan() {
        let (_dir, mut session) = session(Duration::ZERO);
        assert!(session.submit(r"(?P<unclosed", true).await);
        match session.next_event().await.expect("engine task alive") {
            EngineEvent::Error { message } => assert!(message.contains("invalid query")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_scan_yields_cancelled_terminal() {
        let (_dir, mut session) = session(Duration::from_millis(50));
        assert!(session.submit("eagle", true).await);
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.cancel();

        loop {
            match session.next_event().await.expect("engine task alive") {
                EngineEvent::Progress(_) => continue,
                EngineEvent::Cancelled => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_session_reusable_after_cancellation() {
        let (_dir, mut session) = session(Duration::from_millis(20));
        assert!(session.submit("eagle", true).await);
        session.cancel();
        loop {
            match session.next_event().await.expect("engine task alive") {
                EngineEvent::Cancelled | EngineEvent::Completed(_) => break,
                _ => continue,
            }
        }

        // The flag is re-armed for the next scan
        assert!(session.submit("eagle", true).await);
        loop {
            match session.next_event().await.expect("engine task alive") {
                EngineEvent::Completed(result) => {
                    assert_eq!(result.counts.len(), 4);
                    break;
                }
                EngineEvent::Progress(_) => continue,
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}
