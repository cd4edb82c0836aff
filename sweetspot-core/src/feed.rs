//! Async event feed: pumps an [`EventSource`] into a shared router.
//!
//! The feed task is the only writer. Readers hold a [`Dashboard`] and see the
//! last applied state; detaching the feed stops mutation but keeps the state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::{RwLock, RwLockReadGuard, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::events::EventEnvelope;
use crate::router::{Dispatch, EventRouter};

/// Errors raised by event sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read events: {0}")]
    Read(#[from] std::io::Error),

    /// A single envelope could not be decoded; later ones may still be fine.
    #[error("line {line}: invalid event envelope: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that yields event envelopes in delivery order.
///
/// `Ok(None)` means the source is exhausted.
#[async_trait]
pub trait EventSource: Send {
    async fn next(&mut self) -> Result<Option<EventEnvelope>, SourceError>;
}

/// In-process source backed by a tokio mpsc channel.
pub struct ChannelSource {
    rx: mpsc::Receiver<EventEnvelope>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<EventEnvelope>) -> Self {
        Self { rx }
    }

    /// Create a bounded channel and its source end.
    pub fn channel(capacity: usize) -> (mpsc::Sender<EventEnvelope>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    async fn next(&mut self) -> Result<Option<EventEnvelope>, SourceError> {
        Ok(self.rx.recv().await)
    }
}

/// One JSON envelope per line; blank lines are skipped.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: AsyncBufRead + Unpin> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventSource for JsonLinesSource<R> {
    async fn next(&mut self) -> Result<Option<EventEnvelope>, SourceError> {
        while let Some(text) = self.lines.next_line().await? {
            self.line += 1;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            return serde_json::from_str(text)
                .map(Some)
                .map_err(|source| SourceError::Decode {
                    line: self.line,
                    source,
                });
        }
        Ok(None)
    }
}

/// Counters for one run of a feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    pub received: u64,
    pub applied: u64,
    pub resets: u64,
    pub held: u64,
    pub stale: u64,
    pub dropped: u64,
    pub logged: u64,
    pub undecodable: u64,
}

impl FeedStats {
    fn record(&mut self, dispatch: &Dispatch) {
        self.received += 1;
        match dispatch {
            Dispatch::Reset { .. } => self.resets += 1,
            Dispatch::Applied { .. } => self.applied += 1,
            Dispatch::Buffered | Dispatch::Overflowed => self.held += 1,
            Dispatch::Stale | Dispatch::Unchanged => self.stale += 1,
            Dispatch::Logged => self.logged += 1,
            Dispatch::Dropped(_) => self.dropped += 1,
        }
    }
}

/// Cloneable read handle on a router driven by a feed.
#[derive(Debug, Clone)]
pub struct Dashboard {
    router: Arc<RwLock<EventRouter>>,
}

impl Dashboard {
    /// Acquire a consistent view of the router.
    pub async fn read(&self) -> RwLockReadGuard<'_, EventRouter> {
        self.router.read().await
    }
}

/// Handle on a running feed task.
pub struct EngineFeed {
    dashboard: Dashboard,
    shutdown: CancellationToken,
    changes: watch::Receiver<u64>,
    handle: JoinHandle<FeedStats>,
}

impl EngineFeed {
    /// Start applying envelopes from `source` to `router` on a tokio task.
    pub fn spawn<S>(router: EventRouter, mut source: S) -> Self
    where
        S: EventSource + 'static,
    {
        let router = Arc::new(RwLock::new(router));
        let shutdown = CancellationToken::new();
        let (notify, changes) = watch::channel(0u64);

        let writer = Arc::clone(&router);
        let cancelled = shutdown.clone();
        let handle = tokio::spawn(async move {
            info!("event feed started");
            let mut stats = FeedStats::default();

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        info!("event feed detached");
                        break;
                    }
                    next = source.next() => {
                        match next {
                            Ok(Some(envelope)) => {
                                let dispatch = writer.write().await.dispatch(envelope);
                                stats.record(&dispatch);
                                notify.send_modify(|version| *version += 1);
                            }
                            Ok(None) => {
                                debug!("event source exhausted");
                                break;
                            }
                            Err(e @ SourceError::Decode { .. }) => {
                                warn!(error = %e, "skipping undecodable envelope");
                                stats.undecodable += 1;
                            }
                            Err(e) => {
                                error!(error = %e, "event source failed");
                                break;
                            }
                        }
                    }
                }
            }

            info!(
                received = stats.received,
                applied = stats.applied,
                dropped = stats.dropped,
                "event feed stopped"
            );
            stats
        });

        Self {
            dashboard: Dashboard { router },
            shutdown,
            changes,
            handle,
        }
    }

    #[must_use]
    pub fn dashboard(&self) -> Dashboard {
        self.dashboard.clone()
    }

    /// Receiver bumped after every processed envelope.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.clone()
    }

    /// Stop applying events. Already aggregated state stays readable.
    pub fn detach(&self) {
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the feed task to end and return its counters.
    pub async fn join(self) -> FeedStats {
        match self.handle.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "event feed task panicked");
                FeedStats::default()
            }
        }
    }
}

/// Apply every envelope from `source` to `router` on the current task.
///
/// Undecodable envelopes are skipped with a warning; read failures end the
/// drain with an error.
pub async fn drain<S: EventSource>(
    router: &mut EventRouter,
    source: &mut S,
) -> Result<FeedStats, SourceError> {
    let mut stats = FeedStats::default();
    loop {
        match source.next().await {
            Ok(Some(envelope)) => {
                let dispatch = router.dispatch(envelope);
                stats.record(&dispatch);
            }
            Ok(None) => return Ok(stats),
            Err(e @ SourceError::Decode { .. }) => {
                warn!(error = %e, "skipping undecodable envelope");
                stats.undecodable += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn description() -> EventEnvelope {
        EventEnvelope::new(
            "experiment-description",
            json!({
                "experiment_description": {
                    "General": { "isMinimizationExperiment": false },
                    "TaskConfiguration": { "Objectives": ["throughput"] }
                },
                "searchspace_description": { "boundaries": { "threads": [1, 2, 4] } }
            }),
        )
    }

    fn measurement(threads: i64, throughput: f64) -> EventEnvelope {
        EventEnvelope::new(
            "new-configuration",
            json!({ "configurations": [threads], "results": [throughput] }),
        )
    }

    // ==================== JsonLinesSource Tests ====================

    #[tokio::test]
    async fn json_lines_skip_blank_lines() {
        let input = b"{\"event\":\"log\",\"body\":\"a\"}\n\n   \n{\"event\":\"log\",\"body\":\"b\"}\n";
        let mut source = JsonLinesSource::new(&input[..]);

        assert_eq!(source.next().await.unwrap().unwrap().body, json!("a"));
        assert_eq!(source.next().await.unwrap().unwrap().body, json!("b"));
        assert!(source.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_lines_report_line_of_bad_envelope() {
        let input = b"{\"event\":\"log\"}\nnot json\n{\"event\":\"log\"}\n";
        let mut source = JsonLinesSource::new(&input[..]);

        source.next().await.unwrap();
        let err = source.next().await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { line: 2, .. }));
        assert!(source.next().await.unwrap().is_some());
    }

    // ==================== Drain Tests ====================

    #[tokio::test]
    async fn drain_applies_in_order_and_skips_bad_lines() {
        let lines = [
            serde_json::to_string(&description()).unwrap(),
            "{broken".to_string(),
            serde_json::to_string(&measurement(2, 40.0)).unwrap(),
        ]
        .join("\n");
        let mut source = JsonLinesSource::new(lines.as_bytes());
        let mut router = EventRouter::default();

        let stats = drain(&mut router, &mut source).await.unwrap();

        assert_eq!(stats.resets, 1);
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.undecodable, 1);
        assert_eq!(router.state().unwrap().measurements().len(), 1);
    }

    // ==================== EngineFeed Tests ====================

    #[tokio::test]
    async fn feed_applies_until_source_closes() {
        let (tx, source) = ChannelSource::channel(8);
        let feed = EngineFeed::spawn(EventRouter::default(), source);
        let dashboard = feed.dashboard();

        tx.send(description()).await.unwrap();
        tx.send(measurement(1, 10.0)).await.unwrap();
        tx.send(measurement(4, 30.0)).await.unwrap();
        drop(tx);

        let stats = feed.join().await;
        assert_eq!(stats.received, 3);
        assert_eq!(stats.applied, 2);

        let router = dashboard.read().await;
        let best = router.state().unwrap().tracker().best().unwrap();
        assert_eq!(best.value, Some(30.0));
    }

    #[tokio::test]
    async fn detach_stops_mutation_but_keeps_state() {
        let (tx, source) = ChannelSource::channel(8);
        let feed = EngineFeed::spawn(EventRouter::default(), source);
        let dashboard = feed.dashboard();
        let mut changes = feed.subscribe();

        tx.send(description()).await.unwrap();
        tx.send(measurement(2, 12.0)).await.unwrap();
        changes.wait_for(|version| *version >= 2).await.unwrap();

        feed.detach();
        feed.join().await;

        // the source was dropped with the task
        assert!(tx.send(measurement(4, 99.0)).await.is_err());

        let router = dashboard.read().await;
        let state = router.state().unwrap();
        assert_eq!(state.measurements().len(), 1);
        assert_eq!(state.tracker().best().unwrap().value, Some(12.0));
    }
}
