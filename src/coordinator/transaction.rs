//! Two-phase commit coordination across the worker replicas
//!
//! Every client command is broadcast to all workers in three steps:
//!
//! 1. PREPARE on every worker. The transaction proceeds only if every
//!    single reply is exactly `PREPARED`; any other reply or any failed
//!    call aborts it.
//! 2. COMMIT on every worker. Replies are deduplicated (first seen wins)
//!    and joined with newlines. A failed call becomes an error line in the
//!    aggregate instead of failing the transaction.
//! 3. Otherwise ROLLBACK on every worker. Failures are logged and dropped,
//!    and the client gets [`PREPARE_FAILED`].
//!
//! Each phase fans out one task per worker and waits for all of them
//! before moving on. All tasks of all in-flight transactions share one
//! dispatch semaphore, which bounds the outbound calls in progress.
//!
//! Concurrent commands are not isolated from each other: two PUTs to the
//! same key may be applied in different orders on different replicas.

use crate::common::command::{PREPARED, PREPARE_FAILED, ROLLBACK_SUCCESS};
use crate::common::{generate_transaction_id, Command, CoordinatorMetrics, Error, Phase, Result};
use crate::coordinator::node::{invoke, WorkerNode};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::Instrument;

tokio::task_local! {
    /// Id of the transaction the current worker call belongs to
    pub static TRANSACTION_ID: String;
}

/// Prefix of the aggregate line reported for a failed commit call
pub const COMMIT_ERROR_PREFIX: &str = "Error committing on worker node: ";

pub struct TransactionCoordinator {
    workers: Vec<Arc<dyn WorkerNode>>,
    dispatch: Arc<Semaphore>,
    call_timeout: Option<Duration>,
    metrics: Arc<CoordinatorMetrics>,
}

impl TransactionCoordinator {
    /// Coordinator over a fixed set of workers with `pool_size` concurrent
    /// outbound calls
    pub fn new(workers: Vec<Arc<dyn WorkerNode>>, pool_size: usize) -> Self {
        Self {
            workers,
            dispatch: Arc::new(Semaphore::new(pool_size.max(1))),
            call_timeout: None,
            metrics: Arc::new(CoordinatorMetrics::new()),
        }
    }

    /// Bound every worker call. An expired call counts as a failed call.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn workers(&self) -> &[Arc<dyn WorkerNode>] {
        &self.workers
    }

    pub fn metrics(&self) -> &Arc<CoordinatorMetrics> {
        &self.metrics
    }

    /// Run the full protocol for one command. Never fails: every outcome,
    /// including worker failures, is described by the returned string.
    pub async fn handle_command(&self, command: Command) -> String {
        self.handle_command_with_id(command, generate_transaction_id())
            .await
    }

    /// Same as [`handle_command`](Self::handle_command) under a caller-chosen
    /// transaction id (forwarded to the workers for log correlation)
    pub async fn handle_command_with_id(&self, command: Command, txn_id: String) -> String {
        let span = tracing::info_span!("transaction", txn = %txn_id, command = %command);
        async {
            let start = Instant::now();
            self.metrics.transactions.inc();
            self.metrics.in_flight.inc();

            let result = if self.prepare(&command, &txn_id).await {
                self.metrics.committed.inc();
                self.commit(&command, &txn_id).await
            } else {
                self.metrics.aborted.inc();
                self.rollback(&command, &txn_id).await;
                PREPARE_FAILED.to_string()
            };

            self.metrics.in_flight.dec();
            self.metrics.observe_duration(start.elapsed());
            tracing::info!(duration_ms = %start.elapsed().as_millis(), "Transaction finished");
            result
        }
        .instrument(span)
        .await
    }

    async fn prepare(&self, command: &Command, txn_id: &str) -> bool {
        let mut prepared = true;
        for (worker, outcome) in self.fan_out(Phase::Prepare, command, txn_id).await {
            match outcome {
                Ok(reply) if reply == PREPARED => {}
                Ok(reply) => {
                    tracing::warn!(worker = %worker, reply = %reply, "Worker did not prepare");
                    prepared = false;
                }
                Err(e) => {
                    tracing::warn!(
                        worker = %worker,
                        transport = e.is_transport(),
                        "Prepare call failed: {}",
                        e
                    );
                    prepared = false;
                }
            }
        }
        tracing::debug!(prepared, "Prepare phase done");
        prepared
    }

    async fn commit(&self, command: &Command, txn_id: &str) -> String {
        let replies = self
            .fan_out(Phase::Commit, command, txn_id)
            .await
            .into_iter()
            .map(|(worker, outcome)| {
                outcome.map_err(|e| {
                    self.metrics.commit_errors.inc();
                    tracing::error!(worker = %worker, "Commit call failed: {}", e);
                    e
                })
            });
        aggregate_replies(replies)
    }

    async fn rollback(&self, command: &Command, txn_id: &str) {
        for (worker, outcome) in self.fan_out(Phase::Rollback, command, txn_id).await {
            match outcome {
                Ok(reply) if reply == ROLLBACK_SUCCESS => {}
                Ok(reply) => {
                    tracing::warn!(worker = %worker, reply = %reply, "Unexpected rollback reply");
                }
                Err(e) => {
                    self.metrics.rollback_errors.inc();
                    tracing::error!(
                        worker = %worker,
                        "Error while performing rollback on worker node: {}",
                        e
                    );
                }
            }
        }
    }

    /// Call `phase` on every worker concurrently and wait for all calls.
    /// Outcomes come back in worker order, labelled with the worker id.
    async fn fan_out(
        &self,
        phase: Phase,
        command: &Command,
        txn_id: &str,
    ) -> Vec<(String, Result<String>)> {
        let tasks = self.workers.iter().map(|worker| {
            let worker = worker.clone();
            let dispatch = self.dispatch.clone();
            let command = command.clone();
            let call_timeout = self.call_timeout;

            let call = async move {
                let _permit = dispatch
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::PoolClosed)?;
                let call = invoke(worker.as_ref(), phase, &command);
                match call_timeout {
                    Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                        Error::Timeout(format!("{} {} after {:?}", worker.id(), phase, limit))
                    })?,
                    None => call.await,
                }
            };
            tokio::spawn(TRANSACTION_ID.scope(txn_id.to_string(), call.in_current_span()))
        });

        let outcomes = join_all(tasks).await;

        self.workers
            .iter()
            .zip(outcomes)
            .map(|(worker, joined)| {
                let outcome = joined.map_err(Error::from).and_then(|res| res);
                (worker.id().to_string(), outcome)
            })
            .collect()
    }
}

/// Fold per-worker commit outcomes into the client-visible result.
///
/// Failed calls become `Error committing on worker node: <cause>` lines.
/// Lines are deduplicated by exact equality keeping first-seen order, then
/// joined with newlines; trailing whitespace is trimmed.
pub fn aggregate_replies<I>(replies: I) -> String
where
    I: IntoIterator<Item = Result<String>>,
{
    let mut lines: Vec<String> = Vec::new();
    for reply in replies {
        let line = match reply {
            Ok(line) => line,
            Err(e) => format!("{}{}", COMMIT_ERROR_PREFIX, e),
        };
        if !lines.contains(&line) {
            lines.push(line);
        }
    }
    lines.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Behavior {
        Reply(&'static str),
        Fail,
        Panic,
        Hang,
    }

    struct FakeWorker {
        id: String,
        prepare: Behavior,
        commit: Behavior,
        rollback: Behavior,
        calls: Mutex<Vec<Phase>>,
    }

    impl FakeWorker {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                prepare: Behavior::Reply("PREPARED"),
                commit: Behavior::Reply("PUT_SUCCESS"),
                rollback: Behavior::Reply("ROLLBACK_SUCCESS"),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn prepare(mut self, behavior: Behavior) -> Self {
            self.prepare = behavior;
            self
        }

        fn commit(mut self, behavior: Behavior) -> Self {
            self.commit = behavior;
            self
        }

        fn rollback(mut self, behavior: Behavior) -> Self {
            self.rollback = behavior;
            self
        }

        fn calls(&self) -> Vec<Phase> {
            self.calls.lock().unwrap().clone()
        }

        async fn act(&self, phase: Phase, behavior: &Behavior) -> Result<String> {
            self.calls.lock().unwrap().push(phase);
            match behavior {
                Behavior::Reply(reply) => Ok(reply.to_string()),
                Behavior::Fail => Err(Error::ConnectionFailed(format!("{} unreachable", self.id))),
                Behavior::Panic => panic!("worker task blew up"),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    #[async_trait]
    impl WorkerNode for FakeWorker {
        fn id(&self) -> &str {
            &self.id
        }

        async fn prepare_command(&self, _command: &Command) -> Result<String> {
            self.act(Phase::Prepare, &self.prepare).await
        }

        async fn commit_command(&self, _command: &Command) -> Result<String> {
            self.act(Phase::Commit, &self.commit).await
        }

        async fn rollback_command(&self, _command: &Command) -> Result<String> {
            self.act(Phase::Rollback, &self.rollback).await
        }
    }

    fn coordinator(workers: &[Arc<FakeWorker>]) -> TransactionCoordinator {
        let nodes = workers
            .iter()
            .map(|w| w.clone() as Arc<dyn WorkerNode>)
            .collect();
        TransactionCoordinator::new(nodes, 5)
    }

    #[tokio::test]
    async fn test_unanimous_prepare_commits_and_dedups() {
        let workers: Vec<_> = (0..3)
            .map(|i| Arc::new(FakeWorker::new(&format!("w{}", i))))
            .collect();
        let coord = coordinator(&workers);

        let result = coord.handle_command(Command::put("x", "1")).await;

        assert_eq!(result, "PUT_SUCCESS");
        for w in &workers {
            assert_eq!(w.calls(), vec![Phase::Prepare, Phase::Commit]);
        }
        assert_eq!(coord.metrics().committed.get(), 1);
        assert_eq!(coord.metrics().aborted.get(), 0);
        assert_eq!(coord.metrics().in_flight.get(), 0);
    }

    #[tokio::test]
    async fn test_negative_prepare_reply_rolls_back_everyone() {
        let workers = vec![
            Arc::new(FakeWorker::new("w0")),
            Arc::new(FakeWorker::new("w1").prepare(Behavior::Reply("BUSY"))),
            Arc::new(FakeWorker::new("w2")),
        ];
        let coord = coordinator(&workers);

        let result = coord.handle_command(Command::put("x", "1")).await;

        assert_eq!(result, "Operation failed during preparation.");
        for w in &workers {
            assert_eq!(w.calls(), vec![Phase::Prepare, Phase::Rollback]);
        }
        assert_eq!(coord.metrics().aborted.get(), 1);
    }

    #[tokio::test]
    async fn test_prepare_transport_error_aborts() {
        let workers = vec![
            Arc::new(FakeWorker::new("w0")),
            Arc::new(FakeWorker::new("w1")),
            Arc::new(FakeWorker::new("w2").prepare(Behavior::Fail)),
        ];
        let coord = coordinator(&workers);

        let result = coord.handle_command(Command::get("x")).await;

        assert_eq!(result, PREPARE_FAILED);
        for w in &workers {
            assert!(w.calls().contains(&Phase::Rollback));
            assert!(!w.calls().contains(&Phase::Commit));
        }
    }

    #[tokio::test]
    async fn test_prepare_task_panic_aborts() {
        let workers = vec![
            Arc::new(FakeWorker::new("w0").prepare(Behavior::Panic)),
            Arc::new(FakeWorker::new("w1")),
        ];
        let coord = coordinator(&workers);

        assert_eq!(coord.handle_command(Command::get("x")).await, PREPARE_FAILED);
        assert_eq!(workers[1].calls(), vec![Phase::Prepare, Phase::Rollback]);
    }

    #[tokio::test]
    async fn test_prepare_timeout_aborts() {
        let workers = vec![
            Arc::new(FakeWorker::new("w0")),
            Arc::new(FakeWorker::new("w1").prepare(Behavior::Hang)),
        ];
        let coord =
            coordinator(&workers).with_call_timeout(Some(Duration::from_millis(50)));

        assert_eq!(coord.handle_command(Command::get("x")).await, PREPARE_FAILED);
        for w in &workers {
            assert_eq!(w.calls(), vec![Phase::Prepare, Phase::Rollback]);
        }
    }

    #[tokio::test]
    async fn test_rollback_errors_are_swallowed() {
        let workers = vec![
            Arc::new(FakeWorker::new("w0").prepare(Behavior::Fail)),
            Arc::new(FakeWorker::new("w1").rollback(Behavior::Fail)),
            Arc::new(FakeWorker::new("w2").rollback(Behavior::Panic)),
        ];
        let coord = coordinator(&workers);

        assert_eq!(coord.handle_command(Command::delete("x")).await, PREPARE_FAILED);
        assert_eq!(coord.metrics().rollback_errors.get(), 2);
    }

    #[tokio::test]
    async fn test_commit_error_becomes_aggregate_line() {
        let workers = vec![
            Arc::new(FakeWorker::new("w0")),
            Arc::new(FakeWorker::new("w1").commit(Behavior::Fail)),
            Arc::new(FakeWorker::new("w2")),
        ];
        let coord = coordinator(&workers);

        let result = coord.handle_command(Command::put("x", "1")).await;

        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "PUT_SUCCESS");
        assert!(lines[1].starts_with("Error committing on worker node: "));
        assert!(lines[1].contains("w1 unreachable"));
        assert_eq!(coord.metrics().commit_errors.get(), 1);
        assert_eq!(coord.metrics().committed.get(), 1);
    }

    #[tokio::test]
    async fn test_commit_task_panic_becomes_aggregate_line() {
        let workers = vec![
            Arc::new(FakeWorker::new("w0")),
            Arc::new(FakeWorker::new("w1").commit(Behavior::Panic)),
            Arc::new(FakeWorker::new("w2")),
        ];
        let coord = coordinator(&workers);

        let result = coord.handle_command(Command::put("x", "1")).await;

        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "PUT_SUCCESS");
        assert!(lines[1].starts_with("Error committing on worker node: Task failed"));
        for w in &workers {
            assert_eq!(w.calls(), vec![Phase::Prepare, Phase::Commit]);
        }
        assert_eq!(coord.metrics().commit_errors.get(), 1);
        assert_eq!(coord.metrics().aborted.get(), 0);
    }

    #[tokio::test]
    async fn test_commit_keeps_distinct_replies_in_order() {
        let workers = vec![
            Arc::new(FakeWorker::new("w0").commit(Behavior::Reply("1"))),
            Arc::new(FakeWorker::new("w1").commit(Behavior::Reply("KEY_NOT_FOUND"))),
            Arc::new(FakeWorker::new("w2").commit(Behavior::Reply("1"))),
        ];
        let coord = coordinator(&workers);

        assert_eq!(
            coord.handle_command(Command::get("x")).await,
            "1\nKEY_NOT_FOUND"
        );
    }

    #[tokio::test]
    async fn test_dispatch_pool_bounds_concurrent_calls() {
        struct Slow {
            id: String,
            current: Arc<AtomicUsize>,
            peak: Arc<AtomicUsize>,
        }

        impl Slow {
            async fn work(&self, reply: &str) -> Result<String> {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                Ok(reply.to_string())
            }
        }

        #[async_trait]
        impl WorkerNode for Slow {
            fn id(&self) -> &str {
                &self.id
            }
            async fn prepare_command(&self, _c: &Command) -> Result<String> {
                self.work("PREPARED").await
            }
            async fn commit_command(&self, _c: &Command) -> Result<String> {
                self.work("PUT_SUCCESS").await
            }
            async fn rollback_command(&self, _c: &Command) -> Result<String> {
                self.work("ROLLBACK_SUCCESS").await
            }
        }

        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let workers: Vec<Arc<dyn WorkerNode>> = (0..4)
            .map(|i| {
                Arc::new(Slow {
                    id: format!("w{}", i),
                    current: current.clone(),
                    peak: peak.clone(),
                }) as Arc<dyn WorkerNode>
            })
            .collect();
        let coord = Arc::new(TransactionCoordinator::new(workers, 2));

        let clients: Vec<_> = (0..3)
            .map(|i| {
                let coord = coord.clone();
                tokio::spawn(async move {
                    coord
                        .handle_command(Command::put(format!("k{}", i), "v"))
                        .await
                })
            })
            .collect();
        for c in clients {
            assert_eq!(c.await.unwrap(), "PUT_SUCCESS");
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(coord.metrics().transactions.get(), 3);
    }

    #[tokio::test]
    async fn test_transaction_id_reaches_worker_calls() {
        struct Probe {
            seen: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl WorkerNode for Probe {
            fn id(&self) -> &str {
                "probe"
            }
            async fn prepare_command(&self, _c: &Command) -> Result<String> {
                let id = TRANSACTION_ID.try_with(|id| id.clone()).unwrap_or_default();
                self.seen.lock().unwrap().push(id);
                Ok(PREPARED.to_string())
            }
            async fn commit_command(&self, _c: &Command) -> Result<String> {
                let id = TRANSACTION_ID.try_with(|id| id.clone()).unwrap_or_default();
                self.seen.lock().unwrap().push(id);
                Ok("ok".to_string())
            }
            async fn rollback_command(&self, _c: &Command) -> Result<String> {
                Ok(ROLLBACK_SUCCESS.to_string())
            }
        }

        let probe = Arc::new(Probe {
            seen: Mutex::new(Vec::new()),
        });
        let coord = TransactionCoordinator::new(vec![probe.clone() as Arc<dyn WorkerNode>], 5);

        coord
            .handle_command_with_id(Command::get("k"), "txn-7".to_string())
            .await;
        assert_eq!(*probe.seen.lock().unwrap(), vec!["txn-7", "txn-7"]);
    }

    #[tokio::test]
    async fn test_no_workers_commits_nothing() {
        let coord = TransactionCoordinator::new(Vec::new(), 5);
        assert_eq!(coord.handle_command(Command::put("x", "1")).await, "");
    }

    #[test]
    fn test_aggregate_replies() {
        let replies = vec![
            Ok("PUT_SUCCESS".to_string()),
            Ok("PUT_SUCCESS".to_string()),
            Err(Error::Timeout("w2 COMMIT after 1s".into())),
            Ok("PUT_SUCCESS".to_string()),
        ];
        assert_eq!(
            aggregate_replies(replies),
            "PUT_SUCCESS\nError committing on worker node: Operation timeout: w2 COMMIT after 1s"
        );
    }

    #[test]
    fn test_aggregate_replies_trims_trailing_whitespace() {
        let replies = vec![Ok("value  \n".to_string())];
        assert_eq!(aggregate_replies(replies), "value");
        assert_eq!(aggregate_replies(Vec::new()), "");
    }

    #[test]
    fn test_aggregate_dedup_is_exact() {
        let replies = vec![Ok("1".to_string()), Ok("11".to_string()), Ok("1".to_string())];
        assert_eq!(aggregate_replies(replies), "1\n11");
    }
}
