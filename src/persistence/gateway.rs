//! Persistence gateway.
//!
//! Keeps the durable store in step with the registry without blocking edits.
//! Callers enqueue writes with [`PersistenceGateway::save_all`] and carry on;
//! a single writer task applies them in the background.
//!
//! Ordering: the writer drains everything queued into one batch in which a
//! later write for an id replaces an earlier, still pending one. Batches are
//! applied one at a time, so writes for the same id reach the store in the
//! order they were issued. A write that is already running always finishes
//! before anything queued after it, which is what lets a storyboard close
//! while its last write is in flight.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::error::{Result, StoryboardError};
use crate::persistence::durable::{DurableStore, RecordDraft, StoredStoryboard};
use crate::state::{Storyboard, StoryboardId};

/// A write the durable store could not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub id: StoryboardId,
    pub reason: String,
}

impl WriteFailure {
    pub fn to_error(&self) -> StoryboardError {
        StoryboardError::PersistenceWriteFailed {
            id: self.id,
            reason: self.reason.clone(),
        }
    }
}

/// Outcome of the batch a flush waited for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub deleted: usize,
    /// Writes that failed and will be retried with the next batch.
    pub failures: Vec<WriteFailure>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Latest state of the writer, for non-blocking warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistenceStatus {
    pub last_flush: Option<DateTime<Utc>>,
    /// Writes currently waiting for a retry.
    pub failures: Vec<WriteFailure>,
}

#[derive(Debug, Clone)]
enum WriteOp {
    Put(RecordDraft),
    Delete,
}

#[derive(Debug)]
enum WriteCommand {
    Put(RecordDraft),
    Forget(StoryboardId),
    Flush(oneshot::Sender<FlushReport>),
}

/// Writes waiting to be applied, at most one per id.
#[derive(Debug, Default)]
struct PendingWrites {
    order: Vec<StoryboardId>,
    ops: HashMap<StoryboardId, WriteOp>,
    waiters: Vec<oneshot::Sender<FlushReport>>,
}

impl PendingWrites {
    fn push(&mut self, command: WriteCommand) {
        match command {
            WriteCommand::Put(draft) => self.insert(draft.id, WriteOp::Put(draft)),
            WriteCommand::Forget(id) => self.insert(id, WriteOp::Delete),
            WriteCommand::Flush(waiter) => self.waiters.push(waiter),
        }
    }

    fn insert(&mut self, id: StoryboardId, op: WriteOp) {
        if self.ops.insert(id, op).is_none() {
            self.order.push(id);
        }
    }

    fn take_ops(&mut self) -> Vec<(StoryboardId, WriteOp)> {
        let mut ops = std::mem::take(&mut self.ops);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|id| ops.remove(&id).map(|op| (id, op)))
            .collect()
    }
}

/// Front end of the background writer.
pub struct PersistenceGateway {
    store: Arc<dyn DurableStore>,
    sender: mpsc::UnboundedSender<WriteCommand>,
    status: watch::Receiver<PersistenceStatus>,
    worker: JoinHandle<()>,
}

impl PersistenceGateway {
    /// Start the writer task. Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn DurableStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(PersistenceStatus::default());
        let worker = tokio::spawn(run_writer(Arc::clone(&store), receiver, status_tx));
        Self {
            store,
            sender,
            status,
            worker,
        }
    }

    /// Load every stored storyboard, in tab order, with empty histories.
    pub async fn load_all(&self) -> Result<Vec<Storyboard>> {
        let store = Arc::clone(&self.store);
        let records = tokio::task::spawn_blocking(move || store.load_all())
            .await
            .map_err(|e| StoryboardError::Internal(format!("load task failed: {}", e)))??;
        info!("Loaded {} storyboard(s) from the durable store", records.len());
        Ok(records
            .into_iter()
            .map(StoredStoryboard::into_storyboard)
            .collect())
    }

    /// Queue a write of every open storyboard. Returns immediately; records
    /// are serialized and checksummed by the writer.
    pub fn save_all(&self, storyboards: &[Storyboard]) -> Result<()> {
        for (position, storyboard) in storyboards.iter().enumerate() {
            self.send(WriteCommand::Put(RecordDraft::capture(storyboard, position)))?;
        }
        Ok(())
    }

    /// Queue removal of a closed storyboard's record. A write for it that is
    /// already running finishes first.
    pub fn forget(&self, id: StoryboardId) -> Result<()> {
        self.send(WriteCommand::Forget(id))
    }

    /// Wait until everything queued so far has been applied.
    pub async fn flush(&self) -> Result<FlushReport> {
        let (tx, rx) = oneshot::channel();
        self.send(WriteCommand::Flush(tx))?;
        rx.await
            .map_err(|_| StoryboardError::Internal("persistence writer stopped".to_string()))
    }

    /// Snapshot of the writer's latest status.
    pub fn status(&self) -> PersistenceStatus {
        self.status.borrow().clone()
    }

    /// Receiver that changes after every applied batch.
    pub fn subscribe(&self) -> watch::Receiver<PersistenceStatus> {
        self.status.clone()
    }

    /// Flush, then stop the writer.
    pub async fn shutdown(self) -> Result<FlushReport> {
        let report = self.flush().await?;
        drop(self.sender);
        self.worker
            .await
            .map_err(|e| StoryboardError::Internal(format!("writer task failed: {}", e)))?;
        Ok(report)
    }

    fn send(&self, command: WriteCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| StoryboardError::Internal("persistence writer stopped".to_string()))
    }
}

async fn run_writer(
    store: Arc<dyn DurableStore>,
    mut receiver: mpsc::UnboundedReceiver<WriteCommand>,
    status: watch::Sender<PersistenceStatus>,
) {
    let mut retry = PendingWrites::default();

    while let Some(command) = receiver.recv().await {
        let mut batch = std::mem::take(&mut retry);
        batch.push(command);
        while let Ok(command) = receiver.try_recv() {
            batch.push(command);
        }

        let waiters = std::mem::take(&mut batch.waiters);
        let ops = batch.take_ops();
        debug!("Applying {} pending write(s)", ops.len());

        let (report, failed) = apply_batch(Arc::clone(&store), ops).await;
        for (id, op) in failed {
            retry.insert(id, op);
        }

        status.send_modify(|current| {
            current.last_flush = Some(Utc::now());
            current.failures = report.failures.clone();
        });
        for waiter in waiters {
            // The flusher may have given up waiting; nothing to do then.
            let _ = waiter.send(report.clone());
        }
    }

    debug!("Persistence writer stopped");
}

async fn apply_batch(
    store: Arc<dyn DurableStore>,
    ops: Vec<(StoryboardId, WriteOp)>,
) -> (FlushReport, Vec<(StoryboardId, WriteOp)>) {
    let ids: Vec<StoryboardId> = ops.iter().map(|(id, _)| *id).collect();
    let outcome = tokio::task::spawn_blocking(move || {
        ops.into_iter()
            .map(|(id, op)| {
                let result = match &op {
                    WriteOp::Put(draft) => draft.seal().and_then(|record| store.put(&record)),
                    WriteOp::Delete => store.delete(id),
                };
                (id, op, result)
            })
            .collect::<Vec<_>>()
    })
    .await;

    let mut report = FlushReport::default();
    let mut failed = Vec::new();

    match outcome {
        Ok(results) => {
            for (id, op, result) in results {
                match result {
                    Ok(()) => match op {
                        WriteOp::Put(_) => report.written += 1,
                        WriteOp::Delete => report.deleted += 1,
                    },
                    Err(e) => {
                        warn!("Persisting storyboard {} failed, will retry: {}", id, e);
                        report.failures.push(WriteFailure {
                            id,
                            reason: e.to_string(),
                        });
                        failed.push((id, op));
                    }
                }
            }
        }
        Err(e) => {
            // The ops were lost with the task; the next save re-sends them.
            warn!("Persistence batch aborted: {}", e);
            report.failures = ids
                .into_iter()
                .map(|id| WriteFailure {
                    id,
                    reason: e.to_string(),
                })
                .collect();
        }
    }

    (report, failed)
}
