//! In-memory execution table and the per-execution driver loop.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::computation::{Computation, Outcome, RunContext, StageReporter};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::execution::{ExecutionRecord, ExecutionStatus};
use crate::hub::EventHub;

struct Entry {
    record: ExecutionRecord,
    computation: Arc<dyn Computation>,
    driver: Option<JoinHandle<()>>,
}

struct RegistryInner {
    entries: RwLock<HashMap<String, Entry>>,
    hub: EventHub,
    next_id: AtomicU64,
}

/// Single source of truth for all in-flight and historical executions.
///
/// Each execution is driven on its own task; record mutations are
/// serialized through one table-level reader/writer lock. Cheap to clone;
/// all clones share the same table.
#[derive(Clone)]
pub struct ExecutionRegistry {
    inner: Arc<RegistryInner>,
}

impl ExecutionRegistry {
    pub fn new(hub: EventHub) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: RwLock::new(HashMap::new()),
                hub,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// The hub this registry publishes lifecycle events to.
    pub fn hub(&self) -> &EventHub {
        &self.inner.hub
    }

    /// Allocate a fresh execution in `running` status and publish
    /// `execution_started`. The computation is stored but not started;
    /// call [`run`](ExecutionRegistry::run) to drive it.
    pub async fn create(
        &self,
        computation: Arc<dyn Computation>,
        checkpoint_key: impl Into<String>,
        input: Value,
    ) -> ExecutionRecord {
        let id = format!("exec-{}", self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let record = ExecutionRecord::new(id.clone(), checkpoint_key, input);

        let mut entries = self.inner.entries.write().await;
        entries.insert(
            id.clone(),
            Entry {
                record: record.clone(),
                computation,
                driver: None,
            },
        );
        self.inner.hub.publish(Event::execution_started(&record));
        drop(entries);

        info!(execution_id = %id, checkpoint_key = %record.checkpoint_key, "execution created");
        record
    }

    /// Start, or re-start after an interrupt, the asynchronous driver for
    /// an execution.
    ///
    /// On a fresh `running` record this launches the first run; on an
    /// `interrupted` record it transitions back to `running` and re-drives
    /// with the resume flag set. Any other status is rejected.
    pub async fn run(&self, id: &str) -> Result<ExecutionRecord> {
        let mut entries = self.inner.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        let resuming = match entry.record.status {
            ExecutionStatus::Running => {
                let in_flight = entry
                    .driver
                    .as_ref()
                    .map_or(false, |driver| !driver.is_finished());
                if in_flight {
                    return Err(CoreError::NotInterrupted {
                        id: id.to_string(),
                        status: ExecutionStatus::Running,
                    });
                }
                entry.record.mark_started();
                false
            }
            ExecutionStatus::Interrupted => {
                entry.record.mark_resumed()?;
                true
            }
            status => {
                return Err(CoreError::NotInterrupted {
                    id: id.to_string(),
                    status,
                })
            }
        };

        let record = entry.record.clone();
        if resuming {
            self.inner.hub.publish(Event::state_update(
                id,
                ExecutionStatus::Running,
                record.current_stage.as_deref(),
            ));
        }
        // The driver is spawned while the table lock is held, so its first
        // read cannot observe the entry without the handle in place.
        entry.driver = Some(spawn_driver(
            Arc::clone(&self.inner),
            entry.computation.clone(),
            id.to_string(),
            resuming,
        ));
        drop(entries);

        debug!(execution_id = %id, resuming, "driver launched");
        Ok(record)
    }

    /// Snapshot copy of one record; `None` if the id is unknown.
    pub async fn get(&self, id: &str) -> Option<ExecutionRecord> {
        self.inner
            .entries
            .read()
            .await
            .get(id)
            .map(|entry| entry.record.clone())
    }

    /// Snapshot copies of all records, newest first.
    pub async fn list(&self) -> Vec<ExecutionRecord> {
        let entries = self.inner.entries.read().await;
        let mut records: Vec<ExecutionRecord> = entries
            .values()
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    /// Remove an execution, aborting its driver task if one is in flight.
    /// Durable files under the record's checkpoint key are not touched.
    pub async fn delete(&self, id: &str) -> Result<ExecutionRecord> {
        let removed = self.inner.entries.write().await.remove(id);
        match removed {
            Some(entry) => {
                if let Some(driver) = entry.driver {
                    driver.abort();
                }
                info!(execution_id = %id, "execution deleted");
                Ok(entry.record)
            }
            None => Err(CoreError::NotFound(id.to_string())),
        }
    }

    /// Overwrite the arguments of the last pending tool call in the
    /// record's in-memory snapshot and return the updated record. The
    /// durable checkpoint is not touched here.
    pub async fn update_tool_arguments(
        &self,
        id: &str,
        new_args: &str,
    ) -> Result<ExecutionRecord> {
        let mut entries = self.inner.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        entry.record.update_tool_arguments(new_args)?;
        info!(execution_id = %id, "pending tool arguments updated");
        Ok(entry.record.clone())
    }
}

fn spawn_driver(
    inner: Arc<RegistryInner>,
    computation: Arc<dyn Computation>,
    id: String,
    resuming: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        drive(inner, computation, id, resuming).await;
    })
}

/// Runs one computation to its next outcome and applies it to the record.
///
/// A panic inside the computation is contained here and recorded as an
/// `error` outcome; the registry and every other driver stay unaffected.
async fn drive(
    inner: Arc<RegistryInner>,
    computation: Arc<dyn Computation>,
    id: String,
    resuming: bool,
) {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let ctx = {
        let entries = inner.entries.read().await;
        let entry = match entries.get(&id) {
            Some(entry) => entry,
            // Deleted before the driver got scheduled.
            None => return,
        };
        RunContext {
            execution_id: id.clone(),
            checkpoint_key: entry.record.checkpoint_key.clone(),
            input: entry.record.input.clone(),
            resuming,
            progress: StageReporter::attached(progress_tx),
        }
    };

    let run = AssertUnwindSafe(computation.run(ctx)).catch_unwind();
    tokio::pin!(run);

    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            Some(stage) = progress_rx.recv() => {
                record_progress(&inner, &id, &stage).await;
            }
        }
    };
    // Stages reported just before the computation returned may still be
    // queued; apply them before the final transition.
    while let Ok(stage) = progress_rx.try_recv() {
        record_progress(&inner, &id, &stage).await;
    }

    match outcome {
        Ok(Ok(Outcome::Completed { result })) => complete(&inner, &id, result).await,
        Ok(Ok(Outcome::Interrupted { stage, snapshot })) => {
            interrupt(&inner, &id, &stage, snapshot).await
        }
        Ok(Err(failure)) => fail(&inner, &id, format!("{:#}", failure)).await,
        Err(panic) => fail(&inner, &id, panic_detail(panic)).await,
    }
}

fn panic_detail(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("computation panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("computation panicked: {}", message)
    } else {
        "computation panicked".to_string()
    }
}

async fn record_progress(inner: &Arc<RegistryInner>, id: &str, stage: &str) {
    let mut entries = inner.entries.write().await;
    let entry = match entries.get_mut(id) {
        Some(entry) => entry,
        None => return,
    };
    entry.record.record_stage(stage);
    // Published under the table lock so events reach the hub in
    // record-mutation order.
    let event = Event::state_update(id, entry.record.status, Some(stage));
    inner.hub.publish(event);
}

async fn complete(inner: &Arc<RegistryInner>, id: &str, result: String) {
    let mut entries = inner.entries.write().await;
    let entry = match entries.get_mut(id) {
        Some(entry) => entry,
        None => return,
    };
    if let Err(rejected) = entry.record.mark_completed(result.clone()) {
        error!(execution_id = %id, error = %rejected, "completed outcome rejected");
        return;
    }
    inner.hub.publish(Event::execution_completed(id, &result));
    drop(entries);
    info!(execution_id = %id, "execution completed");
}

async fn interrupt(inner: &Arc<RegistryInner>, id: &str, stage: &str, snapshot: Value) {
    let mut entries = inner.entries.write().await;
    let entry = match entries.get_mut(id) {
        Some(entry) => entry,
        None => return,
    };
    if let Err(rejected) = entry.record.mark_interrupted(stage, snapshot) {
        error!(execution_id = %id, error = %rejected, "interrupt outcome rejected");
        return;
    }
    inner
        .hub
        .publish(Event::state_update(id, ExecutionStatus::Interrupted, Some(stage)));
    drop(entries);
    info!(execution_id = %id, stage = %stage, "execution interrupted");
}

async fn fail(inner: &Arc<RegistryInner>, id: &str, detail: String) {
    let mut entries = inner.entries.write().await;
    let entry = match entries.get_mut(id) {
        Some(entry) => entry,
        None => return,
    };
    if let Err(rejected) = entry.record.mark_error(detail.clone()) {
        error!(execution_id = %id, error = %rejected, "error outcome rejected");
        return;
    }
    inner.hub.publish(Event::error(id, &detail));
    drop(entries);
    error!(execution_id = %id, error = %detail, "execution failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct Completing;

    #[async_trait]
    impl Computation for Completing {
        async fn run(&self, _ctx: RunContext) -> anyhow::Result<Outcome> {
            Ok(Outcome::Completed {
                result: "done".to_string(),
            })
        }
    }

    struct InterruptOnce;

    #[async_trait]
    impl Computation for InterruptOnce {
        async fn run(&self, ctx: RunContext) -> anyhow::Result<Outcome> {
            if ctx.resuming {
                return Ok(Outcome::Completed {
                    result: "booked".to_string(),
                });
            }
            ctx.progress.stage("compose");
            Ok(Outcome::Interrupted {
                stage: "confirm".to_string(),
                snapshot: json!({
                    "message_history": [
                        {
                            "role": "assistant",
                            "tool_calls": [
                                {"id": "call-1", "name": "BookTicket", "arguments": "{\"location\":\"Beijing\"}"}
                            ]
                        }
                    ]
                }),
            })
        }
    }

    struct Panicking;

    #[async_trait]
    impl Computation for Panicking {
        async fn run(&self, _ctx: RunContext) -> anyhow::Result<Outcome> {
            panic!("boom");
        }
    }

    struct Failing;

    #[async_trait]
    impl Computation for Failing {
        async fn run(&self, _ctx: RunContext) -> anyhow::Result<Outcome> {
            Err(anyhow::anyhow!("engine offline"))
        }
    }

    struct Hanging;

    #[async_trait]
    impl Computation for Hanging {
        async fn run(&self, _ctx: RunContext) -> anyhow::Result<Outcome> {
            futures::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn registry() -> ExecutionRegistry {
        ExecutionRegistry::new(EventHub::new())
    }

    async fn wait_for_status(
        registry: &ExecutionRegistry,
        id: &str,
        status: ExecutionStatus,
    ) -> ExecutionRecord {
        for _ in 0..200 {
            if let Some(record) = registry.get(id).await {
                if record.status == status {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("execution {} never reached {}", id, status);
    }

    #[tokio::test]
    async fn run_to_completion_records_the_result() {
        let registry = registry();
        let record = registry
            .create(Arc::new(Completing), "key-1", json!({}))
            .await;
        registry.run(&record.id).await.unwrap();

        let finished = wait_for_status(&registry, &record.id, ExecutionStatus::Completed).await;
        assert_eq!(finished.result.as_deref(), Some("done"));
        assert!(finished.error.is_none());
        assert!(finished.snapshot.is_none());
    }

    #[tokio::test]
    async fn interrupt_then_resume_reaches_completed() {
        let registry = registry();
        let record = registry
            .create(Arc::new(InterruptOnce), "key-1", json!({}))
            .await;
        registry.run(&record.id).await.unwrap();

        let paused = wait_for_status(&registry, &record.id, ExecutionStatus::Interrupted).await;
        assert_eq!(paused.current_stage.as_deref(), Some("confirm"));
        assert!(paused.snapshot.is_some());
        assert_eq!(paused.pending_tool_calls().len(), 1);

        registry.run(&record.id).await.unwrap();
        let finished = wait_for_status(&registry, &record.id, ExecutionStatus::Completed).await;
        assert_eq!(finished.result.as_deref(), Some("booked"));
        assert!(finished.snapshot.is_none());
    }

    #[tokio::test]
    async fn run_is_rejected_unless_startable() {
        let registry = registry();

        let record = registry.create(Arc::new(Hanging), "key-1", json!({})).await;
        registry.run(&record.id).await.unwrap();
        let err = registry.run(&record.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotInterrupted { .. }));

        let done = registry
            .create(Arc::new(Completing), "key-2", json!({}))
            .await;
        registry.run(&done.id).await.unwrap();
        wait_for_status(&registry, &done.id, ExecutionStatus::Completed).await;
        let err = registry.run(&done.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotInterrupted {
                status: ExecutionStatus::Completed,
                ..
            }
        ));

        let err = registry.run("exec-999").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn panic_is_contained_and_recorded() {
        let registry = registry();
        let record = registry
            .create(Arc::new(Panicking), "key-1", json!({}))
            .await;
        registry.run(&record.id).await.unwrap();

        let failed = wait_for_status(&registry, &record.id, ExecutionStatus::Error).await;
        let detail = failed.error.unwrap();
        assert!(detail.contains("panicked"), "unexpected detail: {}", detail);
        assert!(detail.contains("boom"), "unexpected detail: {}", detail);

        // The registry keeps working after the contained panic.
        let next = registry
            .create(Arc::new(Completing), "key-2", json!({}))
            .await;
        registry.run(&next.id).await.unwrap();
        wait_for_status(&registry, &next.id, ExecutionStatus::Completed).await;
    }

    #[tokio::test]
    async fn failure_is_recorded_and_never_retried() {
        let registry = registry();
        let record = registry.create(Arc::new(Failing), "key-1", json!({})).await;
        registry.run(&record.id).await.unwrap();

        let failed = wait_for_status(&registry, &record.id, ExecutionStatus::Error).await;
        assert_eq!(failed.error.as_deref(), Some("engine offline"));

        // Error is absorbing; re-driving requires nothing less than an
        // explicit interrupted status, which this record will never regain.
        let err = registry.run(&record.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotInterrupted { .. }));
    }

    #[tokio::test]
    async fn delete_aborts_the_inflight_driver() {
        let registry = registry();
        let record = registry.create(Arc::new(Hanging), "key-1", json!({})).await;
        registry.run(&record.id).await.unwrap();

        let deleted = registry.delete(&record.id).await.unwrap();
        assert_eq!(deleted.id, record.id);
        assert!(registry.get(&record.id).await.is_none());

        let err = registry.delete(&record.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_tool_arguments_is_visible_through_get() {
        let registry = registry();
        let record = registry
            .create(Arc::new(InterruptOnce), "key-1", json!({}))
            .await;
        registry.run(&record.id).await.unwrap();
        wait_for_status(&registry, &record.id, ExecutionStatus::Interrupted).await;

        registry
            .update_tool_arguments(&record.id, "{\"location\":\"Shanghai\"}")
            .await
            .unwrap();

        let updated = registry.get(&record.id).await.unwrap();
        let pending = updated.pending_tool_calls();
        assert_eq!(pending[0].arguments, "{\"location\":\"Shanghai\"}");
    }

    #[tokio::test]
    async fn update_tool_arguments_requires_a_snapshot() {
        let registry = registry();
        let record = registry.create(Arc::new(Hanging), "key-1", json!({})).await;
        registry.run(&record.id).await.unwrap();

        let err = registry
            .update_tool_arguments(&record.id, "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSnapshot(_)));
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let registry = registry();
        let first = registry
            .create(Arc::new(Completing), "key-1", json!({}))
            .await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = registry
            .create(Arc::new(Completing), "key-2", json!({}))
            .await;

        let records = registry.list().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second.id);
        assert_eq!(records[1].id, first.id);
    }

    #[tokio::test]
    async fn lifecycle_events_reach_subscribers_in_order() {
        let hub = EventHub::new();
        let registry = ExecutionRegistry::new(hub.clone());
        let record = registry
            .create(Arc::new(InterruptOnce), "key-1", json!({}))
            .await;
        let mut subscription = hub.subscribe(&record.id);

        registry.run(&record.id).await.unwrap();

        let progress = subscription.recv().await.unwrap();
        assert_eq!(progress.kind, EventKind::StateUpdate);
        assert_eq!(progress.payload["current_stage"], "compose");

        let paused = subscription.recv().await.unwrap();
        assert_eq!(paused.kind, EventKind::StateUpdate);
        assert_eq!(paused.payload["status"], "interrupted");

        registry.run(&record.id).await.unwrap();
        let resumed = subscription.recv().await.unwrap();
        assert_eq!(resumed.payload["status"], "running");

        let finished = subscription.recv().await.unwrap();
        assert_eq!(finished.kind, EventKind::ExecutionCompleted);
        assert_eq!(finished.payload["result"], "booked");
    }
}
