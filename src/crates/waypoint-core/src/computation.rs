//! Contract between the registry and the computations it drives.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

/// Context handed to a computation for one driver run.
#[derive(Debug)]
pub struct RunContext {
    /// Registry identifier of the execution being driven.
    pub execution_id: String,
    /// Key under which the computation persists its durable state.
    pub checkpoint_key: String,
    /// Immutable initial parameters from the create request.
    pub input: Value,
    /// True when this run follows an explicit resume rather than a create.
    pub resuming: bool,
    /// Progress handle; reported stages are reflected on the execution
    /// record and broadcast to subscribers.
    pub progress: StageReporter,
}

/// Outcome of one driver run, as reported by the computation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The computation ran to completion.
    Completed { result: String },
    /// The computation paused at `stage` and handed back its suspended
    /// state. Its durable checkpoint was already written as a side effect
    /// of the run.
    Interrupted { stage: String, snapshot: Value },
}

/// A long-running, interruptible computation.
///
/// The registry treats implementations as opaque: it drives `run` on a
/// dedicated task and reacts to the reported [`Outcome`]. Checkpoint
/// persistence is the computation's own responsibility.
#[async_trait]
pub trait Computation: Send + Sync {
    async fn run(&self, ctx: RunContext) -> anyhow::Result<Outcome>;
}

/// Handle a computation uses to report the stage it is entering.
#[derive(Debug, Clone)]
pub struct StageReporter {
    sender: Option<mpsc::UnboundedSender<String>>,
}

impl StageReporter {
    pub(crate) fn attached(sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A reporter whose updates are discarded, for driving a computation
    /// outside a registry.
    pub fn detached() -> Self {
        Self { sender: None }
    }

    /// Report entering a stage. Never blocks; reports are dropped once the
    /// driver has stopped listening.
    pub fn stage(&self, stage: impl Into<String>) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(stage.into());
        }
    }
}
