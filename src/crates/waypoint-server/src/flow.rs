//! Travel booking flow
//!
//! The reference computation served by this binary. A fresh run composes a
//! booking request from the caller's input and proposes a `BookTicket` tool
//! call, then suspends until a human confirms (or amends) the call through
//! the API. The resumed run rehydrates the confirmed state, executes the
//! booking and completes.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use waypoint_core::{Computation, Outcome, RunContext};
use waypoint_store::{CheckpointStore, OverlayStore};

/// Tool name proposed for confirmation
pub const BOOK_TICKET_TOOL: &str = "BookTicket";

/// Stage at which the flow suspends for confirmation
pub const CONFIRM_STAGE: &str = "confirm_booking";

/// Phone number used until the passenger provides a real one
const PLACEHOLDER_PHONE: &str = "1234567890";

/// Input accepted by the flow: who is travelling and where to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingInput {
    pub name: String,
    pub location: String,
}

/// Arguments of a proposed `BookTicket` call, JSON-encoded into the
/// snapshot's pending tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BookTicketArgs {
    location: String,
    passenger_name: String,
    passenger_phone_number: String,
}

/// A suspendable ticket-booking computation backed by the file stores
pub struct TravelBookingFlow {
    checkpoints: CheckpointStore,
    overlays: OverlayStore,
}

impl TravelBookingFlow {
    pub fn new(checkpoints: CheckpointStore, overlays: OverlayStore) -> Self {
        Self {
            checkpoints,
            overlays,
        }
    }

    /// First half of the flow: compose the itinerary, persist the snapshot
    /// with the proposed tool call and suspend.
    async fn start(&self, ctx: &RunContext) -> anyhow::Result<Outcome> {
        let input: BookingInput = serde_json::from_value(ctx.input.clone())
            .context("booking input must carry name and location")?;

        ctx.progress.stage("compose_itinerary");
        let args = BookTicketArgs {
            location: input.location.clone(),
            passenger_name: input.name.clone(),
            passenger_phone_number: PLACEHOLDER_PHONE.to_string(),
        };
        let snapshot = json!({
            "execution_id": ctx.execution_id,
            "stage": CONFIRM_STAGE,
            "context": ctx.input,
            "saved_at": Utc::now(),
            "message_history": [
                {
                    "role": "user",
                    "content": format!(
                        "Book a flight ticket to {} for {}.",
                        input.location, input.name
                    ),
                },
                {
                    "role": "assistant",
                    "content": "I need a confirmation before booking this ticket.",
                    "tool_calls": [
                        {
                            "id": "call_0",
                            "name": BOOK_TICKET_TOOL,
                            "arguments": serde_json::to_string(&args)?,
                        }
                    ],
                },
            ],
        });

        self.checkpoints
            .set(&ctx.checkpoint_key, &serde_json::to_vec_pretty(&snapshot)?)
            .await?;
        info!(
            execution_id = %ctx.execution_id,
            checkpoint_key = %ctx.checkpoint_key,
            "booking proposed, awaiting confirmation"
        );

        Ok(Outcome::Interrupted {
            stage: CONFIRM_STAGE.to_string(),
            snapshot,
        })
    }

    /// Second half of the flow: rehydrate the confirmed state, execute the
    /// pending booking and persist the final checkpoint.
    async fn finish(&self, ctx: &RunContext) -> anyhow::Result<Outcome> {
        let mut snapshot = self.rehydrate(ctx).await?;

        ctx.progress.stage("book_ticket");
        let calls = waypoint_store::pending_tool_calls(&snapshot);
        let call = calls.last().ok_or_else(|| {
            anyhow!(
                "rehydrated state for execution {} has no pending tool call",
                ctx.execution_id
            )
        })?;
        if call.name != BOOK_TICKET_TOOL {
            return Err(anyhow!("unknown pending tool: {}", call.name));
        }
        let args: BookTicketArgs = serde_json::from_str(&call.arguments)
            .with_context(|| format!("invalid arguments for {}", call.name))?;

        let result = format!(
            "Your ticket to {} has been successfully booked, {}!",
            args.location, args.passenger_name
        );

        snapshot["stage"] = json!("completed");
        snapshot["saved_at"] = json!(Utc::now());
        if let Some(history) = snapshot
            .get_mut("message_history")
            .and_then(Value::as_array_mut)
        {
            history.push(json!({
                "role": "tool",
                "name": BOOK_TICKET_TOOL,
                "content": result,
            }));
        }
        self.checkpoints
            .set(&ctx.checkpoint_key, &serde_json::to_vec_pretty(&snapshot)?)
            .await?;
        info!(execution_id = %ctx.execution_id, "booking executed");

        Ok(Outcome::Completed { result })
    }

    /// Load the state to resume from. A confirmed overlay takes precedence
    /// and is consumed; otherwise the plain checkpoint is read. Failures
    /// other than a missing overlay leave the overlay in place.
    async fn rehydrate(&self, ctx: &RunContext) -> anyhow::Result<Value> {
        match self.overlays.load(&ctx.checkpoint_key).await {
            Ok(snapshot) => {
                self.overlays.remove(&ctx.checkpoint_key).await?;
                debug!(
                    checkpoint_key = %ctx.checkpoint_key,
                    "resuming from confirmed overlay"
                );
                Ok(snapshot)
            }
            Err(err) if err.is_not_found() => {
                let bytes = self
                    .checkpoints
                    .get(&ctx.checkpoint_key)
                    .await?
                    .ok_or_else(|| {
                        anyhow!("no checkpoint found for key {}", ctx.checkpoint_key)
                    })?;
                debug!(checkpoint_key = %ctx.checkpoint_key, "resuming from checkpoint");
                Ok(serde_json::from_slice(&bytes)?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl Computation for TravelBookingFlow {
    async fn run(&self, ctx: RunContext) -> anyhow::Result<Outcome> {
        if ctx.resuming {
            self.finish(&ctx).await
        } else {
            self.start(&ctx).await
        }
    }
}
