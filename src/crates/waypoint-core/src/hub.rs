//! Broadcast hub fanning out events to per-execution subscribers.
//!
//! A single coordinating task owns the subscriber table; subscribe,
//! unsubscribe, and publish requests are commands processed strictly in
//! arrival order, so the table needs no lock. Each subscriber gets a
//! bounded queue and is disconnected, rather than allowed to stall
//! delivery, when that queue fills.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::events::Event;

/// Default per-subscriber queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

enum Command {
    Subscribe {
        execution_id: String,
        subscriber_id: u64,
        sender: mpsc::Sender<Event>,
    },
    Unsubscribe {
        execution_id: String,
        subscriber_id: u64,
    },
    Publish(Event),
    SubscriberCount {
        execution_id: String,
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the hub's coordinating task. Cheap to clone; all clones feed
/// the same subscriber table.
#[derive(Clone)]
pub struct EventHub {
    commands: mpsc::UnboundedSender<Command>,
    next_subscriber_id: Arc<AtomicU64>,
    queue_capacity: usize,
}

impl EventHub {
    /// Spawn a hub with the default subscriber queue capacity.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Spawn a hub with a custom subscriber queue capacity.
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        let (commands, inbox) = mpsc::unbounded_channel();
        tokio::spawn(route_commands(inbox));
        Self {
            commands,
            next_subscriber_id: Arc::new(AtomicU64::new(1)),
            queue_capacity,
        }
    }

    /// Register a subscriber for one execution id.
    ///
    /// Only events published after registration are delivered; there is no
    /// replay of earlier events.
    pub fn subscribe(&self, execution_id: &str) -> Subscription {
        let subscriber_id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let _ = self.commands.send(Command::Subscribe {
            execution_id: execution_id.to_string(),
            subscriber_id,
            sender,
        });
        Subscription {
            execution_id: execution_id.to_string(),
            subscriber_id,
            receiver,
            commands: self.commands.clone(),
        }
    }

    /// Broadcast an event to the subscribers of its execution id.
    ///
    /// Never blocks; an event with no subscribers is silently discarded.
    pub fn publish(&self, event: Event) {
        let _ = self.commands.send(Command::Publish(event));
    }

    /// Number of live subscribers for an execution id.
    pub async fn subscriber_count(&self, execution_id: &str) -> usize {
        let (reply, response) = oneshot::channel();
        let command = Command::SubscriberCount {
            execution_id: execution_id.to_string(),
            reply,
        };
        if self.commands.send(command).is_err() {
            return 0;
        }
        response.await.unwrap_or(0)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to one execution's event stream.
///
/// Dropping the subscription de-registers it from the hub.
pub struct Subscription {
    execution_id: String,
    subscriber_id: u64,
    receiver: mpsc::Receiver<Event>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Subscription {
    /// Receive the next event. Returns `None` once the hub has dropped this
    /// subscriber (queue overflow or hub shutdown), after any already
    /// buffered events have been drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Unsubscribe {
            execution_id: self.execution_id.clone(),
            subscriber_id: self.subscriber_id,
        });
    }
}

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Event>,
}

async fn route_commands(mut inbox: mpsc::UnboundedReceiver<Command>) {
    let mut topics: HashMap<String, Vec<Subscriber>> = HashMap::new();

    while let Some(command) = inbox.recv().await {
        match command {
            Command::Subscribe {
                execution_id,
                subscriber_id,
                sender,
            } => {
                debug!(execution_id = %execution_id, subscriber_id, "subscriber registered");
                topics.entry(execution_id).or_default().push(Subscriber {
                    id: subscriber_id,
                    sender,
                });
            }
            Command::Unsubscribe {
                execution_id,
                subscriber_id,
            } => {
                let mut drained = false;
                if let Some(subscribers) = topics.get_mut(&execution_id) {
                    subscribers.retain(|subscriber| subscriber.id != subscriber_id);
                    drained = subscribers.is_empty();
                }
                if drained {
                    topics.remove(&execution_id);
                }
            }
            Command::Publish(event) => {
                let mut drained = false;
                if let Some(subscribers) = topics.get_mut(&event.execution_id) {
                    subscribers.retain(|subscriber| {
                        match subscriber.sender.try_send(event.clone()) {
                            Ok(()) => true,
                            Err(TrySendError::Full(_)) => {
                                warn!(
                                    execution_id = %event.execution_id,
                                    subscriber_id = subscriber.id,
                                    "subscriber queue full; disconnecting"
                                );
                                false
                            }
                            Err(TrySendError::Closed(_)) => false,
                        }
                    });
                    drained = subscribers.is_empty();
                }
                if drained {
                    topics.remove(&event.execution_id);
                }
            }
            Command::SubscriberCount { execution_id, reply } => {
                let count = topics.get(&execution_id).map_or(0, |subscribers| subscribers.len());
                let _ = reply.send(count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionStatus;

    fn update(execution_id: &str, stage: &str) -> Event {
        Event::state_update(execution_id, ExecutionStatus::Running, Some(stage))
    }

    #[tokio::test]
    async fn delivers_events_in_publish_order() {
        let hub = EventHub::new();
        let mut subscription = hub.subscribe("exec-1");

        hub.publish(update("exec-1", "first"));
        hub.publish(update("exec-1", "second"));

        let first = subscription.recv().await.unwrap();
        let second = subscription.recv().await.unwrap();
        assert_eq!(first.payload["current_stage"], "first");
        assert_eq!(second.payload["current_stage"], "second");
    }

    #[tokio::test]
    async fn events_before_subscribe_are_not_replayed() {
        let hub = EventHub::new();
        hub.publish(update("exec-1", "missed"));

        let mut subscription = hub.subscribe("exec-1");
        hub.publish(update("exec-1", "seen"));

        let event = subscription.recv().await.unwrap();
        assert_eq!(event.payload["current_stage"], "seen");
    }

    #[tokio::test]
    async fn events_are_scoped_to_their_execution_id() {
        let hub = EventHub::new();
        let mut one = hub.subscribe("exec-1");
        let _two = hub.subscribe("exec-2");

        hub.publish(update("exec-2", "other"));
        hub.publish(update("exec-1", "mine"));

        let event = one.recv().await.unwrap();
        assert_eq!(event.execution_id, "exec-1");
        assert_eq!(event.payload["current_stage"], "mine");
    }

    #[tokio::test]
    async fn slow_subscriber_is_disconnected_without_blocking_others() {
        let hub = EventHub::with_queue_capacity(1);
        let mut slow = hub.subscribe("exec-1");
        let mut fast = hub.subscribe("exec-1");

        hub.publish(update("exec-1", "one"));
        let event = fast.recv().await.unwrap();
        assert_eq!(event.payload["current_stage"], "one");

        // The slow subscriber never drained "one", so this publish
        // overflows its queue and disconnects it.
        hub.publish(update("exec-1", "two"));
        let event = fast.recv().await.unwrap();
        assert_eq!(event.payload["current_stage"], "two");
        assert_eq!(hub.subscriber_count("exec-1").await, 1);

        // The buffered event is still readable, then the stream ends.
        let buffered = slow.recv().await.unwrap();
        assert_eq!(buffered.payload["current_stage"], "one");
        assert!(slow.recv().await.is_none());

        hub.publish(update("exec-1", "three"));
        let event = fast.recv().await.unwrap();
        assert_eq!(event.payload["current_stage"], "three");
    }

    #[tokio::test]
    async fn dropping_a_subscription_deregisters_it() {
        let hub = EventHub::new();
        let subscription = hub.subscribe("exec-1");
        assert_eq!(hub.subscriber_count("exec-1").await, 1);

        drop(subscription);
        assert_eq!(hub.subscriber_count("exec-1").await, 0);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_discards_the_event() {
        let hub = EventHub::new();
        hub.publish(update("exec-9", "nobody"));
        assert_eq!(hub.subscriber_count("exec-9").await, 0);
    }
}
