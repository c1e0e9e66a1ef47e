//! Change notifications for front-ends.
//!
//! Services publish a [`ChangeEvent`] after every successful mutation.
//! Front-ends subscribe and refresh whatever view shows the entity. Sending
//! with no subscribers is not an error; slow subscribers see `Lagged`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the broadcast buffer.
const CHANNEL_CAPACITY: usize = 256;

/// Which entity changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A task.
    Task,
    /// A category.
    Category,
}

/// What happened to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// Created.
    Created,
    /// Editable fields changed.
    Updated,
    /// Soft-deleted.
    Deleted,
    /// Task flipped between pending and completed.
    CompletionToggled,
}

/// A committed change to one entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Entity kind.
    pub kind: EntityKind,
    /// Entity id.
    pub id: i64,
    /// Change kind.
    pub change: ChangeKind,
}

/// Broadcast publisher shared by the services. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    /// New notifier with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to current subscribers.
    pub fn publish(&self, kind: EntityKind, id: i64, change: ChangeKind) {
        let event = ChangeEvent { kind, id, change };
        let receivers = self.tx.send(event).unwrap_or(0);
        trace!(?event, receivers, "published change");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_fine() {
        let notifier = ChangeNotifier::new();
        notifier.publish(EntityKind::Task, 1, ChangeKind::Created);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        notifier.publish(EntityKind::Task, 1, ChangeKind::Created);
        notifier.publish(EntityKind::Category, 2, ChangeKind::Deleted);

        assert_eq!(
            rx.recv().await.unwrap(),
            ChangeEvent { kind: EntityKind::Task, id: 1, change: ChangeKind::Created }
        );
        assert_eq!(rx.recv().await.unwrap().kind, EntityKind::Category);
    }

    #[tokio::test]
    async fn clones_share_the_channel() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe();
        notifier.clone().publish(EntityKind::Task, 5, ChangeKind::Updated);
        assert_eq!(rx.recv().await.unwrap().id, 5);
    }

    #[test]
    fn event_serializes_camel_case() {
        let event = ChangeEvent {
            kind: EntityKind::Task,
            id: 3,
            change: ChangeKind::CompletionToggled,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["kind"], "task");
        assert_eq!(json["change"], "completionToggled");
    }
}
