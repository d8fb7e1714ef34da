//! Change notifier implementations.

use dashmap::DashMap;
use kanban_domain::{BoardId, ChangeEvent, ChangeNotifier};
use tokio::sync::broadcast;

/// Per-room channel capacity. Slow subscribers lag and skip events rather
/// than blocking publishers.
pub const ROOM_CAPACITY: usize = 100;

/// Fans events out to subscribers of the event's board room.
pub struct BroadcastNotifier {
    rooms: DashMap<BoardId, broadcast::Sender<ChangeEvent>>,
    capacity: usize,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        Self::with_capacity(ROOM_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
        }
    }

    /// Joins the room of a board. Authorization happens before this call.
    pub fn subscribe(&self, board_id: BoardId) -> broadcast::Receiver<ChangeEvent> {
        self.rooms
            .entry(board_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscriber_count(&self, board_id: BoardId) -> usize {
        self.rooms
            .get(&board_id)
            .map_or(0, |room| room.receiver_count())
    }

    /// Drops rooms nobody listens to any more.
    pub fn prune(&self) {
        self.rooms.retain(|_, room| room.receiver_count() > 0);
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, event: ChangeEvent) {
        let Some(room) = self.rooms.get(&event.board_id) else {
            tracing::trace!("No listeners for {}", event.room());
            return;
        };
        let name = event.event_name();
        match room.send(event) {
            Ok(receivers) => tracing::debug!("Sent {} to {} receivers", name, receivers),
            Err(_) => tracing::trace!("Room emptied before {} was sent", name),
        }
    }
}

/// Logs every event; used by the CLI, which has no live clients.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl ChangeNotifier for TracingNotifier {
    fn publish(&self, event: ChangeEvent) {
        tracing::info!(
            room = %event.room(),
            "{}",
            event.event_name()
        );
    }
}

#[derive(Debug, Default)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn publish(&self, _event: ChangeEvent) {}
}
