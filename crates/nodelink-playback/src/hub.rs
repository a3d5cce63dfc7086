//! Named broadcast groups with bounded, oldest-drop-on-full member queues.
//!
//! Generalizes the connection registry's bidirectional session↔room map
//! from a 1:1 subscription model to 1:N fan-out: every endpoint attached to
//! a group receives every message broadcast to that group after it attaches
//! and before it detaches. `tokio::sync::mpsc` blocks or rejects sends once
//! a bounded channel is full, which would let one slow observer stall a
//! playback task; instead each member's queue is a small ring buffer that
//! drops its oldest entry on overflow, so `broadcast` never blocks.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::Notify;

use crate::messages::OutboundEvent;

/// Default per-endpoint queue depth before the oldest message is dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

struct Queue {
    buf: Mutex<VecDeque<OutboundEvent>>,
    notify: Notify,
    capacity: usize,
}

impl Queue {
    fn new(capacity: usize) -> Self {
        Self { buf: Mutex::new(VecDeque::with_capacity(capacity)), notify: Notify::new(), capacity }
    }

    fn push(&self, event: OutboundEvent) {
        let mut buf = self.buf.lock().expect("broadcast queue mutex poisoned");
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(event);
        drop(buf);
        self.notify.notify_one();
    }

    async fn recv(&self) -> OutboundEvent {
        loop {
            {
                let mut buf = self.buf.lock().expect("broadcast queue mutex poisoned");
                if let Some(event) = buf.pop_front() {
                    return event;
                }
            }
            self.notify.notified().await;
        }
    }

    fn len(&self) -> usize {
        self.buf.lock().expect("broadcast queue mutex poisoned").len()
    }
}

/// A process-wide set of named fan-out groups.
pub struct BroadcastHub {
    groups: Mutex<HashMap<String, HashMap<u64, Arc<Queue>>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl BroadcastHub {
    /// Create an empty hub with [`DEFAULT_QUEUE_CAPACITY`] per member.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Create an empty hub with a caller-chosen per-member queue depth.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self { groups: Mutex::new(HashMap::new()), next_id: AtomicU64::new(0), capacity }
    }

    /// Attach a new endpoint to `group`, creating the group if absent.
    pub fn attach(self: &Arc<Self>, group: impl Into<String>) -> BroadcastEndpoint {
        let group = group.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(Queue::new(self.capacity));

        let mut groups = self.groups.lock().expect("broadcast hub mutex poisoned");
        groups.entry(group.clone()).or_default().insert(id, Arc::clone(&queue));
        drop(groups);

        BroadcastEndpoint { hub: Arc::clone(self), group, id, queue }
    }

    /// Detach an endpoint. Idempotent; detaching twice is a no-op.
    pub fn detach(&self, group: &str, id: u64) {
        let mut groups = self.groups.lock().expect("broadcast hub mutex poisoned");
        if let Some(members) = groups.get_mut(group) {
            members.remove(&id);
            if members.is_empty() {
                groups.remove(group);
            }
        }
    }

    /// Enqueue `event` to every endpoint currently attached to `group`.
    /// Delivery order between distinct endpoints is unspecified.
    pub fn broadcast(&self, group: &str, event: OutboundEvent) {
        let groups = self.groups.lock().expect("broadcast hub mutex poisoned");
        if let Some(members) = groups.get(group) {
            for queue in members.values() {
                queue.push(event.clone());
            }
        }
    }

    /// Number of endpoints currently attached to `group`.
    #[must_use]
    pub fn member_count(&self, group: &str) -> usize {
        self.groups.lock().expect("broadcast hub mutex poisoned").get(group).map_or(0, HashMap::len)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A session's membership in one broadcast group.
pub struct BroadcastEndpoint {
    hub: Arc<BroadcastHub>,
    group: String,
    id: u64,
    queue: Arc<Queue>,
}

impl BroadcastEndpoint {
    /// Wait for the next event enqueued to this endpoint's group.
    pub async fn recv(&self) -> OutboundEvent {
        self.queue.recv().await
    }

    /// Number of events currently buffered for this endpoint.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.queue.len()
    }

    /// This endpoint's id within its group.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Detach from the hub, consuming this endpoint.
    pub fn detach(self) {
        self.hub.detach(&self.group, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_attached_endpoint() {
        let hub = Arc::new(BroadcastHub::new());
        let a = hub.attach("room");
        let b = hub.attach("room");
        assert_eq!(hub.member_count("room"), 2);

        hub.broadcast("room", OutboundEvent::Stopped);

        assert_eq!(a.recv().await, OutboundEvent::Stopped);
        assert_eq!(b.recv().await, OutboundEvent::Stopped);
    }

    #[tokio::test]
    async fn detach_removes_membership_and_empties_group() {
        let hub = Arc::new(BroadcastHub::new());
        let a = hub.attach("room");
        assert_eq!(hub.member_count("room"), 1);

        a.detach();
        assert_eq!(hub.member_count("room"), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_oldest_not_newest() {
        let hub = Arc::new(BroadcastHub::with_capacity(2));
        let endpoint = hub.attach("room");

        hub.broadcast("room", OutboundEvent::Paused { frame: 1 });
        hub.broadcast("room", OutboundEvent::Paused { frame: 2 });
        hub.broadcast("room", OutboundEvent::Paused { frame: 3 });

        assert_eq!(endpoint.buffered_len(), 2);
        assert_eq!(endpoint.recv().await, OutboundEvent::Paused { frame: 2 });
        assert_eq!(endpoint.recv().await, OutboundEvent::Paused { frame: 3 });
    }

    #[tokio::test]
    async fn unrelated_groups_do_not_cross_talk() {
        let hub = Arc::new(BroadcastHub::new());
        let a = hub.attach("room-a");
        let b = hub.attach("room-b");

        hub.broadcast("room-a", OutboundEvent::Stopped);

        assert_eq!(a.buffered_len(), 1);
        assert_eq!(b.buffered_len(), 0);
    }
}
