//! Change notification for grid models
//!
//! A [`Publisher`] is an explicit context object owned by a model. Consumers
//! register callbacks, the model publishes [`Event`]s carrying an
//! [`EventMask`], and subscribers test the mask with bitwise AND.

use std::sync::Arc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::grid::BlockCoordinate;

/// Extensible set of event flags
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventMask(u32);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const ROWS_SELECTED: EventMask = EventMask(1 << 0);
    pub const DATA_AVAILABLE: EventMask = EventMask(1 << 1);
    pub const FETCH_ERROR: EventMask = EventMask(1 << 2);
    pub const TOTAL_CHANGED: EventMask = EventMask(1 << 3);
    pub const RELOADED: EventMask = EventMask(1 << 4);

    pub const fn from_bits(bits: u32) -> Self {
        EventMask(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if every flag of `other` is set
    pub const fn contains(&self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any flag of `other` is set
    pub const fn intersects(&self, other: EventMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: EventMask) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for EventMask {
    type Output = EventMask;

    fn bitand(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 & rhs.0)
    }
}

impl std::fmt::Debug for EventMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(EventMask, &str); 5] = [
            (EventMask::ROWS_SELECTED, "ROWS_SELECTED"),
            (EventMask::DATA_AVAILABLE, "DATA_AVAILABLE"),
            (EventMask::FETCH_ERROR, "FETCH_ERROR"),
            (EventMask::TOTAL_CHANGED, "TOTAL_CHANGED"),
            (EventMask::RELOADED, "RELOADED"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "EventMask({:#x}: {})", self.0, names.join(" | "))
    }
}

/// A published notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub mask: EventMask,
    /// Block the event is scoped to, for data-available and fetch-error events
    pub block: Option<BlockCoordinate>,
}

impl Event {
    pub fn new(mask: EventMask) -> Self {
        Self { mask, block: None }
    }

    pub fn for_block(mask: EventMask, block: BlockCoordinate) -> Self {
        Self {
            mask,
            block: Some(block),
        }
    }

    pub fn is(&self, mask: EventMask) -> bool {
        self.mask.contains(mask)
    }
}

impl From<EventMask> for Event {
    fn from(mask: EventMask) -> Self {
        Event::new(mask)
    }
}

/// Receiver of published events
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &Event);
}

impl<F> Subscriber for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event)
    }
}

/// Handle returned by [`Publisher::add_subscriber`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

/// Ordered collection of subscribers
#[derive(Default)]
pub struct Publisher {
    subscribers: RwLock<Vec<(SubscriberId, Arc<dyn Subscriber>)>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it is invoked after all earlier registrations
    pub fn add_subscriber<S>(&self, subscriber: S) -> SubscriberId
    where
        S: Subscriber + 'static,
    {
        self.add_shared(Arc::new(subscriber))
    }

    pub fn add_shared(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(Uuid::new_v4());
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Returns false if `id` is not registered here
    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);

        let removed = subscribers.len() != before;
        if !removed {
            tracing::debug!("remove_subscriber: {:?} is not registered", id);
        }
        removed
    }

    /// Invoke every subscriber synchronously, in registration order
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();

        // Callbacks may subscribe or unsubscribe while being notified
        let snapshot: Vec<Arc<dyn Subscriber>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| s.clone())
            .collect();

        for subscriber in snapshot {
            subscriber.on_event(&event);
        }
    }

    /// Take over all of `other`'s subscribers, leaving `other` empty
    pub fn move_subscribers_from(&self, other: &Publisher) {
        if std::ptr::eq(self, other) {
            return;
        }

        let moved: Vec<_> = other.subscribers.write().drain(..).collect();
        tracing::debug!("Moving {} subscribers between publishers", moved.len());
        self.subscribers.write().extend(moved);
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &self.len())
            .finish()
    }
}
