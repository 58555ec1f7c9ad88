//! In-process publish/subscribe channel for diagram events.
//!
//! Every diagram owns (or is handed) its own [`EventBus`]; nothing is
//! process-wide. Delivery is synchronous and follows subscription order.
//! A subscriber that returns an error or panics is logged and counted, and
//! the remaining subscribers still receive the event.
//!
//! ```
//! # use std::{cell::Cell, rc::Rc};
//! # use schemascope::events::{Event, EventBus, Topic};
//! # use schemascope_core::geometry::Point;
//! let bus = EventBus::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let counter = Rc::clone(&seen);
//! let subscription = bus.subscribe(Topic::SelectionCleared, move |_| {
//!     counter.set(counter.get() + 1);
//!     Ok(())
//! });
//!
//! bus.publish(Event::SelectionCleared { point: Point::default() });
//! subscription.unsubscribe();
//! bus.publish(Event::SelectionCleared { point: Point::default() });
//!
//! assert_eq!(seen.get(), 1);
//! ```

use std::{
    cell::{Cell, RefCell},
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::{Rc, Weak},
};

use indexmap::IndexMap;
use log::{trace, warn};
use serde::Serialize;
use thiserror::Error;

use schemascope_core::{
    geometry::Point,
    identifier::{EntityId, RelationshipId},
    model::Selection,
};

/// Event topics, named the way hosts subscribe to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Zoom,
    Pan,
    SelectionChanged,
    EntityClick,
    EntityDoubleClick,
    RelationshipClick,
    RelationshipDoubleClick,
    DragStart,
    Drag,
    DragEnd,
    DeleteSelected,
    SelectionCleared,
}

impl Topic {
    pub const ALL: [Topic; 12] = [
        Topic::Zoom,
        Topic::Pan,
        Topic::SelectionChanged,
        Topic::EntityClick,
        Topic::EntityDoubleClick,
        Topic::RelationshipClick,
        Topic::RelationshipDoubleClick,
        Topic::DragStart,
        Topic::Drag,
        Topic::DragEnd,
        Topic::DeleteSelected,
        Topic::SelectionCleared,
    ];

    /// Dotted topic name, e.g. `interaction.selectionChanged`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Zoom => "interaction.zoom",
            Self::Pan => "interaction.pan",
            Self::SelectionChanged => "interaction.selectionChanged",
            Self::EntityClick => "interaction.entityClick",
            Self::EntityDoubleClick => "interaction.entityDoubleClick",
            Self::RelationshipClick => "interaction.relationshipClick",
            Self::RelationshipDoubleClick => "interaction.relationshipDoubleClick",
            Self::DragStart => "interaction.dragStart",
            Self::Drag => "interaction.drag",
            Self::DragEnd => "interaction.dragEnd",
            Self::DeleteSelected => "interaction.deleteSelected",
            Self::SelectionCleared => "interaction.selectionCleared",
        }
    }

    /// Looks a topic up by its dotted name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.name() == name)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event payloads. Each variant belongs to exactly one [`Topic`] and
/// serializes with that topic's dotted name under `"topic"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "topic")]
pub enum Event {
    #[serde(rename = "interaction.zoom")]
    Zoom {
        scale: f32,
        point: Point,
    },
    #[serde(rename = "interaction.pan")]
    Pan {
        translate: Point,
        delta: Point,
    },
    #[serde(rename = "interaction.selectionChanged")]
    SelectionChanged(Selection),
    #[serde(rename = "interaction.entityClick", rename_all = "camelCase")]
    EntityClick {
        entity: EntityId,
        selected: bool,
        selected_entities: Vec<EntityId>,
        point: Point,
    },
    #[serde(rename = "interaction.entityDoubleClick")]
    EntityDoubleClick {
        entity: EntityId,
        point: Point,
    },
    #[serde(rename = "interaction.relationshipClick", rename_all = "camelCase")]
    RelationshipClick {
        relationship: RelationshipId,
        selected: bool,
        selected_relationships: Vec<RelationshipId>,
        point: Point,
    },
    #[serde(rename = "interaction.relationshipDoubleClick")]
    RelationshipDoubleClick {
        relationship: RelationshipId,
        point: Point,
    },
    #[serde(rename = "interaction.dragStart")]
    DragStart {
        entity: EntityId,
        position: Point,
    },
    #[serde(rename = "interaction.drag")]
    Drag {
        entity: EntityId,
        position: Point,
    },
    #[serde(rename = "interaction.dragEnd")]
    DragEnd {
        entity: EntityId,
        position: Point,
    },
    #[serde(rename = "interaction.deleteSelected")]
    DeleteSelected(Selection),
    #[serde(rename = "interaction.selectionCleared")]
    SelectionCleared {
        point: Point,
    },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Self::Zoom { .. } => Topic::Zoom,
            Self::Pan { .. } => Topic::Pan,
            Self::SelectionChanged(_) => Topic::SelectionChanged,
            Self::EntityClick { .. } => Topic::EntityClick,
            Self::EntityDoubleClick { .. } => Topic::EntityDoubleClick,
            Self::RelationshipClick { .. } => Topic::RelationshipClick,
            Self::RelationshipDoubleClick { .. } => Topic::RelationshipDoubleClick,
            Self::DragStart { .. } => Topic::DragStart,
            Self::Drag { .. } => Topic::Drag,
            Self::DragEnd { .. } => Topic::DragEnd,
            Self::DeleteSelected(_) => Topic::DeleteSelected,
            Self::SelectionCleared { .. } => Topic::SelectionCleared,
        }
    }
}

/// Error returned by a subscriber that could not handle an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Outcome of one [`EventBus::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that handled the event successfully
    pub delivered: usize,
    /// Subscribers that returned an error or panicked
    pub failed: usize,
}

type Handler = Rc<dyn Fn(&Event) -> Result<(), HandlerError>>;

#[derive(Default)]
struct Subscribers {
    by_topic: IndexMap<Topic, Vec<(u64, Handler)>>,
}

/// Per-diagram publish/subscribe channel.
#[derive(Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<Subscribers>>,
    next_id: Cell<u64>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.borrow();
        let counts: Vec<_> = subscribers
            .by_topic
            .iter()
            .map(|(topic, handlers)| (topic.name(), handlers.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `topic`. Handlers run in subscription order.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&Event) -> Result<(), HandlerError> + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        self.subscribers
            .borrow_mut()
            .by_topic
            .entry(topic)
            .or_default()
            .push((id, Rc::new(handler)));

        Subscription {
            subscribers: Rc::downgrade(&self.subscribers),
            topic,
            id,
            active: Cell::new(true),
        }
    }

    /// Delivers `event` to every subscriber of its topic.
    ///
    /// The subscriber list is captured before the first handler runs, so
    /// handlers may subscribe or unsubscribe without affecting this delivery.
    pub fn publish(&self, event: Event) -> DeliveryReport {
        let topic = event.topic();
        let handlers: Vec<Handler> = self
            .subscribers
            .borrow()
            .by_topic
            .get(&topic)
            .map(|handlers| handlers.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default();

        let mut report = DeliveryReport::default();
        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    warn!(topic = topic.name(), err:err; "Event subscriber failed");
                    report.failed += 1;
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(topic = topic.name(), panic = message; "Event subscriber panicked");
                    report.failed += 1;
                }
            }
        }

        trace!(
            topic = topic.name(),
            delivered = report.delivered,
            failed = report.failed;
            "Event published"
        );
        report
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .borrow()
            .by_topic
            .get(&topic)
            .map_or(0, Vec::len)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle keeps the subscription alive; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "dropping a Subscription keeps the handler registered with no way to remove it"]
pub struct Subscription {
    subscribers: Weak<RefCell<Subscribers>>,
    topic: Topic,
    id: u64,
    active: Cell<bool>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Removes the handler. Calling this again, or after the bus is gone,
    /// does nothing.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        let Some(subscribers) = self.subscribers.upgrade() else {
            return;
        };
        let mut subscribers = subscribers.borrow_mut();
        if let Some(handlers) = subscribers.by_topic.get_mut(&self.topic) {
            handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("active", &self.active.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleared() -> Event {
        Event::SelectionCleared {
            point: Point::new(1.0, 2.0),
        }
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = Rc::clone(&order);
            let _ = bus.subscribe(Topic::SelectionCleared, move |_| {
                order.borrow_mut().push(i);
                Ok(())
            });
        }

        let report = bus.publish(cleared());
        assert_eq!(report.delivered, 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_only_matching_topic_receives() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let _sub = bus.subscribe(Topic::Zoom, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.publish(cleared());
        assert_eq!(hits.get(), 0);

        bus.publish(Event::Zoom {
            scale: 2.0,
            point: Point::default(),
        });
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_failing_subscribers_do_not_block_others() {
        let bus = EventBus::new();
        let reached = Rc::new(Cell::new(false));

        let _a = bus.subscribe(Topic::SelectionCleared, |_| Err(HandlerError::new("boom")));
        let _b = bus.subscribe(Topic::SelectionCleared, |_| panic!("handler exploded"));
        let flag = Rc::clone(&reached);
        let _c = bus.subscribe(Topic::SelectionCleared, move |_| {
            flag.set(true);
            Ok(())
        });

        let report = bus.publish(cleared());
        assert!(reached.get());
        assert_eq!(
            report,
            DeliveryReport {
                delivered: 1,
                failed: 2
            }
        );
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let sub = bus.subscribe(Topic::Pan, |_| Ok(()));
        assert_eq!(bus.subscriber_count(Topic::Pan), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(Topic::Pan), 0);
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus = EventBus::new();
        let sub = bus.subscribe(Topic::Pan, |_| Ok(()));
        drop(bus);
        sub.unsubscribe();
    }

    #[test]
    fn test_subscribe_during_delivery_uses_snapshot() {
        let bus = Rc::new(EventBus::new());
        let late_hits = Rc::new(Cell::new(0));

        let bus_handle = Rc::clone(&bus);
        let late = Rc::clone(&late_hits);
        let _sub = bus.subscribe(Topic::SelectionCleared, move |_| {
            let late = Rc::clone(&late);
            let _ = bus_handle.subscribe(Topic::SelectionCleared, move |_| {
                late.set(late.get() + 1);
                Ok(())
            });
            Ok(())
        });

        bus.publish(cleared());
        assert_eq!(late_hits.get(), 0);
        assert_eq!(bus.subscriber_count(Topic::SelectionCleared), 2);
    }

    #[test]
    fn test_buses_are_isolated() {
        let first = EventBus::new();
        let second = EventBus::new();
        let _sub = first.subscribe(Topic::SelectionCleared, |_| Ok(()));

        assert_eq!(second.publish(cleared()).delivered, 0);
        assert_eq!(first.publish(cleared()).delivered, 1);
    }

    #[test]
    fn test_serialized_events_carry_their_topic_name() {
        let events = [
            cleared(),
            Event::SelectionChanged(Selection::default()),
            Event::EntityClick {
                entity: "users".into(),
                selected: true,
                selected_entities: vec!["users".into()],
                point: Point::default(),
            },
            Event::Zoom {
                scale: 2.0,
                point: Point::default(),
            },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["topic"], event.topic().name());
        }

        let value = serde_json::to_value(Event::EntityClick {
            entity: "users".into(),
            selected: true,
            selected_entities: Vec::new(),
            point: Point::default(),
        })
        .unwrap();
        assert!(value.get("selectedEntities").is_some());
    }

    #[test]
    fn test_topic_names_round_trip() {
        for topic in Topic::ALL {
            assert_eq!(Topic::from_name(topic.name()), Some(topic));
        }
        assert_eq!(Topic::from_name("interaction.unknown"), None);
    }
}
