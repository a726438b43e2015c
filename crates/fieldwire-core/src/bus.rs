#![forbid(unsafe_code)]

//! Topic-keyed event bus with RAII subscriptions.
//!
//! # Design
//!
//! [`EventBus`] keeps its listeners in shared, reference-counted storage
//! (`Rc<RefCell<..>>`); cloning a bus yields another handle to the same
//! listener table. Listeners are grouped per [`Topic`] and invoked in
//! registration order.
//!
//! # Invariants
//!
//! 1. Callbacks run outside any internal borrow: a callback may subscribe,
//!    unsubscribe, or emit on the same bus.
//! 2. A listener removed before its turn in an ongoing emission is skipped.
//! 3. A one-shot listener is removed from the table *before* its callback
//!    runs, so it fires at most once even under re-entrant emission.
//! 4. Dropping a [`Subscription`] removes its listener immediately.
//!
//! # Failure Modes
//!
//! - **Bus dropped first**: a [`Subscription`] that outlives its bus becomes
//!   inert; `unsubscribe()` is a no-op.
//! - **Panicking callback**: the panic propagates to the emitter; listeners
//!   after it in the same emission do not run.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::event::{FieldEvent, Topic};

type Callback = Rc<dyn Fn(&FieldEvent)>;

struct Listener {
    id: u64,
    once: bool,
    alive: Rc<Cell<bool>>,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    topics: HashMap<Topic, Vec<Listener>>,
}

impl BusInner {
    fn remove(&mut self, topic: &Topic, id: u64) {
        if let Some(listeners) = self.topics.get_mut(topic) {
            listeners.retain(|l| l.id != id);
            if listeners.is_empty() {
                self.topics.remove(topic);
            }
        }
    }
}

/// Single-threaded publish/subscribe hub for field events.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("topics", &inner.topics.len())
            .field(
                "listeners",
                &inner.topics.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

impl EventBus {
    /// Create a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to every event published on `topic` until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe(&self, topic: Topic, callback: impl Fn(&FieldEvent) + 'static) -> Subscription {
        self.register(topic, false, Rc::new(callback))
    }

    /// Listen to the next event published on `topic` only.
    pub fn subscribe_once(
        &self,
        topic: Topic,
        callback: impl Fn(&FieldEvent) + 'static,
    ) -> Subscription {
        self.register(topic, true, Rc::new(callback))
    }

    fn register(&self, topic: Topic, once: bool, callback: Callback) -> Subscription {
        let alive = Rc::new(Cell::new(true));
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.topics.entry(topic.clone()).or_default().push(Listener {
                id,
                once,
                alive: Rc::clone(&alive),
                callback,
            });
            id
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(event = %topic, id, once, "bus listener registered");
        Subscription {
            bus: Rc::downgrade(&self.inner),
            topic,
            id,
            alive,
        }
    }

    /// Publish `event` on `topic`. Returns the number of callbacks invoked.
    pub fn emit(&self, topic: &Topic, event: &FieldEvent) -> usize {
        // Snapshot first so the table is not borrowed while callbacks run.
        let snapshot: Vec<(u64, bool, Rc<Cell<bool>>, Callback)> = {
            let inner = self.inner.borrow();
            match inner.topics.get(topic) {
                Some(listeners) => listeners
                    .iter()
                    .map(|l| (l.id, l.once, Rc::clone(&l.alive), Rc::clone(&l.callback)))
                    .collect(),
                None => Vec::new(),
            }
        };

        let mut invoked = 0;
        for (id, once, alive, callback) in snapshot {
            if !alive.get() {
                continue;
            }
            if once {
                alive.set(false);
                self.inner.borrow_mut().remove(topic, id);
            }
            callback(event);
            invoked += 1;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(event = %topic, invoked, "bus emit");
        invoked
    }

    /// Number of live listeners on `topic`.
    #[must_use]
    pub fn listener_count(&self, topic: &Topic) -> usize {
        self.inner
            .borrow()
            .topics
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Number of live listeners across all topics.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.inner.borrow().topics.values().map(Vec::len).sum()
    }
}

/// RAII guard for one bus listener.
///
/// Dropping the guard (or calling [`unsubscribe`](Subscription::unsubscribe))
/// removes the listener from the bus right away.
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    topic: Topic,
    id: u64,
    alive: Rc<Cell<bool>>,
}

impl Subscription {
    /// Remove the listener. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.alive.replace(false) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.borrow_mut().remove(&self.topic, self.id);
        }
    }

    /// Whether the listener can still fire. A one-shot listener becomes
    /// inactive as soon as it is delivered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.alive.get() && self.bus.strong_count() > 0
    }

    /// Topic this subscription listens on.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::FieldPath;
    use crate::props::FieldProps;

    fn registered(name: &str) -> (Topic, FieldEvent) {
        (
            Topic::Registered(FieldPath::from([name])),
            FieldEvent::Registered(FieldProps::new([name])),
        )
    }

    #[test]
    fn subscribe_and_emit() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let (topic, event) = registered("a");

        let _sub = bus.subscribe(topic.clone(), move |_| count_clone.set(count_clone.get() + 1));

        assert_eq!(bus.emit(&topic, &event), 1);
        assert_eq!(bus.emit(&topic, &event), 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn topics_are_isolated() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let (a, _) = registered("a");
        let (b, event_b) = registered("b");

        let _sub = bus.subscribe(a, move |_| count_clone.set(count_clone.get() + 1));
        assert_eq!(bus.emit(&b, &event_b), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn drop_unsubscribes_immediately() {
        let bus = EventBus::new();
        let (topic, event) = registered("a");
        let sub = bus.subscribe(topic.clone(), |_| {});
        assert_eq!(bus.listener_count(&topic), 1);

        drop(sub);
        assert_eq!(bus.listener_count(&topic), 0);
        assert_eq!(bus.emit(&topic, &event), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let (topic, _) = registered("a");
        let keep = bus.subscribe(topic.clone(), |_| {});
        let sub = bus.subscribe(topic.clone(), |_| {});
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert!(keep.is_active());
        assert_eq!(bus.listener_count(&topic), 1);
    }

    #[test]
    fn once_fires_at_most_once() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let (topic, event) = registered("a");

        let sub = bus.subscribe_once(topic.clone(), move |_| count_clone.set(count_clone.get() + 1));
        bus.emit(&topic, &event);
        bus.emit(&topic, &event);

        assert_eq!(count.get(), 1);
        assert!(!sub.is_active());
        assert_eq!(bus.listener_count(&topic), 0);
    }

    #[test]
    fn once_removed_before_reentrant_emit() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0u32));
        let (topic, event) = registered("a");

        let bus_clone = bus.clone();
        let count_clone = Rc::clone(&count);
        let topic_clone = topic.clone();
        let event_clone = event.clone();
        let _sub = bus.subscribe_once(topic.clone(), move |_| {
            count_clone.set(count_clone.get() + 1);
            bus_clone.emit(&topic_clone, &event_clone);
        });

        bus.emit(&topic, &event);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn listener_removed_mid_emission_is_skipped() {
        let bus = EventBus::new();
        let (topic, event) = registered("a");
        let second_fired = Rc::new(Cell::new(false));

        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim_clone = Rc::clone(&victim);
        let _first = bus.subscribe(topic.clone(), move |_| {
            if let Some(sub) = victim_clone.borrow_mut().take() {
                sub.unsubscribe();
            }
        });
        let fired = Rc::clone(&second_fired);
        *victim.borrow_mut() = Some(bus.subscribe(topic.clone(), move |_| fired.set(true)));

        assert_eq!(bus.emit(&topic, &event), 1);
        assert!(!second_fired.get());
    }

    #[test]
    fn callback_may_subscribe_during_emit() {
        let bus = EventBus::new();
        let (topic, event) = registered("a");
        let late: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let bus_clone = bus.clone();
        let late_clone = Rc::clone(&late);
        let topic_clone = topic.clone();
        let _sub = bus.subscribe(topic.clone(), move |_| {
            late_clone
                .borrow_mut()
                .push(bus_clone.subscribe(topic_clone.clone(), |_| {}));
        });

        // The listener added during emission does not see the current event.
        assert_eq!(bus.emit(&topic, &event), 1);
        assert_eq!(bus.listener_count(&topic), 2);
    }

    #[test]
    fn registration_order() {
        let bus = EventBus::new();
        let (topic, event) = registered("a");
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let _s1 = bus.subscribe(topic.clone(), move |_| log1.borrow_mut().push('A'));
        let log2 = Rc::clone(&log);
        let _s2 = bus.subscribe_once(topic.clone(), move |_| log2.borrow_mut().push('B'));
        let log3 = Rc::clone(&log);
        let _s3 = bus.subscribe(topic.clone(), move |_| log3.borrow_mut().push('C'));

        bus.emit(&topic, &event);
        bus.emit(&topic, &event);
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C', 'A', 'C']);
    }

    #[test]
    fn subscription_outliving_bus_is_inert() {
        let (topic, _) = registered("a");
        let sub = {
            let bus = EventBus::new();
            bus.subscribe(topic, |_| {})
        };
        assert!(!sub.is_active());
        sub.unsubscribe();
    }

    #[test]
    fn clone_shares_listeners() {
        let bus = EventBus::new();
        let other = bus.clone();
        let (topic, event) = registered("a");
        let _sub = bus.subscribe(topic.clone(), |_| {});
        assert_eq!(other.emit(&topic, &event), 1);
        assert_eq!(other.total_listeners(), 1);
    }

    #[test]
    fn debug_format() {
        let bus = EventBus::new();
        let (topic, _) = registered("a");
        let sub = bus.subscribe(topic, |_| {});
        assert!(format!("{bus:?}").contains("listeners: 1"));
        assert!(format!("{sub:?}").contains("Subscription"));
    }
}
