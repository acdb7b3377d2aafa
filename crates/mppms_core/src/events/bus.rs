//! Session-scoped change bus.
//!
//! # Responsibility
//! - Fan one change out to every subscribed observer, synchronously, on the
//!   calling thread, in subscription order.
//!
//! # Invariants
//! - Subscribing the same observer twice yields the same subscription.
//! - The bus holds weak handles; a dropped observer is never called again.
//! - A failing observer is logged and skipped; delivery continues.
//! - A publish issued while a dispatch is running is queued and delivered
//!   after the current event reaches every observer.
//! - One dispatch delivers at most `max_rounds` events; the rest are dropped
//!   and reported.

use crate::events::ChangeEvent;
use log::{debug, error, warn};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::error::Error;
use std::rc::{Rc, Weak};

pub const DEFAULT_MAX_ROUNDS: usize = 32;

/// Error type returned from `ChangeObserver::on_change`.
pub type ObserverError = Box<dyn Error>;

/// Receiver of change notifications.
pub trait ChangeObserver {
    /// Re-derive view state after `event`.
    fn on_change(&self, event: &ChangeEvent) -> Result<(), ObserverError>;

    /// Lets an observer skip events it cannot be affected by.
    fn is_interested(&self, event: &ChangeEvent) -> bool {
        let _ = event;
        true
    }

    /// Stable name used in log metadata.
    fn observer_name(&self) -> &'static str {
        "observer"
    }
}

/// Handle returned by `ChangeBus::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    observer: Weak<dyn ChangeObserver>,
}

/// Outcome of one `publish` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A dispatch was already running; the event was appended to its queue.
    Queued,
    /// This call ran the dispatch, including every event queued meanwhile.
    Delivered(DeliveryReport),
}

/// Counters for one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Events delivered, the published one included.
    pub events: usize,
    /// Successful `on_change` calls.
    pub deliveries: usize,
    /// Observers that declined an event via `is_interested`.
    pub skipped: usize,
    /// `on_change` calls that returned an error.
    pub failures: usize,
    /// Events discarded after the round limit.
    pub dropped: usize,
}

/// Explicit, constructor-injected dispatcher.
pub struct ChangeBus {
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u64>,
    pending: RefCell<VecDeque<ChangeEvent>>,
    dispatching: Cell<bool>,
    max_rounds: usize,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Ends a dispatch on every exit path. Events still queued when an
/// observer unwinds are discarded, never carried into the next publish.
struct DispatchGuard<'a> {
    flag: &'a Cell<bool>,
    pending: &'a RefCell<VecDeque<ChangeEvent>>,
}

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>, pending: &'a RefCell<VecDeque<ChangeEvent>>) -> Self {
        flag.set(true);
        Self { flag, pending }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
        if let Ok(mut pending) = self.pending.try_borrow_mut() {
            if !pending.is_empty() {
                warn!(
                    "event=bus_dispatch_aborted module=events status=error dropped={}",
                    pending.len()
                );
                pending.clear();
            }
        }
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::with_max_rounds(DEFAULT_MAX_ROUNDS)
    }

    /// `max_rounds` is clamped to at least 1.
    pub fn with_max_rounds(max_rounds: usize) -> Self {
        Self {
            subscriptions: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            pending: RefCell::new(VecDeque::new()),
            dispatching: Cell::new(false),
            max_rounds: max_rounds.max(1),
        }
    }

    /// Registers `observer`; returns the existing id if already registered.
    pub fn subscribe<O: ChangeObserver + 'static>(&self, observer: &Rc<O>) -> SubscriptionId {
        let address = Rc::as_ptr(observer) as *const ();
        let mut subscriptions = self.subscriptions.borrow_mut();
        subscriptions.retain(|sub| sub.observer.strong_count() > 0);

        if let Some(existing) = subscriptions
            .iter()
            .find(|sub| sub.observer.as_ptr() as *const () == address)
        {
            debug!(
                "event=bus_subscribe module=events status=noop subscription={}",
                existing.id.0
            );
            return existing.id;
        }

        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let weak: Weak<dyn ChangeObserver> = Rc::downgrade(observer) as Weak<dyn ChangeObserver>;
        subscriptions.push(Subscription { id, observer: weak });
        debug!(
            "event=bus_subscribe module=events status=ok subscription={} observer={}",
            id.0,
            observer.observer_name()
        );
        id
    }

    /// Removes a subscription. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);
        let removed = subscriptions.len() != before;
        if removed {
            debug!(
                "event=bus_unsubscribe module=events status=ok subscription={}",
                id.0
            );
        }
        removed
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions
            .borrow()
            .iter()
            .any(|sub| sub.id == id && sub.observer.strong_count() > 0)
    }

    /// Number of subscriptions whose observer is still alive.
    pub fn len(&self) -> usize {
        self.subscriptions
            .borrow()
            .iter()
            .filter(|sub| sub.observer.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Delivers `event` to every observer, or queues it when re-entered.
    pub fn publish(&self, event: ChangeEvent) -> PublishOutcome {
        self.pending.borrow_mut().push_back(event);
        if self.dispatching.get() {
            debug!("event=bus_publish module=events status=queued change={event}");
            return PublishOutcome::Queued;
        }

        let _guard = DispatchGuard::enter(&self.dispatching, &self.pending);
        let mut report = DeliveryReport::default();
        loop {
            let Some(next) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            if report.events == self.max_rounds {
                let mut pending = self.pending.borrow_mut();
                report.dropped = pending.len() + 1;
                pending.clear();
                error!(
                    "event=bus_cascade_limit module=events status=error max_rounds={} dropped={}",
                    self.max_rounds, report.dropped
                );
                break;
            }
            report.events += 1;
            self.deliver(&next, &mut report);
        }

        debug!(
            "event=bus_publish module=events status=ok change={event} events={} deliveries={} skipped={} failures={} dropped={}",
            report.events, report.deliveries, report.skipped, report.failures, report.dropped
        );
        PublishOutcome::Delivered(report)
    }

    fn deliver(&self, event: &ChangeEvent, report: &mut DeliveryReport) {
        // Snapshot so observers may (un)subscribe while being notified.
        let snapshot: Vec<(SubscriptionId, Weak<dyn ChangeObserver>)> = self
            .subscriptions
            .borrow()
            .iter()
            .map(|sub| (sub.id, sub.observer.clone()))
            .collect();

        for (id, weak) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }
            let Some(observer) = weak.upgrade() else {
                continue;
            };
            if !observer.is_interested(event) {
                report.skipped += 1;
                continue;
            }
            match observer.on_change(event) {
                Ok(()) => report.deliveries += 1,
                Err(err) => {
                    report.failures += 1;
                    warn!(
                        "event=bus_observer_failed module=events status=error subscription={} observer={} change={event} error={err}",
                        id.0,
                        observer.observer_name()
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeBus, ChangeObserver, ObserverError, PublishOutcome};
    use crate::events::{ChangeEvent, Mutation};
    use crate::model::entity::{EntityId, EntityKind};
    use std::cell::Cell;
    use std::panic::AssertUnwindSafe;
    use std::rc::Rc;

    struct Counter {
        calls: Cell<usize>,
    }

    impl ChangeObserver for Counter {
        fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }
    }

    fn event() -> ChangeEvent {
        ChangeEvent::new(EntityKind::Task, Mutation::Updated, EntityId(7))
    }

    #[test]
    fn resubscribing_is_idempotent() {
        let bus = ChangeBus::new();
        let counter = Rc::new(Counter {
            calls: Cell::new(0),
        });
        let first = bus.subscribe(&counter);
        let second = bus.subscribe(&counter);
        assert_eq!(first, second);

        bus.publish(event());
        assert_eq!(counter.calls.get(), 1);
    }

    #[test]
    fn dropped_observer_is_pruned() {
        let bus = ChangeBus::new();
        let counter = Rc::new(Counter {
            calls: Cell::new(0),
        });
        bus.subscribe(&counter);
        assert_eq!(bus.len(), 1);
        drop(counter);
        assert!(bus.is_empty());

        let PublishOutcome::Delivered(report) = bus.publish(event()) else {
            panic!("top-level publish must dispatch");
        };
        assert_eq!(report.deliveries, 0);
    }

    #[test]
    fn round_limit_is_clamped_to_one() {
        let bus = ChangeBus::with_max_rounds(0);
        let PublishOutcome::Delivered(report) = bus.publish(event()) else {
            panic!("top-level publish must dispatch");
        };
        assert_eq!(report.events, 1);
        assert_eq!(report.dropped, 0);
    }

    struct Exploder {
        bus: Rc<ChangeBus>,
        armed: Cell<bool>,
    }

    impl ChangeObserver for Exploder {
        fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
            if self.armed.replace(false) {
                self.bus.publish(ChangeEvent::new(
                    EntityKind::Asset,
                    Mutation::Deleted,
                    EntityId(3),
                ));
                panic!("observer blew up");
            }
            Ok(())
        }
    }

    #[test]
    fn unwinding_dispatch_discards_its_queue() {
        let bus = Rc::new(ChangeBus::new());
        let counter = Rc::new(Counter {
            calls: Cell::new(0),
        });
        let exploder = Rc::new(Exploder {
            bus: Rc::clone(&bus),
            armed: Cell::new(true),
        });
        bus.subscribe(&counter);
        bus.subscribe(&exploder);

        let unwound = std::panic::catch_unwind(AssertUnwindSafe(|| bus.publish(event())));
        assert!(unwound.is_err());
        assert!(!bus.is_dispatching());
        assert_eq!(counter.calls.get(), 1);

        let PublishOutcome::Delivered(report) = bus.publish(event()) else {
            panic!("top-level publish must dispatch");
        };
        assert_eq!(report.events, 1);
        assert_eq!(report.deliveries, 2);
        assert_eq!(counter.calls.get(), 2);
    }
}
