mod common;

use common::{event_log, EventLog, Recorder};
use mppms_core::events::bus::ObserverError;
use mppms_core::{
    ChangeBus, ChangeEvent, ChangeObserver, DeliveryReport, EntityId, EntityKind, Mutation,
    PublishOutcome, SubscriptionId,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn task_updated(id: i64) -> ChangeEvent {
    ChangeEvent::new(EntityKind::Task, Mutation::Updated, EntityId(id))
}

fn delivered(outcome: PublishOutcome) -> DeliveryReport {
    match outcome {
        PublishOutcome::Delivered(report) => report,
        PublishOutcome::Queued => panic!("expected the call to run the dispatch"),
    }
}

#[test]
fn every_observer_is_notified_once_in_subscription_order() {
    let bus = ChangeBus::new();
    let log = event_log();
    let o1 = Recorder::new("o1", &log);
    let o2 = Recorder::new("o2", &log);
    let o3 = Recorder::new("o3", &log);
    bus.subscribe(&o1);
    bus.subscribe(&o2);
    bus.subscribe(&o3);

    let report = delivered(bus.publish(task_updated(7)));

    assert_eq!(
        *log.borrow(),
        vec!["o1:task:updated:7", "o2:task:updated:7", "o3:task:updated:7"]
    );
    assert_eq!(report.events, 1);
    assert_eq!(report.deliveries, 3);
}

#[test]
fn failing_observer_does_not_block_the_rest() {
    let bus = ChangeBus::new();
    let log = event_log();
    let first = Recorder::failing("first", &log);
    let second = Recorder::new("second", &log);
    bus.subscribe(&first);
    bus.subscribe(&second);

    let report = delivered(bus.publish(task_updated(1)));

    assert_eq!(report.failures, 1);
    assert_eq!(report.deliveries, 1);
    assert_eq!(log.borrow().len(), 2);
    assert_eq!(log.borrow()[1], "second:task:updated:1");
}

/// Publishes a follow-up event from inside the first notification.
struct Cascader {
    bus: Rc<ChangeBus>,
    log: EventLog,
    fired: Cell<bool>,
    outcome: RefCell<Option<PublishOutcome>>,
}

impl ChangeObserver for Cascader {
    fn on_change(&self, event: &ChangeEvent) -> Result<(), ObserverError> {
        self.log.borrow_mut().push(format!("cascader:{event}"));
        if !self.fired.replace(true) {
            let outcome = self.bus.publish(task_updated(99));
            *self.outcome.borrow_mut() = Some(outcome);
        }
        Ok(())
    }
}

#[test]
fn nested_publish_is_queued_until_current_event_finishes() {
    let bus = Rc::new(ChangeBus::new());
    let log = event_log();
    let cascader = Rc::new(Cascader {
        bus: Rc::clone(&bus),
        log: Rc::clone(&log),
        fired: Cell::new(false),
        outcome: RefCell::new(None),
    });
    let tail = Recorder::new("tail", &log);
    bus.subscribe(&cascader);
    bus.subscribe(&tail);

    let report = delivered(bus.publish(task_updated(1)));

    assert_eq!(*cascader.outcome.borrow(), Some(PublishOutcome::Queued));
    assert_eq!(
        *log.borrow(),
        vec![
            "cascader:task:updated:1",
            "tail:task:updated:1",
            "cascader:task:updated:99",
            "tail:task:updated:99",
        ]
    );
    assert_eq!(report.events, 2);
    assert!(!bus.is_dispatching());
}

/// Republishes on every notification.
struct Echo {
    bus: Rc<ChangeBus>,
    calls: Cell<usize>,
}

impl ChangeObserver for Echo {
    fn on_change(&self, event: &ChangeEvent) -> Result<(), ObserverError> {
        self.calls.set(self.calls.get() + 1);
        self.bus.publish(*event);
        Ok(())
    }
}

#[test]
fn runaway_cascade_stops_at_round_limit() {
    let bus = Rc::new(ChangeBus::with_max_rounds(5));
    let echo = Rc::new(Echo {
        bus: Rc::clone(&bus),
        calls: Cell::new(0),
    });
    bus.subscribe(&echo);

    let report = delivered(bus.publish(task_updated(3)));

    assert_eq!(report.events, 5);
    assert_eq!(report.dropped, 1);
    assert_eq!(echo.calls.get(), 5);

    // The bus is usable again after the limit trips.
    let again = delivered(bus.publish(task_updated(4)));
    assert_eq!(again.events, 5);
}

/// Unsubscribes a peer when notified.
struct Closer {
    bus: Rc<ChangeBus>,
    victim: Cell<Option<SubscriptionId>>,
}

impl ChangeObserver for Closer {
    fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
        if let Some(id) = self.victim.take() {
            self.bus.unsubscribe(id);
        }
        Ok(())
    }
}

#[test]
fn observer_removed_mid_dispatch_is_not_notified() {
    let bus = Rc::new(ChangeBus::new());
    let log = event_log();
    let closer = Rc::new(Closer {
        bus: Rc::clone(&bus),
        victim: Cell::new(None),
    });
    let victim = Recorder::new("victim", &log);
    bus.subscribe(&closer);
    let victim_id = bus.subscribe(&victim);
    closer.victim.set(Some(victim_id));

    bus.publish(task_updated(2));

    assert!(log.borrow().is_empty());
    assert!(!bus.is_subscribed(victim_id));
    assert_eq!(bus.len(), 1);
}

#[test]
fn unsubscribe_is_idempotent_and_dropped_views_stop_receiving() {
    let bus = ChangeBus::new();
    let log = event_log();
    let kept = Recorder::new("kept", &log);
    let removed = Recorder::new("removed", &log);
    let kept_id = bus.subscribe(&kept);
    let removed_id = bus.subscribe(&removed);

    assert!(bus.unsubscribe(removed_id));
    assert!(!bus.unsubscribe(removed_id));

    {
        let transient = Recorder::new("transient", &log);
        bus.subscribe(&transient);
    }
    bus.publish(task_updated(5));

    assert_eq!(*log.borrow(), vec!["kept:task:updated:5"]);
    assert!(bus.is_subscribed(kept_id));
}

/// Only cares about asset events.
struct AssetsOnly {
    seen: Cell<usize>,
}

impl ChangeObserver for AssetsOnly {
    fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
        self.seen.set(self.seen.get() + 1);
        Ok(())
    }

    fn is_interested(&self, event: &ChangeEvent) -> bool {
        event.kind == EntityKind::Asset
    }
}

#[test]
fn uninterested_observers_are_skipped() {
    let bus = ChangeBus::new();
    let watcher = Rc::new(AssetsOnly { seen: Cell::new(0) });
    bus.subscribe(&watcher);

    let skipped = delivered(bus.publish(task_updated(1)));
    let seen = delivered(bus.publish(ChangeEvent::new(
        EntityKind::Asset,
        Mutation::Deleted,
        EntityId(4),
    )));

    assert_eq!(skipped.skipped, 1);
    assert_eq!(seen.deliveries, 1);
    assert_eq!(watcher.seen.get(), 1);
}
