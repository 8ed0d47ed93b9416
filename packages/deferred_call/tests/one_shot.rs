//! Integration tests for one-shot bindings and delayed handlers, driven by a real event loop.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use deferred_call::{
    ABOUT_A_MINUTE, DelayScheduler, connect, make_callback_closure, make_closure,
};
use event_loop::{Emitter, EventLoop, ManualClock};
use testing::{CallLog, DropCounter, DropToken, with_watchdog};

#[derive(Debug, Default)]
struct StatusLog {
    entries: RefCell<Vec<(i32, &'static str)>>,
}

impl StatusLog {
    fn record(&self, code: i32, status: &'static str) {
        self.entries.borrow_mut().push((code, status));
    }
}

#[derive(Debug, Default)]
struct Counter {
    calls: Cell<u32>,
}

impl Counter {
    fn hit(&self) {
        self.calls.set(self.calls.get().wrapping_add(1));
    }

    fn hit_with_token(&self, _token: DropToken) {
        self.hit();
    }
}

fn manual_loop() -> (EventLoop, ManualClock) {
    let clock = ManualClock::new();
    let event_loop = EventLoop::builder().manual_clock(clock.clone()).build();
    (event_loop, clock)
}

#[test]
fn bound_values_arrive_once_and_binding_is_disposed() {
    with_watchdog(|| {
        let event_loop = EventLoop::new();
        let emitter = Emitter::with_name(&event_loop, "request");
        let log = Rc::new(StatusLog::default());

        connect(
            &emitter,
            "finished",
            make_closure(&log, StatusLog::record, (42, "ok")),
        );

        emitter.emit("finished");
        emitter.emit("finished");

        assert_eq!(*log.entries.borrow(), vec![(42, "ok")]);
        assert_eq!(event_loop.pending_deletion_count(), 1);

        event_loop.run_until_idle();

        assert_eq!(event_loop.pending_deletion_count(), 0);
        assert_eq!(emitter.subscriber_count("finished"), 0);
    });
}

#[test]
fn destroyed_emitter_never_invokes() {
    with_watchdog(|| {
        let event_loop = EventLoop::new();
        let emitter = Emitter::new(&event_loop);
        let target = Rc::new(Counter::default());
        let counter = DropCounter::new();

        connect(
            &emitter,
            "finished",
            make_closure(&target, Counter::hit_with_token, (counter.token(),)),
        );

        drop(emitter);
        event_loop.run_until_idle();

        assert_eq!(target.calls.get(), 0);
        assert_eq!(counter.dropped(), 1);
        assert_eq!(event_loop.pending_deletion_count(), 0);
    });
}

#[test]
fn fire_then_destroy_in_same_iteration_fires() {
    with_watchdog(|| {
        let event_loop = EventLoop::new();
        let emitter = Rc::new(Emitter::new(&event_loop));
        let target = Rc::new(Counter::default());

        connect(&emitter, "finished", make_closure(&target, Counter::hit, ()));

        emitter.post_emit("finished");
        event_loop.post({
            let emitter = Rc::clone(&emitter);
            move || drop(emitter)
        });
        drop(emitter);

        event_loop.run_until_idle();

        assert_eq!(target.calls.get(), 1);
        assert_eq!(event_loop.pending_deletion_count(), 0);
    });
}

#[test]
fn destroy_then_fire_in_same_iteration_abandons() {
    with_watchdog(|| {
        let event_loop = EventLoop::new();
        let emitter = Rc::new(Emitter::new(&event_loop));
        let target = Rc::new(Counter::default());

        connect(&emitter, "finished", make_closure(&target, Counter::hit, ()));

        event_loop.post({
            let emitter = Rc::clone(&emitter);
            move || drop(emitter)
        });
        emitter.post_emit("finished");
        drop(emitter);

        event_loop.run_until_idle();

        assert_eq!(target.calls.get(), 0);
        assert_eq!(event_loop.pending_deletion_count(), 0);
    });
}

#[test]
fn many_bindings_on_one_emitter_each_fire_once() {
    with_watchdog(|| {
        let event_loop = EventLoop::new();
        let emitter = Emitter::new(&event_loop);
        let log = CallLog::new();

        for i in 0..5 {
            let log = log.clone();
            connect(&emitter, "tick", make_callback_closure(move || log.record(i)));
        }

        emitter.emit("tick");
        emitter.emit("tick");
        event_loop.run_until_idle();

        assert_eq!(log.calls(), vec![0, 1, 2, 3, 4]);
    });
}

#[test]
fn binding_can_schedule_a_delayed_handler() {
    with_watchdog(|| {
        let (event_loop, clock) = manual_loop();
        let scheduler = Rc::new(DelayScheduler::with_seed(&event_loop, 3));
        let emitter = Emitter::new(&event_loop);
        let target = Rc::new(Counter::default());
        let start = clock.now();

        connect(
            &emitter,
            "retry",
            make_closure(
                &scheduler,
                {
                    let target = Rc::clone(&target);
                    move |scheduler: &DelayScheduler| {
                        scheduler.after_about_a_minute(&target, Counter::hit);
                    }
                },
                (),
            ),
        );

        emitter.emit("retry");
        assert_eq!(target.calls.get(), 0);

        event_loop.run();

        assert_eq!(target.calls.get(), 1);
        assert!(ABOUT_A_MINUTE.contains(&clock.now().duration_since(start)));
    });
}

#[test]
fn zero_delay_runs_on_next_iteration() {
    with_watchdog(|| {
        let (event_loop, _clock) = manual_loop();
        let scheduler = DelayScheduler::new(&event_loop);
        let target = Rc::new(Counter::default());

        scheduler.after(&target, Counter::hit, Duration::ZERO);
        assert_eq!(target.calls.get(), 0);

        event_loop.run_once();
        assert_eq!(target.calls.get(), 1);
    });
}

#[test]
fn delays_run_in_deadline_order() {
    with_watchdog(|| {
        let (event_loop, _clock) = manual_loop();
        let scheduler = DelayScheduler::new(&event_loop);
        let log = Rc::new(CallLog::<&'static str>::new());

        scheduler.after(&log, |log| log.record("slow"), Duration::from_secs(30));
        scheduler.after(&log, |log| log.record("fast"), Duration::from_secs(1));
        scheduler.after(&log, |log| log.record("medium"), Duration::from_secs(10));

        event_loop.run();

        assert_eq!(log.calls(), vec!["fast", "medium", "slow"]);
    });
}
