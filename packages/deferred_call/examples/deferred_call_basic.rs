//! Example demonstrating one-shot bindings and delayed handlers on an event loop.
//!
//! A download emits "finished" once it completes. A status display shows the result when that
//! happens and then schedules a refresh about a minute later. A second download is cancelled
//! by dropping its emitter, so its binding never fires.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use deferred_call::{DelayScheduler, connect, make_closure};
use event_loop::{Emitter, EventLoop, ManualClock};

#[derive(Default)]
struct StatusDisplay {
    lines: RefCell<Vec<String>>,
}

impl StatusDisplay {
    fn show(&self, code: i32, status: &'static str) {
        let line = format!("download finished: {code} {status}");
        println!("{line}");
        self.lines.borrow_mut().push(line);
    }

    fn refresh(&self) {
        println!("refreshing status display");
        self.lines.borrow_mut().push(String::from("refreshed"));
    }
}

fn main() {
    // The manual clock lets the example skip over the delay instead of sleeping through it.
    let clock = ManualClock::new();
    let event_loop = EventLoop::builder().manual_clock(clock.clone()).build();
    let scheduler = Rc::new(DelayScheduler::new(&event_loop));

    let display = Rc::new(StatusDisplay::default());
    let download = Emitter::with_name(&event_loop, "download");
    let cancelled_download = Emitter::with_name(&event_loop, "cancelled download");

    connect(
        &download,
        "finished",
        make_closure(&display, StatusDisplay::show, (200, "ok")),
    );
    connect(
        &download,
        "finished",
        make_closure(
            &scheduler,
            {
                let display = Rc::clone(&display);
                move |scheduler: &DelayScheduler| {
                    scheduler.after_about_a_minute(&display, StatusDisplay::refresh);
                }
            },
            (),
        ),
    );
    connect(
        &cancelled_download,
        "finished",
        make_closure(&display, StatusDisplay::show, (500, "never shown")),
    );

    let start = clock.now();

    event_loop.single_shot(Duration::from_secs(2), move || {
        download.emit("finished");
        download.emit("finished");
    });
    drop(cancelled_download);

    event_loop.run();

    println!(
        "event loop idle after {:?} of virtual time",
        clock.now().duration_since(start)
    );

    assert_eq!(
        *display.lines.borrow(),
        vec!["download finished: 200 ok", "refreshed"]
    );
}
