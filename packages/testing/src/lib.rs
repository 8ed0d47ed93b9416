#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests and examples in this workspace.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs a test with a timeout to prevent infinite hangs.
///
/// The event loop runs until it has no more work, so a test that accidentally keeps
/// re-queueing work would otherwise never finish. The closure runs on its own thread; all
/// single-threaded state must be created inside it.
///
/// The timeout is 10 seconds under normal conditions and 60 seconds under Miri.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog
/// is disabled and the test function is executed directly. This allows mutation
/// testing to properly detect hanging mutations.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode).
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// with_watchdog(|| {
///     // Your test code here
///     assert_eq!(2 + 2, 4);
/// });
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already timed out.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("Test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("Test exceeded {timeout:?} timeout");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            // Thread panicked, join it to get the panic
            match test_handle.join() {
                Ok(()) => panic!("Test thread disconnected unexpectedly"),
                Err(e) => std::panic::resume_unwind(e),
            }
        }
    }
}

/// Records every call made to a handler, in order.
///
/// Clones share the same log, so one clone can be moved into a handler while the test keeps
/// another for assertions.
#[derive(Debug)]
pub struct CallLog<T> {
    calls: Rc<RefCell<Vec<T>>>,
}

impl<T> CallLog<T> {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Appends a call to the log.
    pub fn record(&self, call: T) {
        self.calls.borrow_mut().push(call);
    }

    /// Number of calls recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Whether no calls have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }
}

impl<T: Clone> CallLog<T> {
    /// A copy of every call recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<T> {
        self.calls.borrow().clone()
    }
}

impl<T> Clone for CallLog<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Rc::clone(&self.calls),
        }
    }
}

impl<T> Default for CallLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts how many of its tokens have been dropped.
///
/// Hand a [`DropToken`] to an object whose lifetime is under test and check the count later.
#[derive(Clone, Debug, Default)]
pub struct DropCounter {
    dropped: Rc<Cell<usize>>,
}

impl DropCounter {
    /// Creates a counter with nothing dropped yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that increments this counter when dropped.
    #[must_use]
    pub fn token(&self) -> DropToken {
        DropToken {
            dropped: Rc::clone(&self.dropped),
        }
    }

    /// How many tokens of this counter have been dropped.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.get()
    }
}

/// Increments its [`DropCounter`] when dropped.
#[derive(Debug)]
pub struct DropToken {
    dropped: Rc<Cell<usize>>,
}

impl Drop for DropToken {
    fn drop(&mut self) {
        self.dropped.set(self.dropped.get().wrapping_add(1));
    }
}
