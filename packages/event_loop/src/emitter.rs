//! Objects that emit named events and announce their own destruction.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::EventLoop;

/// Identifies one subscription on one [`Emitter`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

#[derive(Debug, Eq, PartialEq)]
enum Topic {
    Event(Box<str>),
    Destroyed,
}

impl Topic {
    fn is_event(&self, name: &str) -> bool {
        matches!(self, Self::Event(event) if **event == *name)
    }
}

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    handler: Rc<dyn Fn()>,
}

struct EmitterInner {
    name: Option<String>,
    event_loop: EventLoop,
    subscriptions: RefCell<Vec<Subscription>>,
    next_subscription: Cell<u64>,
    destroyed: Cell<bool>,
}

impl EmitterInner {
    fn subscribe(&self, topic: Topic, handler: Rc<dyn Fn()>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription
            .set(self.next_subscription.get().wrapping_add(1));

        trace!(emitter = self.display_name(), ?id, ?topic, "subscribed");

        self.subscriptions.borrow_mut().push(Subscription { id, topic, handler });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();

        let Some(position) = subscriptions.iter().position(|s| s.id == id) else {
            return false;
        };

        // The handler is dropped after the borrow ends, in case dropping it touches us again.
        let removed = subscriptions.remove(position);
        drop(subscriptions);
        drop(removed);

        true
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscriptions.borrow().iter().any(|s| s.id == id)
    }

    /// Calls every handler whose topic matches, as subscribed at the moment of the call.
    ///
    /// Handlers unsubscribed by an earlier handler of the same delivery are skipped.
    /// Handlers subscribed during the delivery are not called until the next one.
    fn deliver(&self, matches: impl Fn(&Topic) -> bool) -> usize {
        let snapshot: Vec<(SubscriptionId, Rc<dyn Fn()>)> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| matches(&s.topic))
            .map(|s| (s.id, Rc::clone(&s.handler)))
            .collect();

        let mut delivered: usize = 0;

        for (id, handler) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }

            handler();
            delivered = delivered.wrapping_add(1);
        }

        delivered
    }

    fn emit(&self, event: &str) -> usize {
        if self.destroyed.get() {
            return 0;
        }

        let delivered = self.deliver(|topic| topic.is_event(event));
        trace!(emitter = self.display_name(), event, delivered, "emitted");
        delivered
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }

        let notified = self.deliver(|topic| *topic == Topic::Destroyed);
        let remaining = mem::take(&mut *self.subscriptions.borrow_mut());

        debug!(
            emitter = self.display_name(),
            notified,
            disconnected = remaining.len(),
            "emitter destroyed"
        );

        drop(remaining);
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

impl fmt::Debug for EmitterInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("name", &self.name)
            .field("subscriptions", &self.subscriptions.borrow().len())
            .field("destroyed", &self.destroyed.get())
            .finish_non_exhaustive()
    }
}

/// An object that emits named events to its subscribers.
///
/// Events carry no payload; a subscriber is a plain `Fn()` registered for one event name.
/// Delivery via [`emit()`][Self::emit] is synchronous, on the calling thread.
///
/// Dropping the emitter destroys it: subscribers registered with
/// [`subscribe_destroyed()`][Self::subscribe_destroyed] are notified exactly once, after which
/// every subscription is removed and no further events are delivered. Observers that must not
/// keep the emitter alive hold a [`WeakEmitter`].
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use event_loop::{Emitter, EventLoop};
///
/// let event_loop = EventLoop::new();
/// let emitter = Emitter::new(&event_loop);
/// let finished = Rc::new(Cell::new(0));
///
/// emitter.subscribe("finished", {
///     let finished = Rc::clone(&finished);
///     move || finished.set(finished.get() + 1)
/// });
///
/// assert_eq!(emitter.emit("finished"), 1);
/// assert_eq!(finished.get(), 1);
/// ```
#[derive(Debug)]
pub struct Emitter {
    inner: Rc<EmitterInner>,
}

impl Emitter {
    /// Creates an emitter that belongs to `event_loop`.
    #[must_use]
    pub fn new(event_loop: &EventLoop) -> Self {
        Self::create(event_loop, None)
    }

    /// Creates a named emitter that belongs to `event_loop`.
    ///
    /// The name only appears in logs.
    #[must_use]
    pub fn with_name(event_loop: &EventLoop, name: impl Into<String>) -> Self {
        Self::create(event_loop, Some(name.into()))
    }

    fn create(event_loop: &EventLoop, name: Option<String>) -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                name,
                event_loop: event_loop.clone(),
                subscriptions: RefCell::new(Vec::new()),
                next_subscription: Cell::new(0),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// The name given in [`with_name()`][Self::with_name], if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The event loop this emitter belongs to.
    #[must_use]
    pub fn event_loop(&self) -> &EventLoop {
        &self.inner.event_loop
    }

    /// Registers `handler` to be called every time `event` is emitted.
    pub fn subscribe(&self, event: &str, handler: impl Fn() + 'static) -> SubscriptionId {
        self.inner
            .subscribe(Topic::Event(event.into()), Rc::new(handler))
    }

    /// Registers `handler` to be called once, when this emitter is destroyed.
    pub fn subscribe_destroyed(&self, handler: impl Fn() + 'static) -> SubscriptionId {
        self.inner.subscribe(Topic::Destroyed, Rc::new(handler))
    }

    /// Removes a subscription. Returns `false` if it did not exist.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Number of handlers currently subscribed to `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.inner
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.topic.is_event(event))
            .count()
    }

    /// Delivers `event` to its subscribers right now, returning how many handlers ran.
    ///
    /// Panics raised by a handler propagate to the caller.
    pub fn emit(&self, event: &str) -> usize {
        self.inner.emit(event)
    }

    /// Delivers `event` to its subscribers on the next iteration of the event loop.
    ///
    /// If the emitter is destroyed before then, the event is never delivered.
    pub fn post_emit(&self, event: &str) {
        let weak = Rc::downgrade(&self.inner);
        let event = event.to_owned();

        self.inner.event_loop.post(move || {
            if let Some(inner) = weak.upgrade() {
                inner.emit(&event);
            }
        });
    }

    /// Returns a non-owning reference to this emitter.
    #[must_use]
    pub fn downgrade(&self) -> WeakEmitter {
        WeakEmitter {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Drop for Emitter {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}

/// A non-owning reference to an [`Emitter`].
///
/// Holding one never keeps the emitter alive. Pair it with a
/// [`subscribe_destroyed()`][Emitter::subscribe_destroyed] subscription to learn when the
/// emitter goes away.
#[derive(Clone, Debug)]
pub struct WeakEmitter {
    inner: Weak<EmitterInner>,
}

impl WeakEmitter {
    /// Removes a subscription. Returns `false` if it did not exist or the emitter is gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.unsubscribe(id))
    }

    /// Whether the emitter still exists and has not started its destruction.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| !inner.destroyed.get())
    }
}
