//! One-shot bindings of a closure to an emitter event.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use event_loop::{Emitter, SubscriptionId, WeakEmitter, WeakEventLoop};
use scopeguard::defer;
use tracing::{debug, trace};

use crate::Closure;

/// Invokes `closure` the first time `emitter` emits `event`.
///
/// The binding manages itself: after the first `event` it disconnects from the emitter and
/// schedules its own disposal on the emitter's event loop. If the emitter is destroyed first,
/// the closure is never invoked and is dropped together with the binding. Either way, at most
/// one of the two outcomes happens and the closure runs at most once.
///
/// There is no handle to cancel the binding. Destroying the emitter is the only way to prevent
/// the call.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use deferred_call::{connect, make_closure};
/// use event_loop::{Emitter, EventLoop};
///
/// struct Player {
///     position: Cell<u32>,
/// }
///
/// impl Player {
///     fn seek(&self, position: u32) {
///         self.position.set(position);
///     }
/// }
///
/// let event_loop = EventLoop::new();
/// let media = Emitter::with_name(&event_loop, "media");
/// let player = Rc::new(Player {
///     position: Cell::new(0),
/// });
///
/// connect(&media, "loaded", make_closure(&player, Player::seek, (90,)));
///
/// media.emit("loaded");
/// media.emit("loaded");
///
/// assert_eq!(player.position.get(), 90);
/// ```
pub fn connect(emitter: &Emitter, event: &str, closure: Box<dyn Closure>) {
    BindingHelper::arm(emitter, event, closure);
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BindingState {
    /// Waiting for the first of the trigger event or the emitter's destruction.
    Armed,

    /// The trigger event arrived and the closure was (or is being) invoked.
    Fired,

    /// The emitter was destroyed first; the closure will never be invoked.
    Abandoned,
}

/// Keeps a closure until its emitter either fires the bound event or is destroyed.
///
/// The helper owns itself through `keep_alive` while armed. Leaving the armed state hands that
/// reference to the event loop's deferred-deletion queue, so the helper is never dropped from
/// inside one of its own handlers.
pub(crate) struct BindingHelper {
    state: Cell<BindingState>,
    closure: RefCell<Option<Box<dyn Closure>>>,

    emitter: WeakEmitter,
    // Weak, since the loop owns the helper once it is released.
    event_loop: WeakEventLoop,
    event: Box<str>,

    // Trigger event subscription and destruction subscription, in that order.
    subscriptions: Cell<Option<(SubscriptionId, SubscriptionId)>>,

    keep_alive: RefCell<Option<Rc<Self>>>,
}

impl BindingHelper {
    /// Subscribes a new helper to `emitter` and returns a non-owning reference to it.
    pub(crate) fn arm(emitter: &Emitter, event: &str, closure: Box<dyn Closure>) -> Weak<Self> {
        let helper = Rc::new(Self {
            state: Cell::new(BindingState::Armed),
            closure: RefCell::new(Some(closure)),
            emitter: emitter.downgrade(),
            event_loop: emitter.event_loop().downgrade(),
            event: event.into(),
            subscriptions: Cell::new(None),
            keep_alive: RefCell::new(None),
        });

        let weak = Rc::downgrade(&helper);

        let fired = emitter.subscribe(event, {
            let weak = Weak::clone(&weak);

            move || {
                if let Some(helper) = weak.upgrade() {
                    helper.fire();
                }
            }
        });

        let destroyed = emitter.subscribe_destroyed({
            let weak = Weak::clone(&weak);

            move || {
                if let Some(helper) = weak.upgrade() {
                    helper.abandon();
                }
            }
        });

        helper.subscriptions.set(Some((fired, destroyed)));
        *helper.keep_alive.borrow_mut() = Some(Rc::clone(&helper));

        trace!(event, "binding armed");

        weak
    }

    fn fire(&self) {
        if !self.leave_armed(BindingState::Fired) {
            return;
        }

        // Released even if the closure panics.
        defer! {
            self.release();
        }

        let closure = self.closure.borrow_mut().take();

        if let Some(closure) = closure {
            closure.invoke();
        }
    }

    fn abandon(&self) {
        if !self.leave_armed(BindingState::Abandoned) {
            return;
        }

        self.release();
    }

    /// Moves from `Armed` to `next` and disconnects from the emitter.
    ///
    /// Returns `false` if the helper had already left the armed state, in which case nothing
    /// is changed.
    fn leave_armed(&self, next: BindingState) -> bool {
        if self.state.get() != BindingState::Armed {
            return false;
        }

        self.state.set(next);

        if let Some((fired, destroyed)) = self.subscriptions.take() {
            self.emitter.unsubscribe(fired);
            self.emitter.unsubscribe(destroyed);
        }

        debug!(event = &*self.event, state = ?next, "binding completed");

        true
    }

    fn release(&self) {
        let this = self.keep_alive.borrow_mut().take();

        let Some(this) = this else {
            return;
        };

        match self.event_loop.upgrade() {
            Some(event_loop) => event_loop.delete_later(this),
            // The handler that called us still holds a reference, so we outlive this call.
            None => drop(this),
        }
    }
}

impl Drop for BindingHelper {
    fn drop(&mut self) {
        trace!(
            event = &*self.event,
            state = ?self.state.get(),
            invoked = self.closure.get_mut().is_none(),
            "binding disposed"
        );
    }
}

impl fmt::Debug for BindingHelper {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHelper")
            .field("state", &self.state.get())
            .field("event", &self.event)
            .field("emitter_alive", &self.emitter.is_alive())
            .finish_non_exhaustive()
    }
}
