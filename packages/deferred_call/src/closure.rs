//! Closures: a target, a handler and a bound argument list, invoked at most once.

use std::any::type_name;
use std::borrow::Cow;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::{BoundArguments, DispatchError, ErasedArgument};

const ERR_ARGUMENT_SHAPE: &str = "bound arguments always match the handler signature - \
    both are derived from the same type parameters";

/// A deferred call that can be invoked exactly once.
///
/// Invoking consumes the closure, so a second invocation cannot be expressed. Dropping a
/// closure without invoking it is always allowed and simply releases what it captured.
pub trait Closure: fmt::Debug {
    /// Performs the deferred call.
    ///
    /// Panics raised by the handler propagate to the caller.
    fn invoke(self: Box<Self>);
}

/// A handler that can be called on a target of type `T` with the arguments `A`.
///
/// Implemented for every `Fn(&T, A0, ..., An)` with up to six arguments, which includes
/// methods such as `Player::seek` taking `&self`.
pub trait Handler<T, A>: 'static {
    /// Calls the handler, moving each argument out of its erased slot in declared order.
    fn call(&self, target: &T, arguments: &mut [ErasedArgument<'_>]);
}

impl<T, F> Handler<T, ()> for F
where
    F: Fn(&T) + 'static,
{
    fn call(&self, target: &T, _arguments: &mut [ErasedArgument<'_>]) {
        self(target);
    }
}

macro_rules! impl_handler {
    ($($name:ident $value:ident),+) => {
        impl<T, F, $($name: 'static),+> Handler<T, ($($name,)+)> for F
        where
            F: Fn(&T, $($name),+) + 'static,
        {
            fn call(&self, target: &T, arguments: &mut [ErasedArgument<'_>]) {
                let mut arguments = arguments.iter_mut();

                $(
                    let $value = arguments
                        .next()
                        .and_then(ErasedArgument::take::<$name>)
                        .expect(ERR_ARGUMENT_SHAPE);
                )+

                self(target, $($value),+);
            }
        }
    };
}

impl_handler!(A0 a0);
impl_handler!(A0 a0, A1 a1);
impl_handler!(A0 a0, A1 a1, A2 a2);
impl_handler!(A0 a0, A1 a1, A2 a2, A3 a3);
impl_handler!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4);
impl_handler!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);

/// A target that dispatches calls by handler name.
///
/// This is the dynamic counterpart of [`Handler`]: the slot name and the arguments are only
/// matched up at invocation time, so mismatches surface as [`DispatchError`] instead of as
/// compile errors.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
///
/// use deferred_call::{DispatchError, ErasedArgument, Invokable, expect_arity};
///
/// #[derive(Default)]
/// struct Volume {
///     level: Cell<u8>,
/// }
///
/// impl Invokable for Volume {
///     fn invoke_slot(
///         &self,
///         slot: &str,
///         arguments: &mut [ErasedArgument<'_>],
///     ) -> Result<(), DispatchError> {
///         match (slot, arguments) {
///             ("set", [level]) => {
///                 self.level.set(level.take_checked::<u8>()?);
///                 Ok(())
///             }
///             ("mute", arguments) => {
///                 expect_arity(arguments, 0)?;
///                 self.level.set(0);
///                 Ok(())
///             }
///             ("set", arguments) => Err(DispatchError::ArityMismatch {
///                 expected: 1,
///                 actual: arguments.len(),
///             }),
///             _ => Err(DispatchError::unknown_slot::<Self>(slot)),
///         }
///     }
/// }
/// ```
pub trait Invokable: 'static {
    /// Calls the handler named `slot` with `arguments`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if there is no such slot or the arguments do not fit it.
    fn invoke_slot(
        &self,
        slot: &str,
        arguments: &mut [ErasedArgument<'_>],
    ) -> Result<(), DispatchError>;
}

/// Erases `arguments` and hands them to `dispatch`.
fn with_erased<A, R>(arguments: A, dispatch: impl FnOnce(&mut [ErasedArgument<'_>]) -> R) -> R
where
    A: BoundArguments,
{
    let mut slots = arguments.into_slots();
    let mut erased = Vec::with_capacity(A::ARITY);
    A::erase(&mut slots, &mut erased);

    dispatch(&mut erased)
}

/// A closure that calls a typed handler on a target.
///
/// Created by [`make_closure()`].
pub struct MethodClosure<T, H, A> {
    target: Weak<T>,
    handler: H,
    arguments: A,
}

impl<T, H, A> Closure for MethodClosure<T, H, A>
where
    T: 'static,
    H: Handler<T, A>,
    A: BoundArguments,
{
    fn invoke(self: Box<Self>) {
        let Self {
            target,
            handler,
            arguments,
        } = *self;

        let Some(target) = target.upgrade() else {
            debug!(
                receiver = type_name::<T>(),
                "closure target dropped before invocation"
            );
            return;
        };

        with_erased(arguments, |erased| handler.call(&target, erased));
    }
}

impl<T, H, A> fmt::Debug for MethodClosure<T, H, A>
where
    A: BoundArguments,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodClosure")
            .field("target", &type_name::<T>())
            .field("target_alive", &(self.target.strong_count() > 0))
            .field("handler", &type_name::<H>())
            .field("arity", &A::ARITY)
            .finish_non_exhaustive()
    }
}

/// A closure that calls a handler by name on an [`Invokable`] target.
///
/// Created by [`make_slot_closure()`].
pub struct SlotClosure<T, A> {
    target: Weak<T>,
    slot: Cow<'static, str>,
    arguments: A,
}

impl<T, A> Closure for SlotClosure<T, A>
where
    T: Invokable,
    A: BoundArguments,
{
    fn invoke(self: Box<Self>) {
        let Self {
            target,
            slot,
            arguments,
        } = *self;

        let Some(target) = target.upgrade() else {
            debug!(
                receiver = type_name::<T>(),
                %slot,
                "closure target dropped before invocation"
            );
            return;
        };

        let result = with_erased(arguments, |erased| target.invoke_slot(&slot, erased));

        if let Err(error) = result {
            warn!(
                receiver = type_name::<T>(),
                %slot,
                %error,
                "slot dispatch failed"
            );
        }
    }
}

impl<T, A> fmt::Debug for SlotClosure<T, A>
where
    A: BoundArguments,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotClosure")
            .field("target", &type_name::<T>())
            .field("target_alive", &(self.target.strong_count() > 0))
            .field("slot", &self.slot)
            .field("arity", &A::ARITY)
            .finish_non_exhaustive()
    }
}

/// A closure without a target, wrapping a plain callback.
///
/// Created by [`make_callback_closure()`].
pub struct CallbackClosure<F> {
    callback: F,
}

impl<F> Closure for CallbackClosure<F>
where
    F: FnOnce() + 'static,
{
    fn invoke(self: Box<Self>) {
        (self.callback)();
    }
}

impl<F> fmt::Debug for CallbackClosure<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackClosure")
            .field("callback", &type_name::<F>())
            .finish()
    }
}

/// Binds `handler` and `arguments` to `target` for a later, single call.
///
/// The closure holds only a weak reference to the target. If the target has been dropped by
/// the time the closure is invoked, the handler is not called.
///
/// The handler signature is checked against the bound arguments at compile time: a handler
/// `Fn(&T, A0, A1)` needs arguments of type `(A0, A1)`. Single arguments are passed as a
/// one-element tuple, `(value,)`.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use deferred_call::make_closure;
///
/// #[derive(Default)]
/// struct Recorder {
///     calls: RefCell<Vec<(i32, &'static str)>>,
/// }
///
/// impl Recorder {
///     fn record(&self, code: i32, status: &'static str) {
///         self.calls.borrow_mut().push((code, status));
///     }
/// }
///
/// let recorder = Rc::new(Recorder::default());
/// let closure = make_closure(&recorder, Recorder::record, (42, "ok"));
///
/// closure.invoke();
/// assert_eq!(*recorder.calls.borrow(), vec![(42, "ok")]);
/// ```
#[must_use]
pub fn make_closure<T, H, A>(target: &Rc<T>, handler: H, arguments: A) -> Box<dyn Closure>
where
    T: 'static,
    H: Handler<T, A>,
    A: BoundArguments,
{
    Box::new(MethodClosure {
        target: Rc::downgrade(target),
        handler,
        arguments,
    })
}

/// Binds the handler named `slot` and `arguments` to `target` for a later, single call.
///
/// Dispatch failures are logged at `warn` level; the caller of
/// [`Closure::invoke()`] never sees them.
#[must_use]
pub fn make_slot_closure<T, A>(
    target: &Rc<T>,
    slot: impl Into<Cow<'static, str>>,
    arguments: A,
) -> Box<dyn Closure>
where
    T: Invokable,
    A: BoundArguments,
{
    Box::new(SlotClosure {
        target: Rc::downgrade(target),
        slot: slot.into(),
        arguments,
    })
}

/// Wraps `callback` as a closure that has no separate target.
#[must_use]
pub fn make_callback_closure(callback: impl FnOnce() + 'static) -> Box<dyn Closure> {
    Box::new(CallbackClosure { callback })
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use testing::CallLog;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: CallLog<String>,
    }

    impl Recorder {
        fn none(&self) {
            self.calls.record(String::from("none"));
        }

        fn one(&self, a: i32) {
            self.calls.record(format!("one({a})"));
        }

        fn two(&self, a: i32, b: &'static str) {
            self.calls.record(format!("two({a}, {b})"));
        }

        fn three(&self, a: i32, b: String, c: bool) {
            self.calls.record(format!("three({a}, {b}, {c})"));
        }

        fn four(&self, a: u8, b: u16, c: u32, d: u64) {
            self.calls.record(format!("four({a}, {b}, {c}, {d})"));
        }

        fn five(&self, a: char, b: char, c: char, d: char, e: char) {
            self.calls.record(format!("five({a}{b}{c}{d}{e})"));
        }

        fn six(&self, a: i8, b: i16, c: i32, d: i64, e: Vec<u8>, f: Option<&'static str>) {
            self.calls
                .record(format!("six({a}, {b}, {c}, {d}, {e:?}, {f:?})"));
        }
    }

    #[test]
    fn every_arity_forwards_values_in_order() {
        let recorder = Rc::new(Recorder::default());

        make_closure(&recorder, Recorder::none, ()).invoke();
        make_closure(&recorder, Recorder::one, (1,)).invoke();
        make_closure(&recorder, Recorder::two, (1, "b")).invoke();
        make_closure(&recorder, Recorder::three, (1, String::from("b"), true)).invoke();
        make_closure(&recorder, Recorder::four, (1_u8, 2_u16, 3_u32, 4_u64)).invoke();
        make_closure(&recorder, Recorder::five, ('a', 'b', 'c', 'd', 'e')).invoke();
        make_closure(
            &recorder,
            Recorder::six,
            (-1_i8, -2_i16, -3_i32, -4_i64, vec![5_u8], Some("six")),
        )
        .invoke();

        assert_eq!(
            recorder.calls.calls(),
            vec![
                "none",
                "one(1)",
                "two(1, b)",
                "three(1, b, true)",
                "four(1, 2, 3, 4)",
                "five(abcde)",
                "six(-1, -2, -3, -4, [5], Some(\"six\"))",
            ]
        );
    }

    #[test]
    fn closures_accept_non_method_handlers() {
        let target = Rc::new(Cell::new(0));

        make_closure(&target, |cell: &Cell<i32>, delta: i32| cell.set(cell.get() + delta), (5,))
            .invoke();

        assert_eq!(target.get(), 5);
    }

    #[test]
    fn closure_does_not_keep_target_alive() {
        let recorder = Rc::new(Recorder::default());
        let calls = recorder.calls.clone();
        let closure = make_closure(&recorder, Recorder::one, (7,));

        drop(recorder);
        closure.invoke();

        assert!(calls.is_empty());
    }

    #[test]
    fn dropping_uninvoked_closure_drops_arguments() {
        let recorder = Rc::new(Recorder::default());
        let counter = testing::DropCounter::new();

        let closure = make_closure(
            &recorder,
            |_: &Recorder, _token: testing::DropToken| {},
            (counter.token(),),
        );
        assert_eq!(counter.dropped(), 0);

        drop(closure);
        assert_eq!(counter.dropped(), 1);
        assert!(recorder.calls.is_empty());
    }

    #[derive(Default)]
    struct Playlist {
        tracks: RefCell<Vec<String>>,
    }

    impl Invokable for Playlist {
        fn invoke_slot(
            &self,
            slot: &str,
            arguments: &mut [ErasedArgument<'_>],
        ) -> Result<(), DispatchError> {
            match slot {
                "add" => {
                    crate::expect_arity(arguments, 2)?;
                    let mut arguments = arguments.iter_mut();
                    let (Some(title), Some(times)) = (arguments.next(), arguments.next()) else {
                        unreachable!("arity checked above");
                    };

                    let title = title.take_checked::<String>()?;
                    let times = times.take_checked::<usize>()?;

                    self.tracks
                        .borrow_mut()
                        .extend(std::iter::repeat_n(title, times));
                    Ok(())
                }
                "clear" => {
                    crate::expect_arity(arguments, 0)?;
                    self.tracks.borrow_mut().clear();
                    Ok(())
                }
                _ => Err(DispatchError::unknown_slot::<Self>(slot)),
            }
        }
    }

    #[test]
    fn slot_closure_dispatches_by_name() {
        let playlist = Rc::new(Playlist::default());

        make_slot_closure(&playlist, "add", (String::from("Intro"), 2_usize)).invoke();

        assert_eq!(*playlist.tracks.borrow(), vec!["Intro", "Intro"]);

        make_slot_closure(&playlist, String::from("clear"), ()).invoke();

        assert!(playlist.tracks.borrow().is_empty());
    }

    #[test]
    fn slot_closure_mismatch_is_swallowed() {
        let playlist = Rc::new(Playlist::default());

        // Wrong type, wrong arity and unknown slot all fail without reaching the caller.
        make_slot_closure(&playlist, "add", (42_i32, 2_usize)).invoke();
        make_slot_closure(&playlist, "add", (String::from("Intro"),)).invoke();
        make_slot_closure(&playlist, "shuffle", ()).invoke();

        assert!(playlist.tracks.borrow().is_empty());
    }

    #[test]
    fn callback_closure_runs_callback() {
        let log = CallLog::new();

        make_callback_closure({
            let log = log.clone();
            move || log.record("called")
        })
        .invoke();

        assert_eq!(log.calls(), vec!["called"]);
    }

    #[test]
    fn debug_output_names_the_parts() {
        let recorder = Rc::new(Recorder::default());
        let closure = make_closure(&recorder, Recorder::two, (1, "b"));

        let debug = format!("{closure:?}");

        assert!(debug.contains("MethodClosure"));
        assert!(debug.contains("arity: 2"));
    }
}
