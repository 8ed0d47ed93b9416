//! Type erasure for bound argument lists.
//!
//! A closure captures its arguments as an ordinary tuple. Right before dispatch the tuple is
//! turned into per-argument slots and every slot is exposed as an [`ErasedArgument`], a
//! dynamically typed reference the handler can inspect or move the value out of.

use std::any::{Any, type_name};
use std::fmt;

use crate::DispatchError;

/// A dynamically typed reference to one bound argument.
///
/// The erased argument borrows the slot that holds the value; it never copies it. The value
/// can be moved out exactly once, via [`take()`][Self::take] or
/// [`take_checked()`][Self::take_checked].
pub struct ErasedArgument<'a> {
    index: usize,
    type_name: &'static str,
    slot: &'a mut dyn Any,
}

impl<'a> ErasedArgument<'a> {
    /// Erases the value held in `slot`, which is argument number `index` of its list.
    #[must_use]
    pub fn new<T: 'static>(index: usize, slot: &'a mut Option<T>) -> Self {
        Self {
            index,
            type_name: type_name::<T>(),
            slot,
        }
    }

    /// Position of the argument in the bound argument list.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Name of the argument's type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the argument is of type `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.slot.is::<Option<T>>()
    }

    /// Borrows the value if it is of type `T` and has not been taken yet.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.slot.downcast_ref::<Option<T>>()?.as_ref()
    }

    /// Moves the value out if it is of type `T` and has not been taken yet.
    pub fn take<T: 'static>(&mut self) -> Option<T> {
        self.slot.downcast_mut::<Option<T>>()?.take()
    }

    /// Moves the value out, describing what went wrong if that is not possible.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::TypeMismatch`] if the argument is not of type `T` and
    /// [`DispatchError::ArgumentTaken`] if the value has already been moved out.
    pub fn take_checked<T: 'static>(&mut self) -> Result<T, DispatchError> {
        let index = self.index;
        let actual = self.type_name;

        let Some(slot) = self.slot.downcast_mut::<Option<T>>() else {
            return Err(DispatchError::TypeMismatch {
                index,
                expected: type_name::<T>(),
                actual,
            });
        };

        slot.take().ok_or(DispatchError::ArgumentTaken { index })
    }
}

impl fmt::Debug for ErasedArgument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedArgument")
            .field("index", &self.index)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Checks that a handler received exactly `expected` arguments.
///
/// Name-based handlers call this before taking their arguments.
///
/// # Errors
///
/// Returns [`DispatchError::ArityMismatch`] if the counts differ.
pub fn expect_arity(
    arguments: &[ErasedArgument<'_>],
    expected: usize,
) -> Result<(), DispatchError> {
    if arguments.len() == expected {
        Ok(())
    } else {
        Err(DispatchError::ArityMismatch {
            expected,
            actual: arguments.len(),
        })
    }
}

/// A fixed-length list of values bound into a closure at construction time.
///
/// Implemented for `()` and for tuples of up to six `'static` elements.
pub trait BoundArguments: 'static {
    /// Number of arguments in the list.
    const ARITY: usize;

    /// Per-argument storage that values can be moved out of during dispatch.
    type Slots;

    /// Moves the arguments into their slots, in declared order.
    fn into_slots(self) -> Self::Slots;

    /// Appends one [`ErasedArgument`] per slot to `erased`, in declared order.
    fn erase<'a>(slots: &'a mut Self::Slots, erased: &mut Vec<ErasedArgument<'a>>);
}

impl BoundArguments for () {
    const ARITY: usize = 0;

    type Slots = ();

    fn into_slots(self) -> Self::Slots {}

    fn erase<'a>(_slots: &'a mut Self::Slots, _erased: &mut Vec<ErasedArgument<'a>>) {}
}

macro_rules! count {
    () => { 0_usize };
    ($head:ident $($tail:ident)*) => { 1_usize + count!($($tail)*) };
}

// Expands to one impl per tuple length, peeling the first element off on each step until the
// empty list, which is covered by the hand-written impl for `()`.
macro_rules! impl_bound_arguments {
    (@impl $($name:ident $value:ident),+) => {
        impl<$($name: 'static),+> BoundArguments for ($($name,)+) {
            const ARITY: usize = count!($($name)+);

            type Slots = ($(Option<$name>,)+);

            fn into_slots(self) -> Self::Slots {
                let ($($value,)+) = self;
                ($(Some($value),)+)
            }

            fn erase<'a>(slots: &'a mut Self::Slots, erased: &mut Vec<ErasedArgument<'a>>) {
                let ($($value,)+) = slots;
                $(
                    erased.push(ErasedArgument::new(erased.len(), $value));
                )+
            }
        }
    };
    () => {};
    ($name:ident $value:ident $(, $tail_name:ident $tail_value:ident)*) => {
        impl_bound_arguments!(@impl $name $value $(, $tail_name $tail_value)*);
        impl_bound_arguments!($($tail_name $tail_value),*);
    };
}

impl_bound_arguments!(A0 a0, A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);

#[cfg(test)]
mod tests {
    use super::*;

    fn erase_all<A: BoundArguments>(arguments: A) -> Vec<&'static str> {
        let mut slots = arguments.into_slots();
        let mut erased = Vec::with_capacity(A::ARITY);
        A::erase(&mut slots, &mut erased);

        erased
            .iter()
            .enumerate()
            .map(|(position, argument)| {
                assert_eq!(argument.index(), position);
                argument.type_name()
            })
            .collect()
    }

    #[test]
    fn empty_list_erases_to_nothing() {
        assert_eq!(<() as BoundArguments>::ARITY, 0);
        assert!(erase_all(()).is_empty());
    }

    #[test]
    fn erasure_preserves_declared_order() {
        let types = erase_all((1_u8, "two", 3.0_f64, String::from("four")));

        assert_eq!(
            types,
            vec![
                type_name::<u8>(),
                type_name::<&str>(),
                type_name::<f64>(),
                type_name::<String>()
            ]
        );
    }

    #[test]
    fn arity_matches_tuple_length() {
        assert_eq!(<(i32,) as BoundArguments>::ARITY, 1);
        assert_eq!(<(i32, i32) as BoundArguments>::ARITY, 2);
        assert_eq!(<(i32, i32, i32) as BoundArguments>::ARITY, 3);
        assert_eq!(<(i32, i32, i32, i32) as BoundArguments>::ARITY, 4);
        assert_eq!(<(i32, i32, i32, i32, i32) as BoundArguments>::ARITY, 5);
        assert_eq!(<(i32, i32, i32, i32, i32, i32) as BoundArguments>::ARITY, 6);
    }

    #[test]
    fn erased_argument_references_without_copying() {
        let mut slot = Some(vec![1, 2, 3]);
        let address = slot.as_ref().map(Vec::as_ptr);

        let argument = ErasedArgument::new(0, &mut slot);
        let borrowed = argument.downcast_ref::<Vec<i32>>().map(Vec::as_ptr);

        assert_eq!(borrowed, address);
    }

    #[test]
    fn take_moves_the_value_out_once() {
        let mut slot = Some(String::from("ok"));
        let mut argument = ErasedArgument::new(0, &mut slot);

        assert!(argument.is::<String>());
        assert_eq!(argument.take::<String>().as_deref(), Some("ok"));
        assert_eq!(argument.take::<String>(), None);
        assert_eq!(argument.downcast_ref::<String>(), None);
    }

    #[test]
    fn take_with_wrong_type_leaves_value_in_place() {
        let mut slot = Some(42_i32);
        let mut argument = ErasedArgument::new(3, &mut slot);

        assert!(!argument.is::<u32>());
        assert_eq!(argument.take::<u32>(), None);
        assert_eq!(argument.downcast_ref::<i32>(), Some(&42));
    }

    #[test]
    fn take_checked_reports_what_went_wrong() {
        let mut slot = Some(42_i32);
        let mut argument = ErasedArgument::new(2, &mut slot);

        assert_eq!(
            argument.take_checked::<String>(),
            Err(DispatchError::TypeMismatch {
                index: 2,
                expected: type_name::<String>(),
                actual: type_name::<i32>(),
            })
        );
        assert_eq!(argument.take_checked::<i32>(), Ok(42));
        assert_eq!(
            argument.take_checked::<i32>(),
            Err(DispatchError::ArgumentTaken { index: 2 })
        );
    }

    #[test]
    fn expect_arity_compares_lengths() {
        let mut first = Some(1_i32);
        let mut second = Some(2_i32);
        let arguments = vec![
            ErasedArgument::new(0, &mut first),
            ErasedArgument::new(1, &mut second),
        ];

        assert_eq!(expect_arity(&arguments, 2), Ok(()));
        assert_eq!(
            expect_arity(&arguments, 1),
            Err(DispatchError::ArityMismatch {
                expected: 1,
                actual: 2
            })
        );
    }
}
