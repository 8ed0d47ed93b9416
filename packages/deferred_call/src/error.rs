use std::any::type_name;

use thiserror::Error;

/// Why a dispatch by slot name could not reach its handler.
///
/// Only name-based dispatch (see [`Invokable`][crate::Invokable]) can fail this way. Closures
/// built from typed handlers are checked by the compiler instead.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum DispatchError {
    /// The target has no handler with the requested name.
    #[error("{target} has no slot named '{slot}'")]
    UnknownSlot {
        /// The requested slot name.
        slot: String,

        /// Type name of the target.
        target: &'static str,
    },

    /// The number of bound arguments does not match what the slot expects.
    #[error("slot expects {expected} argument(s) but {actual} were bound")]
    ArityMismatch {
        /// Number of arguments the slot expects.
        expected: usize,

        /// Number of arguments that were bound.
        actual: usize,
    },

    /// A bound argument has a different type than the slot expects.
    #[error("argument {index} is {actual}, expected {expected}")]
    TypeMismatch {
        /// Position of the argument.
        index: usize,

        /// Type the slot expects.
        expected: &'static str,

        /// Type that was bound.
        actual: &'static str,
    },

    /// The argument value was already moved out by an earlier take.
    #[error("argument {index} has already been taken")]
    ArgumentTaken {
        /// Position of the argument.
        index: usize,
    },
}

impl DispatchError {
    /// Creates an [`UnknownSlot`][Self::UnknownSlot] error for a target of type `T`.
    #[must_use]
    pub fn unknown_slot<T: ?Sized>(slot: &str) -> Self {
        Self::UnknownSlot {
            slot: slot.to_owned(),
            target: type_name::<T>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Player;

    #[test]
    fn unknown_slot_names_the_target_type() {
        let error = DispatchError::unknown_slot::<Player>("pause");

        assert!(matches!(
            &error,
            DispatchError::UnknownSlot { slot, target }
                if slot == "pause" && target.ends_with("Player")
        ));
    }

    #[test]
    fn messages_mention_the_details() {
        let error = DispatchError::TypeMismatch {
            index: 1,
            expected: "i32",
            actual: "&str",
        };

        assert_eq!(error.to_string(), "argument 1 is &str, expected i32");
    }
}
