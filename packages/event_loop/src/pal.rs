//! Platform abstraction layer for the passage of time.
//!
//! The event loop never asks the operating system for the time directly. It goes through a
//! [`Clock`], which lets tests substitute virtual time for wall-clock time.

mod abstractions;
mod facade;
mod manual;
mod system;

pub(crate) use abstractions::*;
pub(crate) use facade::*;
pub use manual::*;
pub(crate) use system::*;
