use std::fmt::Debug;
use std::time::Instant;

#[cfg_attr(test, mockall::automock)]
pub(crate) trait Clock: Debug {
    fn now(&mut self) -> Instant;

    /// Returns once `deadline` has been reached.
    ///
    /// Real clocks block the thread. Virtual clocks jump forward instead.
    fn sleep_until(&mut self, deadline: Instant);
}
