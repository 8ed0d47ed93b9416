use crate::EventLoop;
use crate::ManualClock;
use crate::pal::{ClockFacade, SystemClock};

/// Builder for configuring an [`EventLoop`].
#[derive(Debug)]
pub struct EventLoopBuilder {
    clock: ClockFacade,
}

impl EventLoopBuilder {
    pub(crate) fn new() -> Self {
        Self {
            clock: SystemClock.into(),
        }
    }

    /// Drives the loop's timers from a virtual clock instead of the system clock.
    ///
    /// Default is the system clock.
    #[must_use]
    pub fn manual_clock(mut self, clock: ManualClock) -> Self {
        self.clock = clock.into();
        self
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn clock_facade(mut self, clock: ClockFacade) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the event loop with the configured settings.
    #[must_use]
    pub fn build(self) -> EventLoop {
        EventLoop::with_clock(self.clock)
    }
}
