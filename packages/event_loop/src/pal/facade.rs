use std::time::Instant;

#[cfg(test)]
use crate::pal::MockClock;
use crate::pal::{Clock, ManualClock, SystemClock};

/// The clock an event loop uses, selected when the loop is built.
#[derive(Debug)]
pub(crate) enum ClockFacade {
    System(SystemClock),
    Manual(ManualClock),

    #[cfg(test)]
    Mock(MockClock),
}

impl From<SystemClock> for ClockFacade {
    fn from(clock: SystemClock) -> Self {
        Self::System(clock)
    }
}

impl From<ManualClock> for ClockFacade {
    fn from(clock: ManualClock) -> Self {
        Self::Manual(clock)
    }
}

#[cfg(test)]
impl From<MockClock> for ClockFacade {
    fn from(clock: MockClock) -> Self {
        Self::Mock(clock)
    }
}

impl Clock for ClockFacade {
    fn now(&mut self) -> Instant {
        match self {
            Self::System(clock) => clock.now(),
            Self::Manual(clock) => Clock::now(clock),
            #[cfg(test)]
            Self::Mock(clock) => clock.now(),
        }
    }

    fn sleep_until(&mut self, deadline: Instant) {
        match self {
            Self::System(clock) => clock.sleep_until(deadline),
            Self::Manual(clock) => clock.sleep_until(deadline),
            #[cfg(test)]
            Self::Mock(clock) => clock.sleep_until(deadline),
        }
    }
}
