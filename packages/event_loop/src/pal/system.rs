use std::thread;
use std::time::Instant;

use crate::pal::Clock;

/// Wall-clock time as reported by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SystemClock;

impl Clock for SystemClock {
    #[cfg_attr(test, mutants::skip)] // Real time cannot be asserted on.
    fn now(&mut self) -> Instant {
        Instant::now()
    }

    #[cfg_attr(test, mutants::skip)] // Real time cannot be asserted on.
    fn sleep_until(&mut self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(Instant::now());

        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
    }
}
