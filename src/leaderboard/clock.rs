use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

/// Monotonic timestamp recorded when a player's score last changed.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attainment(u64);

impl Attainment {
    pub const fn from_ticks(ticks: u64) -> Self {
        Attainment(ticks)
    }

    pub const fn ticks(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Attainment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Source of attainment timestamps.
///
/// Successive calls must return strictly increasing values, otherwise two
/// players reaching the same score could not be told apart by arrival.
pub trait Clock: Send + Sync {
    fn now(&self) -> Attainment;
}

/// Nanoseconds since the clock was created, bumped by one tick whenever two
/// reads land on the same instant.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
    last: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
            last: AtomicU64::new(0),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Attainment {
        let elapsed = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);

        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(elapsed.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);

        Attainment(elapsed.max(previous.saturating_add(1)))
    }
}

/// Logical clock handing out 1, 2, 3, ...
///
/// Deterministic, so it suits tests and replays where wall time is noise.
#[derive(Debug, Default)]
pub struct SequenceClock {
    next: AtomicU64,
}

impl SequenceClock {
    pub fn new() -> Self {
        SequenceClock::default()
    }
}

impl Clock for SequenceClock {
    fn now(&self) -> Attainment {
        Attainment(self.next.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_strictly_increases() {
        let clock = MonotonicClock::new();
        let mut last = clock.now();
        for _ in 0..10_000 {
            let now = clock.now();
            assert!(now > last, "{now} should be after {last}");
            last = now;
        }
    }

    #[test]
    fn sequence_clock() {
        let clock = SequenceClock::new();
        assert_eq!(clock.now(), Attainment::from_ticks(1));
        assert_eq!(clock.now(), Attainment::from_ticks(2));
        assert_eq!(clock.now(), Attainment::from_ticks(3));
    }
}
