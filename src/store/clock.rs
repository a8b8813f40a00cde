use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to. Each reading advances it by `step`.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<OffsetDateTime>,
    step: Duration,
}

impl ManualClock {
    pub fn starting_at(start: OffsetDateTime) -> Self {
        Self::with_step(start, Duration::ZERO)
    }

    pub fn with_step(start: OffsetDateTime, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.current.lock() += by;
    }

    pub fn set(&self, to: OffsetDateTime) {
        *self.current.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        let mut current = self.current.lock();
        let now = *current;
        *current += self.step;
        now
    }
}
