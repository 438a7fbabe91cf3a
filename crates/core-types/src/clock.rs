use chrono::{Local, NaiveDateTime};

/// Source of "now" for the report as-of time.
///
/// Injected wherever the current time is needed so tests can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall-clock time in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// The as-of time of a report: the analyst's explicit choice, otherwise the
/// clock's current time. Never left unset.
pub fn resolve_report_time(explicit: Option<NaiveDateTime>, clock: &dyn Clock) -> NaiveDateTime {
    explicit.unwrap_or_else(|| clock.now())
}
