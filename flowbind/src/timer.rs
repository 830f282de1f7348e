//! Interval and countdown stream factories.
//!
//! All factories share the same delay placement: emit first, then delay.
//! The first value is emitted immediately, and the bounded factories
//! ([`timer_down`], [`timer_up`]) keep their task alive for one more
//! interval after the final value before completing.

use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio::time::sleep;

/// Time units accepted by the unit-converting timer overloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// 10^-9 seconds.
    Nanoseconds,
    /// 10^-6 seconds.
    Microseconds,
    /// 10^-3 seconds.
    Milliseconds,
    /// Whole seconds.
    Seconds,
    /// 60 seconds.
    Minutes,
    /// 3600 seconds.
    Hours,
    /// 86400 seconds.
    Days,
}

impl TimeUnit {
    /// Convert `interval` in this unit to whole milliseconds.
    ///
    /// Division truncates: sub-millisecond intervals convert to `0`, which
    /// produces a timer with no delay between emissions. That busy-loop
    /// hazard is the caller's to avoid; it is not guarded against.
    #[must_use]
    pub fn to_millis(self, interval: u64) -> u64 {
        match self {
            Self::Nanoseconds => interval / 1_000 / 1_000,
            Self::Microseconds => interval / 1_000,
            Self::Milliseconds => interval,
            Self::Seconds => interval * 1_000,
            Self::Minutes => interval * 60 * 1_000,
            Self::Hours => interval * 60 * 60 * 1_000,
            Self::Days => interval * 24 * 60 * 60 * 1_000,
        }
    }
}

/// Infinite interval stream: emits `0, 1, 2, ...` with `interval_ms`
/// between emissions.
///
/// The first value is emitted immediately, with no initial delay. The
/// stream never completes on its own.
pub fn timer_millis(interval_ms: u64) -> impl Stream<Item = u64> {
    stream::unfold(0u64, move |count| async move {
        if count > 0 {
            sleep(Duration::from_millis(interval_ms)).await;
        }
        Some((count, count + 1))
    })
}

/// [`timer_millis`] with a mapping step: emits `map(0), map(1), ...` at the
/// same cadence.
pub fn timer_millis_map<T, F>(interval_ms: u64, map: F) -> impl Stream<Item = T>
where
    F: FnMut(u64) -> T,
{
    timer_millis(interval_ms).map(map)
}

/// Unit-converting form of [`timer_millis`].
pub fn timer(interval: u64, unit: TimeUnit) -> impl Stream<Item = u64> {
    timer_millis(unit.to_millis(interval))
}

/// Unit-converting form of [`timer_millis_map`].
pub fn timer_map<T, F>(interval: u64, unit: TimeUnit, map: F) -> impl Stream<Item = T>
where
    F: FnMut(u64) -> T,
{
    timer_millis_map(unit.to_millis(interval), map)
}

/// Countdown stream: emits `seconds, seconds - 1, ..., 0` one second
/// apart, then completes.
///
/// The delay sits after every emission, including the final `0`, so the
/// stream completes one second after its last value.
pub fn timer_down(seconds: u64) -> impl Stream<Item = u64> {
    stream::unfold(0u64, move |count| async move {
        if count > 0 {
            sleep(Duration::from_millis(1000)).await;
        }
        if count > seconds {
            None
        } else {
            Some((seconds - count, count + 1))
        }
    })
}

/// Count-up stream: emits `0, 1, ..., seconds` one second apart, then
/// completes. Same delay placement as [`timer_down`].
pub fn timer_up(seconds: u64) -> impl Stream<Item = u64> {
    stream::unfold(0u64, move |count| async move {
        if count > 0 {
            sleep(Duration::from_millis(1000)).await;
        }
        if count > seconds {
            None
        } else {
            Some((count, count + 1))
        }
    })
}
