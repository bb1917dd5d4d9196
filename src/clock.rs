//! Time sources for a bucket.
//!
//! Buckets only ever look at whole seconds. Anything finer is truncated by the
//! clock before the bucket sees it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of whole-second timestamps.
///
/// Timestamps are only ever compared with each other, so the epoch is up to
/// the implementation. A clock which moves backwards is tolerated: the bucket
/// treats it as no time having passed.
pub trait Clock: Send + Sync {
    /// The current time in whole seconds.
    fn now(&self) -> u64;
}

impl<C> Clock for &C
where
    C: ?Sized + Clock,
{
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<C> Clock for Arc<C>
where
    C: ?Sized + Clock,
{
    #[inline]
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Wall-clock time, in seconds since the UNIX epoch.
#[derive(Debug, Default, Clone, Copy)]
#[non_exhaustive]
pub struct SystemClock;

impl SystemClock {
    /// Construct a new system clock.
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_secs(),
            // A system clock set before 1970 is not worth failing over.
            Err(..) => 0,
        }
    }
}

/// A clock which only moves when told to.
///
/// Clones share the same time, so one handle can be given to a bucket while
/// another is kept around to advance it.
///
/// # Examples
///
/// ```
/// use token_bucket::{ManualClock, TokenBucket};
///
/// # fn main() -> Result<(), token_bucket::Error> {
/// let clock = ManualClock::new();
///
/// let bucket = TokenBucket::builder()
///     .initial(0)
///     .max(10)
///     .clock(clock.clone())
///     .build()?;
///
/// assert!(!bucket.consume(1)?);
/// clock.advance(3);
/// assert!(bucket.consume(3)?);
/// # Ok(()) }
/// ```
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Construct a manual clock starting at zero.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Construct a manual clock starting at the given second.
    pub fn starting_at(secs: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(secs)),
        }
    }

    /// Move the clock forward by `secs` seconds.
    pub fn advance(&self, secs: u64) {
        let mut current = self.now.load(Ordering::Acquire);

        loop {
            let new = current.saturating_add(secs);

            match self
                .now
                .compare_exchange_weak(current, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(x) => current = x,
            }
        }
    }

    /// Set the clock to an absolute second, which may be in the past.
    pub fn set(&self, secs: u64) {
        self.now.store(secs, Ordering::Release);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

/// Whole seconds elapsed since the clock was constructed, as measured by
/// [`tokio::time::Instant`].
///
/// This follows tokio's paused time, so a test running with
/// `start_paused = true` can drive a bucket through
/// [`tokio::time::advance`] or [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    start: tokio::time::Instant,
}

impl TokioClock {
    /// Construct a clock which reads zero right now.
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock, SystemClock, TokioClock};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::starting_at(10);
        let other = clock.clone();

        other.advance(5);
        assert_eq!(15, clock.now());

        clock.set(3);
        assert_eq!(3, other.now());
    }

    #[test]
    fn test_manual_clock_saturates() {
        let clock = ManualClock::starting_at(u64::MAX - 1);
        clock.advance(10);
        assert_eq!(u64::MAX, clock.now());
    }

    #[test]
    fn test_forwarding_impls() {
        fn read<C: Clock>(clock: C) -> u64 {
            clock.now()
        }

        let clock = ManualClock::starting_at(7);
        assert_eq!(7, read(&clock));
        assert_eq!(7, read(Arc::new(clock)));
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        // 2020-01-01T00:00:00Z.
        assert!(SystemClock::new().now() > 1_577_836_800);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_truncates() {
        let clock = TokioClock::new();
        assert_eq!(0, clock.now());

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(0, clock.now());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(1, clock.now());

        tokio::time::advance(Duration::from_millis(2500)).await;
        assert_eq!(3, clock.now());
    }
}
