#![deny(missing_docs)]
//! A token-based rate limiter based on the [token bucket] algorithm.
//!
//! A bucket holds up to `max` tokens and gains `refill_rate` tokens for every
//! whole second that passes. Consuming tokens succeeds when enough are
//! available, and otherwise fails according to the [`Policy`] the bucket was
//! built with. Time is tracked at whole-second resolution, so operations
//! within the same second never see any tokens added between them.
//!
//! ## Usage
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! token-bucket = "0.1.0"
//! ```
//!
//! ## Example
//!
//! ```
//! use token_bucket::TokenBucket;
//!
//! # fn main() -> Result<(), token_bucket::Error> {
//! let bucket = TokenBucket::builder()
//!     .initial(5)
//!     .refill_rate(1.0)
//!     .max(10)
//!     .build()?;
//!
//! if bucket.consume_one()? {
//!     println!("Admitted!");
//! }
//! # Ok(()) }
//! ```
//!
//! ## Signaling exhaustion
//!
//! Buckets built with [`Policy::Signal`] report exhaustion as an
//! [`Error::BucketExhausted`] instead of `false`, which lets it travel with
//! `?` like any other error:
//!
//! ```
//! use token_bucket::{Error, Policy, TokenBucket};
//!
//! # fn main() -> Result<(), Error> {
//! let bucket = TokenBucket::builder()
//!     .initial(1)
//!     .max(1)
//!     .policy(Policy::Signal)
//!     .build()?;
//!
//! assert!(matches!(
//!     bucket.consume(2),
//!     Err(Error::BucketExhausted { requested: 2, available: 1 })
//! ));
//!
//! // The failed attempt left the bucket untouched.
//! assert!(bucket.consume(1)?);
//! # Ok(()) }
//! ```
//!
//! ## Sharing a bucket
//!
//! All operations take `&self` and are serialized by a lock inside of the
//! bucket, so it can be wrapped in an [`Arc`] and shared between threads or
//! tasks without ever handing out more tokens than it holds.
//!
//! ## Features
//!
//! * `tracing` - emit [`tracing`] events at `TRACE` level for every refill and
//!   consumption.
//!
//! [token bucket]: https://en.wikipedia.org/wiki/Token_bucket
//! [`Arc`]: std::sync::Arc
//! [`tracing`]: https://docs.rs/tracing

use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;

mod clock;
pub use self::clock::{Clock, ManualClock, SystemClock, TokioClock};

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

/// Error type for the token bucket.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured refill rate is not a positive, finite number.
    #[error("Refill rate must be a positive number of tokens per second, but was {0}")]
    InvalidRefillRate(f64),
    /// Tried to consume more tokens than the bucket holds.
    ///
    /// Only produced by buckets using [`Policy::Signal`].
    #[error("Bucket exhausted: requested {requested} tokens but only {available} are available")]
    BucketExhausted {
        /// The number of tokens that was asked for.
        requested: usize,
        /// The number of tokens the bucket held at the time.
        available: usize,
    },
}

/// How a bucket reports that it doesn't hold enough tokens.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// [`TokenBucket::consume`] returns `Ok(false)`.
    #[default]
    Boolean,
    /// [`TokenBucket::consume`] returns [`Error::BucketExhausted`].
    Signal,
}

/// Builder for a token bucket.
///
/// Constructed through [`TokenBucket::builder`].
pub struct Builder<C = SystemClock> {
    initial: Option<usize>,
    refill_rate: Option<f64>,
    /// `Some(None)` means the max follows the initial number of tokens.
    max: Option<Option<usize>>,
    policy: Policy,
    clock: C,
}

impl<C> Builder<C>
where
    C: Clock,
{
    /// The number of tokens that the bucket should start with.
    ///
    /// If set to larger than `max` at build time, will only saturate to max.
    #[inline(always)]
    pub fn initial(mut self, initial: usize) -> Self {
        self.initial = Some(initial);
        self
    }

    /// The number of tokens added for every whole second that passes.
    ///
    /// Fractional rates are allowed, so `0.1` adds one token every ten
    /// seconds.
    #[inline(always)]
    pub fn refill_rate(mut self, refill_rate: f64) -> Self {
        self.refill_rate = Some(refill_rate);
        self
    }

    /// Set the max number of tokens the bucket can hold.
    ///
    /// If this is never set, the max is 100.
    #[inline(always)]
    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(Some(max));
        self
    }

    /// Set the max number of tokens, where `None` makes the max equal to
    /// the initial number of tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use token_bucket::TokenBucket;
    ///
    /// # fn main() -> Result<(), token_bucket::Error> {
    /// let bucket = TokenBucket::builder().initial(7).max_opt(None).build()?;
    /// assert_eq!(7, bucket.max());
    ///
    /// let bucket = TokenBucket::builder().initial(7).max_opt(Some(20)).build()?;
    /// assert_eq!(20, bucket.max());
    /// # Ok(()) }
    /// ```
    #[inline(always)]
    pub fn max_opt(mut self, max: Option<usize>) -> Self {
        self.max = Some(max);
        self
    }

    /// Set how the bucket reports that it is exhausted.
    #[inline(always)]
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Use the given clock as the time source of the bucket.
    pub fn clock<D>(self, clock: D) -> Builder<D>
    where
        D: Clock,
    {
        Builder {
            initial: self.initial,
            refill_rate: self.refill_rate,
            max: self.max,
            policy: self.policy,
            clock,
        }
    }

    /// Construct a new token bucket.
    ///
    /// # Errors
    ///
    /// Errors with [`Error::InvalidRefillRate`] if the refill rate is zero,
    /// negative, or not finite.
    pub fn build(self) -> Result<TokenBucket<C>, Error> {
        const DEFAULT_INITIAL: usize = 100;
        const DEFAULT_REFILL_RATE: f64 = 1.0;
        const DEFAULT_MAX: usize = 100;

        let initial = self.initial.unwrap_or(DEFAULT_INITIAL);
        let max = match self.max {
            Some(Some(max)) => max,
            Some(None) => initial,
            None => DEFAULT_MAX,
        };
        let refill_rate = self.refill_rate.unwrap_or(DEFAULT_REFILL_RATE);

        if !refill_rate.is_finite() || refill_rate <= 0.0 {
            return Err(Error::InvalidRefillRate(refill_rate));
        }

        let state = State {
            tokens: initial.min(max),
            last_refill: self.clock.now(),
        };

        Ok(TokenBucket {
            refill_rate,
            max,
            policy: self.policy,
            clock: self.clock,
            state: Mutex::new(state),
        })
    }
}

/// Mutable state of a bucket, only ever touched while the lock is held.
struct State {
    /// Current number of tokens.
    tokens: usize,
    /// The second as of which `tokens` is accurate.
    last_refill: u64,
}

/// A token bucket.
///
/// See the [crate-level documentation](crate) for an overview.
pub struct TokenBucket<C = SystemClock> {
    /// Tokens added per whole second.
    refill_rate: f64,
    /// Max number of tokens.
    max: usize,
    /// How exhaustion is reported.
    policy: Policy,
    /// Time source.
    clock: C,
    /// Critical state.
    state: Mutex<State>,
}

impl TokenBucket<SystemClock> {
    /// Construct a new token bucket through a builder.
    ///
    /// Defaults to 100 initial tokens, a refill rate of 1 token per second, a
    /// max of 100 tokens, [`Policy::Boolean`], and [`SystemClock`]. The max
    /// can be tied to the initial number of tokens through
    /// [`Builder::max_opt`].
    pub fn builder() -> Builder<SystemClock> {
        Builder {
            initial: None,
            refill_rate: None,
            max: None,
            policy: Policy::default(),
            clock: SystemClock::new(),
        }
    }
}

impl<C> TokenBucket<C>
where
    C: Clock,
{
    /// Number of tokens as of the last refill.
    ///
    /// This does not refill the bucket, so it might be lower than what a call
    /// to [`refill`] would report.
    ///
    /// [`refill`]: TokenBucket::refill
    pub fn tokens(&self) -> usize {
        self.state.lock().tokens
    }

    /// Get the max number of tokens this bucket is configured for.
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Get the number of tokens added per second.
    #[inline]
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Get the policy used to report exhaustion.
    #[inline]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// The second, as reported by the clock, of the last refill.
    pub fn last_refill(&self) -> u64 {
        self.state.lock().last_refill
    }

    /// Access the clock used by this bucket.
    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Bring the bucket up to date and return the number of tokens it holds.
    ///
    /// Adds `floor(elapsed * refill_rate)` tokens, where `elapsed` is the
    /// number of whole seconds since the last refill, without going over
    /// `max`. Calling this twice within the same second adds nothing the
    /// second time.
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
    ///     .refill_rate(0.5)
    ///     .max(10)
    ///     .clock(clock.clone())
    ///     .build()?;
    ///
    /// clock.advance(5);
    /// assert_eq!(2, bucket.refill());
    /// # Ok(()) }
    /// ```
    pub fn refill(&self) -> usize {
        let mut state = self.state.lock();
        self.refill_locked(&mut state)
    }

    /// Consume a single token.
    ///
    /// This is identical to [`consume`] with an argument of `1`.
    ///
    /// [`consume`]: TokenBucket::consume
    #[inline]
    pub fn consume_one(&self) -> Result<bool, Error> {
        self.consume(1)
    }

    /// Try to consume `count` tokens.
    ///
    /// The bucket is refilled first. If it then holds at least `count`
    /// tokens they are removed and this returns `Ok(true)`. Otherwise the
    /// token count is left alone and the outcome depends on the [`Policy`]:
    /// `Ok(false)` for [`Policy::Boolean`] and [`Error::BucketExhausted`] for
    /// [`Policy::Signal`].
    ///
    /// Consuming zero tokens always succeeds.
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
    ///     .initial(5)
    ///     .max(10)
    ///     .clock(clock.clone())
    ///     .build()?;
    ///
    /// assert!(bucket.consume(3)?);
    /// assert_eq!(2, bucket.tokens());
    ///
    /// clock.advance(4);
    /// assert!(bucket.consume(5)?);
    /// assert_eq!(1, bucket.tokens());
    ///
    /// assert!(!bucket.consume(2)?);
    /// assert_eq!(1, bucket.tokens());
    /// # Ok(()) }
    /// ```
    ///
    /// # Errors
    ///
    /// Errors with [`Error::BucketExhausted`] if there are not enough tokens
    /// and the bucket uses [`Policy::Signal`].
    pub fn consume(&self, count: usize) -> Result<bool, Error> {
        let mut state = self.state.lock();
        let available = self.refill_locked(&mut state);

        if available >= count {
            state.tokens = available - count;
            trace!(requested = count, tokens = state.tokens, "consumed");
            return Ok(true);
        }

        trace!(requested = count, tokens = available, "insufficient tokens");

        match self.policy {
            Policy::Boolean => Ok(false),
            Policy::Signal => Err(Error::BucketExhausted {
                requested: count,
                available,
            }),
        }
    }

    fn refill_locked(&self, state: &mut State) -> usize {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(state.last_refill);

        // Float to integer casts saturate.
        let added = (elapsed as f64 * self.refill_rate).floor() as usize;

        state.tokens = state.tokens.saturating_add(added).min(self.max);
        state.last_refill = state.last_refill.max(now);

        if added > 0 {
            trace!(elapsed, added, tokens = state.tokens, "refilled");
        }

        state.tokens
    }
}

impl<C> fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();

        f.debug_struct("TokenBucket")
            .field("tokens", &state.tokens)
            .field("max", &self.max)
            .field("refill_rate", &self.refill_rate)
            .field("last_refill", &state.last_refill)
            .field("policy", &self.policy)
            .finish()
    }
}
