//! Drive buckets through long pseudo-random sequences and check the accounting
//! after every step.

use token_bucket::{Clock, Error, ManualClock, Policy, TokenBucket};

/// Small deterministic generator so runs are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

fn run(seed: u64, refill_rate: f64, max: usize, policy: Policy) {
    let mut rng = Lcg(seed);
    let clock = ManualClock::new();

    let bucket = TokenBucket::builder()
        .initial(max / 2)
        .refill_rate(refill_rate)
        .max(max)
        .policy(policy)
        .clock(clock.clone())
        .build()
        .unwrap();

    for _ in 0..10_000 {
        let before = bucket.tokens();
        let elapsed = rng.next(4);
        clock.advance(elapsed);

        let expected = (before + (elapsed as f64 * refill_rate).floor() as usize).min(max);

        if rng.next(3) == 0 {
            assert_eq!(expected, bucket.refill());
            continue;
        }

        let count = rng.next(max as u64 + 3) as usize;

        match bucket.consume(count) {
            Ok(true) => {
                assert!(count <= expected);
                assert_eq!(expected - count, bucket.tokens());
            }
            Ok(false) => {
                assert_eq!(Policy::Boolean, policy);
                assert!(count > expected);
                assert_eq!(expected, bucket.tokens());
            }
            Err(Error::BucketExhausted {
                requested,
                available,
            }) => {
                assert_eq!(Policy::Signal, policy);
                assert_eq!(count, requested);
                assert_eq!(expected, available);
                assert_eq!(expected, bucket.tokens());
            }
            Err(e) => panic!("unexpected error: {}", e),
        }

        assert!(bucket.tokens() <= bucket.max());
        assert_eq!(clock.now(), bucket.last_refill());
    }
}

#[test]
fn test_boolean_accounting() {
    run(1, 1.0, 10, Policy::Boolean);
    run(2, 2.5, 7, Policy::Boolean);
    run(3, 0.3, 3, Policy::Boolean);
}

#[test]
fn test_signal_accounting() {
    run(4, 1.0, 10, Policy::Signal);
    run(5, 4.0, 20, Policy::Signal);
}
