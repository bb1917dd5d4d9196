use token_bucket::{TokenBucket, TokioClock};
use tokio::time::{self, Duration};

#[tokio::test(start_paused = true)]
async fn test_default_max_is_independent_of_initial() -> anyhow::Result<()> {
    let bucket = TokenBucket::builder()
        .initial(7)
        .clock(TokioClock::new())
        .build()?;

    assert_eq!(100, bucket.max());

    time::sleep(Duration::from_secs(50)).await;
    assert_eq!(57, bucket.refill());

    time::sleep(Duration::from_secs(50)).await;
    assert_eq!(100, bucket.refill());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_absent_max_follows_initial() -> anyhow::Result<()> {
    let bucket = TokenBucket::builder()
        .initial(7)
        .max_opt(None)
        .clock(TokioClock::new())
        .build()?;

    assert_eq!(7, bucket.max());
    assert!(bucket.consume(7)?);

    time::sleep(Duration::from_secs(50)).await;
    assert_eq!(7, bucket.refill());
    Ok(())
}
