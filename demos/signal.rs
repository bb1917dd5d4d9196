use anyhow::Result;
use token_bucket::{Error, Policy, TokenBucket};

fn handle(bucket: &TokenBucket, cost: usize) -> Result<(), Error> {
    bucket.consume(cost)?;
    println!("handled request costing {} tokens", cost);
    Ok(())
}

fn main() -> Result<()> {
    helpers::init_logging();

    let bucket = TokenBucket::builder()
        .initial(5)
        .max(5)
        .policy(Policy::Signal)
        .build()?;

    for cost in [2, 2, 2, 1] {
        if let Err(error) = handle(&bucket, cost) {
            println!("rejected: {}", error);
        }
    }

    Ok(())
}
