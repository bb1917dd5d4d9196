use std::thread;
use std::time::Duration;

use anyhow::Result;
use token_bucket::TokenBucket;

fn main() -> Result<()> {
    helpers::init_logging();

    let bucket = TokenBucket::builder()
        .initial(3)
        .refill_rate(1.0)
        .max(3)
        .build()?;

    for request in 0..10 {
        if bucket.consume_one()? {
            println!("request {}: admitted", request);
        } else {
            println!("request {}: rate limited", request);
        }

        thread::sleep(Duration::from_millis(400));
    }

    Ok(())
}
