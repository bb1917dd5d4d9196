use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use token_bucket::TokenBucket;

#[tokio::main]
async fn main() -> Result<()> {
    helpers::init_logging();

    let bucket = Arc::new(
        TokenBucket::builder()
            .initial(10)
            .refill_rate(5.0)
            .max(10)
            .build()?,
    );

    let mut tasks = Vec::new();

    for n in 0..4 {
        let bucket = bucket.clone();

        tasks.push(tokio::spawn(async move {
            let mut admitted = 0;

            for _ in 0..10 {
                if bucket.consume_one()? {
                    admitted += 1;
                }

                tokio::time::sleep(Duration::from_millis(250)).await;
            }

            println!("worker {}: {} admitted", n, admitted);
            Ok::<_, token_bucket::Error>(admitted)
        }));
    }

    let mut total = 0;

    for t in tasks {
        total += t.await??;
    }

    println!("total admitted: {}", total);
    Ok(())
}
