// Dump recent aggregated_status rows as JSON.
//
// Usage: cargo run --example dump_aggregates -- [DB_PATH] [LIMIT]
//   DB_PATH  default: ./data/aligator.db
//   LIMIT    default: 20

use aligator::status_repo::StatusRepo;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/aligator.db");
    let limit: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);

    let repo = StatusRepo::connect(path, 1).await?;
    let aggregates = repo.get_recent_aggregates(limit).await?;

    println!("{}", serde_json::to_string_pretty(&aggregates)?);
    Ok(())
}
