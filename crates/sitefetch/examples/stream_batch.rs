//! Example: Stream batch progress for a handful of URLs
//!
//! Run with: cargo run -p sitefetch --example stream_batch
//!
//! Prints each progress frame as it arrives, then a plain batch summary
//! for the same URLs.

use futures::StreamExt;
use sitefetch::{BatchArgs, BatchOptions, OutputFormat, StreamOptions, Tool};

const URLS: &[&str] = &[
    "https://example.com",
    "https://httpbin.org/html",
    "https://httpbin.org/json",
    "https://httpbin.org/status/404",
    "http://localhost/",
];

#[tokio::main]
async fn main() {
    let tool = Tool::default();
    let args = BatchArgs {
        urls: URLS.iter().map(|u| u.to_string()).collect(),
        options: BatchOptions {
            format: Some(OutputFormat::Text),
            max_concurrency: Some(2),
            ..Default::default()
        },
    };

    println!("Streaming {} URLs", URLS.len());
    println!("==================\n");

    let mut stream = match tool.stream_batch(args.clone(), StreamOptions::default()) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("Content-Type: {}\n", stream.content_type());
    while let Some(frame) = stream.next().await {
        print!("{}", String::from_utf8_lossy(&frame));
    }

    match tool.fetch_multiple_websites(args).await {
        Ok(batch) => {
            for item in &batch.results {
                let mark = if item.success { "✓" } else { "✗" };
                match &item.result.error {
                    Some(err) => println!("{} {} ({})", mark, item.result.url, err),
                    None => println!("{} {} [{}]", mark, item.result.url, item.result.status_code),
                }
            }
            println!(
                "\n{} requested, {} successful, {} failed",
                batch.summary.total_requested, batch.summary.successful, batch.summary.failed
            );
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
