//! Import a remote file, then walk the project's stored files
//!
//! This demo shows:
//! - Starting a URL import in the background and cancelling on Ctrl-C
//! - Bulk iteration with an item cap
//! - Reading the detail of a failed REST call
//!
//! Run with: cargo run --example import_from_url -- https://example.com/cat.jpg

use std::ops::ControlFlow;
use uploadcare_client::{Config, ImportOptions, ListOptions, UploadcareClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let source = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://ucarecdn.com/assets/images/logo.png".to_string());

    let config = Config::new(
        std::env::var("UPLOADCARE_PUBLIC_KEY").unwrap_or_else(|_| "demopublickey".to_string()),
        std::env::var("UPLOADCARE_SECRET_KEY").unwrap_or_else(|_| "demoprivatekey".to_string()),
    );
    let client = UploadcareClient::new(config)?;

    // ==================== URL Import ====================

    println!("Importing {} ...", source);
    let handle = client
        .files()
        .start_from_url(&source, ImportOptions::new().wait_until_ready());

    tokio::select! {
        result = handle.wait() => match result {
            Ok(file) => println!("   imported {}", serde_json::to_string_pretty(&file)?),
            Err(e) => println!("   import failed: {}", e),
        },
        _ = tokio::signal::ctrl_c() => {
            // Dropping the handle stops the polling loop.
            println!("   interrupted");
            return Ok(());
        }
    }

    // ==================== Bulk Iteration ====================

    println!("\nFirst stored files:");
    let seen = client
        .files()
        .iterate(ListOptions::new().stored(true).limit(5), Some(10))
        .run(|page| {
            for file in &page {
                println!("   - {} ({:?})", file.uuid, file.original_filename);
            }
            async { ControlFlow::Continue(()) }
        })
        .await;

    match seen {
        Ok(count) => println!("   {} files", count),
        Err(e) => println!("   listing failed: {} {:?}", e, e.body()),
    }

    Ok(())
}
