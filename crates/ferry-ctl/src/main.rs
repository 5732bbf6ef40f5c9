//! ferry-ctl — command-line client for ferryd.
//!
//! Usage: ferry-ctl <file> <chunk_count>
//!
//! The integrity report is advisory: the process exits 0 once the protocol
//! has run, whatever the verdict, and a damaged output file is kept.

use anyhow::{Context, Result};
use tokio::net::TcpStream;

use ferry_core::config::FerryConfig;
use ferry_core::wire::TransferRequest;
use ferry_ctl::{fetch, TransferOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let (file, count) = match (args.next(), args.next()) {
        (Some(file), Some(count)) => (file, count),
        _ => {
            eprintln!("usage: ferry-ctl <file> <chunk_count>");
            std::process::exit(2);
        }
    };
    let chunk_count: u32 = count
        .parse()
        .context("chunk count must be a positive integer")?;

    let config = FerryConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        FerryConfig::default()
    });

    let request = TransferRequest::new(&file, chunk_count)?;
    let addr = format!("{}:{}", config.network.server_addr, config.network.port);
    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to ferryd at {addr} — is it running?"))?;

    // The request filename carries no path components, so the output name
    // is simply the original with a prefix, as the reassembled copy.
    let output_path = config.storage.output_dir.join(format!("new_{file}"));

    let outcome = fetch(stream, &request, &output_path).await?;

    println!("Reassembled file written to: {}", output_path.display());
    match outcome {
        TransferOutcome::Complete { digest } => {
            println!("File digest: {digest}");
            println!("Data integrity check: PASSED");
        }
        TransferOutcome::IntegrityMismatch { ours, theirs } => {
            println!("Original file digest:    {theirs}");
            println!("Reassembled file digest: {ours}");
            println!("Data integrity check: FAILED");
        }
        TransferOutcome::PartialLoss { missing_ids } => {
            println!("Transfer incomplete — missing chunk ids: {missing_ids:?}");
            println!("Data integrity check: FAILED");
        }
    }

    Ok(())
}
