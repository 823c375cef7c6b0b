use clap::Parser;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use tftp_client::{resolve, Cli, Client, RetryPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let server = resolve(&args.host, args.port).await?;
    let policy = RetryPolicy::new(Duration::from_millis(args.timeout), args.retry);
    let local = args.local_path();

    println!(
        "TFTP {} {} <-> {}, timeout: {} ms, retry: {}",
        args.operation,
        server,
        local.display(),
        args.timeout,
        args.retry
    );

    let client = Client::new(server, policy);
    let report = client.run(args.operation, &args.filename, &local).await?;

    println!(
        "{} bytes in {} blocks, cost: {:.3}s, speed: {:.2} MB/s",
        report.bytes,
        report.blocks,
        report.elapsed.as_secs_f64(),
        report.speed()
    );
    Ok(())
}
