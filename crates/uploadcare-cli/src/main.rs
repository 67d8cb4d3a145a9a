//! Uploadcare command line client

use clap::Parser;
use uploadcare_cli::{execute, CliConfig, Command};
use uploadcare_client::{UploadcareClient, DEFAULT_API_BASE, DEFAULT_UPLOAD_BASE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "uploadcare")]
#[command(about = "Manage files in an Uploadcare project")]
#[command(version)]
struct Args {
    /// Project public key
    #[arg(long, env = "UPLOADCARE_PUBLIC_KEY")]
    public_key: String,

    /// Project secret key
    #[arg(long, env = "UPLOADCARE_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// REST API base URL
    #[arg(long, default_value = DEFAULT_API_BASE, env = "UPLOADCARE_API_BASE")]
    api_base: String,

    /// Upload API base URL
    #[arg(long, default_value = DEFAULT_UPLOAD_BASE, env = "UPLOADCARE_UPLOAD_BASE")]
    upload_base: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    request_timeout: u64,

    /// Enable debug logging
    #[arg(short, long, env = "UPLOADCARE_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so stdout stays valid JSON
    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("uploadcare_cli={0},uploadcare_client={0}", log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CliConfig {
        public_key: args.public_key,
        secret_key: args.secret_key,
        api_base: args.api_base,
        upload_base: args.upload_base,
        request_timeout_secs: args.request_timeout,
        ..Default::default()
    };
    tracing::debug!(config = %serde_json::to_string(&config)?, "Loaded configuration");

    let client = UploadcareClient::new(config.client_config()?)?;
    let output = execute(&client, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
