//! Subcommands and their execution

use anyhow::Context;
use clap::Subcommand;
use serde_json::Value;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Duration;
use uploadcare_client::{ImportOptions, ListOptions, StoreMode, UploadOptions, UploadcareClient};

/// What to do
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List files
    Files {
        /// Stop after at least this many files
        #[arg(long)]
        max: Option<usize>,
        /// Page size
        #[arg(long, default_value_t = 100)]
        limit: u32,
        /// Only stored (true) or only unstored (false) files
        #[arg(long)]
        stored: Option<bool>,
    },
    /// List groups
    Groups {
        /// Stop after at least this many groups
        #[arg(long)]
        max: Option<usize>,
        /// Page size
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// Upload a local file
    Upload {
        /// File to upload
        path: PathBuf,
        /// Store permanently (true) or keep temporary (false); project default if unset
        #[arg(long)]
        store: Option<bool>,
    },
    /// Import a file from a URL
    FromUrl {
        /// Source URL
        url: String,
        /// Store permanently (true) or keep temporary (false)
        #[arg(long)]
        store: Option<bool>,
        /// Keep polling until the file is ready to serve
        #[arg(long)]
        wait_until_ready: bool,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Show file details
    Info {
        /// File UUID
        uuid: String,
    },
    /// Store a file permanently
    Store {
        /// File UUID
        uuid: String,
    },
    /// Delete a file
    Remove {
        /// File UUID
        uuid: String,
    },
}

/// Run a command and return what should be printed
pub async fn execute(client: &UploadcareClient, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Files { max, limit, stored } => {
            let mut options = ListOptions::new().limit(limit);
            if let Some(stored) = stored {
                options = options.stored(stored);
            }

            let mut files = Vec::new();
            let count = client
                .files()
                .iterate(options, max)
                .run(|page| {
                    files.extend(page);
                    async { ControlFlow::Continue(()) }
                })
                .await?;
            tracing::info!(count, "Listed files");
            Ok(serde_json::to_value(files)?)
        }
        Command::Groups { max, limit } => {
            let mut groups = Vec::new();
            client
                .groups()
                .iterate(ListOptions::new().limit(limit), max)
                .run(|page| {
                    groups.extend(page);
                    async { ControlFlow::Continue(()) }
                })
                .await?;
            Ok(serde_json::to_value(groups)?)
        }
        Command::Upload { path, store } => {
            let options = UploadOptions::new().with_store(StoreMode::from_flag(store));
            let result = client
                .files()
                .upload_path(&path, options)
                .await
                .with_context(|| format!("uploading {}", path.display()))?;
            Ok(result)
        }
        Command::FromUrl {
            url,
            store,
            wait_until_ready,
            timeout,
        } => {
            let mut options = ImportOptions::new().with_store(StoreMode::from_flag(store));
            if wait_until_ready {
                options = options.wait_until_ready();
            }

            let handle = client.files().start_from_url(&url, options);
            let result = match timeout {
                // Dropping the handle on timeout cancels the polling.
                Some(secs) => tokio::time::timeout(Duration::from_secs(secs), handle.wait())
                    .await
                    .map_err(|_| anyhow::anyhow!("import of {} did not finish within {}s", url, secs))??,
                None => handle.wait().await?,
            };
            Ok(result)
        }
        Command::Info { uuid } => Ok(serde_json::to_value(client.files().info(&uuid).await?)?),
        Command::Store { uuid } => Ok(serde_json::to_value(client.files().store(&uuid).await?)?),
        Command::Remove { uuid } => Ok(client.files().remove(&uuid).await?),
    }
}
