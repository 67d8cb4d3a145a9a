//! # Uploadcare Client SDK
//!
//! A client SDK for the Uploadcare upload and REST APIs.
//!
//! ## Features
//!
//! - **Signed requests**: HMAC-SHA1 request signing for the REST API
//! - **Cursors**: forward-only pagination over files and groups
//! - **Bulk iteration**: page-by-page walks with an item limit and early stop
//! - **URL imports**: submit-then-poll imports with cancellation
//!
//! ## Example
//!
//! ```rust,ignore
//! use uploadcare_client::{Config, ImportOptions, ListOptions, UploadcareClient};
//! use std::ops::ControlFlow;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = UploadcareClient::new(Config::new("public-key", "secret-key"))?;
//!
//!     // Import a file and wait until it can be served
//!     let file = client
//!         .files()
//!         .from_url("https://example.com/cat.jpg", ImportOptions::new().wait_until_ready())
//!         .await?;
//!     println!("Imported: {}", file["uuid"]);
//!
//!     // Walk the first hundred stored files
//!     client
//!         .files()
//!         .iterate(ListOptions::new().stored(true), Some(100))
//!         .run(|page| {
//!             for f in page {
//!                 println!("{}", f.uuid);
//!             }
//!             async { ControlFlow::Continue(()) }
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
mod client;
mod config;
mod error;
pub mod from_url;
pub mod iterate;
pub mod pagination;
pub mod transport;
mod types;
pub mod upload;

pub use auth::SignedRequest;
pub use client::{Files, Groups, UploadcareClient};
pub use config::{Config, Credentials, DEFAULT_API_BASE, DEFAULT_POLL_INTERVAL, DEFAULT_UPLOAD_BASE};
pub use error::{ClientError, Result};
pub use from_url::{ImportHandle, ImportState, UrlImportTask};
pub use iterate::BulkIterator;
pub use pagination::{Page, PageCursor, QueryParams, ListSource};
pub use transport::{HttpTransport, Transport, TransportRequest};
pub use types::*;
