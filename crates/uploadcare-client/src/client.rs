//! Main client implementation

use crate::auth::SignedRequest;
use crate::from_url::{ImportHandle, UrlImportTask};
use crate::iterate::BulkIterator;
use crate::pagination::{to_query_string, ListSource, PageCursor, QueryParams};
use crate::transport::{Body, FormField, HttpTransport, Transport, TransportRequest};
use crate::upload::{group_form, options_for_path, upload_form};
use crate::{ClientError, Config, Result, types::*};
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

struct Inner {
    config: Config,
    transport: Arc<dyn Transport>,
}

/// Uploadcare client.
///
/// Cheap to clone; clones share configuration and transport.
#[derive(Clone)]
pub struct UploadcareClient {
    inner: Arc<Inner>,
}

impl UploadcareClient {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner { config, transport }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// File operations
    pub fn files(&self) -> Files {
        Files { client: self.clone() }
    }

    /// Group operations
    pub fn groups(&self) -> Groups {
        Groups { client: self.clone() }
    }

    // ==================== Helper Methods ====================

    /// Signed REST call. `path` includes the query string.
    async fn rest<B: Serialize + ?Sized>(&self, method: Method, path: &str, data: Option<&B>) -> Result<Value> {
        let body = match data {
            Some(data) => serde_json::to_vec(data)
                .map_err(|e| ClientError::InvalidRequest(format!("cannot encode body: {}", e)))?,
            None => Vec::new(),
        };

        let signed = SignedRequest::now(&self.inner.config.credentials, method.as_str(), path, &body)?;
        let body = if body.is_empty() {
            Body::Empty
        } else {
            Body::Json(Bytes::from(body))
        };

        let request = TransportRequest::new(method, self.inner.config.api_url(path))
            .with_headers(signed.headers())
            .with_body(body);
        self.inner.transport.send(request).await
    }

    async fn rest_empty(&self, method: Method, path: &str) -> Result<Value> {
        self.rest::<Value>(method, path, None).await
    }

    /// Unsigned multipart POST to the upload API
    async fn submit_form(&self, path: &str, fields: Vec<FormField>) -> Result<Value> {
        let request = TransportRequest::new(Method::POST, self.inner.config.upload_url(path))
            .with_body(Body::Form(fields));
        self.inner.transport.send(request).await
    }
}

/// Bytes left as-is inside a path segment (RFC 3986 unreserved)
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Percent-encode a resource id for use as one path segment.
///
/// The signature covers the path string, so it has to be the exact form
/// that goes on the wire.
fn segment(id: &str) -> Result<String> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(ClientError::InvalidRequest(format!("invalid resource id {:?}", id)));
    }
    Ok(utf8_percent_encode(id, SEGMENT).to_string())
}

fn list_path(base: &str, params: &QueryParams) -> String {
    let qs = to_query_string(params);
    if qs.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, qs)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

/// File endpoints
#[derive(Clone)]
pub struct Files {
    client: UploadcareClient,
}

impl Files {
    /// Upload bytes directly
    #[instrument(skip(self, data))]
    pub async fn upload(&self, data: impl Into<Bytes>, options: UploadOptions) -> Result<Value> {
        let config = self.client.config();
        let fields = upload_form(&config.credentials.public_key, data.into(), &options);
        self.client.submit_form("/base/", fields).await
    }

    /// Upload a file from disk, named after its path unless told otherwise
    #[instrument(skip(self))]
    pub async fn upload_path(&self, path: &Path, options: UploadOptions) -> Result<Value> {
        let data = tokio::fs::read(path).await?;
        debug!(bytes = data.len(), "Read file for upload");
        self.upload(data, options_for_path(path, options)).await
    }

    /// Import a file from a URL and wait for the outcome
    pub async fn from_url(&self, source_url: &str, options: ImportOptions) -> Result<Value> {
        self.import_task(source_url, options).run().await
    }

    /// Start a URL import in the background
    pub fn start_from_url(&self, source_url: &str, options: ImportOptions) -> ImportHandle {
        self.import_task(source_url, options).spawn()
    }

    /// Prepare a URL import without starting it
    pub fn import_task(&self, source_url: &str, options: ImportOptions) -> UrlImportTask {
        UrlImportTask::new(
            self.client.inner.transport.clone(),
            self.client.config(),
            source_url,
            options,
        )
    }

    /// Fetch one raw page of files
    #[instrument(skip(self))]
    pub async fn list(&self, params: &QueryParams) -> Result<Value> {
        self.client.rest_empty(Method::GET, &list_path("/files/", params)).await
    }

    /// Cursor over all files
    pub fn cursor(&self, params: impl Into<QueryParams>) -> PageCursor<FileInfo, Files> {
        PageCursor::new(self.clone(), params.into())
    }

    /// Bulk iterator over all files, optionally stopping after `max` items
    pub fn iterate(&self, params: impl Into<QueryParams>, max: Option<usize>) -> BulkIterator<FileInfo, Files> {
        BulkIterator::new(self.cursor(params)).with_limit(max)
    }

    /// Store a file permanently
    #[instrument(skip(self))]
    pub async fn store(&self, uuid: &str) -> Result<FileInfo> {
        let value = self
            .client
            .rest_empty(Method::POST, &format!("/files/{}/storage/", segment(uuid)?))
            .await?;
        decode(value)
    }

    /// Copy a file to a custom storage target
    #[instrument(skip(self))]
    pub async fn store_custom(&self, uuid: &str, target: &str) -> Result<Value> {
        let data = serde_json::json!({ "source": uuid, "target": target });
        self.client.rest(Method::POST, "/files/", Some(&data)).await
    }

    /// File details
    #[instrument(skip(self))]
    pub async fn info(&self, uuid: &str) -> Result<FileInfo> {
        let value = self
            .client
            .rest_empty(Method::GET, &format!("/files/{}/", segment(uuid)?))
            .await?;
        decode(value)
    }

    /// Delete a file
    #[instrument(skip(self))]
    pub async fn remove(&self, uuid: &str) -> Result<Value> {
        self.client
            .rest_empty(Method::DELETE, &format!("/files/{}/", segment(uuid)?))
            .await
    }

    /// Delete many files in one call
    #[instrument(skip(self, uuids), fields(count = uuids.len()))]
    pub async fn remove_multiple<S: AsRef<str>>(&self, uuids: &[S]) -> Result<Value> {
        let ids: Vec<&str> = uuids.iter().map(|id| id.as_ref()).collect();
        self.client
            .rest(Method::DELETE, "/files/storage/", Some(&ids))
            .await
    }
}

#[async_trait]
impl ListSource for Files {
    async fn list(&self, params: &QueryParams) -> Result<Value> {
        Files::list(self, params).await
    }
}

/// Group endpoints
#[derive(Clone)]
pub struct Groups {
    client: UploadcareClient,
}

impl Groups {
    /// Create a group from file ids
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn from_files<S: AsRef<str>>(&self, files: &[S]) -> Result<Value> {
        let fields = group_form(&self.client.config().credentials.public_key, files);
        self.client.submit_form("/group/", fields).await
    }

    /// Fetch one raw page of groups
    #[instrument(skip(self))]
    pub async fn list(&self, params: &QueryParams) -> Result<Value> {
        self.client.rest_empty(Method::GET, &list_path("/groups/", params)).await
    }

    /// Cursor over all groups
    pub fn cursor(&self, params: impl Into<QueryParams>) -> PageCursor<GroupInfo, Groups> {
        PageCursor::new(self.clone(), params.into())
    }

    /// Bulk iterator over all groups
    pub fn iterate(&self, params: impl Into<QueryParams>, max: Option<usize>) -> BulkIterator<GroupInfo, Groups> {
        BulkIterator::new(self.cursor(params)).with_limit(max)
    }

    /// Group details, including its files
    #[instrument(skip(self))]
    pub async fn info(&self, group_id: &str) -> Result<Value> {
        self.client
            .rest_empty(Method::GET, &format!("/groups/{}/", segment(group_id)?))
            .await
    }

    /// Store every file of a group
    #[instrument(skip(self))]
    pub async fn store(&self, group_id: &str) -> Result<Value> {
        self.client
            .rest_empty(Method::PUT, &format!("/groups/{}/storage/", segment(group_id)?))
            .await
    }

    /// Delete every file of a group.
    ///
    /// Returns the group info that was used and the delete response.
    #[instrument(skip(self))]
    pub async fn remove(&self, group_id: &str) -> Result<(Value, Value)> {
        let info = self.info(group_id).await?;
        let files = info
            .get("files")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::InvalidResponse("Unexpected error".to_string()))?;

        let ids: Vec<&str> = files
            .iter()
            .filter_map(|f| f.get("uuid").and_then(Value::as_str))
            .filter(|uuid| !uuid.is_empty())
            .collect();
        debug!(files = ids.len(), "Removing group files");

        let response = self
            .client
            .rest(Method::DELETE, "/files/storage/", Some(&ids))
            .await?;
        Ok((info, response))
    }
}

#[async_trait]
impl ListSource for Groups {
    async fn list(&self, params: &QueryParams) -> Result<Value> {
        Groups::list(self, params).await
    }
}
