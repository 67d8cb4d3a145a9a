//! Common types for the client SDK

use crate::pagination::QueryParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Storage behaviour requested for a new upload
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreMode {
    /// Let the project settings decide
    #[default]
    Auto,
    /// Store permanently
    Store,
    /// Keep as a temporary upload
    Temporary,
}

impl StoreMode {
    /// Map an optional flag: `None` means auto
    pub fn from_flag(store: Option<bool>) -> Self {
        match store {
            Some(true) => Self::Store,
            Some(false) => Self::Temporary,
            None => Self::Auto,
        }
    }

    /// Value sent in upload forms
    pub fn as_form_value(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Store => "1",
            Self::Temporary => "0",
        }
    }
}

/// Options for a direct upload
#[derive(Clone, Debug, Default)]
pub struct UploadOptions {
    /// File name reported to the service
    pub filename: Option<String>,
    /// MIME type of the content
    pub content_type: Option<String>,
    /// Storage behaviour
    pub store: StoreMode,
}

impl UploadOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file name
    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    /// Set the content type
    pub fn with_content_type(mut self, ct: impl Into<String>) -> Self {
        self.content_type = Some(ct.into());
        self
    }

    /// Set storage behaviour
    pub fn with_store(mut self, store: StoreMode) -> Self {
        self.store = store;
        self
    }
}

/// Options for importing a file from a URL
#[derive(Clone, Debug, Default)]
pub struct ImportOptions {
    /// Storage behaviour
    pub store: StoreMode,
    /// Keep polling after `success` until the file reports `is_ready`
    pub wait_until_ready: bool,
}

impl ImportOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set storage behaviour
    pub fn with_store(mut self, store: StoreMode) -> Self {
        self.store = store;
        self
    }

    /// Wait for `is_ready` before resolving
    pub fn wait_until_ready(mut self) -> Self {
        self.wait_until_ready = true;
        self
    }
}

/// Builder for list query parameters
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    params: QueryParams,
}

impl ListOptions {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size
    pub fn limit(self, limit: u32) -> Self {
        self.param("limit", limit.to_string())
    }

    /// Sort order, e.g. `-datetime_uploaded`
    pub fn ordering(self, ordering: impl Into<String>) -> Self {
        self.param("ordering", ordering)
    }

    /// Start position, as understood by the ordering
    pub fn from(self, from: impl Into<String>) -> Self {
        self.param("from", from)
    }

    /// Only stored (or only unstored) files
    pub fn stored(self, stored: bool) -> Self {
        self.param("stored", stored.to_string())
    }

    /// Only removed (or only live) files
    pub fn removed(self, removed: bool) -> Self {
        self.param("removed", removed.to_string())
    }

    /// Any other parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Finished parameter map
    pub fn into_params(self) -> QueryParams {
        self.params
    }
}

impl From<ListOptions> for QueryParams {
    fn from(options: ListOptions) -> Self {
        options.into_params()
    }
}

/// A file as described by the REST API
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File UUID
    pub uuid: String,
    /// Name given at upload time
    #[serde(default)]
    pub original_filename: Option<String>,
    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,
    /// Detected MIME type
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Whether the file can be served
    #[serde(default)]
    pub is_ready: Option<bool>,
    /// Upload timestamp (RFC 3339)
    #[serde(default)]
    pub datetime_uploaded: Option<String>,
    /// Storage timestamp, `None` until stored
    #[serde(default)]
    pub datetime_stored: Option<String>,
    /// Removal timestamp, `None` while live
    #[serde(default)]
    pub datetime_removed: Option<String>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// A group of files
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group id, `<uuid>~<count>`
    pub id: String,
    /// Number of files
    #[serde(default)]
    pub files_count: Option<u64>,
    /// Creation timestamp
    #[serde(default)]
    pub datetime_created: Option<String>,
    /// Storage timestamp
    #[serde(default)]
    pub datetime_stored: Option<String>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_store_mode_form_values() {
        assert_eq!(StoreMode::from_flag(None).as_form_value(), "auto");
        assert_eq!(StoreMode::from_flag(Some(true)).as_form_value(), "1");
        assert_eq!(StoreMode::from_flag(Some(false)).as_form_value(), "0");
    }

    #[test]
    fn test_list_options() {
        let params = ListOptions::new().limit(50).stored(true).param("removed", "false").into_params();
        assert_eq!(params.get("limit").map(String::as_str), Some("50"));
        assert_eq!(params.get("stored").map(String::as_str), Some("true"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_file_info_keeps_unknown_fields() {
        let info: FileInfo = serde_json::from_value(json!({
            "uuid": "3c269810-c17b-4e2c-92b6-25622464d866",
            "size": 1024,
            "is_ready": true,
            "image_info": {"width": 10}
        }))
        .unwrap();

        assert_eq!(info.size, Some(1024));
        assert_eq!(info.is_ready, Some(true));
        assert_eq!(info.extra["image_info"], json!({"width": 10}));
    }
}
