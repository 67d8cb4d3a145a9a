//! Request signing for the REST API
//!
//! Every REST call carries an HMAC-SHA1 signature over a canonical string:
//!
//! ```text
//! METHOD \n md5(body) \n content-type \n date \n path
//! ```
//!
//! The MD5 body hash is what the service expects on the wire; it carries no
//! security weight here. Signatures are bound to a fresh date header, so a
//! [`SignedRequest`] is built per call and never reused.

use crate::{ClientError, Credentials, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Content type covered by the signature
pub const CONTENT_TYPE: &str = "application/json";
/// Header carrying `UploadCare <public>:<signature>`
pub const AUTH_HEADER: &str = "Authentication";
/// Header carrying the signed date
pub const DATE_HEADER: &str = "X-Uploadcare-Date";
/// Scheme prefix of the auth header value
pub const AUTH_SCHEME: &str = "UploadCare";

/// Hex MD5 of a request body
pub fn content_hash(body: &[u8]) -> String {
    hex::encode(Md5::digest(body))
}

/// Format a timestamp the way the date header expects (RFC 1123, GMT)
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Build the string that gets signed
pub fn canonical_string(method: &str, content_hash: &str, date: &str, path: &str) -> String {
    [method, content_hash, CONTENT_TYPE, date, path].join("\n")
}

/// Compute the hex HMAC-SHA1 signature for one request.
///
/// Inputs that would corrupt the canonical string are rejected instead of
/// being normalized.
pub fn sign(method: &str, path: &str, body: &[u8], date: &str, private_key: &str) -> Result<String> {
    validate(method, path, date)?;

    let canonical = canonical_string(method, &content_hash(body), date, path);
    let mut mac = HmacSha1::new_from_slice(private_key.as_bytes())
        .map_err(|e| ClientError::Signing(e.to_string()))?;
    mac.update(canonical.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn validate(method: &str, path: &str, date: &str) -> Result<()> {
    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ClientError::Signing(format!("invalid method: {:?}", method)));
    }
    if !path.starts_with('/') {
        return Err(ClientError::Signing(format!("path must be absolute: {:?}", path)));
    }
    if path.contains('\n') || date.contains('\n') {
        return Err(ClientError::Signing("line break in signed input".to_string()));
    }
    if date.is_empty() {
        return Err(ClientError::Signing("missing date".to_string()));
    }
    Ok(())
}

/// Everything needed to authenticate one REST call
#[derive(Clone, Debug)]
pub struct SignedRequest {
    /// HTTP method
    pub method: String,
    /// Path including query string
    pub path: String,
    /// Hex MD5 of the body
    pub content_hash: String,
    /// Signed content type
    pub content_type: &'static str,
    /// Signed date header value
    pub date: String,
    /// Hex HMAC-SHA1 signature
    pub signature: String,
    /// Body length in bytes
    pub content_length: usize,
    public_key: String,
}

impl SignedRequest {
    /// Sign a request for the given date
    pub fn new(
        credentials: &Credentials,
        method: &str,
        path: &str,
        body: &[u8],
        date: String,
    ) -> Result<Self> {
        let signature = sign(method, path, body, &date, &credentials.private_key)?;

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            content_hash: content_hash(body),
            content_type: CONTENT_TYPE,
            date,
            signature,
            content_length: body.len(),
            public_key: credentials.public_key.clone(),
        })
    }

    /// Sign a request stamped with the current time
    pub fn now(credentials: &Credentials, method: &str, path: &str, body: &[u8]) -> Result<Self> {
        Self::new(credentials, method, path, body, http_date(Utc::now()))
    }

    /// Value of the auth header
    pub fn authorization(&self) -> String {
        format!("{} {}:{}", AUTH_SCHEME, self.public_key, self.signature)
    }

    /// Headers to attach to the outgoing request
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            (AUTH_HEADER.to_string(), self.authorization()),
            (DATE_HEADER.to_string(), self.date.clone()),
            ("Content-Type".to_string(), self.content_type.to_string()),
            ("Content-Length".to_string(), self.content_length.to_string()),
        ]
    }
}
