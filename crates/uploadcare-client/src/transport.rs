//! HTTP transport seam
//!
//! The cursor, the bulk iterator and the URL import task only ever talk to a
//! [`Transport`]. [`HttpTransport`] is the reqwest-backed implementation;
//! tests plug in scripted ones.

use crate::{ClientError, Config, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, multipart, Client, Method};
use serde_json::Value;
use tracing::debug;

/// One field of a multipart form
#[derive(Clone, Debug)]
pub struct FormField {
    /// Field name
    pub name: String,
    /// Field payload
    pub value: FormValue,
}

/// Multipart field payload
#[derive(Clone, Debug)]
pub enum FormValue {
    /// Plain text value
    Text(String),
    /// File content
    File {
        data: Bytes,
        filename: Option<String>,
        content_type: Option<String>,
    },
}

impl FormField {
    /// Text field
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    /// Text value of this field, if it is one
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            FormValue::Text(s) => Some(s),
            FormValue::File { .. } => None,
        }
    }
}

/// Request body
#[derive(Clone, Debug, Default)]
pub enum Body {
    /// No body
    #[default]
    Empty,
    /// Serialized JSON document
    Json(Bytes),
    /// Multipart form
    Form(Vec<FormField>),
}

impl Body {
    /// Raw bytes that the signature covers
    pub fn signed_bytes(&self) -> &[u8] {
        match self {
            Body::Json(bytes) => bytes,
            Body::Empty | Body::Form(_) => &[],
        }
    }
}

/// A request ready to go on the wire
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Extra headers (auth, date, content type)
    pub headers: Vec<(String, String)>,
    /// Body
    pub body: Body,
}

impl TransportRequest {
    /// Request without headers or body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Attach a body
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Attach headers
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Look up a text form field
    pub fn form_field(&self, name: &str) -> Option<&str> {
        match &self.body {
            Body::Form(fields) => fields.iter().find(|f| f.name == name).and_then(FormField::as_text),
            _ => None,
        }
    }
}

/// Performs a request and yields the parsed JSON body
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request.
    ///
    /// Implementations apply [`handle_response`] to whatever the server returns.
    async fn send(&self, request: TransportRequest) -> Result<Value>;
}

/// Turn a status code and raw body into JSON or an error.
///
/// An unparseable body wins over a bad status: it is always reported as
/// [`ClientError::InvalidResponse`]. Any status above 201 is an error that
/// still carries the parsed body.
pub fn handle_response(status: u16, text: &str) -> Result<Value> {
    let body: Value = serde_json::from_str(text)
        .map_err(|e| ClientError::InvalidResponse(format!("Invalid JSON from uploadcare.com: {}", e)))?;

    if status > 201 {
        return Err(ClientError::UnexpectedStatus { status, body });
    }

    Ok(body)
}

/// reqwest-backed transport
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Build the underlying HTTP client from the configuration
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ClientError::Config(format!("invalid user agent: {}", e)))?,
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        debug!("Sending {} request to {}", method, url);
        let mut req = self.http.request(method, &url);

        for (k, v) in headers {
            req = req.header(k, v);
        }

        req = match body {
            Body::Empty => req,
            Body::Json(data) => req.body(data),
            Body::Form(fields) => req.multipart(build_form(fields)?),
        };

        let response = req.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(status, bytes = text.len(), "Received response");

        handle_response(status, &text)
    }
}

fn build_form(fields: Vec<FormField>) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for field in fields {
        form = match field.value {
            FormValue::Text(value) => form.text(field.name, value),
            FormValue::File {
                data,
                filename,
                content_type,
            } => {
                let mut part = multipart::Part::bytes(data.to_vec())
                    .file_name(filename.unwrap_or_else(|| "file".to_string()));
                if let Some(ct) = content_type {
                    part = part.mime_str(&ct)?;
                }
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}
