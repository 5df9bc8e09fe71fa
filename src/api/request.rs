//! Per-call request descriptor.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::Method;
use serde::Serialize;

use super::error::ApiError;

pub const CODE_INVALID_BODY: &str = "INVALID_BODY";
pub const CODE_INVALID_HEADER: &str = "INVALID_HEADER";

/// Request payload.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    /// Serialized as JSON with the default content type.
    Json(serde_json::Value),
    /// Raw bytes sent as-is; `content_type` replaces the default when set.
    Bytes {
        data: Vec<u8>,
        content_type: Option<String>,
    },
    /// Multipart form-data. The default `Content-Type` is never sent with it
    /// so the transport can set its own boundary.
    Form(Form),
}

impl Body {
    /// Serialize any value into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value).map(Body::Json).map_err(|e| {
            ApiError::new(
                format!("Failed to serialize request body: {}", e),
                None,
                Some(CODE_INVALID_BODY.to_string()),
            )
        })
    }

    pub fn is_form(&self) -> bool {
        matches!(self, Body::Form(_))
    }
}

/// Method, path, query, header overrides and body for a single call.
#[derive(Debug)]
pub struct RequestOptions {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/jobs`.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Merged over the client's default headers.
    pub headers: HeaderMap,
    pub body: Body,
}

impl RequestOptions {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ApiError> {
        Ok(self.body(Body::json(value)?))
    }

    pub fn form(self, form: Form) -> Self {
        self.body(Body::Form(form))
    }

    /// Append a query parameter; values are percent-encoded when the URL is built.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Header override from raw strings (e.g. CLI input).
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, ApiError> {
        let invalid = || {
            ApiError::new(
                format!("Invalid header {}: {}", name, value),
                None,
                Some(CODE_INVALID_HEADER.to_string()),
            )
        };
        let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
        Ok(self.header(name, value))
    }

    /// Full URL: `<base_url><path>?<query>`.
    pub fn url(&self, base_url: &str) -> String {
        let mut url = format!("{}{}", base_url, self.path);
        if !self.query.is_empty() {
            let encoded: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push(if self.path.contains('?') { '&' } else { '?' });
            url.push_str(&encoded.join("&"));
        }
        url
    }
}
