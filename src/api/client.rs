//! HTTP client with bearer-token injection, timeout cancellation and
//! content-type aware response handling.
//!
//! Every call resolves to either the decoded payload or an `ApiError`; raw
//! transport errors never escape. There are no retries at this layer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use zeroize::Zeroize;

use super::error::{ApiError, CODE_DECODE, CODE_INVALID_JSON, STATUS_NETWORK};
use super::request::{Body, RequestOptions, CODE_INVALID_BODY};
use crate::config::ClientConfig;
use crate::storage::SecureStore;

/// Future returned by a token provider.
pub type TokenFuture = Pin<Box<dyn Future<Output = Option<String>> + Send>>;

type TokenProvider = Arc<dyn Fn() -> TokenFuture + Send + Sync>;

/// HTTP client wrapper for backend API communication.
///
/// Constructed once at startup and shared by `Arc`. The auth subsystem
/// registers a token provider; until it does, the token is read from the
/// secure store the client was built with.
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
    store: Option<Arc<SecureStore>>,
    token_provider: RwLock<Option<TokenProvider>>,
}

impl ApiClient {
    /// Create a new API client from static configuration.
    pub fn new(config: ClientConfig, store: Option<Arc<SecureStore>>) -> Self {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self::with_http_client(config, client, store)
    }

    /// Create a client around a preconfigured `reqwest::Client`.
    pub fn with_http_client(
        config: ClientConfig,
        client: Client,
        store: Option<Arc<SecureStore>>,
    ) -> Self {
        Self {
            client,
            config,
            store,
            token_provider: RwLock::new(None),
        }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Register the async function that supplies the current bearer token.
    pub async fn set_token_provider<F, Fut>(&self, provider: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        let provider: TokenProvider = Arc::new(move || Box::pin(provider()) as TokenFuture);
        *self.token_provider.write().await = Some(provider);
    }

    /// Remove the token provider (used on logout). Falls back to the store.
    pub async fn clear_token_provider(&self) {
        *self.token_provider.write().await = None;
    }

    /// Whether a token provider is registered.
    pub async fn has_token_provider(&self) -> bool {
        self.token_provider.read().await.is_some()
    }

    /// GET `path`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestOptions::new(Method::GET, path)).await
    }

    /// POST `body` as JSON.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(RequestOptions::new(Method::POST, path).json(body)?)
            .await
    }

    /// PUT `body` as JSON.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(RequestOptions::new(Method::PUT, path).json(body)?)
            .await
    }

    /// PATCH `body` as JSON.
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(RequestOptions::new(Method::PATCH, path).json(body)?)
            .await
    }

    /// DELETE `path`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestOptions::new(Method::DELETE, path)).await
    }

    /// POST multipart form-data (file uploads).
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        self.request(RequestOptions::new(Method::POST, path).form(form))
            .await
    }

    /// Send a request and decode the payload into `T`.
    pub async fn request<T: DeserializeOwned>(&self, options: RequestOptions) -> Result<T, ApiError> {
        let (status, payload) = self.execute(options).await?;
        serde_json::from_value(payload).map_err(|e| {
            ApiError::new(
                format!("Failed to decode response: {}", e),
                Some(status.as_u16()),
                Some(CODE_DECODE.to_string()),
            )
        })
    }

    /// Shared request routine.
    async fn execute(&self, options: RequestOptions) -> Result<(StatusCode, Value), ApiError> {
        let url = options.url(&self.config.base_url);
        let method = options.method.clone();
        let headers = self.build_headers(&options).await;

        let builder = self.client.request(method.clone(), &url).headers(headers);
        let builder = match options.body {
            Body::Empty => builder,
            Body::Json(value) => {
                let bytes = serde_json::to_vec(&value).map_err(|e| {
                    ApiError::new(
                        format!("Failed to serialize request body: {}", e),
                        None,
                        Some(CODE_INVALID_BODY.to_string()),
                    )
                })?;
                builder.body(bytes)
            }
            Body::Bytes { data, .. } => builder.body(data),
            Body::Form(form) => builder.multipart(form),
        };

        log::debug!("{} {}", method, options.path);

        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = resp.bytes().await?;
            Ok::<_, reqwest::Error>((status, content_type, bytes))
        };

        // Dropping the exchange on timeout aborts the in-flight request.
        let (status, content_type, bytes) =
            match tokio::time::timeout(self.config.timeout, exchange).await {
                Err(_) => {
                    log::warn!(
                        "{} {} timed out after {}ms",
                        method,
                        options.path,
                        self.config.timeout.as_millis()
                    );
                    return Err(ApiError::timeout());
                }
                Ok(Err(e)) => {
                    let err = ApiError::from(e);
                    log::warn!("{} {} failed: {}", method, options.path, err);
                    return Err(err);
                }
                Ok(Ok(parts)) => parts,
            };

        let text = String::from_utf8_lossy(&bytes);
        if !status.is_success() {
            let err = error_from_response(status, content_type.as_deref(), &text);
            log::warn!(
                "{} {} returned {}: {}",
                method,
                options.path,
                status.as_u16(),
                err.message
            );
            return Err(err);
        }

        log::debug!("{} {} -> {}", method, options.path, status.as_u16());
        let payload = parse_success_body(content_type.as_deref(), &text)?;
        Ok((status, payload))
    }

    /// Defaults, then caller overrides, then the bearer token.
    async fn build_headers(&self, options: &RequestOptions) -> HeaderMap {
        let mut headers = self.config.headers.clone();
        match &options.body {
            Body::Form(_) => {
                headers.remove(CONTENT_TYPE);
            }
            Body::Bytes {
                content_type: Some(content_type),
                ..
            } => match HeaderValue::from_str(content_type) {
                Ok(value) => {
                    headers.insert(CONTENT_TYPE, value);
                }
                Err(_) => log::warn!("Ignoring invalid body content type: {}", content_type),
            },
            _ => {}
        }
        headers.extend(options.headers.clone());

        if let Some(mut token) = self.resolve_token().await {
            let mut bearer = format!("Bearer {}", token);
            match HeaderValue::from_str(&bearer) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => log::warn!("Stored token is not a valid header value, sending without it"),
            }
            bearer.zeroize();
            token.zeroize();
        }

        headers
    }

    /// Current token from the provider, or from the store when none is registered.
    async fn resolve_token(&self) -> Option<String> {
        // Clone the provider out so the lock is not held while it runs.
        let provider = self.token_provider.read().await.clone();
        let token = match provider {
            Some(provider) => provider().await,
            None => self.store.as_ref().and_then(|store| store.get_token()),
        };
        token.filter(|t| !t.trim().is_empty())
    }
}

/// `application/json` or any `+json` suffix type.
fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Build the normalized error for a non-2xx response.
///
/// Message priority: JSON `message`, JSON `error`, a bare JSON string, raw
/// text (non-JSON bodies only), status reason, generic fallback.
pub(crate) fn error_from_response(
    status: StatusCode,
    content_type: Option<&str>,
    text: &str,
) -> ApiError {
    let mut message = None;
    let mut code = None;
    let mut parsed_json = false;

    if is_json_content_type(content_type) {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(body)) => {
                parsed_json = true;
                message = extract_message(&body);
                code = extract_code(&body);
            }
            Ok(Value::String(s)) => {
                parsed_json = true;
                message = Some(s).filter(|s| !s.trim().is_empty());
            }
            _ => {}
        }
    }

    if message.is_none() && !parsed_json {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            message = Some(trimmed.to_string());
        }
    }

    let message = message
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

    ApiError::new(message, Some(status.as_u16()), code)
}

fn extract_message(body: &Map<String, Value>) -> Option<String> {
    ["message", "error"].iter().find_map(|field| match body.get(*field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        // Validation pipes report a list of messages.
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    })
}

fn extract_code(body: &Map<String, Value>) -> Option<String> {
    match body.get("code") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a 2xx body. Non-JSON content types are parsed best-effort and
/// degrade to `{}`; an empty body is `{}` for any content type.
pub(crate) fn parse_success_body(content_type: Option<&str>, text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    if is_json_content_type(content_type) {
        return serde_json::from_str(text).map_err(|e| {
            ApiError::new(
                format!("Invalid JSON in response: {}", e),
                Some(STATUS_NETWORK),
                Some(CODE_INVALID_JSON.to_string()),
            )
        });
    }

    Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::Object(Map::new())))
}
