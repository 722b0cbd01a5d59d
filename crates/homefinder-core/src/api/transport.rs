//! HTTP transport: requests and responses as plain data, plus the
//! reqwest-backed sender.
//!
//! Requests are described by `ApiRequest` so that the auth layer can hold on
//! to one, change its headers and send it again. A `Transport` turns every
//! non-2xx status into an `ApiError` carrying the status and body.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{multipart, Client, Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;

use super::{ApiError, ErrorKind};

/// One part of a multipart form. File contents are kept in memory so the
/// form can be rebuilt for a replay.
#[derive(Debug, Clone)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// A single outgoing request. `retried` marks a request that has already
/// been replayed after a token refresh; it is set at most once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/properties/properties/1/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| {
            ApiError::new(ErrorKind::Decode, format!("Failed to encode request body: {}", e))
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn with_multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value.
    pub fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            ApiError::new(ErrorKind::Storage, "Stored access token is not a valid header value")
        })?;
        value.set_sensitive(true);
        self.headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }

    /// The bearer token this request carries, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Resolve against the API base URL, appending query parameters.
    pub fn url(&self, base_url: &str) -> Result<Url, ApiError> {
        let raw = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        let parsed = if self.query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, &self.query)
        };
        parsed.map_err(|e| {
            ApiError::new(ErrorKind::Transport, format!("Invalid request URL {}: {}", raw, e))
        })
    }
}

/// A 2xx response. Error statuses never reach callers as an `ApiResponse`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ApiError::decode("unexpected response body", e)
                .with_status(self.status)
                .with_data(Value::String(String::from_utf8_lossy(&self.body).into_owned()))
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests. Implementations return `Err` for transport failures and
/// for every non-2xx status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        (**self).send(request).await
    }
}

/// reqwest-backed transport bound to a base URL.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::transport)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_form(parts: &[FormPart]) -> Result<multipart::Form, ApiError> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let file = multipart::Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(content_type)
                        .map_err(ApiError::transport)?;
                    form.part(name.clone(), file)
                }
            };
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = request.url(&self.base_url)?;
        debug!(method = %request.method, path = %request.path, retried = request.retried, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(Self::build_form(parts)?),
        };

        let response = builder.send().await.map_err(ApiError::transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ApiError::transport)?;
        debug!(method = %request.method, path = %request.path, status = status.as_u16(), "Response received");

        if !status.is_success() {
            return Err(ApiError::from_status(
                status.as_u16(),
                &String::from_utf8_lossy(&body),
            ));
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            headers,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let request = ApiRequest::get("/properties/properties/1/");
        let url = request.url("http://localhost:8000/api/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/properties/properties/1/");
    }

    #[test]
    fn test_url_encodes_query() {
        let request = ApiRequest::get("/properties/properties/").with_query(vec![
            ("min_price".to_string(), "500000".to_string()),
            ("city".to_string(), "San José".to_string()),
        ]);
        let url = request.url("http://localhost:8000/api").unwrap();
        assert_eq!(url.query(), Some("min_price=500000&city=San+Jos%C3%A9"));
    }

    #[test]
    fn test_bearer_header_roundtrip() {
        let mut request = ApiRequest::get("/users/api/user/");
        assert_eq!(request.bearer_token(), None);

        request.set_bearer("A1").unwrap();
        assert_eq!(request.bearer_token(), Some("A1"));
        assert_eq!(request.headers.get(header::AUTHORIZATION).unwrap(), "Bearer A1");

        request.set_bearer("A2").unwrap();
        assert_eq!(request.bearer_token(), Some("A2"));
        assert_eq!(request.headers.get_all(header::AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_set_bearer_rejects_control_characters() {
        let mut request = ApiRequest::get("/");
        let err = request.set_bearer("bad\ntoken").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert_eq!(err.status, None);
    }

    #[test]
    fn test_response_json_decode_error() {
        let response = ApiResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: b"<html>".to_vec(),
        };
        let err = response.json::<Value>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        assert_eq!(err.data.unwrap(), "<html>");
    }
}
