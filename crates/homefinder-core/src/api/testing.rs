//! Test doubles for the transport layer.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync>;

/// Transport that answers from a closure and records every request it sees.
/// Each send yields once so concurrent callers interleave.
pub struct FakeTransport {
    handler: Handler,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}

pub fn ok_json(body: Value) -> Result<ApiResponse, ApiError> {
    Ok(ApiResponse {
        status: 200,
        headers: HeaderMap::new(),
        body: serde_json::to_vec(&body).unwrap(),
    })
}

pub fn no_content() -> Result<ApiResponse, ApiError> {
    Ok(ApiResponse {
        status: 204,
        headers: HeaderMap::new(),
        body: Vec::new(),
    })
}

pub fn status(code: u16, body: Value) -> Result<ApiResponse, ApiError> {
    Err(ApiError::from_status(code, &body.to_string()))
}

/// The JSON body a request was sent with.
pub fn json_body(request: &ApiRequest) -> Value {
    match &request.body {
        super::transport::RequestBody::Json(v) => v.clone(),
        other => panic!("expected JSON body, got {:?}", other),
    }
}
