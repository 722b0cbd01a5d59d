//! REST API client module for the HomeFinder backend.
//!
//! Layers, bottom up:
//! - `HttpTransport`: reqwest-backed `Transport` with a base URL and timeout
//! - `AuthInterceptor`: bearer tokens plus one refresh-and-replay per 401
//! - `PropertyApi`: one typed operation per backend resource
//!
//! The API uses JWT bearer tokens issued by `/users/api/token/`.

pub mod client;
pub mod error;
pub mod interceptor;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::PropertyApi;
pub use error::{ApiError, ErrorKind};
pub use interceptor::{classify, AuthInterceptor, Transition, REFRESH_PATH};
pub use transport::{ApiRequest, ApiResponse, FormPart, HttpTransport, RequestBody, Transport};
