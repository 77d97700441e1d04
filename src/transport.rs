//! Blocking HTTP transport.
//!
//! The client core issues every request through the [`Transport`] trait, so
//! tests can substitute canned responses without touching the network.
//! [`HttpTransport`] is the production implementation over a blocking
//! reqwest client: one request, one response, no retries, no connection
//! state beyond reqwest's own pool.

use thiserror::Error;

use crate::constants;

/// HTTP method of a request. The client only ever reads and posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Status code and body bytes of one completed request.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A request that produced no response at all: connection failure, TLS
/// failure, or timeout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// One blocking HTTP round-trip.
pub trait Transport {
    /// Performs the request and blocks until the response arrives or the
    /// transport's own timeout fires. Any response with a status code is a
    /// success at this layer; status handling belongs to the caller.
    fn perform(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<Response, TransportError>;
}

/// Production transport over `reqwest::blocking`.
///
/// TLS peer and host verification stay at the reqwest defaults and are
/// never relaxed.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds the underlying HTTP client with the fixed request timeout.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(constants::HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn perform(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&str>,
    ) -> Result<Response, TransportError> {
        let mut request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| TransportError(e.to_string()))?
            .to_vec();
        Ok(Response { status, body })
    }
}
