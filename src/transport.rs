use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder};

use crate::error::RequestFailure;

pub const MIME_TYPE_JSON_UTF_8: &str = "application/json;charset=UTF-8";

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::GET,
            url: url.to_string(),
            body: None,
        }
    }

    pub fn post(url: &str, body: Option<String>) -> Self {
        Self {
            method: Method::POST,
            url: url.to_string(),
            body,
        }
    }
}

/// Sends one request and hands back the whole response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<String, RequestFailure>;
}

/// reqwest backed transport. The inner client keeps the connection pool for
/// as long as the owning `SubmissionClient` lives and is dropped with it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, RequestFailure> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    fn post(&self, url: &str, body: Option<String>) -> RequestBuilder {
        let request = self.client.post(url);
        match body {
            Some(body) => request.header(CONTENT_TYPE, MIME_TYPE_JSON_UTF_8).body(body),
            None => request,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<String, RequestFailure> {
        log::debug!("{} {}", request.method, request.url);
        let builder = match request.method {
            Method::GET => self.get(&request.url),
            Method::POST => self.post(&request.url, request.body),
            method => self.client.request(method, &request.url),
        };
        let resp = builder.send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }
}
