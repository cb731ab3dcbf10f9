use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::HttpConfig;
use crate::models::{RequestBody, RequestTemplate};
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers,
            body: None,
        }
    }

    pub fn from_template(method: Method, template: &RequestTemplate) -> Self {
        Self {
            method,
            url: template.url.clone(),
            headers: template.headers.clone(),
            body: template.data.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub final_url: String,
}

/// Sends retailer requests. Non-2xx statuses come back as `AppError::HttpStatus`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Races a request against the shutdown token.
pub async fn send_cancellable(
    client: &dyn HttpClient,
    request: &HttpRequest,
    cancel: &CancellationToken,
) -> Result<HttpResponse> {
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled);
    }
    tokio::select! {
        response = client.send(request) => response,
        _ = cancel.cancelled() => Err(AppError::Cancelled),
    }
}

/// Converts stored header pairs, rejecting names or values HTTP cannot carry.
pub fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AppError::RequestTemplate(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AppError::RequestTemplate(format!("invalid value for header '{}': {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Cookie-carrying HTTP session owned by exactly one search loop.
pub struct ReqwestSession {
    client: reqwest::Client,
}

impl ReqwestSession {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self { client })
    }

    /// Visits the retailer's landing page so later requests carry its session cookies.
    pub async fn bootstrap(&self, cookies: &RequestTemplate) -> Result<()> {
        let request = HttpRequest::from_template(Method::Get, cookies);
        let response = self.send(&request).await?;
        tracing::debug!(
            "Session bootstrapped from {} (status {})",
            response.final_url,
            response.status
        );
        Ok(())
    }
}

#[async_trait]
impl HttpClient for ReqwestSession {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let headers = header_map(&request.headers)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        }
        .headers(headers);

        builder = match &request.body {
            Some(RequestBody::Form(fields)) => builder.form(fields),
            Some(RequestBody::Raw(raw)) => builder.body(raw.clone()),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(AppError::HttpStatus {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let body = response.text().await?;
        Ok(HttpResponse {
            status: status.as_u16(),
            body,
            final_url,
        })
    }
}
