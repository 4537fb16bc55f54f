use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_BASE_URL: &str = "https://infinity-booking-backend1.onrender.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const FALLBACK_MESSAGE: &str = "Server error";

/// JSON client for the admin backend.
///
/// Attaches the stored bearer token, if any, to every request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.send(self.request(Method::GET, path), path).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Value> {
        let request = self.request(Method::GET, path).query(query);
        self.send(request, path).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        let request = self.request(Method::POST, path).json(body);
        self.send(request, path).await
    }

    /// POST without a body.
    pub async fn post_empty(&self, path: &str) -> ApiResult<Value> {
        self.send(self.request(Method::POST, path), path).await
    }

    /// POST authorised with `bearer` instead of the stored token.
    pub async fn post_with_bearer<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        bearer: &str,
    ) -> ApiResult<Value> {
        let request = self
            .http
            .post(self.url(path))
            .bearer_auth(bearer)
            .json(body);
        self.send(request, path).await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<Value> {
        let request = self.request(Method::POST, path).multipart(form);
        self.send(request, path).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        let request = self.request(Method::PUT, path).json(body);
        self.send(request, path).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        let request = self.request(Method::PATCH, path).json(body);
        self.send(request, path).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.send(self.request(Method::DELETE, path), path).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> ApiResult<Value> {
        tracing::debug!(path, "sending request");

        let response = request.send().await.map_err(|err| {
            tracing::error!(path, error = %err, "API error");
            ApiError::Transport(err)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            tracing::error!(path, error = %err, "API error");
            ApiError::Transport(err)
        })?;

        if !status.is_success() {
            let message = error_message(&body);
            tracing::error!(path, status = status.as_u16(), %message, "API error");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(decode_body(body))
    }
}

/// Empty bodies decode as `null`; anything that is not JSON is kept as a string.
fn decode_body(body: String) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        trimmed.to_string()
    }
}
