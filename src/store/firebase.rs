use async_trait::async_trait;
use reqwest::{header, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::store::{DocumentStore, StorePath};

/// Client for a Firebase Realtime Database reached through its REST API.
///
/// Every path maps to `{base_url}/{path}.json`. Appends use `POST`, whose
/// push ids are time-ordered; increments use the `increment` server value and
/// create-if-absent uses an ETag-conditional `PUT`.
pub struct FirebaseDocumentStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

impl FirebaseDocumentStore {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// Each key becomes one percent-encoded URL segment.
    fn url(&self, path: &StorePath) -> Result<Url, AppError> {
        let invalid = || AppError::Config(format!("Invalid Firebase URL '{}'", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| invalid())?;
            segments.pop_if_empty();
            match path.segments().split_last() {
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{last}.json"));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &StorePath,
    ) -> Result<reqwest::RequestBuilder, AppError> {
        let builder = self.client.request(method, self.url(path)?);
        Ok(match &self.auth_token {
            Some(token) => builder.query(&[("auth", token)]),
            None => builder,
        })
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        path: &StorePath,
    ) -> Result<reqwest::Response, AppError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Store(format!("Request for '{path}' failed: {e}")))?;
        let status = response.status();
        if status.is_success() || status == StatusCode::PRECONDITION_FAILED {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::Store(format!("Access to '{path}' denied: {body}"))
            }
            _ => AppError::Store(format!("Store answered {status} for '{path}': {body}")),
        })
    }

    async fn json(response: reqwest::Response, path: &StorePath) -> Result<Value, AppError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Store(format!("Invalid response body for '{path}': {e}")))
    }
}

#[async_trait]
impl DocumentStore for FirebaseDocumentStore {
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, AppError> {
        let response = self
            .send(self.request(reqwest::Method::GET, path)?, path)
            .await?;
        let value = Self::json(response, path).await?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn write(&self, path: &StorePath, value: Value) -> Result<(), AppError> {
        let builder = if value.is_null() {
            self.request(reqwest::Method::DELETE, path)?
        } else {
            self.request(reqwest::Method::PUT, path)?.json(&value)
        };
        self.send(builder, path).await?;
        Ok(())
    }

    async fn append(&self, path: &StorePath, value: Value) -> Result<String, AppError> {
        let response = self
            .send(self.request(reqwest::Method::POST, path)?.json(&value), path)
            .await?;
        let pushed: PushResponse = response
            .json()
            .await
            .map_err(|e| AppError::Store(format!("Invalid push response for '{path}': {e}")))?;
        Ok(pushed.name)
    }

    async fn increment(&self, path: &StorePath, delta: i64) -> Result<i64, AppError> {
        let body = json!({ ".sv": { "increment": delta } });
        let response = self
            .send(self.request(reqwest::Method::PUT, path)?.json(&body), path)
            .await?;
        let value = Self::json(response, path).await?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .ok_or_else(|| AppError::Store(format!("Counter at '{path}' is not a number: {value}")))
    }

    async fn create_if_absent(&self, path: &StorePath, value: Value) -> Result<bool, AppError> {
        let response = self
            .send(
                self.request(reqwest::Method::GET, path)?
                    .header("X-Firebase-ETag", "true"),
                path,
            )
            .await?;
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AppError::Store(format!("No ETag returned for '{path}'")))?;
        if !Self::json(response, path).await?.is_null() {
            return Ok(false);
        }

        let response = self
            .send(
                self.request(reqwest::Method::PUT, path)?
                    .header(header::IF_MATCH, etag)
                    .json(&value),
                path,
            )
            .await?;
        // 412: someone wrote the location between our read and write.
        Ok(response.status() != StatusCode::PRECONDITION_FAILED)
    }
}
