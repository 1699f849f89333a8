//! HTTP client for the remote progress store.
//!
//! Endpoints:
//! - `GET  /api/progress/{topic}` → `{topic_slug, items: [{lesson_number, status}]}`
//! - `POST /api/progress/{topic}/{lesson}/complete`
//! - `POST /api/progress/{topic}/{lesson}/activate`
//! - `GET  /api/lives/my-lives` → `{current_lives, max_lives, last_reset_date}`
//! - `POST /api/lives/use-life` → `{remaining_lives, max_lives}`
//!
//! Requests carry the bearer token issued by the auth service. A 401 from
//! any endpoint means the session is gone.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{LessonGateError, Result};
use crate::store::traits::{LessonProgressItem, LivesRecord, ProgressStore, UseLifeReceipt};

/// Response body of the topic progress endpoint.
#[derive(Debug, Deserialize)]
struct TopicProgressResponse {
    #[serde(default)]
    items: Vec<LessonProgressItem>,
}

/// Blocking HTTP progress store.
#[derive(Debug, Clone)]
pub struct HttpProgressStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpProgressStore {
    /// Create a client for the store at `base_url`.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LessonGateError::config(format!("bad base url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(LessonGateError::config(format!(
                "base url '{}' cannot carry a path",
                base_url
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LessonGateError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Build an endpoint URL from path segments.
    ///
    /// Segments are percent-encoded, so topic slugs cannot escape the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LessonGateError::config(format!("base url '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request; 401 becomes `AuthRequired`, other statuses pass through.
    fn send(&self, method: Method, segments: &[&str]) -> Result<Response> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "progress store request");
        let response = self
            .request(method.clone(), url.clone())
            .send()
            .map_err(|e| LessonGateError::store(format!("{} {}: {}", method, url, e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(LessonGateError::AuthRequired);
        }
        Ok(response)
    }

    /// Turn a non-success status into a store error.
    fn expect_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().clone();
        let body = response.text().unwrap_or_default();
        Err(LessonGateError::store(format!(
            "{} returned {}: {}",
            url,
            status,
            body.trim()
        )))
    }

    fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json::<T>()
            .map_err(|e| LessonGateError::serde(format!("invalid store response: {}", e)))
    }
}

impl ProgressStore for HttpProgressStore {
    fn name(&self) -> &'static str {
        "http"
    }

    fn topic_progress(&self, topic: &str) -> Result<Vec<LessonProgressItem>> {
        let response = self.send(Method::GET, &["api", "progress", topic])?;
        let body: TopicProgressResponse = Self::decode(Self::expect_success(response)?)?;
        Ok(body.items)
    }

    fn mark_completed(&self, topic: &str, lesson: u32) -> Result<()> {
        let lesson = lesson.to_string();
        let path = ["api", "progress", topic, &lesson, "complete"];
        let response = self.send(Method::POST, &path)?;
        Self::expect_success(response)?;
        Ok(())
    }

    fn mark_active(&self, topic: &str, lesson: u32) -> Result<()> {
        let lesson = lesson.to_string();
        let path = ["api", "progress", topic, &lesson, "activate"];
        let response = self.send(Method::POST, &path)?;
        Self::expect_success(response)?;
        Ok(())
    }

    fn lives(&self) -> Result<LivesRecord> {
        let response = self.send(Method::GET, &["api", "lives", "my-lives"])?;
        Self::decode(Self::expect_success(response)?)
    }

    fn use_life(&self) -> Result<UseLifeReceipt> {
        let response = self.send(Method::POST, &["api", "lives", "use-life"])?;
        if response.status() == StatusCode::BAD_REQUEST {
            // The store refuses the decrement only when the balance is empty.
            // The ledger fills in the maximum it holds.
            return Err(LessonGateError::Exhausted { max: 0 });
        }
        Self::decode(Self::expect_success(response)?)
    }
}
