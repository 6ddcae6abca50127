//! GitHub commit-comment publisher.
//!
//! Web URLs of the form `https://host/{owner}/{repo}/commit/{sha}` are
//! mapped to the commit comments endpoint of the configured API. URLs that
//! already point at the API are posted to as given.

use crate::config::PublishConfig;
use crate::feedback::ports::{FeedbackPublisher, PublishError, PublishResult, PublishedMessage};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Publisher posting commit comments through the GitHub REST API.
pub struct GitHubPublisher {
    client: Client,
    api_base: Url,
    token: Option<String>,
    enabled: bool,
    messages: RwLock<Vec<PublishedMessage>>,
}

impl GitHubPublisher {
    /// Builds a publisher from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidTarget`] for a malformed API base URL
    /// and [`PublishError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &PublishConfig) -> PublishResult<Self> {
        let mut base = config.api_base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = PublishedMessage::parse_target(&base)?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(PublishError::transport)?;
        Ok(Self {
            client,
            api_base,
            token: config.token.clone(),
            enabled: config.enabled,
            messages: RwLock::new(Vec::new()),
        })
    }

    /// Returns every message posted, or skipped while publishing is
    /// disabled.
    #[must_use]
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remember(&self, message: PublishedMessage) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Resolves the API endpoint for a commit URL.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InvalidTarget`] when the URL is neither an API
    /// URL nor a commit web URL.
    pub fn comments_endpoint(&self, target_url: &str) -> PublishResult<Url> {
        let target = PublishedMessage::parse_target(target_url)?;
        if target.host_str() == self.api_base.host_str()
            && target.path().starts_with(self.api_base.path())
        {
            return Ok(target);
        }
        let invalid = || PublishError::InvalidTarget(target_url.to_owned());
        let segments: Vec<&str> = target
            .path_segments()
            .ok_or_else(invalid)?
            .filter(|segment| !segment.is_empty())
            .collect();
        let [owner, repo, "commit", sha] = segments.as_slice() else {
            return Err(invalid());
        };
        self.api_base
            .join(&format!("repos/{owner}/{repo}/commits/{sha}/comments"))
            .map_err(|_| invalid())
    }
}

impl fmt::Debug for GitHubPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubPublisher")
            .field("api_base", &self.api_base.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FeedbackPublisher for GitHubPublisher {
    async fn post_markdown(&self, target_url: &str, body: &str) -> PublishResult<()> {
        let message = PublishedMessage::new(target_url, body)?;
        let endpoint = self.comments_endpoint(message.url())?;
        if !self.enabled {
            tracing::info!(%endpoint, "publishing disabled; message recorded only");
            self.remember(message);
            return Ok(());
        }

        let mut request = self
            .client
            .post(endpoint.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .json(&serde_json::json!({ "body": message.body() }));
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await.map_err(|err| {
            tracing::error!(%endpoint, error = %err, "feedback post failed");
            PublishError::transport(err)
        })?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%endpoint, status = status.as_u16(), "feedback post rejected");
            return Err(PublishError::Rejected(status.as_u16()));
        }
        tracing::info!(%endpoint, status = status.as_u16(), "feedback posted");
        self.remember(message);
        Ok(())
    }
}
