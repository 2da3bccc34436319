//! Network access for avatar lookups.
//!
//! Lookup providers need exactly one capability from the network: GET a URL
//! and hand back a parsed JSON body, or report why that failed. That seam is
//! the [`JsonFetcher`] trait. Hosts that want to verify images before showing
//! them (the CLI does) use [`ImageProbe`], whose failures stand in for a
//! renderer's image-load error.
//!
//! [`AvatarHttpClient`] implements both on top of a shared `reqwest::Client`.
//!
//! # Example
//!
//! ```ignore
//! use avatarkit_api::{AvatarHttpClient, JsonFetcher};
//! use std::time::Duration;
//!
//! let client = AvatarHttpClient::new(Duration::from_secs(30), "avatarkit/0.1")?;
//! let body = client.fetch_json("https://example.com/profile.json").await?;
//! println!("{body}");
//! ```

mod parser;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use parser::{LookupDecodeError, decode_lookup_body};

/// Why a lookup request produced no JSON body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid lookup URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("lookup returned HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] LookupDecodeError),
}

impl FetchError {
    /// HTTP status for non-success responses.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Performs the single GET a lookup provider needs.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// Checks that an image URL can actually be loaded.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<(), FetchError>;
}

/// `reqwest` backed implementation of [`JsonFetcher`] and [`ImageProbe`].
#[derive(Debug, Clone)]
pub struct AvatarHttpClient {
    http: Client,
    user_agent: String,
}

impl AvatarHttpClient {
    /// Build a client with the given transport timeout and User-Agent.
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> anyhow::Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json,image/*;q=0.9,*/*;q=0.8"));

        let http = Client::builder()
            .default_headers(default_headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            user_agent: user_agent.into(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let parsed_url = Url::parse(url).map_err(|error| FetchError::InvalidUrl {
            url: url.to_string(),
            message: error.to_string(),
        })?;
        debug!(%url, "sending lookup request");

        let response = self
            .http
            .get(parsed_url)
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(%url, status = status.as_u16(), "lookup request rejected");
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl JsonFetcher for AvatarHttpClient {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let text = self.get(url).await?.text().await?;
        Ok(decode_lookup_body(url, &text)?)
    }
}

#[async_trait]
impl ImageProbe for AvatarHttpClient {
    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        self.get(url).await.map(|_| ())
    }
}
