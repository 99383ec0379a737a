use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use url::Url;

use crate::error::FetchError;

/// Network side of the crawl. Pages and stylesheets are read as text, assets as bytes.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl<'a, T: Fetcher + ?Sized> Fetcher for &'a T {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        (**self).fetch_text(url).await
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        (**self).fetch_bytes(url).await
    }
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// `timeout` of `None` lets a request hang for as long as the server does.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ClientBuilder::new().use_rustls_tls().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        self.get(url).await?.text().await.map_err(transport)
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let bytes = self.get(url).await?.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }
}

fn transport(err: reqwest::Error) -> FetchError {
    FetchError::Transport {
        message: err.to_string(),
    }
}
