use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Why a single fetch did not produce a body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}")]
    Status { status: String },
    #[error("{message}")]
    Transport { message: String },
}

/// Failures that abort the crawl (or, with `keep_going`, the page they hit).
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Please enter a valid URL.")]
    EmptySeed,
    #[error("invalid seed URL {seed:?}: {reason}")]
    InvalidSeed { seed: String, reason: String },
    #[error("failed to create site folder {path:?}: {source}")]
    SiteRoot {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to download {url}: {source}")]
    Page {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("Failed to save page {url}: {source}")]
    PageWrite {
        url: Url,
        #[source]
        source: anyhow::Error,
    },
}

/// Recoverable failures: the resource is left out and the crawl continues.
#[derive(Debug, Error)]
pub enum Skipped {
    #[error("Failed to download asset {url}: {source}")]
    Asset {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("Failed to read stylesheet {url}: {source}")]
    Stylesheet {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("Failed to save asset {url}: {source}")]
    AssetWrite {
        url: Url,
        #[source]
        source: anyhow::Error,
    },
    #[error("Error creating directory {name:?} in {parent:?}: {source}")]
    Directory {
        parent: PathBuf,
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Skipped {
    pub fn url(&self) -> Option<&Url> {
        match self {
            Skipped::Asset { url, .. }
            | Skipped::Stylesheet { url, .. }
            | Skipped::AssetWrite { url, .. } => Some(url),
            Skipped::Directory { .. } => None,
        }
    }
}
