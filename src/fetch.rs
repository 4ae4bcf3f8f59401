use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use scraper::Html;
use tracing::{debug, info};

use crate::error::FetchError;

/// Source of the stats page.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<Html, FetchError>;
}

/// Fetch over HTTP. Any non-2xx status is an error.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("strn_nodes/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Html, FetchError> {
        info!("Fetching stats page: {}", url);
        let res = self.client.get(url).send()?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = res.text()?;
        debug!("Fetched {} bytes", body.len());
        Ok(Html::parse_document(&body))
    }
}

/// Read a saved copy of the page from disk instead of the network.
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileFetcher { path: path.into() }
    }
}

impl Fetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<Html, FetchError> {
        info!("Reading {:?} in place of {}", self.path, url);
        let body = std::fs::read_to_string(&self.path).map_err(|source| FetchError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(Html::parse_document(&body))
    }
}
