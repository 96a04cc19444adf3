//! Byte transports for partitioned datasets

use std::path::PathBuf;
use async_trait::async_trait;

use crate::DataError;

/// Fetches a named file relative to some root
#[async_trait]
pub trait PartFetcher: Send + Sync + 'static {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, DataError>;

    /// Root description for log messages
    fn location(&self) -> String;
}

/// Reads files below a local directory
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl PartFetcher for DirFetcher {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, DataError> {
        let path = self.root.join(name);
        tokio::fs::read(&path).await.map_err(|e| {
            DataError::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

/// Downloads files below a base URL
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: String,
}

impl HttpFetcher {
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { client, base }
    }

    fn url(&self, name: &str) -> String {
        format!("{}{}", self.base, name.trim_start_matches('/'))
    }
}

#[async_trait]
impl PartFetcher for HttpFetcher {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, DataError> {
        let url = self.url(name);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Network(format!("{} returned {}", url, status)));
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn location(&self) -> String {
        self.base.clone()
    }
}
