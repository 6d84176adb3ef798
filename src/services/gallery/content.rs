use super::ProxySettings;
use crate::core::errors::{Error, Result};
use crate::models::Entry;
use futures::future::{FutureExt, LocalBoxFuture};
use std::path::PathBuf;

/// Everything a transport needs to download an extension's readme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub url: String,
    pub proxy_url: Option<String>,
    pub strict_ssl: bool,
    pub headers: Vec<(String, String)>,
}

impl ContentRequest {
    /// `None` when the entry's display version has no readme.
    pub fn for_entry(entry: &Entry, proxy: &ProxySettings) -> Option<Self> {
        let url = entry.readme_url()?.to_string();

        let mut headers = vec![
            ("Accept".to_string(), "text/markdown, text/plain".to_string()),
            ("X-Extension-Id".to_string(), entry.id()),
        ];
        if let Some(token) = entry
            .item()
            .display_version()
            .and_then(|v| v.asset_token.as_deref())
        {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        Some(Self {
            url,
            proxy_url: proxy.proxy_url.clone(),
            strict_ssl: proxy.strict_ssl,
            headers,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Downloads raw supplementary content (readme text).
pub trait ContentFetcher {
    fn fetch(&self, request: ContentRequest) -> LocalBoxFuture<'static, Result<String>>;
}

/// Reads `file://` URLs and plain paths from disk. Relative paths are
/// resolved against `base_dir` when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileContentFetcher {
    base_dir: Option<PathBuf>,
}

impl FileContentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf> {
        let raw = url.strip_prefix("file://").unwrap_or(url);
        if raw.contains("://") {
            return Err(Error::ContentFetch {
                url: url.to_string(),
                reason: "only file URLs are supported".to_string(),
            });
        }

        let path = PathBuf::from(raw);
        Ok(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        })
    }
}

impl ContentFetcher for FileContentFetcher {
    fn fetch(&self, request: ContentRequest) -> LocalBoxFuture<'static, Result<String>> {
        let resolved = self.resolve(&request.url);
        async move {
            let path = resolved?;
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::ContentFetch {
                    url: request.url.clone(),
                    reason: e.to_string(),
                })
        }
        .boxed_local()
    }
}
