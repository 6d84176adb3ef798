use super::{GalleryQuery, GalleryService, PageFuture, PageLoader, Pager};
use crate::core::errors::{Error, Result};
use crate::models::GalleryExtension;
use futures::future::{FutureExt, LocalBoxFuture};
use serde::Deserialize;
use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<GalleryExtension>),
    Wrapped { extensions: Vec<GalleryExtension> },
}

/// Gallery backed by an in-memory list of extensions, usually read from a
/// JSON catalog file.
pub struct LocalCatalog {
    extensions: Rc<Vec<GalleryExtension>>,
    latency: Duration,
    queries: Cell<usize>,
}

impl LocalCatalog {
    pub fn new(extensions: Vec<GalleryExtension>) -> Self {
        Self {
            extensions: Rc::new(extensions),
            latency: Duration::ZERO,
            queries: Cell::new(0),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .map_err(|e| Error::Catalog(format!("{}: {e}", path.display())))?;
        let extensions = match file {
            CatalogFile::List(list) => list,
            CatalogFile::Wrapped { extensions } => extensions,
        };
        tracing::info!("Loaded {} extensions from {}", extensions.len(), path.display());
        Ok(Self::new(extensions))
    }

    /// Delays every query and page fetch, to behave like a remote gallery.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Number of queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.get()
    }

    fn matches(extension: &GalleryExtension, needle: &str) -> bool {
        extension.id().to_lowercase().contains(needle)
            || extension.display_name().to_lowercase().contains(needle)
            || extension.author().to_lowercase().contains(needle)
            || extension.description.to_lowercase().contains(needle)
    }
}

impl GalleryService for LocalCatalog {
    fn query(&self, query: GalleryQuery) -> LocalBoxFuture<'static, Result<Pager<GalleryExtension>>> {
        self.queries.set(self.queries.get() + 1);

        let needle = query.text.trim().to_lowercase();
        let matches: Vec<GalleryExtension> = if needle.is_empty() {
            Vec::new()
        } else {
            self.extensions
                .iter()
                .filter(|ext| Self::matches(ext, &needle))
                .cloned()
                .collect()
        };
        let matches = Rc::new(matches);
        let page_size = query.page_size.max(1);
        let latency = self.latency;

        tracing::debug!("catalog query '{}' matched {}", query.text, matches.len());

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let total = matches.len();
            let first_page = matches[..page_size.min(total)].to_vec();
            let source = Rc::clone(&matches);
            let get_page: PageLoader<GalleryExtension> = Rc::new(move |page: usize| -> PageFuture<GalleryExtension> {
                let source = Rc::clone(&source);
                async move {
                    if !latency.is_zero() {
                        tokio::time::sleep(latency).await;
                    }
                    let start = page * page_size;
                    if start >= source.len() {
                        return Err(Error::PageFetch {
                            page,
                            reason: format!("page starts past the {} results", source.len()),
                        });
                    }
                    let end = (start + page_size).min(source.len());
                    Ok(source[start..end].to_vec())
                }
                .boxed_local()
            });

            Ok(Pager {
                first_page,
                total,
                page_size,
                get_page,
            })
        }
        .boxed_local()
    }
}
