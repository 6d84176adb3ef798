use crate::core::errors::Result;
use crate::models::GalleryExtension;
use futures::future::{FutureExt, LocalBoxFuture};
use std::collections::HashMap;
use std::rc::Rc;

pub mod catalog;
pub mod content;
pub mod proxy;

pub use catalog::LocalCatalog;
pub use content::{ContentFetcher, ContentRequest, FileContentFetcher};
pub use proxy::{ProxyResolver, ProxySettings, WorkspaceSettings};

pub type PageFuture<T> = LocalBoxFuture<'static, Result<Vec<T>>>;
pub type PageLoader<T> = Rc<dyn Fn(usize) -> PageFuture<T>>;

/// A query result: the first page is already fetched, the rest is loaded
/// page by page through `get_page`.
pub struct Pager<T> {
    pub first_page: Vec<T>,
    pub total: usize,
    pub page_size: usize,
    pub get_page: PageLoader<T>,
}

impl<T: 'static> Pager<T> {
    /// Converts every item, including those of pages fetched later.
    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Pager<U> {
        let f = Rc::new(f);
        let first_page = self.first_page.into_iter().map(|item| f(item)).collect();
        let inner = self.get_page;
        let get_page: PageLoader<U> = Rc::new(move |page: usize| -> PageFuture<U> {
            let pending = inner(page);
            let f = Rc::clone(&f);
            async move { Ok(pending.await?.into_iter().map(|item| f(item)).collect()) }
                .boxed_local()
        });

        Pager {
            first_page,
            total: self.total,
            page_size: self.page_size,
            get_page,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryQuery {
    pub text: String,
    pub page_size: usize,
}

/// Remote (or local) extension gallery.
pub trait GalleryService {
    fn query(&self, query: GalleryQuery) -> LocalBoxFuture<'static, Result<Pager<GalleryExtension>>>;
}

/// Lookup of locally installed extensions by id.
pub trait InstalledExtensions {
    fn installed_version(&self, id: &str) -> Option<String>;
}

impl InstalledExtensions for HashMap<String, String> {
    fn installed_version(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}
