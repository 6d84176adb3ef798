use super::highlight::HighlightController;
use super::paged::PagedModel;
use super::virtual_list::VirtualList;
use crate::core::debounce::{Debounced, Debouncer};
use crate::models::Entry;
use crate::services::gallery::{GalleryQuery, GalleryService, InstalledExtensions};
use crate::ui::element::{ElementId, SharedTree};
use crate::ui::theme::classes;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Search settings taken from the gallery configuration.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub delay: Duration,
    pub page_size: usize,
}

struct SearchInner {
    gallery: Rc<dyn GalleryService>,
    installed: Rc<dyn InstalledExtensions>,
    list: VirtualList,
    highlight: HighlightController,
    tree: SharedTree,
    root: ElementId,
    debouncer: Debouncer,
    generation: Cell<u64>,
    options: SearchOptions,
}

/// Feeds search box input through the debouncer into the gallery and hands
/// results to the list. Each trigger bumps a generation counter; a result is
/// only shown while its generation is still the latest.
pub struct SearchOrchestrator {
    inner: Rc<SearchInner>,
}

impl SearchOrchestrator {
    pub fn new(
        gallery: Rc<dyn GalleryService>,
        installed: Rc<dyn InstalledExtensions>,
        list: VirtualList,
        highlight: HighlightController,
        tree: SharedTree,
        root: ElementId,
        options: SearchOptions,
    ) -> Self {
        Self {
            inner: Rc::new(SearchInner {
                gallery,
                installed,
                list,
                highlight,
                tree,
                root,
                debouncer: Debouncer::new(),
                generation: Cell::new(0),
                options,
            }),
        }
    }

    /// Schedules a search for `text`. Empty text and `immediate` requests skip
    /// the quiet period. The returned future resolves to `None` when this
    /// search was superseded before it started.
    pub fn search(&self, text: impl Into<String>, immediate: bool) -> Debounced<()> {
        let text = text.into();
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);
        self.inner
            .tree
            .borrow_mut()
            .add_class(self.inner.root, classes::LOADING);

        let delay = if immediate || text.is_empty() {
            Duration::ZERO
        } else {
            self.inner.options.delay
        };
        tracing::trace!(query = %text, generation, ?delay, "search scheduled");

        let inner = Rc::downgrade(&self.inner);
        self.inner
            .debouncer
            .trigger(delay, move || run_search(inner, text, generation))
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    /// Drops the scheduled search and makes any running one stale.
    pub fn cancel(&self) {
        self.inner.debouncer.cancel();
        self.inner.generation.set(self.inner.generation.get() + 1);
        self.inner
            .tree
            .borrow_mut()
            .remove_class(self.inner.root, classes::LOADING);
    }
}

async fn run_search(inner: Weak<SearchInner>, text: String, generation: u64) {
    let pending = {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if inner.generation.get() != generation {
            return;
        }

        inner.highlight.collapse();
        inner.list.set_model(PagedModel::empty());
        tracing::debug!(query = %text, generation, "search started");
        inner.gallery.query(GalleryQuery {
            text: text.clone(),
            page_size: inner.options.page_size,
        })
    };

    let result = pending.await;

    let Some(inner) = inner.upgrade() else {
        return;
    };
    if inner.generation.get() != generation {
        tracing::debug!(query = %text, generation, "discarding stale search result");
        return;
    }

    match result {
        Ok(pager) => {
            let installed = Rc::clone(&inner.installed);
            let pager = pager.map(move |item| {
                let local = installed.installed_version(&item.id());
                Entry::classify(item, local.as_deref())
            });
            let model = PagedModel::new(pager);
            tracing::info!(query = %text, total = model.len(), "search completed");
            inner.list.set_model(model);
        }
        Err(e) => {
            tracing::warn!(query = %text, "search failed, showing no results: {}", e);
            inner.list.set_model(PagedModel::empty());
        }
    }

    inner
        .tree
        .borrow_mut()
        .remove_class(inner.root, classes::LOADING);
}
