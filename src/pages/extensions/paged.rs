use crate::models::Entry;
use crate::services::gallery::{PageLoader, Pager};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

/// What a list slot shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Entry(Entry),
    Placeholder,
}

enum PageState {
    Loading,
    Loaded(Vec<Entry>),
    Failed,
}

type PageListener = Rc<dyn Fn(Range<usize>)>;

/// Lazily paged data source for one search. Page 0 arrives with the query
/// result; the others are fetched on first access, one fetch per page.
///
/// Fetch tasks are spawned on the current `LocalSet` and only hold a weak
/// reference, so a model dropped by the list silently discards late pages.
pub struct PagedModel {
    total: usize,
    page_size: usize,
    pages: RefCell<HashMap<usize, PageState>>,
    get_page: Option<PageLoader<Entry>>,
    listener: RefCell<Option<PageListener>>,
    fetches: Cell<usize>,
}

impl PagedModel {
    pub fn new(pager: Pager<Entry>) -> Rc<Self> {
        if pager.total == 0 || pager.page_size == 0 {
            return Self::empty();
        }

        let mut pages = HashMap::new();
        pages.insert(0, PageState::Loaded(pager.first_page));
        Rc::new(Self {
            total: pager.total,
            page_size: pager.page_size,
            pages: RefCell::new(pages),
            get_page: Some(pager.get_page),
            listener: RefCell::new(None),
            fetches: Cell::new(0),
        })
    }

    /// The "nothing to show" model used while no search result is available.
    pub fn empty() -> Rc<Self> {
        Rc::new(Self {
            total: 0,
            page_size: 0,
            pages: RefCell::new(HashMap::new()),
            get_page: None,
            listener: RefCell::new(None),
            fetches: Cell::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_of(&self, index: usize) -> usize {
        if self.page_size == 0 {
            0
        } else {
            index / self.page_size
        }
    }

    /// Resolves `index`, starting the fetch of its page when needed.
    /// `None` past the end.
    pub fn get(self: &Rc<Self>, index: usize) -> Option<Slot> {
        if index >= self.total {
            return None;
        }

        if let Some(entry) = self.peek(index) {
            return Some(Slot::Entry(entry));
        }

        let page = self.page_of(index);
        if !self.pages.borrow().contains_key(&page) {
            self.load_page(page);
        }
        Some(Slot::Placeholder)
    }

    /// Like [`PagedModel::get`] without triggering a fetch.
    pub fn peek(&self, index: usize) -> Option<Entry> {
        if index >= self.total {
            return None;
        }
        let page = self.page_of(index);
        match self.pages.borrow().get(&page) {
            Some(PageState::Loaded(entries)) => entries.get(index % self.page_size).cloned(),
            _ => None,
        }
    }

    pub fn is_resolved(&self, index: usize) -> bool {
        self.peek(index).is_some()
    }

    pub fn is_loading(&self, page: usize) -> bool {
        matches!(self.pages.borrow().get(&page), Some(PageState::Loading))
    }

    pub fn is_failed(&self, page: usize) -> bool {
        matches!(self.pages.borrow().get(&page), Some(PageState::Failed))
    }

    /// Page fetches started by this model.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    /// Registers the single consumer notified with the index range of each
    /// page that finishes loading.
    pub fn connect(&self, listener: impl Fn(Range<usize>) + 'static) {
        *self.listener.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn disconnect(&self) {
        self.listener.borrow_mut().take();
    }

    fn load_page(self: &Rc<Self>, page: usize) {
        let Some(get_page) = self.get_page.clone() else {
            return;
        };

        self.pages.borrow_mut().insert(page, PageState::Loading);
        self.fetches.set(self.fetches.get() + 1);
        tracing::debug!(page, "fetching page");

        let pending = get_page(page);
        let model = Rc::downgrade(self);
        tokio::task::spawn_local(async move {
            let result = pending.await;
            match model.upgrade() {
                Some(model) => model.finish_page(page, result),
                None => tracing::debug!(page, "page arrived for a discarded model"),
            }
        });
    }

    fn finish_page(&self, page: usize, result: crate::core::errors::Result<Vec<Entry>>) {
        let entries = match result {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(page, "page fetch failed, rows stay placeholders: {}", e);
                self.pages.borrow_mut().insert(page, PageState::Failed);
                return;
            }
        };

        self.pages.borrow_mut().insert(page, PageState::Loaded(entries));

        let start = page * self.page_size;
        let range = start..(start + self.page_size).min(self.total);
        let listener = self.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(range);
        }
    }
}
