//! The expanded "highlight" presentation of a single list row.
//!
//! Expanding borrows the row's element from the [`VirtualList`], moves it into
//! the overlay layer placed exactly over the row and grows the overlay to the
//! viewport while the readme is fetched. Collapsing puts the element back
//! where it came from at invocation time; only the shrinking overlay is left
//! to finish visually.

use super::virtual_list::{RowLease, VirtualList};
use crate::models::Entry;
use crate::services::gallery::{ContentFetcher, ContentRequest, ProxyResolver};
use crate::services::markdown::ContentRenderer;
use crate::ui::element::{ElementId, Rect, SharedTree};
use crate::ui::theme::classes;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Expanding,
    Expanded,
    Collapsing,
}

/// Supplementary content of the active highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentState {
    Pending,
    Loaded,
    Failed,
    /// The entry has no readme.
    Unavailable,
}

/// External collaborators used to load the readme of an expanded row.
#[derive(Clone)]
pub struct ContentServices {
    pub proxy: Rc<dyn ProxyResolver>,
    pub fetcher: Rc<dyn ContentFetcher>,
    pub renderer: Rc<dyn ContentRenderer>,
    pub settings_key: String,
}

struct Active {
    lease: RowLease,
    origin: (ElementId, usize),
    row_frame: Rect,
    row_rect: Rect,
    token: u64,
    content: ContentState,
    fetch: Option<JoinHandle<()>>,
}

struct HighlightState {
    phase: Phase,
    active: Option<Active>,
    viewport: Rect,
    next_token: u64,
}

struct HighlightInner {
    state: RefCell<HighlightState>,
    tree: SharedTree,
    list: VirtualList,
    root: ElementId,
    overlay: ElementId,
    services: ContentServices,
}

#[derive(Clone)]
pub struct HighlightController {
    inner: Rc<HighlightInner>,
}

/// Non-owning handle, for listeners registered on the list.
#[derive(Clone)]
pub struct WeakHighlight {
    inner: Weak<HighlightInner>,
}

impl WeakHighlight {
    pub fn upgrade(&self) -> Option<HighlightController> {
        self.inner.upgrade().map(|inner| HighlightController { inner })
    }
}

impl HighlightController {
    /// Creates the hidden overlay layer as the last child of `root`.
    pub fn new(tree: SharedTree, root: ElementId, list: VirtualList, services: ContentServices) -> Self {
        let overlay = {
            let mut t = tree.borrow_mut();
            let overlay = t.create_with_class("div", classes::OVERLAY);
            t.add_class(overlay, classes::HIDDEN);
            t.append_child(root, overlay);
            overlay
        };

        Self {
            inner: Rc::new(HighlightInner {
                state: RefCell::new(HighlightState {
                    phase: Phase::Idle,
                    active: None,
                    viewport: Rect::default(),
                    next_token: 0,
                }),
                tree,
                list,
                root,
                overlay,
                services,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakHighlight {
        WeakHighlight {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn overlay(&self) -> ElementId {
        self.inner.overlay
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.borrow().phase
    }

    /// True while a row is expanding or expanded.
    pub fn is_active(&self) -> bool {
        self.inner.state.borrow().active.is_some()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.inner.state.borrow().active.as_ref().map(|a| a.lease.index())
    }

    pub fn active_entry(&self) -> Option<Entry> {
        self.inner
            .state
            .borrow()
            .active
            .as_ref()
            .map(|a| a.lease.entry().clone())
    }

    pub fn active_element(&self) -> Option<ElementId> {
        self.inner.state.borrow().active.as_ref().map(|a| a.lease.element())
    }

    pub fn content_state(&self) -> Option<ContentState> {
        self.inner.state.borrow().active.as_ref().map(|a| a.content)
    }

    /// Area the overlay grows to, in the coordinates of the root element.
    pub fn set_viewport(&self, viewport: Rect) {
        let mut state = self.inner.state.borrow_mut();
        state.viewport = viewport;
        let mut tree = self.inner.tree.borrow_mut();
        match state.phase {
            Phase::Expanded => tree.set_frame(self.inner.overlay, viewport),
            Phase::Expanding => tree.animate_frame(self.inner.overlay, viewport),
            Phase::Idle | Phase::Collapsing => {}
        }
    }

    /// Expands row `index`, collapsing whatever was highlighted before.
    /// Returns false when the row is not rendered or still a placeholder.
    pub fn expand(&self, index: usize) -> bool {
        if self.active_index() == Some(index) {
            return true;
        }

        self.collapse();
        self.settle();

        let Some(lease) = self.inner.list.lease_row(index) else {
            tracing::debug!(index, "row cannot be highlighted");
            return false;
        };

        let element = lease.element();
        let viewport = self.inner.state.borrow().viewport;
        let placed = {
            let mut tree = self.inner.tree.borrow_mut();
            let row_rect = tree.bounds_within(element, self.inner.root);
            let row_frame = tree.frame(element);
            tree.detach(element).map(|origin| {
                let overlay = self.inner.overlay;
                tree.set_frame(element, Rect::new(0.0, 0.0, row_rect.width, row_rect.height));
                tree.append_child(overlay, element);
                tree.add_class(element, classes::HIGHLIGHTED);

                tree.remove_class(overlay, classes::HIDDEN);
                tree.remove_class(overlay, classes::ANIMATE);
                tree.remove_class(overlay, classes::SETTLED);
                tree.set_frame(overlay, row_rect);
                // The overlay must sit on the row before it starts to grow.
                tree.flush_layout();
                tree.add_class(overlay, classes::ANIMATE);
                tree.animate_frame(overlay, viewport);
                (origin, row_frame, row_rect)
            })
        };
        let Some((origin, row_frame, row_rect)) = placed else {
            self.inner.list.release_row(lease);
            return false;
        };

        let token = {
            let mut state = self.inner.state.borrow_mut();
            state.next_token += 1;
            state.next_token
        };
        let services = &self.inner.services;
        let proxy = services.proxy.resolve(&services.settings_key);
        let (content, fetch) = match ContentRequest::for_entry(lease.entry(), &proxy) {
            Some(request) => {
                let pending = services.fetcher.fetch(request);
                let highlight = self.downgrade();
                let handle = tokio::task::spawn_local(async move {
                    let result = pending.await;
                    if let Some(highlight) = highlight.upgrade() {
                        highlight.apply_content(token, result);
                    }
                });
                (ContentState::Pending, Some(handle))
            }
            None => (ContentState::Unavailable, None),
        };

        tracing::debug!(index, id = %lease.entry().id(), "expanding highlight");
        let mut state = self.inner.state.borrow_mut();
        state.phase = Phase::Expanding;
        state.active = Some(Active {
            lease,
            origin,
            row_frame,
            row_rect,
            token,
            content,
            fetch,
        });
        true
    }

    /// Tears the highlight down. Safe to call in any phase; only the first
    /// call after an expand does anything.
    pub fn collapse(&self) {
        let lease = {
            let mut state = self.inner.state.borrow_mut();
            let Some(active) = state.active.take() else {
                return;
            };
            state.phase = Phase::Collapsing;

            if let Some(fetch) = &active.fetch {
                fetch.abort();
            }

            let mut tree = self.inner.tree.borrow_mut();
            let overlay = self.inner.overlay;
            let element = active.lease.element();
            tree.set_markup(active.lease.template().body, None);
            tree.remove_class(element, classes::HIGHLIGHTED);
            tree.remove_class(overlay, classes::HAS_CONTENT);
            tree.remove_class(overlay, classes::SETTLED);

            tree.detach(element);
            let (parent, position) = active.origin;
            tree.insert_child(parent, position, element);
            tree.set_frame(element, active.row_frame);
            tree.animate_frame(overlay, active.row_rect);

            tracing::debug!(index = active.lease.index(), "collapsing highlight");
            active.lease
        };

        self.inner.list.release_row(lease);
    }

    /// Transition-end signal from the host.
    pub fn on_transition_end(&self, element: ElementId) {
        if element != self.inner.overlay {
            return;
        }
        let phase = self.phase();
        match phase {
            Phase::Expanding => {
                self.inner.state.borrow_mut().phase = Phase::Expanded;
                self.inner
                    .tree
                    .borrow_mut()
                    .add_class(self.inner.overlay, classes::SETTLED);
            }
            Phase::Collapsing => self.settle(),
            Phase::Idle | Phase::Expanded => {}
        }
    }

    /// Collapses and hides the overlay immediately.
    pub fn dispose(&self) {
        self.collapse();
        self.settle();
    }

    /// Ends a running collapse without waiting for its transition.
    fn settle(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.phase != Phase::Collapsing {
                return;
            }
            state.phase = Phase::Idle;
        }
        let mut tree = self.inner.tree.borrow_mut();
        tree.remove_class(self.inner.overlay, classes::ANIMATE);
        tree.add_class(self.inner.overlay, classes::HIDDEN);
    }

    fn apply_content(&self, token: u64, result: crate::core::errors::Result<String>) {
        let mut state = self.inner.state.borrow_mut();
        let Some(active) = state.active.as_mut().filter(|a| a.token == token) else {
            tracing::debug!(token, "discarding content of a collapsed highlight");
            return;
        };
        active.fetch = None;

        match result {
            Ok(text) => {
                let markup = self.inner.services.renderer.render(&text);
                let mut tree = self.inner.tree.borrow_mut();
                tree.set_markup(active.lease.template().body, Some(markup));
                tree.add_class(self.inner.overlay, classes::HAS_CONTENT);
                active.content = ContentState::Loaded;
            }
            Err(e) => {
                tracing::warn!(id = %active.lease.entry().id(), "readme unavailable: {}", e);
                active.content = ContentState::Failed;
            }
        }
    }
}
