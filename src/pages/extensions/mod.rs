pub mod highlight;
pub mod paged;
pub mod row;
pub mod search;
pub mod virtual_list;

pub use highlight::{ContentServices, ContentState, HighlightController, Phase};
pub use paged::{PagedModel, Slot};
pub use row::ExtensionRowRenderer;
pub use search::{SearchOptions, SearchOrchestrator};
pub use virtual_list::{ListEvent, RowLease, RowRenderer, RowTemplate, SelectedRow, VirtualList};

use crate::core::config::GalleryConfig;
use crate::core::debounce::Debounced;
use crate::pages::Page;
use crate::services::gallery::{ContentFetcher, GalleryService, InstalledExtensions, ProxyResolver};
use crate::services::markdown::ContentRenderer;
use crate::ui::element::{ElementId, Rect, SharedTree, Size};
use crate::ui::events::Subscription;
use crate::ui::theme::classes;
use std::rc::Rc;

// ============================================================================
// Collaborators
// ============================================================================

/// Everything the extensions view talks to outside the element tree.
#[derive(Clone)]
pub struct ExtensionsServices {
    pub gallery: Rc<dyn GalleryService>,
    pub installed: Rc<dyn InstalledExtensions>,
    pub proxy: Rc<dyn ProxyResolver>,
    pub fetcher: Rc<dyn ContentFetcher>,
    pub renderer: Rc<dyn ContentRenderer>,
}

// ============================================================================
// ExtensionsPage
// ============================================================================

struct View {
    root: ElementId,
    header: ElementId,
    search_box: ElementId,
    list_container: ElementId,
    list: VirtualList,
    highlight: HighlightController,
    search: SearchOrchestrator,
    selection: Subscription,
}

/// Searchable extension gallery: a search box over a virtual list whose rows
/// expand into a readme overlay when selected.
pub struct ExtensionsPage {
    tree: SharedTree,
    config: GalleryConfig,
    services: ExtensionsServices,
    view: Option<View>,
    query: String,
    visible: bool,
}

impl ExtensionsPage {
    pub fn new(tree: SharedTree, config: GalleryConfig, services: ExtensionsServices) -> Self {
        Self {
            tree,
            config,
            services,
            view: None,
            query: String::new(),
            visible: false,
        }
    }

    pub fn tree(&self) -> &SharedTree {
        &self.tree
    }

    pub fn root(&self) -> Option<ElementId> {
        self.view.as_ref().map(|v| v.root)
    }

    pub fn search_box(&self) -> Option<ElementId> {
        self.view.as_ref().map(|v| v.search_box)
    }

    pub fn list(&self) -> Option<&VirtualList> {
        self.view.as_ref().map(|v| &v.list)
    }

    pub fn highlight(&self) -> Option<&HighlightController> {
        self.view.as_ref().map(|v| &v.highlight)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// True while a search is scheduled or running.
    pub fn is_loading(&self) -> bool {
        self.view
            .as_ref()
            .is_some_and(|v| self.tree.borrow().has_class(v.root, classes::LOADING))
    }

    /// Input-change handler of the search box.
    pub fn set_query(&mut self, text: &str) -> Option<Debounced<()>> {
        self.search(text, false)
    }

    /// Runs a search for `text` without waiting for the input to settle.
    pub fn search_now(&mut self, text: &str) -> Option<Debounced<()>> {
        self.search(text, true)
    }

    fn search(&mut self, text: &str, immediate: bool) -> Option<Debounced<()>> {
        let view = self.view.as_ref()?;
        self.query = text.to_string();
        self.tree
            .borrow_mut()
            .set_attr(view.search_box, "value", text);
        Some(view.search.search(text, immediate))
    }

    /// Pointer input at `y` pixels below the top of the view. The overlay
    /// swallows clicks while a row is highlighted.
    pub fn click_at(&self, y: f32) {
        let Some(view) = &self.view else {
            return;
        };
        let top = self.config.header_height;
        if y < top || view.highlight.is_active() {
            return;
        }
        view.list.click_at(y - top);
    }

    /// Click on the view background: deselects and collapses.
    pub fn click_root(&self) {
        if let Some(view) = &self.view {
            view.list.clear_selection();
            view.highlight.collapse();
        }
    }

    /// Keyboard-style selection of row `index`.
    pub fn select(&self, index: usize) -> bool {
        self.view.as_ref().is_some_and(|v| v.list.select(index))
    }

    /// Ends all running transitions and delivers their transition-end
    /// signals. Returns how many finished.
    pub fn finish_transitions(&self) -> usize {
        let finished = self.tree.borrow_mut().finish_transitions();
        if let Some(view) = &self.view {
            for transition in &finished {
                view.highlight.on_transition_end(transition.element);
            }
        }
        finished.len()
    }
}

impl Page for ExtensionsPage {
    fn create_view(&mut self, container: ElementId) {
        if self.view.is_some() {
            tracing::warn!("extensions view already created");
            return;
        }

        let (root, header, search_box, list_container) = {
            let mut tree = self.tree.borrow_mut();
            let root = tree.create_with_class("div", classes::VIEWLET);
            let header = tree.create_with_class("div", classes::HEADER);
            let search_box = tree.create_with_class("input", classes::SEARCH_BOX);
            let list_container = tree.create_with_class("div", classes::LIST);
            tree.set_attr(search_box, "placeholder", "Search Extensions in Marketplace");
            tree.append_child(container, root);
            tree.append_child(root, header);
            tree.append_child(header, search_box);
            tree.append_child(root, list_container);
            (root, header, search_box, list_container)
        };

        let list = VirtualList::new(
            Rc::clone(&self.tree),
            list_container,
            self.config.row_height,
            self.config.overscan,
            Rc::new(ExtensionRowRenderer),
        );
        let highlight = HighlightController::new(
            Rc::clone(&self.tree),
            root,
            list.clone(),
            ContentServices {
                proxy: Rc::clone(&self.services.proxy),
                fetcher: Rc::clone(&self.services.fetcher),
                renderer: Rc::clone(&self.services.renderer),
                settings_key: self.config.proxy_settings_key.clone(),
            },
        );
        let search = SearchOrchestrator::new(
            Rc::clone(&self.services.gallery),
            Rc::clone(&self.services.installed),
            list.clone(),
            highlight.clone(),
            Rc::clone(&self.tree),
            root,
            SearchOptions {
                delay: self.config.search_delay(),
                page_size: self.config.page_size,
            },
        );

        let weak_highlight = highlight.downgrade();
        let selection = list.subscribe(move |event| {
            let Some(highlight) = weak_highlight.upgrade() else {
                return;
            };
            match event {
                ListEvent::SelectionChanged(Some(row)) => {
                    highlight.expand(row.index);
                }
                ListEvent::SelectionChanged(None) => highlight.collapse(),
            }
        });

        tracing::debug!("extensions view created");
        self.view = Some(View {
            root,
            header,
            search_box,
            list_container,
            list,
            highlight,
            search,
            selection,
        });
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        let Some(root) = self.root() else {
            return;
        };
        self.tree
            .borrow_mut()
            .toggle_class(root, classes::HIDDEN, !visible);

        if visible {
            // Fire and forget; the orchestrator guards its own effects.
            let _ = self.search_now("");
        } else if let Some(view) = &self.view {
            view.list.clear_selection();
            view.highlight.collapse();
        }
    }

    fn layout(&mut self, size: Size) {
        let Some(view) = &self.view else {
            return;
        };
        let header_height = self.config.header_height.min(size.height);
        let list_height = size.height - header_height;
        let list_area = Rect::new(header_height, 0.0, size.width, list_height);
        {
            let mut tree = self.tree.borrow_mut();
            tree.set_frame(view.root, Rect::new(0.0, 0.0, size.width, size.height));
            tree.set_frame(view.header, Rect::new(0.0, 0.0, size.width, header_height));
            tree.set_frame(view.list_container, list_area);
        }
        view.list.layout(Size::new(size.width, list_height));
        view.highlight.set_viewport(list_area);
    }

    fn focus(&mut self) {
        if let Some(view) = &self.view {
            self.tree.borrow_mut().focus(view.search_box);
        }
    }

    fn dispose(&mut self) {
        let Some(view) = self.view.take() else {
            return;
        };
        view.search.cancel();
        view.highlight.dispose();
        drop(view.selection);
        view.list.dispose();
        self.tree.borrow_mut().detach(view.root);
        self.visible = false;
        tracing::debug!("extensions view disposed");
    }
}
