//! Fixed-row-height virtual list over a [`PagedModel`].
//!
//! Only the rows intersecting the viewport (plus a trailing overscan) are
//! rendered, into a pool of reusable templates. Index `i` is always rendered
//! by template `i % pool_size`, and a template is rebound whenever its index
//! changes, so each scroll or update costs O(visible rows) regardless of the
//! model size.

use super::paged::{PagedModel, Slot};
use crate::models::Entry;
use crate::ui::element::{ElementId, ElementTree, Rect, SharedTree, Size};
use crate::ui::events::{Emitter, Subscription};
use crate::ui::theme::classes;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

/// View handles of one reusable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowTemplate {
    pub container: ElementId,
    pub icon: ElementId,
    pub name: ElementId,
    pub version: ElementId,
    pub author: ElementId,
    pub description: ElementId,
    pub body: ElementId,
}

/// Template factory and binder for list rows.
pub trait RowRenderer {
    fn create_template(&self, tree: &mut ElementTree) -> RowTemplate;
    fn render_entry(&self, tree: &mut ElementTree, template: &RowTemplate, entry: &Entry);
    fn render_placeholder(&self, tree: &mut ElementTree, template: &RowTemplate);
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedRow {
    pub index: usize,
    pub entry: Entry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    SelectionChanged(Option<SelectedRow>),
}

/// Temporary custody of a rendered row. While leased, the list never rebinds
/// the row's template; hand it back with [`VirtualList::release_row`] once
/// the row element is back in the list.
#[must_use = "a leased row must be handed back with VirtualList::release_row"]
#[derive(Debug)]
pub struct RowLease {
    slot: usize,
    index: usize,
    template: RowTemplate,
    entry: Entry,
}

impl RowLease {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn template(&self) -> &RowTemplate {
        &self.template
    }

    pub fn element(&self) -> ElementId {
        self.template.container
    }

    pub fn entry(&self) -> &Entry {
        &self.entry
    }
}

struct TemplateSlot {
    template: RowTemplate,
    index: Option<usize>,
    bound: Option<Entry>,
    leased: bool,
}

struct ListState {
    model: Rc<PagedModel>,
    slots: Vec<TemplateSlot>,
    row_height: f32,
    overscan: usize,
    viewport: Size,
    scroll_top: f32,
    selected: Option<usize>,
}

impl ListState {
    fn visible_range(&self) -> Range<usize> {
        let total = self.model.len();
        if total == 0 || self.viewport.height <= 0.0 {
            return 0..0;
        }
        let start = (self.scroll_top / self.row_height).floor() as usize;
        let end = ((self.scroll_top + self.viewport.height) / self.row_height).ceil() as usize;
        start.min(total)..(end + self.overscan).min(total)
    }

    fn pool_size(&self) -> usize {
        if self.viewport.height <= 0.0 {
            return 0;
        }
        (self.viewport.height / self.row_height).ceil() as usize + 1 + self.overscan
    }

    fn max_scroll(&self) -> f32 {
        (self.model.len() as f32 * self.row_height - self.viewport.height).max(0.0)
    }
}

struct ListInner {
    state: RefCell<ListState>,
    tree: SharedTree,
    renderer: Rc<dyn RowRenderer>,
    element: ElementId,
    events: Emitter<ListEvent>,
}

/// Cheap-to-clone handle; clones share the same list.
#[derive(Clone)]
pub struct VirtualList {
    inner: Rc<ListInner>,
}

impl VirtualList {
    pub fn new(
        tree: SharedTree,
        container: ElementId,
        row_height: f32,
        overscan: usize,
        renderer: Rc<dyn RowRenderer>,
    ) -> Self {
        let element = {
            let mut t = tree.borrow_mut();
            let element = t.create_with_class("div", classes::LIST_ROWS);
            t.append_child(container, element);
            element
        };

        Self {
            inner: Rc::new(ListInner {
                state: RefCell::new(ListState {
                    model: PagedModel::empty(),
                    slots: Vec::new(),
                    row_height,
                    overscan,
                    viewport: Size::default(),
                    scroll_top: 0.0,
                    selected: None,
                }),
                tree,
                renderer,
                element,
                events: Emitter::new(),
            }),
        }
    }

    /// The scrolling element rows are rendered into.
    pub fn element(&self) -> ElementId {
        self.inner.element
    }

    pub fn model(&self) -> Rc<PagedModel> {
        Rc::clone(&self.inner.state.borrow().model)
    }

    /// Swaps the data source. Every binding of the old model is dropped
    /// before the new visible range is rendered, and the selection is cleared.
    pub fn set_model(&self, model: Rc<PagedModel>) {
        let cleared = {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let mut tree = self.inner.tree.borrow_mut();

            state.model.disconnect();
            for slot in state.slots.iter_mut() {
                slot.bound = None;
                slot.index = None;
                if slot.leased {
                    continue;
                }
                self.inner.renderer.render_placeholder(&mut tree, &slot.template);
                tree.remove_class(slot.template.container, classes::SELECTED);
                tree.detach(slot.template.container);
            }

            state.model = Rc::clone(&model);
            state.scroll_top = 0.0;
            tree.set_scroll_top(self.inner.element, 0.0);
            state.selected.take().is_some()
        };

        let list = Rc::downgrade(&self.inner);
        model.connect(move |range| {
            if let Some(inner) = list.upgrade() {
                VirtualList { inner }.refresh_range(range);
            }
        });

        tracing::debug!(total = model.len(), "list model replaced");
        self.render();

        if cleared {
            self.inner.events.emit(&ListEvent::SelectionChanged(None));
        }
    }

    /// Sizes the viewport and renders whatever became visible.
    pub fn layout(&self, viewport: Size) {
        {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let mut tree = self.inner.tree.borrow_mut();

            state.viewport = viewport;
            let wanted = state.pool_size();
            while state.slots.len() < wanted {
                let template = self.inner.renderer.create_template(&mut tree);
                state.slots.push(TemplateSlot {
                    template,
                    index: None,
                    bound: None,
                    leased: false,
                });
            }

            state.scroll_top = state.scroll_top.min(state.max_scroll());
            tree.set_scroll_top(self.inner.element, state.scroll_top);
            tree.set_frame(
                self.inner.element,
                Rect::new(0.0, 0.0, viewport.width, viewport.height),
            );
        }
        self.render();
    }

    pub fn viewport(&self) -> Size {
        self.inner.state.borrow().viewport
    }

    pub fn row_height(&self) -> f32 {
        self.inner.state.borrow().row_height
    }

    pub fn scroll_top(&self) -> f32 {
        self.inner.state.borrow().scroll_top
    }

    pub fn set_scroll_top(&self, scroll_top: f32) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.scroll_top = scroll_top.clamp(0.0, state.max_scroll());
            self.inner
                .tree
                .borrow_mut()
                .set_scroll_top(self.inner.element, state.scroll_top);
        }
        self.render();
    }

    pub fn scroll_to_index(&self, index: usize) {
        let top = index as f32 * self.row_height();
        self.set_scroll_top(top);
    }

    pub fn visible_range(&self) -> Range<usize> {
        self.inner.state.borrow().visible_range()
    }

    /// Frame of row `index` relative to the top of the viewport.
    pub fn row_bounds(&self, index: usize) -> Rect {
        let state = self.inner.state.borrow();
        Rect::new(
            index as f32 * state.row_height - state.scroll_top,
            0.0,
            state.viewport.width,
            state.row_height,
        )
    }

    /// Number of templates ever created; they are never destroyed.
    pub fn template_count(&self) -> usize {
        self.inner.state.borrow().slots.len()
    }

    /// Rows currently in the list, by index. `None` marks a placeholder.
    pub fn rendered_rows(&self) -> Vec<(usize, Option<Entry>)> {
        let state = self.inner.state.borrow();
        let mut rows: Vec<_> = state
            .slots
            .iter()
            .filter(|slot| !slot.leased)
            .filter_map(|slot| slot.index.map(|ix| (ix, slot.bound.clone())))
            .collect();
        rows.sort_by_key(|(ix, _)| *ix);
        rows
    }

    /// Template currently rendering `index`, if any.
    pub fn template_for(&self, index: usize) -> Option<RowTemplate> {
        self.inner
            .state
            .borrow()
            .slots
            .iter()
            .find(|slot| slot.index == Some(index))
            .map(|slot| slot.template)
    }

    // Selection

    pub fn selection(&self) -> Option<usize> {
        self.inner.state.borrow().selected
    }

    pub fn subscribe(&self, listener: impl Fn(&ListEvent) + 'static) -> Subscription {
        self.inner.events.subscribe(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.events.listener_count()
    }

    /// Pointer input at `y` pixels below the top of the viewport. Clicking
    /// empty space clears the selection; clicking a placeholder does nothing.
    pub fn click_at(&self, y: f32) {
        let (index, total) = {
            let state = self.inner.state.borrow();
            if y < 0.0 || state.row_height <= 0.0 {
                return;
            }
            let index = ((y + state.scroll_top) / state.row_height).floor() as usize;
            (index, state.model.len())
        };

        if index >= total {
            self.clear_selection();
        } else {
            self.select(index);
        }
    }

    /// Selects a resolved row that is currently rendered. Returns false for
    /// placeholders, rows outside the rendered range and out of range indices.
    pub fn select(&self, index: usize) -> bool {
        let entry = {
            let mut state = self.inner.state.borrow_mut();
            let Some(entry) = state.model.peek(index) else {
                return false;
            };
            if state.selected == Some(index) {
                return true;
            }
            if !state.slots.iter().any(|slot| slot.index == Some(index)) {
                return false;
            }
            state.selected = Some(index);
            self.mark_selection(&state);
            entry
        };

        self.inner
            .events
            .emit(&ListEvent::SelectionChanged(Some(SelectedRow { index, entry })));
        true
    }

    pub fn clear_selection(&self) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let changed = state.selected.take().is_some();
            if changed {
                self.mark_selection(&state);
            }
            changed
        };

        if changed {
            self.inner.events.emit(&ListEvent::SelectionChanged(None));
        }
    }

    fn mark_selection(&self, state: &ListState) {
        let mut tree = self.inner.tree.borrow_mut();
        for slot in &state.slots {
            let selected = slot.index.is_some() && slot.index == state.selected;
            tree.toggle_class(slot.template.container, classes::SELECTED, selected);
        }
    }

    // Custody

    /// Hands out the template rendering `index`. Only resolved rows that are
    /// currently rendered and not already leased can be leased.
    pub fn lease_row(&self, index: usize) -> Option<RowLease> {
        let mut state = self.inner.state.borrow_mut();
        let (slot_ix, slot) = state
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.index == Some(index))?;
        if slot.leased {
            return None;
        }
        let entry = slot.bound.clone()?;
        slot.leased = true;
        tracing::trace!(index, slot = slot_ix, "row leased");

        Some(RowLease {
            slot: slot_ix,
            index,
            template: slot.template,
            entry,
        })
    }

    /// Takes a leased template back and rebinds it if the list moved on
    /// while it was away.
    pub fn release_row(&self, lease: RowLease) {
        {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let orphaned = match state.slots.get_mut(lease.slot) {
                Some(slot) => {
                    slot.leased = false;
                    slot.index.is_none()
                }
                None => false,
            };
            // The model was replaced while the row was away.
            if orphaned {
                let mut tree = self.inner.tree.borrow_mut();
                self.unbind(state, &mut tree, lease.slot);
            }
        }
        tracing::trace!(index = lease.index, slot = lease.slot, "row released");
        self.render();
    }

    pub fn is_leased(&self, index: usize) -> bool {
        self.inner
            .state
            .borrow()
            .slots
            .iter()
            .any(|slot| slot.leased && slot.index == Some(index))
    }

    /// Detaches from the model and the DOM and drops every listener.
    pub fn dispose(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.model.disconnect();
            state.model = PagedModel::empty();
            state.selected = None;
        }
        self.inner.events.clear();
        self.inner.tree.borrow_mut().detach(self.inner.element);
    }

    // Rendering

    fn render(&self) {
        let mut guard = self.inner.state.borrow_mut();
        let state = &mut *guard;
        let pool = state.slots.len();
        if pool == 0 {
            return;
        }

        let mut wanted: Vec<Option<usize>> = vec![None; pool];
        for index in state.visible_range() {
            wanted[index % pool] = Some(index);
        }

        let mut tree = self.inner.tree.borrow_mut();
        for (slot_ix, want) in wanted.into_iter().enumerate() {
            if state.slots[slot_ix].leased || state.slots[slot_ix].index == want {
                continue;
            }
            match want {
                Some(index) => self.bind(state, &mut tree, slot_ix, index),
                None => self.unbind(state, &mut tree, slot_ix),
            }
        }
    }

    /// Re-renders rows of a page that just finished loading.
    fn refresh_range(&self, range: Range<usize>) {
        let mut guard = self.inner.state.borrow_mut();
        let state = &mut *guard;
        let mut tree = self.inner.tree.borrow_mut();
        for slot_ix in 0..state.slots.len() {
            let slot = &state.slots[slot_ix];
            let stale = slot.index.filter(|ix| !slot.leased && range.contains(ix));
            if let Some(index) = stale {
                self.bind(state, &mut tree, slot_ix, index);
            }
        }
    }

    fn bind(&self, state: &mut ListState, tree: &mut ElementTree, slot_ix: usize, index: usize) {
        let row_height = state.row_height;
        let width = state.viewport.width;
        let selected = state.selected == Some(index);
        let slot = &mut state.slots[slot_ix];

        match state.model.get(index) {
            Some(Slot::Entry(entry)) => {
                self.inner.renderer.render_entry(tree, &slot.template, &entry);
                slot.bound = Some(entry);
            }
            Some(Slot::Placeholder) | None => {
                self.inner.renderer.render_placeholder(tree, &slot.template);
                slot.bound = None;
            }
        }
        slot.index = Some(index);

        let container = slot.template.container;
        tree.set_frame(
            container,
            Rect::new(index as f32 * row_height, 0.0, width, row_height),
        );
        tree.set_attr(container, "data-index", index.to_string());
        tree.toggle_class(container, classes::SELECTED, selected);
        if tree.parent(container) != Some(self.inner.element) {
            tree.append_child(self.inner.element, container);
        }
    }

    fn unbind(&self, state: &mut ListState, tree: &mut ElementTree, slot_ix: usize) {
        let slot = &mut state.slots[slot_ix];
        slot.index = None;
        slot.bound = None;
        self.inner.renderer.render_placeholder(tree, &slot.template);
        tree.remove_class(slot.template.container, classes::SELECTED);
        tree.remove_attr(slot.template.container, "data-index");
        tree.detach(slot.template.container);
    }
}
