//! Retained element tree the extensions view renders into.
//!
//! Frames are relative to the parent element and shifted by the parent's
//! scroll offset. Frame writes stay pending until [`ElementTree::flush_layout`]
//! commits them; a transition always starts from the committed frame, so
//! callers that reposition an element and then animate it must flush in
//! between.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

pub type SharedTree = Rc<RefCell<ElementTree>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub top: f32,
    pub left: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(top: f32, left: f32, width: f32, height: f32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A frame animation that has started and not yet signalled its end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub element: ElementId,
    pub from: Rect,
    pub to: Rect,
}

#[derive(Debug)]
struct Node {
    tag: &'static str,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    classes: BTreeSet<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    markup: Option<String>,
    frame: Rect,
    pending_frame: Option<Rect>,
    scroll_top: f32,
}

impl Node {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            parent: None,
            children: Vec::new(),
            classes: BTreeSet::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            markup: None,
            frame: Rect::default(),
            pending_frame: None,
            scroll_top: 0.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct ElementTree {
    nodes: Vec<Node>,
    transitions: Vec<Transition>,
    focused: Option<ElementId>,
    layout_passes: u64,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedTree {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn create(&mut self, tag: &'static str) -> ElementId {
        self.nodes.push(Node::new(tag));
        ElementId(self.nodes.len() - 1)
    }

    pub fn create_with_class(&mut self, tag: &'static str, class: &str) -> ElementId {
        let id = self.create(tag);
        self.add_class(id, class);
        id
    }

    pub fn tag(&self, id: ElementId) -> &'static str {
        self.nodes[id.0].tag
    }

    // Structure

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        &self.nodes[id.0].children
    }

    /// Moves `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Moves `child` into `parent` at `position`, clamped to the child count.
    pub fn insert_child(&mut self, parent: ElementId, position: usize, child: ElementId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let position = position.min(children.len());
        children.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Removes `id` from its parent and returns where it was.
    pub fn detach(&mut self, id: ElementId) -> Option<(ElementId, usize)> {
        let parent = self.nodes[id.0].parent.take()?;
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings.iter().position(|c| *c == id)?;
        siblings.remove(position);
        Some((parent, position))
    }

    pub fn is_attached(&self, id: ElementId) -> bool {
        self.nodes[id.0].parent.is_some()
    }

    /// True when `id` is `ancestor` or lies below it.
    pub fn contains(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes[node.0].parent;
        }
        false
    }

    pub fn find_by_class(&self, root: ElementId, class: &str) -> Option<ElementId> {
        if self.has_class(root, class) {
            return Some(root);
        }
        self.nodes[root.0]
            .children
            .iter()
            .find_map(|child| self.find_by_class(*child, class))
    }

    // Classes, attributes, content

    pub fn add_class(&mut self, id: ElementId, class: &str) {
        self.nodes[id.0].classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, id: ElementId, class: &str) {
        self.nodes[id.0].classes.remove(class);
    }

    pub fn toggle_class(&mut self, id: ElementId, class: &str, on: bool) {
        if on {
            self.add_class(id, class);
        } else {
            self.remove_class(id, class);
        }
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.nodes[id.0].classes.contains(class)
    }

    pub fn set_attr(&mut self, id: ElementId, name: &str, value: impl Into<String>) {
        self.nodes[id.0].attrs.insert(name.to_string(), value.into());
    }

    pub fn remove_attr(&mut self, id: ElementId, name: &str) {
        self.nodes[id.0].attrs.remove(name);
    }

    pub fn attr(&self, id: ElementId, name: &str) -> Option<&str> {
        self.nodes[id.0].attrs.get(name).map(String::as_str)
    }

    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) {
        self.nodes[id.0].text = text.into();
    }

    pub fn text(&self, id: ElementId) -> &str {
        &self.nodes[id.0].text
    }

    /// Injected markup, e.g. a rendered readme.
    pub fn set_markup(&mut self, id: ElementId, markup: Option<String>) {
        self.nodes[id.0].markup = markup;
    }

    pub fn markup(&self, id: ElementId) -> Option<&str> {
        self.nodes[id.0].markup.as_deref()
    }

    pub fn focus(&mut self, id: ElementId) {
        self.focused = Some(id);
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    // Geometry

    pub fn set_frame(&mut self, id: ElementId, frame: Rect) {
        self.nodes[id.0].pending_frame = Some(frame);
    }

    /// Latest frame, pending or committed.
    pub fn frame(&self, id: ElementId) -> Rect {
        let node = &self.nodes[id.0];
        node.pending_frame.unwrap_or(node.frame)
    }

    /// Frame as of the last layout pass.
    pub fn committed_frame(&self, id: ElementId) -> Rect {
        self.nodes[id.0].frame
    }

    pub fn set_scroll_top(&mut self, id: ElementId, scroll_top: f32) {
        self.nodes[id.0].scroll_top = scroll_top;
    }

    pub fn scroll_top(&self, id: ElementId) -> f32 {
        self.nodes[id.0].scroll_top
    }

    /// Frame of `id` in the coordinate space of `ancestor`, accounting for
    /// the scroll offsets of every element in between.
    pub fn bounds_within(&self, id: ElementId, ancestor: ElementId) -> Rect {
        let mut rect = self.frame(id);
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            rect.top -= self.nodes[parent.0].scroll_top;
            if parent == ancestor {
                break;
            }
            let frame = self.frame(parent);
            rect.top += frame.top;
            rect.left += frame.left;
            current = self.nodes[parent.0].parent;
        }
        rect
    }

    /// Commits every pending frame. This is the synchronization point that
    /// must separate placing an element from animating it.
    pub fn flush_layout(&mut self) {
        for node in &mut self.nodes {
            if let Some(frame) = node.pending_frame.take() {
                node.frame = frame;
            }
        }
        self.layout_passes += 1;
    }

    pub fn layout_passes(&self) -> u64 {
        self.layout_passes
    }

    /// Starts animating `id` from its committed frame to `to`, replacing any
    /// transition already running on it.
    pub fn animate_frame(&mut self, id: ElementId, to: Rect) {
        let from = self.nodes[id.0].frame;
        self.nodes[id.0].pending_frame = Some(to);
        self.transitions.retain(|t| t.element != id);
        self.transitions.push(Transition {
            element: id,
            from,
            to,
        });
    }

    pub fn running_transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Ends every running transition at its target frame and returns them so
    /// the host can deliver the transition-end signals.
    pub fn finish_transitions(&mut self) -> Vec<Transition> {
        let finished = std::mem::take(&mut self.transitions);
        for transition in &finished {
            let node = &mut self.nodes[transition.element.0];
            node.frame = transition.to;
            if node.pending_frame == Some(transition.to) {
                node.pending_frame = None;
            }
        }
        finished
    }
}
