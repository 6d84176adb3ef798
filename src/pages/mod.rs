use crate::ui::element::{ElementId, Size};

pub mod extensions;

/// Lifecycle a host drives a page through.
pub trait Page {
    /// Builds the page's elements under `container`.
    fn create_view(&mut self, container: ElementId);
    fn set_visible(&mut self, visible: bool);
    fn layout(&mut self, size: Size);
    fn focus(&mut self);
    /// Cancels pending work, drops listeners and removes the page's elements.
    fn dispose(&mut self);
}
