pub mod element;
pub mod events;
pub mod theme;

pub use element::{ElementId, ElementTree, Rect, SharedTree, Size};
pub use events::{Emitter, Subscription};
