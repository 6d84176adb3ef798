pub mod extension_entry;

pub use extension_entry::{Entry, GalleryExtension, GalleryVersion, InstallState};
