pub mod gallery;
pub mod markdown;
