pub mod metadata;

pub use metadata::{extract_metadata, FileInfo, Metadata};
