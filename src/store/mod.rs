//! Columnar storage for node trees and their JSON descriptions.
pub mod error;
pub mod library;
pub mod registry;
pub mod types;

pub use error::TreeError;
pub use library::{
    load_library, load_library_from_path, Library, LibraryDescription, LinkDescription, NodeDescription,
    TreeDescription,
};
pub use registry::Registry;
pub use types::*;
