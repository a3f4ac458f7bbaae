//! Reading and writing networks in a directory-based circuit exchange format.

pub mod environment;
pub mod export;
pub mod import;
pub mod manifest;

pub use environment::{Environment, StandardEnvironment};
pub use export::export;
pub use import::import;
pub use manifest::MANIFEST_FILE;
