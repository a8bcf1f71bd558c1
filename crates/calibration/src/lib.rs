pub mod discovery;
pub mod document;

pub use discovery::*;
pub use document::*;
