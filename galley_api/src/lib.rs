//! Shared Galley data models consumed by the core engine and its clients.

pub mod annotation;
pub mod change;
pub mod comment;
pub mod span;

pub use annotation::*;
pub use change::*;
pub use comment::*;
pub use span::*;
