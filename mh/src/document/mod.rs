//! Documents and the context they run in

mod context;
mod core;

pub use context::{BrowsingContext, EventLoopSource};
pub use self::core::Document;
