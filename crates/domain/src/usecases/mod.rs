//! Application use cases / business logic

pub mod watch;

pub use watch::{WatchError, WatchPipeline, WatchSource};
