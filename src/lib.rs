pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod ids;
pub mod indexer;
pub mod journey;
pub mod measurement;
pub mod parser;
pub mod paths;
pub mod reader;
pub mod snapshot;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::Engine;
    pub use crate::error::LatseqError;
    pub use crate::ids::IdValue;
    pub use crate::measurement::{Direction, Measurement};
}
