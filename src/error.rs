//! Typed error hierarchy for the fatal conditions of the reconstruction pipeline.
//!
//! Recoverable per-record conditions are reported through the `log` facade
//! instead of through this enum; see module docs in `reader`, `parser` and
//! `journey` for where those warnings are emitted.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LatseqError {
    #[error("failed to read trace file {path}: {source}")]
    TraceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config file {path}: {source}")]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    ConfigMalformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no feasible paths in either direction (DL or UL) for the configured input/output points")]
    NoPathsEitherDirection,

    #[error("{0}")]
    Usage(String),
}
