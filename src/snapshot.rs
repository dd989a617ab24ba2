//! C8: opaque binary persistence of engine state, keyed by trace file name.
//!
//! The original tool pickles a live Python object graph; there is no Rust
//! equivalent for that, so the fully-parsed and reconstructed state is
//! instead serialized with `serde` + `bincode` (see the design ledger for
//! this decision).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph::PointGraph;
use crate::journey::Journey;
use crate::measurement::Measurement;
use crate::paths::Paths;

#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub measurements: Vec<Measurement>,
    pub graph: PointGraph,
    pub paths: Paths,
    pub journeys: Vec<Journey>,
}

/// `foo.lseq` -> `foo.pkl`, alongside the trace file.
pub fn snapshot_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("pkl")
}

/// A write failure is a warning: the caller's results are still emitted,
/// just not persisted for next time.
pub fn save(path: &Path, snapshot: &Snapshot) {
    match std::fs::File::create(path) {
        Ok(file) => {
            if let Err(e) = bincode::serialize_into(file, snapshot) {
                log::warn!("failed to write snapshot {}: {e}", path.display());
            }
        }
        Err(e) => log::warn!("failed to create snapshot file {}: {e}", path.display()),
    }
}

/// Any failure (missing file, truncated data, format mismatch) falls
/// through silently to a full parse and reconstruct.
pub fn load(path: &Path) -> Option<Snapshot> {
    let file = std::fs::File::open(path).ok()?;
    match bincode::deserialize_from(file) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            log::debug!("discarding unreadable snapshot {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::PointGraph;
    use crate::journey::reconstruct;
    use crate::paths::enumerate_paths;
    use std::collections::HashMap;
    use crate::measurement::Direction;

    #[test]
    fn round_trips_through_bincode() {
        let measurements = vec![Measurement {
            ts: 0.0,
            dir: Direction::Dl,
            src_point: "ip".to_string(),
            dst_point: "phy.out.proc".to_string(),
            properties: HashMap::new(),
            global_ids: HashMap::new(),
            local_ids: HashMap::new(),
        }];
        let config = Config::default();
        let graph = PointGraph::build(&measurements, &config);
        let paths = enumerate_paths(&graph, &config).unwrap();
        let journeys = reconstruct(&measurements, &graph, &paths, &config);

        let snapshot = Snapshot {
            measurements,
            graph,
            paths,
            journeys,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.pkl");
        save(&path, &snapshot);

        let loaded = load(&path).expect("snapshot should load back");
        assert_eq!(loaded.journeys.len(), snapshot.journeys.len());
    }

    #[test]
    fn missing_snapshot_falls_through() {
        let path = Path::new("/nonexistent/trace.pkl");
        assert!(load(path).is_none());
    }

    #[test]
    fn snapshot_path_swaps_extension() {
        let path = Path::new("/tmp/foo.lseq");
        assert_eq!(snapshot_path(path), Path::new("/tmp/foo.pkl"));
    }
}
