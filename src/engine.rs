//! Ties the pipeline stages together and renders each of the CLI's output modes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::config::Config;
use crate::error::LatseqError;
use crate::graph::PointGraph;
use crate::ids::IdValue;
use crate::indexer::{self, IndexResult};
use crate::journey::{reconstruct, Journey, PathState};
use crate::measurement::Measurement;
use crate::paths::{enumerate_paths, Paths};
use crate::snapshot::{self, Snapshot};
use crate::{parser, reader};

pub struct Engine {
    pub measurements: Vec<Measurement>,
    pub graph: PointGraph,
    pub paths: Paths,
    pub journeys: Vec<Journey>,
}

impl Engine {
    fn from_snapshot(s: Snapshot) -> Engine {
        Engine {
            measurements: s.measurements,
            graph: s.graph,
            paths: s.paths,
            journeys: s.journeys,
        }
    }

    fn build(log_path: &Path, config: &Config) -> Result<Engine, LatseqError> {
        let raw = reader::read_trace(log_path)?;
        let (measurements, _known_global_ids) = parser::parse_records(raw);
        let graph = PointGraph::build(&measurements, config);
        let paths = enumerate_paths(&graph, config)?;
        let journeys = reconstruct(&measurements, &graph, &paths, config);
        Ok(Engine {
            measurements,
            graph,
            paths,
            journeys,
        })
    }

    /// Load the engine state, reusing a snapshot when present and clean is
    /// not requested. `--clean` unconditionally discards a prior snapshot
    /// first, forcing a fresh parse/reconstruct/persist cycle.
    pub fn load_or_build(log_path: &Path, config: &Config, clean: bool) -> Result<Engine, LatseqError> {
        let snap_path = snapshot::snapshot_path(log_path);

        if clean && snap_path.exists() {
            if let Err(e) = std::fs::remove_file(&snap_path) {
                log::warn!("failed to remove snapshot {}: {e}", snap_path.display());
            }
        } else if !clean {
            if let Some(snapshot) = snapshot::load(&snap_path) {
                log::info!("reusing snapshot {}", snap_path.display());
                return Ok(Engine::from_snapshot(snapshot));
            }
        }

        let engine = Engine::build(log_path, config)?;
        snapshot::save(
            &snap_path,
            &Snapshot {
                measurements: engine.measurements.clone(),
                graph: engine.graph.clone(),
                paths: engine.paths.clone(),
                journeys: engine.journeys.clone(),
            },
        );
        Ok(engine)
    }

    fn index(&self) -> IndexResult {
        indexer::build(&self.measurements, &self.journeys)
    }

    /// `--inputs`: the canonicalized measurement stream, one line per record.
    pub fn inputs_lines(&self) -> Vec<String> {
        self.measurements
            .iter()
            .map(|m| {
                format!(
                    "{:.6} {} {}--{} {}.{}.{}",
                    m.ts,
                    m.dir,
                    m.src_point,
                    m.dst_point,
                    render_props(&m.properties),
                    render_globals(&m.global_ids),
                    render_locals(&m.local_ids),
                )
            })
            .collect()
    }

    /// Every point name referenced by any enumerated path, across both
    /// directions, in a stable order.
    fn all_path_points(&self) -> Vec<String> {
        let mut set: BTreeSet<String> = BTreeSet::new();
        for path in self.paths.dl.iter().chain(self.paths.ul.iter()) {
            set.extend(path.iter().cloned());
        }
        set.into_iter().collect()
    }

    /// `--out_journeys`: the flat indexed view, in the `.lseqj` line format.
    pub fn out_journeys_lines(&self) -> Vec<String> {
        let IndexResult { flat, .. } = self.index();
        let mut lines = Vec::with_capacity(flat.len() + 1);
        lines.push(format!("#funcId {}", self.all_path_points().join(" ")));

        for record in flat {
            let len = record.properties.get("len").cloned().unwrap_or_default();
            let ts = format_timestamp(record.ts);
            let uids = record.uids.join(".");
            lines.push(format!(
                "{ts} {} (len{len})\t{}--{}\t{}.{}.{}",
                record.dir,
                record.src_point,
                record.dst_point,
                uids,
                render_globals(&record.global_ids),
                render_locals(&record.local_ids),
            ));
        }
        lines
    }

    /// `--journeys`: one JSON object per completed journey.
    pub fn journeys_json(&self) -> Vec<serde_json::Value> {
        self.journeys
            .iter()
            .filter(|j| j.completed)
            .map(|j| {
                json!({
                    "uid": j.uid,
                    "dir": j.dir.to_string(),
                    "ts_in": j.ts_in,
                    "ts_out": j.ts_out,
                    "path_id": match &j.path {
                        PathState::Resolved(id) => Some(*id),
                        PathState::Candidates(_) => None,
                    },
                    "hops": j.set.iter().map(|&(idx, ts)| {
                        let m = &self.measurements[idx];
                        json!({"index": idx, "ts": ts, "src": m.src_point, "dst": m.dst_point})
                    }).collect::<Vec<_>>(),
                })
            })
            .collect()
    }

    /// `--points`: one JSON object per point, including per-uid durations.
    pub fn points_json(&self) -> Vec<serde_json::Value> {
        let IndexResult { durations, .. } = self.index();
        let mut names: Vec<&String> = self.graph.names().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| {
                let point = self.graph.get(name).unwrap();
                let mut next: Vec<&String> = point.next.iter().collect();
                next.sort();
                json!({
                    "name": name,
                    "next": next,
                    "count": point.count,
                    "dir": point.dir.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
                    "duration": durations.get(name).cloned().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// `--paths`: `{"D": [...], "U": [...]}`.
    pub fn paths_json(&self) -> serde_json::Value {
        json!({
            "D": self.paths.dl,
            "U": self.paths.ul,
        })
    }

    /// `--csv`: one row per completed journey; columns are `uid, dir,
    /// path_id` followed by one column per point in `all_path_points`,
    /// holding the bound timestamp at that point (empty if not visited).
    pub fn csv_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let points = self.all_path_points();
        let mut header = vec!["uid".to_string(), "dir".to_string(), "path_id".to_string()];
        header.extend(points.iter().cloned());

        let mut rows = Vec::new();
        for j in self.journeys.iter().filter(|j| j.completed) {
            let mut by_point: std::collections::HashMap<&str, f64> = std::collections::HashMap::new();
            for (i, &(idx, ts)) in j.set.iter().enumerate() {
                let m = &self.measurements[idx];
                if i == 0 {
                    by_point.insert(m.src_point.as_str(), ts);
                }
                by_point.insert(m.dst_point.as_str(), ts);
            }
            let path_id = match &j.path {
                PathState::Resolved(id) => id.to_string(),
                PathState::Candidates(ids) => ids.iter().map(|(id, _)| id.to_string()).collect::<Vec<_>>().join("|"),
            };
            let mut row = vec![j.uid.clone(), j.dir.to_string(), path_id];
            for p in &points {
                row.push(by_point.get(p.as_str()).map(|ts| format!("{ts:.6}")).unwrap_or_default());
            }
            rows.push(row);
        }
        (header, rows)
    }

    pub fn orphans(&self) -> usize {
        self.index().orphans
    }
}

fn render_props(props: &std::collections::HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = props.keys().collect();
    keys.sort();
    keys.into_iter().map(|k| format!("{k}{}", props[k])).collect::<Vec<_>>().join(".")
}

fn render_globals(ids: &std::collections::HashMap<String, String>) -> String {
    render_props(ids)
}

fn render_locals(ids: &std::collections::HashMap<String, IdValue>) -> String {
    let mut keys: Vec<&String> = ids.keys().collect();
    keys.sort();
    let mut tokens = Vec::new();
    for k in keys {
        match &ids[k] {
            IdValue::Single(v) => tokens.push(format!("{k}{v}")),
            IdValue::Aggregate(vs) => {
                for v in vs {
                    tokens.push(format!("{k}{v}"));
                }
            }
        }
    }
    tokens.join(".")
}

/// Render a `ts` (seconds since epoch) as `YYYYMMDD_HHMMSS.ffffff`.
fn format_timestamp(ts: f64) -> String {
    let secs = ts.trunc() as i64;
    let micros = ((ts.fract()) * 1_000_000.0).round() as u32;
    match Utc.timestamp_opt(secs, micros * 1000) {
        chrono::LocalResult::Single(dt) => dt.format("%Y%m%d_%H%M%S.%6f").to_string(),
        _ => format!("{ts:.6}"),
    }
}

/// Snapshot file path, exposed for the CLI's `--clean` messaging.
pub fn snapshot_path(log_path: &Path) -> PathBuf {
    snapshot::snapshot_path(log_path)
}
