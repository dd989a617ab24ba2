//! C6: post-process completed journeys into a flat per-measurement view and
//! per-point hop durations.

use std::collections::{HashMap, HashSet};

use crate::ids::IdValue;
use crate::journey::Journey;
use crate::measurement::{Direction, Measurement};

/// One row of the flat, indexed view: a single measurement, annotated with
/// every journey uid that bound it (more than one iff it was consumed as a
/// shared prefix by segmentation forks or as a concatenation point).
#[derive(Debug, Clone)]
pub struct FlatRecord {
    pub ts: f64,
    pub dir: Direction,
    pub src_point: String,
    pub dst_point: String,
    pub properties: HashMap<String, String>,
    pub global_ids: HashMap<String, String>,
    pub local_ids: HashMap<String, IdValue>,
    pub uids: Vec<String>,
}

/// Per-point hop durations, keyed by point name then by journey uid.
pub type Durations = HashMap<String, HashMap<String, f64>>;

pub struct IndexResult {
    pub flat: Vec<FlatRecord>,
    pub durations: Durations,
    /// Measurements not included in any *completed* journey (§4.6).
    pub orphans: usize,
}

pub fn build(measurements: &[Measurement], journeys: &[Journey]) -> IndexResult {
    let mut by_index: HashMap<usize, FlatRecord> = HashMap::new();
    let mut durations: Durations = HashMap::new();
    let mut consumed: HashSet<usize> = HashSet::new();

    for journey in journeys.iter().filter(|j| j.completed) {
        let mut prev_ts: Option<f64> = None;
        for &(idx, ts) in &journey.set {
            consumed.insert(idx);
            let m = &measurements[idx];

            by_index
                .entry(idx)
                .or_insert_with(|| FlatRecord {
                    ts,
                    dir: m.dir,
                    src_point: m.src_point.clone(),
                    dst_point: m.dst_point.clone(),
                    properties: m.properties.clone(),
                    global_ids: m.global_ids.clone(),
                    local_ids: m.local_ids.clone(),
                    uids: Vec::new(),
                })
                .uids
                .push(journey.uid.clone());

            match prev_ts {
                None => {
                    durations
                        .entry(m.src_point.clone())
                        .or_default()
                        .insert(journey.uid.clone(), 0.0);
                }
                Some(prev) => {
                    durations
                        .entry(m.src_point.clone())
                        .or_default()
                        .insert(journey.uid.clone(), ts - prev);
                }
            }
            prev_ts = Some(ts);
        }
    }

    let mut flat: Vec<FlatRecord> = by_index.into_values().collect();
    flat.sort_by(|a, b| a.ts.partial_cmp(&b.ts).unwrap_or(std::cmp::Ordering::Equal));

    IndexResult {
        flat,
        durations,
        orphans: measurements.len() - consumed.len(),
    }
}

/// The total accounting from property 8: every journey (completed or not)
/// contributes one entry per measurement it bound; plus one for every
/// measurement bound by no journey at all.
pub fn total_accounting(measurements: &[Measurement], journeys: &[Journey]) -> usize {
    let bound: usize = journeys.iter().map(|j| j.set.len()).sum();
    let touched: HashSet<usize> = journeys.iter().flat_map(|j| j.set.iter().map(|&(i, _)| i)).collect();
    let untouched = measurements.len() - touched.len();
    bound + untouched
}
