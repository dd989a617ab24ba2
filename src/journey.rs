//! C5: the core matcher. For every input measurement, greedily extend a
//! journey forward under identifier and time-window constraints, spawning
//! sibling journeys at segmentation forks.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::graph::PointGraph;
use crate::ids::IdValue;
use crate::measurement::{Direction, Measurement};
use crate::paths::Paths;

/// Either a single disambiguated path id, or the set of still-plausible
/// path ids each paired with a cursor into that path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PathState {
    Candidates(Vec<(usize, usize)>),
    Resolved(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    pub uid: String,
    pub dir: Direction,
    pub glob: HashMap<String, String>,
    pub ts_in: f64,
    pub ts_out: Option<f64>,
    /// Ordered `(measurement_index, ts)` trajectory.
    pub set: Vec<(usize, f64)>,
    pub set_ids: HashMap<String, IdValue>,
    pub next_points: HashSet<String>,
    pub path: PathState,
    pub completed: bool,
}

/// Identifier-match predicate of the core algorithm. `l_local` is the
/// local-id context of the journey's last-bound measurement; `m_*` are the
/// candidate's ids; `j_glob` is the journey's frozen global-id snapshot.
///
/// Global ids are a strict filter: every key `m` carries that `j_glob` also
/// carries must agree, and a global key present in `m` but absent from
/// `j_glob` disqualifies the candidate. Local ids are compared per common
/// key: a single value against a single value must match exactly; a single
/// value against an aggregate must be a member of it (narrowing which
/// element of the aggregate "continues"); keys present on only one side
/// never disqualify.
fn match_ids(
    m_global: &HashMap<String, String>,
    m_local: &HashMap<String, IdValue>,
    j_glob: &HashMap<String, String>,
    l_local: &HashMap<String, IdValue>,
) -> Option<HashMap<String, String>> {
    for (k, v) in m_global {
        if j_glob.get(k) != Some(v) {
            return None;
        }
    }

    let mut matched = HashMap::new();
    for (k, m_val) in m_local {
        if let Some(l_val) = l_local.get(k) {
            let agreed = match (l_val, m_val) {
                (IdValue::Single(a), IdValue::Single(b)) => (a == b).then(|| a.clone()),
                (IdValue::Single(a), IdValue::Aggregate(bs)) => bs.contains(a).then(|| a.clone()),
                (IdValue::Aggregate(a_list), IdValue::Single(b)) => a_list.contains(b).then(|| b.clone()),
                (IdValue::Aggregate(a_list), IdValue::Aggregate(b_list)) => {
                    a_list.iter().find(|a| b_list.contains(a)).cloned()
                }
            };
            match agreed {
                Some(v) => {
                    matched.insert(k.clone(), v);
                }
                None => return None,
            }
        }
    }
    Some(matched)
}

fn initial_path_state(paths_for_dir: &[Vec<String>], first_point: &str) -> PathState {
    let mut candidates = Vec::new();
    for (id, path) in paths_for_dir.iter().enumerate() {
        if path.first().map(String::as_str) == Some(first_point) {
            let cursor = if path.len() > 1 { 1 } else { 0 };
            candidates.push((id, cursor));
        }
    }
    collapse_path_state(candidates)
}

fn prune_path_state(state: &PathState, paths_for_dir: &[Vec<String>], next_point: &str) -> PathState {
    // Once a single path id has been disambiguated there is nothing left to
    // prune against: every subsequent hop is checked implicitly by the
    // identifier-match and next_points constraints instead.
    let PathState::Candidates(candidates) = state else {
        return state.clone();
    };

    let mut kept = Vec::new();
    for &(id, cursor) in candidates {
        if paths_for_dir[id].get(cursor).map(String::as_str) == Some(next_point) {
            let new_cursor = if paths_for_dir[id].len() > cursor + 1 { cursor + 1 } else { cursor };
            kept.push((id, new_cursor));
        }
    }
    collapse_path_state(kept)
}

fn collapse_path_state(candidates: Vec<(usize, usize)>) -> PathState {
    if candidates.len() == 1 {
        PathState::Resolved(candidates[0].0)
    } else {
        PathState::Candidates(candidates)
    }
}

/// A fork sibling recorded during extension: the journey state as of just
/// before `q` was bound (so the sibling can be spawned from that shared
/// prefix), the measurement index of the sibling candidate, and its
/// already-computed matched ids.
struct ForkSeed {
    prefix: Journey,
    candidate: usize,
    matched: HashMap<String, String>,
}

/// Transient extension state for one in-flight journey (or fork sibling).
/// `root_ts` is always the *original* root's `ts_in`, reused by every
/// sibling spawned along the fork chain -- see the faithfulness note on
/// window reuse in the design ledger.
struct WorkItem {
    journey: Journey,
    last_local_ids: HashMap<String, IdValue>,
    root_ts: f64,
    resume: usize,
}

/// Reconstruct all journeys (completed and incomplete) from a canonicalized
/// measurement sequence.
pub fn reconstruct(measurements: &[Measurement], graph: &PointGraph, paths: &Paths, config: &Config) -> Vec<Journey> {
    let mut journeys = Vec::new();
    let mut next_uid: usize = 0;
    let mut consumed_root: HashSet<usize> = HashSet::new();
    // Multi-map: a measurement may legitimately be bound by several
    // journeys owing to concatenation, so it is never removed from the
    // candidate pool once bound.
    let mut point_added: HashMap<usize, Vec<String>> = HashMap::new();

    for p in 0..measurements.len() {
        if consumed_root.contains(&p) {
            continue;
        }
        let m = &measurements[p];
        if !graph.is_input(m.dir, &m.src_point) {
            continue;
        }
        consumed_root.insert(p);

        let uid = next_uid.to_string();
        next_uid += 1;

        let mut set_ids = m.local_ids.clone();
        let journey = Journey {
            uid,
            dir: m.dir,
            glob: m.global_ids.clone(),
            ts_in: m.ts,
            ts_out: None,
            set: vec![(p, m.ts)],
            set_ids: std::mem::take(&mut set_ids),
            next_points: graph.next_of(&m.src_point),
            path: initial_path_state(paths.for_dir(m.dir), &m.src_point),
            completed: false,
        };

        let seed = WorkItem {
            journey,
            last_local_ids: m.local_ids.clone(),
            root_ts: m.ts,
            resume: p + 1,
        };

        run_from_seed(seed, measurements, graph, paths, config, &mut journeys, &mut next_uid, &mut point_added);
    }

    journeys
}

#[allow(clippy::too_many_arguments)]
fn run_from_seed(
    seed: WorkItem,
    measurements: &[Measurement],
    graph: &PointGraph,
    paths: &Paths,
    config: &Config,
    journeys: &mut Vec<Journey>,
    next_uid: &mut usize,
    point_added: &mut HashMap<usize, Vec<String>>,
) {
    let mut queue: VecDeque<WorkItem> = VecDeque::new();
    queue.push_back(seed);

    while let Some(mut item) = queue.pop_front() {
        let window_end = item.root_ts + config.timing.journey_window_secs();
        let mut forks: Vec<ForkSeed> = Vec::new();
        let mut q = item.resume;

        while q < measurements.len() && measurements[q].ts <= window_end {
            let candidate = &measurements[q];
            if candidate.dir != item.journey.dir
                || graph.is_input(candidate.dir, &candidate.src_point)
                || !item.journey.next_points.contains(&candidate.src_point)
            {
                q += 1;
                continue;
            }

            let Some(matched) = match_ids(&candidate.global_ids, &candidate.local_ids, &item.journey.glob, &item.last_local_ids) else {
                q += 1;
                continue;
            };

            // Fork detection against the *pre-bind* state, before q itself
            // is committed: siblings and q are both compared against the
            // same last-bound context.
            let prefix_snapshot = item.journey.clone();
            let mut qp = q + 1;
            while qp < measurements.len() && measurements[qp].ts - candidate.ts <= config.timing.fork_window_secs() {
                let sib = &measurements[qp];
                if sib.dir == item.journey.dir && sib.src_point == candidate.src_point {
                    if let Some(sib_matched) = match_ids(&sib.global_ids, &sib.local_ids, &item.journey.glob, &item.last_local_ids) {
                        forks.push(ForkSeed {
                            prefix: prefix_snapshot.clone(),
                            candidate: qp,
                            matched: sib_matched,
                        });
                    }
                }
                qp += 1;
            }

            // Commit q into the primary journey.
            point_added.entry(q).or_default().push(item.journey.uid.clone());
            item.journey.set.push((q, candidate.ts));
            for (k, v) in matched {
                item.journey.set_ids.insert(k, IdValue::Single(v));
            }
            item.journey.path = prune_path_state(&item.journey.path, paths.for_dir(item.journey.dir), &candidate.src_point);
            item.last_local_ids = candidate.local_ids.clone();
            item.journey.next_points = graph.next_of(&candidate.src_point);

            if graph.is_output(candidate.dir, &candidate.dst_point) {
                item.journey.completed = true;
                item.journey.ts_out = Some(candidate.ts);
                break;
            }
            q += 1;
        }

        let completed = item.journey.completed;
        // The window bound is always measured from the *original* root,
        // reused unchanged by every sibling spawned along this fork chain.
        let root_ts = item.root_ts;
        journeys.push(item.journey);

        if completed {
            for fork in forks {
                let sib = &measurements[fork.candidate];
                let uid = next_uid.to_string();
                *next_uid += 1;

                let mut journey = fork.prefix;
                journey.uid = uid;
                journey.completed = false;
                journey.ts_out = None;
                point_added.entry(fork.candidate).or_default().push(journey.uid.clone());
                journey.set.push((fork.candidate, sib.ts));
                for (k, v) in fork.matched {
                    journey.set_ids.insert(k, IdValue::Single(v));
                }
                journey.path = prune_path_state(&journey.path, paths.for_dir(journey.dir), &sib.src_point);
                journey.next_points = graph.next_of(&sib.src_point);

                if graph.is_output(sib.dir, &sib.dst_point) {
                    journey.completed = true;
                    journey.ts_out = Some(sib.ts);
                }

                queue.push_back(WorkItem {
                    journey,
                    last_local_ids: sib.local_ids.clone(),
                    root_ts,
                    resume: fork.candidate + 1,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::PointGraph;
    use crate::ids::parse_id_blob;
    use crate::paths::enumerate_paths;

    fn measurement(ts: f64, dir: Direction, src: &str, dst: &str, blob: &str) -> Measurement {
        let parsed = parse_id_blob(blob);
        Measurement {
            ts,
            dir,
            src_point: src.to_string(),
            dst_point: dst.to_string(),
            properties: parsed.properties,
            global_ids: parsed.global_ids,
            local_ids: parsed.local_ids,
        }
    }

    fn build(measurements: &[Measurement]) -> (PointGraph, Paths) {
        let config = Config::default();
        let graph = PointGraph::build(measurements, &config);
        let paths = enumerate_paths(&graph, &config).unwrap();
        (graph, paths)
    }

    #[test]
    fn s1_single_hop_dl_journey() {
        let measurements = vec![
            measurement(0.000, Direction::Dl, "ip", "pdcp", ":rnti1:sn5"),
            measurement(0.001, Direction::Dl, "pdcp", "phy.out.proc", ":rnti1:sn5"),
        ];
        let (graph, paths) = build(&measurements);
        let journeys = reconstruct(&measurements, &graph, &paths, &Config::default());

        let completed: Vec<_> = journeys.iter().filter(|j| j.completed).collect();
        assert_eq!(completed.len(), 1);
        let j = completed[0];
        assert_eq!(j.ts_in, 0.000);
        assert_eq!(j.ts_out, Some(0.001));
        assert_eq!(j.set.len(), 2);
    }

    #[test]
    fn s2_global_id_mismatch_blocks_completion() {
        let measurements = vec![
            measurement(0.000, Direction::Dl, "ip", "pdcp", ":rnti1:sn5"),
            measurement(0.001, Direction::Dl, "pdcp", "phy.out.proc", ":rnti2:sn5"),
        ];
        let (graph, paths) = build(&measurements);
        let journeys = reconstruct(&measurements, &graph, &paths, &Config::default());
        assert!(journeys.iter().all(|j| !j.completed));
    }

    #[test]
    fn s3_segmentation_fork_produces_two_journeys_sharing_root_hop() {
        let measurements = vec![
            measurement(0.0000, Direction::Dl, "ip", "rlc", ":rnti1:sn5"),
            measurement(0.0005, Direction::Dl, "rlc", "mac", ":rnti1:sn5.so0"),
            measurement(0.0010, Direction::Dl, "rlc", "mac", ":rnti1:sn5.so1"),
            measurement(0.0015, Direction::Dl, "mac", "phy.out.proc", ":rnti1:so0"),
            measurement(0.0020, Direction::Dl, "mac", "phy.out.proc", ":rnti1:so1"),
        ];
        let (graph, paths) = build(&measurements);
        let journeys = reconstruct(&measurements, &graph, &paths, &Config::default());

        let completed: Vec<_> = journeys.iter().filter(|j| j.completed).collect();
        assert_eq!(completed.len(), 2);
        let uids: HashSet<_> = completed.iter().map(|j| j.uid.clone()).collect();
        assert_eq!(uids.len(), 2);

        // both journeys should include the shared root hop (measurement index 0)
        assert!(completed.iter().all(|j| j.set.iter().any(|&(idx, _)| idx == 0)));
    }

    #[test]
    fn s4_window_timeout_leaves_incomplete_journey() {
        let measurements = vec![
            measurement(0.000, Direction::Dl, "ip", "pdcp", ":rnti1:sn5"),
            measurement(0.060, Direction::Dl, "pdcp", "phy.out.proc", ":rnti1:sn5"),
        ];
        let (graph, paths) = build(&measurements);
        let journeys = reconstruct(&measurements, &graph, &paths, &Config::default());

        assert!(journeys.iter().all(|j| !j.completed));
        assert_eq!(journeys.len(), 1);
        assert_eq!(journeys[0].set.len(), 1);
    }

    #[test]
    fn s6_concatenation_narrows_aggregate_to_continuing_value() {
        // root carries sn5 as an aggregate with sn6 (as if it concatenates
        // two upstream packets), the next hop binds to the single value
        // that actually continues.
        let measurements = vec![
            measurement(0.000, Direction::Dl, "ip", "rlc", ":rnti1:sn5.sn6"),
            measurement(0.001, Direction::Dl, "rlc", "phy.out.proc", ":rnti1:sn5"),
        ];
        let (graph, paths) = build(&measurements);
        let journeys = reconstruct(&measurements, &graph, &paths, &Config::default());

        let completed: Vec<_> = journeys.iter().filter(|j| j.completed).collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(
            completed[0].set_ids.get("sn"),
            Some(&IdValue::Single("5".to_string()))
        );
    }

    #[test]
    fn match_ids_rejects_unknown_global_key() {
        let mut j_glob = HashMap::new();
        j_glob.insert("rnti".to_string(), "1".to_string());
        let mut m_global = HashMap::new();
        m_global.insert("cellid".to_string(), "7".to_string());

        let result = match_ids(&m_global, &HashMap::new(), &j_glob, &HashMap::new());
        assert!(result.is_none());
    }
}
