//! C4: enumerate simple source-to-sink paths through the point graph, per direction.

use serde::{Deserialize, Serialize};

use crate::error::LatseqError;
use crate::graph::PointGraph;
use crate::measurement::Direction;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Paths {
    pub dl: Vec<Vec<String>>,
    pub ul: Vec<Vec<String>>,
}

impl Paths {
    pub fn for_dir(&self, dir: Direction) -> &[Vec<String>] {
        match dir {
            Direction::Dl => &self.dl,
            Direction::Ul => &self.ul,
        }
    }
}

/// Depth-first enumeration of every simple (no repeated node) path from an
/// input point to an output point. A successor name that is not itself a
/// node in the graph is a dead end (it never contributes a path). Paths are
/// frozen in discovery order (inputs sorted, then DFS over sorted
/// successors) so their indices can serve as stable path ids.
fn enumerate_direction(graph: &PointGraph, dir: Direction) -> Vec<Vec<String>> {
    let mut inputs: Vec<&String> = graph.inputs(dir).iter().collect();
    inputs.sort();
    let outputs = graph.outputs(dir);

    let mut paths = Vec::new();
    for input in inputs {
        let mut visited = vec![input.clone()];
        dfs(graph, input, outputs, &mut visited, &mut paths);
    }
    paths
}

fn dfs(
    graph: &PointGraph,
    current: &str,
    outputs: &std::collections::HashSet<String>,
    visited: &mut Vec<String>,
    paths: &mut Vec<Vec<String>>,
) {
    if outputs.contains(current) {
        paths.push(visited.clone());
    }

    let Some(point) = graph.get(current) else {
        return;
    };

    let mut successors: Vec<&String> = point.next.iter().collect();
    successors.sort();
    for next in successors {
        if visited.contains(next) {
            continue;
        }
        if graph.get(next).is_none() && !outputs.contains(next) {
            continue;
        }
        visited.push(next.clone());
        dfs(graph, next, outputs, visited, paths);
        visited.pop();
    }
}

/// Enumerate paths for both directions. Fatal if neither direction yields
/// any path; a warning if exactly one direction is pathless.
pub fn enumerate_paths(graph: &PointGraph, _config: &crate::config::Config) -> Result<Paths, LatseqError> {
    let dl = enumerate_direction(graph, Direction::Dl);
    let ul = enumerate_direction(graph, Direction::Ul);

    if dl.is_empty() && ul.is_empty() {
        return Err(LatseqError::NoPathsEitherDirection);
    }
    if dl.is_empty() {
        log::warn!("no feasible downlink paths found for the configured input/output points");
    }
    if ul.is_empty() {
        log::warn!("no feasible uplink paths found for the configured input/output points");
    }

    Ok(Paths { dl, ul })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::measurement::Measurement;
    use std::collections::HashMap;

    fn m(dir: Direction, src: &str, dst: &str) -> Measurement {
        Measurement {
            ts: 0.0,
            dir,
            src_point: src.to_string(),
            dst_point: dst.to_string(),
            properties: HashMap::new(),
            global_ids: HashMap::new(),
            local_ids: HashMap::new(),
        }
    }

    #[test]
    fn enumerates_linear_path() {
        let measurements = vec![
            m(Direction::Dl, "ip", "rlc"),
            m(Direction::Dl, "rlc", "phy.out.proc"),
        ];
        let graph = PointGraph::build(&measurements, &Config::default());
        let paths = enumerate_paths(&graph, &Config::default()).unwrap();
        assert_eq!(paths.dl, vec![vec!["ip".to_string(), "rlc".to_string(), "phy.out.proc".to_string()]]);
    }

    #[test]
    fn no_paths_in_either_direction_is_fatal() {
        let measurements = vec![m(Direction::Dl, "foo", "bar")];
        let graph = PointGraph::build(&measurements, &Config::default());
        assert!(matches!(
            enumerate_paths(&graph, &Config::default()),
            Err(LatseqError::NoPathsEitherDirection)
        ));
    }
}
