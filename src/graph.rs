//! C3: the directed graph of observed checkpoints ("points").

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::measurement::{Direction, Measurement};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Point {
    pub next: HashSet<String>,
    pub count: u64,
    pub dir: HashSet<Direction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointGraph {
    points: HashMap<String, Point>,
    dl_in: HashSet<String>,
    dl_out: HashSet<String>,
    ul_in: HashSet<String>,
    ul_out: HashSet<String>,
}

/// All dotted prefixes of a name, e.g. `rlc.seg.um` -> `[rlc, rlc.seg, rlc.seg.um]`.
fn dotted_prefixes(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut acc = String::new();
    for part in name.split('.') {
        if !acc.is_empty() {
            acc.push('.');
        }
        acc.push_str(part);
        out.push(acc.clone());
    }
    out
}

impl PointGraph {
    pub fn build(measurements: &[Measurement], config: &Config) -> PointGraph {
        let mut points: HashMap<String, Point> = HashMap::new();

        for m in measurements {
            points.entry(m.src_point.clone()).or_default();
            points.entry(m.dst_point.clone()).or_default();

            let src = points.get_mut(&m.src_point).unwrap();
            for prefix in dotted_prefixes(&m.dst_point) {
                src.next.insert(prefix);
            }
            src.dir.insert(m.dir);
            src.count += 1;
        }

        PointGraph {
            points,
            dl_in: config.points.dl_in.iter().cloned().collect(),
            dl_out: config.points.dl_out.iter().cloned().collect(),
            ul_in: config.points.ul_in.iter().cloned().collect(),
            ul_out: config.points.ul_out.iter().cloned().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Point> {
        self.points.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.points.keys()
    }

    pub fn next_of(&self, name: &str) -> HashSet<String> {
        self.points.get(name).map(|p| p.next.clone()).unwrap_or_default()
    }

    pub fn is_input(&self, dir: Direction, name: &str) -> bool {
        match dir {
            Direction::Dl => self.dl_in.contains(name),
            Direction::Ul => self.ul_in.contains(name),
        }
    }

    pub fn is_output(&self, dir: Direction, name: &str) -> bool {
        match dir {
            Direction::Dl => self.dl_out.contains(name),
            Direction::Ul => self.ul_out.contains(name),
        }
    }

    pub fn inputs(&self, dir: Direction) -> &HashSet<String> {
        match dir {
            Direction::Dl => &self.dl_in,
            Direction::Ul => &self.ul_in,
        }
    }

    pub fn outputs(&self, dir: Direction) -> &HashSet<String> {
        match dir {
            Direction::Dl => &self.dl_out,
            Direction::Ul => &self.ul_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Direction;
    use std::collections::HashMap as Map;

    fn m(dir: Direction, src: &str, dst: &str) -> Measurement {
        Measurement {
            ts: 0.0,
            dir,
            src_point: src.to_string(),
            dst_point: dst.to_string(),
            properties: Map::new(),
            global_ids: Map::new(),
            local_ids: Map::new(),
        }
    }

    #[test]
    fn dst_prefixes_added_to_src_next() {
        let measurements = vec![m(Direction::Dl, "rlc", "mac.seg.um")];
        let graph = PointGraph::build(&measurements, &Config::default());
        let next = graph.next_of("rlc");
        assert!(next.contains("mac"));
        assert!(next.contains("mac.seg"));
        assert!(next.contains("mac.seg.um"));
    }

    #[test]
    fn count_and_dir_tracked() {
        let measurements = vec![
            m(Direction::Dl, "ip", "rlc"),
            m(Direction::Dl, "ip", "rlc"),
        ];
        let graph = PointGraph::build(&measurements, &Config::default());
        let ip = graph.get("ip").unwrap();
        assert_eq!(ip.count, 2);
        assert!(ip.dir.contains(&Direction::Dl));
    }
}
