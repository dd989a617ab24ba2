//! The canonicalized measurement record that every later stage operates on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::ids::IdValue;

/// Downlink (infrastructure -> device) or Uplink (device -> infrastructure).
/// The point graph and path set are partitioned by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum Direction {
    #[strum(serialize = "D")]
    Dl,
    #[strum(serialize = "U")]
    Ul,
}

/// One canonicalized crossing of a packet over a named checkpoint pair,
/// immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub ts: f64,
    pub dir: Direction,
    pub src_point: String,
    pub dst_point: String,
    pub properties: HashMap<String, String>,
    pub global_ids: HashMap<String, String>,
    pub local_ids: HashMap<String, IdValue>,
}

impl Measurement {
    pub fn segment(&self) -> String {
        format!("{}--{}", self.src_point, self.dst_point)
    }
}
