//! C2: turn raw trace lines into canonicalized, immutable `Measurement`s.

use std::collections::HashSet;

use crate::ids::parse_id_blob;
use crate::measurement::Measurement;
use crate::reader::RawRecord;

/// Radio context sentinel meaning "unassigned"; records whose `dst_point`
/// carries it describe packets that never reached a real radio-bearer
/// context and are dropped.
const SENTINEL: &str = "rnti65535";

/// Parse every raw record into a `Measurement`, dropping sentinel-filtered
/// records. Returns the frozen measurement sequence plus the set of global
/// id keys observed across the whole trace.
pub fn parse_records(raw: Vec<RawRecord>) -> (Vec<Measurement>, HashSet<String>) {
    let mut known_global_ids = HashSet::new();
    let mut measurements = Vec::with_capacity(raw.len());

    for record in raw {
        if record.dst_point.contains(SENTINEL) {
            log::debug!(
                "dropping sentinel record {}--{} ({})",
                record.src_point,
                record.dst_point,
                SENTINEL
            );
            continue;
        }

        let parsed = parse_id_blob(&record.id_blob);
        known_global_ids.extend(parsed.global_ids.keys().cloned());

        measurements.push(Measurement {
            ts: record.ts,
            dir: record.dir,
            src_point: record.src_point,
            dst_point: record.dst_point,
            properties: parsed.properties,
            global_ids: parsed.global_ids,
            local_ids: parsed.local_ids,
        });
    }

    (measurements, known_global_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Direction;

    fn raw(ts: f64, dir: Direction, src: &str, dst: &str, blob: &str) -> RawRecord {
        RawRecord {
            ts,
            dir,
            src_point: src.to_string(),
            dst_point: dst.to_string(),
            id_blob: blob.to_string(),
        }
    }

    #[test]
    fn drops_sentinel_records() {
        let input = vec![
            raw(0.0, Direction::Dl, "ip", "rlc", ":rnti1:sn5"),
            raw(0.001, Direction::Dl, "rlc", "rnti65535.mac", ":rnti1:sn5"),
        ];
        let (measurements, _) = parse_records(input);
        assert_eq!(measurements.len(), 1);
    }

    #[test]
    fn tracks_known_global_ids() {
        let input = vec![raw(0.0, Direction::Dl, "ip", "rlc", ":rnti1:sn5")];
        let (_, known) = parse_records(input);
        assert!(known.contains("rnti"));
    }
}
