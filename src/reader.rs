//! C1: read a `.lseq` trace file into raw, time-ordered records.

use std::path::Path;
use std::str::FromStr;

use crate::error::LatseqError;
use crate::measurement::Direction;

/// One line of the trace, split but not yet canonicalized into a `Measurement`.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub ts: f64,
    pub dir: Direction,
    pub src_point: String,
    pub dst_point: String,
    pub id_blob: String,
}

/// Read and parse a `.lseq` trace. Lines starting with `#` and blank lines
/// are skipped; a data line must have the shape
/// `TIMESTAMP DIRECTION SRC--DST IDBLOB`. Lines that don't parse are logged
/// at `warn` and dropped. The result is globally sorted by timestamp.
pub fn read_trace(path: &Path) -> Result<Vec<RawRecord>, LatseqError> {
    let text = std::fs::read_to_string(path).map_err(|source| LatseqError::TraceUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records: Vec<RawRecord> = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line) {
            Some(record) => records.push(record),
            None => log::warn!("{}:{}: malformed trace line, skipping: {line:?}", path.display(), lineno + 1),
        }
    }

    records.sort_by(|a, b| a.ts.partial_cmp(&b.ts).unwrap_or(std::cmp::Ordering::Equal));
    log::info!("read {} records from {}", records.len(), path.display());
    Ok(records)
}

fn parse_line(line: &str) -> Option<RawRecord> {
    let mut fields = line.split_whitespace();
    let ts: f64 = fields.next()?.parse().ok()?;
    let dir_field = fields.next()?;
    let segment = fields.next()?;
    let id_blob = fields.next()?.to_string();

    let dir = Direction::from_str(dir_field).ok()?;
    let (src_point, dst_point) = segment.split_once("--")?;
    if src_point.is_empty() || dst_point.is_empty() {
        return None;
    }

    Some(RawRecord {
        ts,
        dir,
        src_point: src_point.to_string(),
        dst_point: dst_point.to_string(),
        id_blob,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_and_sorts_by_timestamp() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file, "0.002 D b--c :rnti1:").unwrap();
        writeln!(file, "0.001 D a--b :rnti1:").unwrap();
        writeln!(file).unwrap();

        let records = read_trace(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].src_point, "a");
        assert_eq!(records[1].src_point, "b");
    }

    #[test]
    fn skips_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a valid line").unwrap();
        writeln!(file, "0.001 X a--b :rnti1:").unwrap(); // bad direction
        writeln!(file, "0.002 D a--b").unwrap(); // missing id blob field
        writeln!(file, "0.001 D a--b :rnti1:").unwrap();

        let records = read_trace(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn missing_file_is_fatal() {
        let path = Path::new("/nonexistent/path/to/trace.lseq");
        assert!(matches!(read_trace(path), Err(LatseqError::TraceUnreadable { .. })));
    }
}
