//! Reference point declarations and tunable timing constants.
//!
//! `Config::default()` matches the reference values hardcoded in the
//! original tool; an optional on-disk TOML file can override any subset of
//! them, mirroring the teacher crate's pattern of externalizing scenario
//! parameters (`ExperimentDescription`) instead of hardcoding them.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::LatseqError;

#[derive(Debug, Clone)]
pub struct PointsConfig {
    pub dl_in: Vec<String>,
    pub dl_out: Vec<String>,
    pub ul_in: Vec<String>,
    pub ul_out: Vec<String>,
}

impl Default for PointsConfig {
    fn default() -> Self {
        PointsConfig {
            dl_in: vec!["ip".to_string(), "rlc.tx.am".to_string()],
            dl_out: vec!["phy.out.proc".to_string()],
            ul_in: vec!["phy.in.proc".to_string()],
            ul_out: vec!["ip".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimingConfig {
    pub journey_window_ms: f64,
    pub fork_window_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            journey_window_ms: 50.0,
            fork_window_ms: 2.0,
        }
    }
}

impl TimingConfig {
    pub fn journey_window_secs(&self) -> f64 {
        self.journey_window_ms / 1000.0
    }

    pub fn fork_window_secs(&self) -> f64 {
        self.fork_window_ms / 1000.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub points: PointsConfig,
    pub timing: TimingConfig,
}

/// Mirrors `Config`, but every field is optional so a TOML file only needs
/// to specify the overrides it cares about.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    points: Option<RawPoints>,
    timing: Option<RawTiming>,
}

#[derive(Debug, Deserialize, Default)]
struct RawPoints {
    dl_in: Option<Vec<String>>,
    dl_out: Option<Vec<String>>,
    ul_in: Option<Vec<String>>,
    ul_out: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct RawTiming {
    journey_window_ms: Option<f64>,
    fork_window_ms: Option<f64>,
}

impl Config {
    /// Load a config file if `path` is given, merging any present fields
    /// over the defaults. A missing path falls back to `Config::default()`
    /// silently; a malformed file is a fatal `LatseqError::ConfigMalformed`.
    pub fn load(path: Option<&Path>) -> Result<Config, LatseqError> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                return Err(LatseqError::ConfigUnreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let raw: RawConfig = toml::from_str(&text).map_err(|source| LatseqError::ConfigMalformed {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Config::default();
        if let Some(p) = raw.points {
            if let Some(v) = p.dl_in {
                config.points.dl_in = v;
            }
            if let Some(v) = p.dl_out {
                config.points.dl_out = v;
            }
            if let Some(v) = p.ul_in {
                config.points.ul_in = v;
            }
            if let Some(v) = p.ul_out {
                config.points.ul_out = v;
            }
        }
        if let Some(t) = raw.timing {
            if let Some(v) = t.journey_window_ms {
                config.timing.journey_window_ms = v;
            }
            if let Some(v) = t.fork_window_ms {
                config.timing.fork_window_ms = v;
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_values() {
        let config = Config::default();
        assert_eq!(config.points.dl_in, vec!["ip", "rlc.tx.am"]);
        assert_eq!(config.points.dl_out, vec!["phy.out.proc"]);
        assert_eq!(config.points.ul_in, vec!["phy.in.proc"]);
        assert_eq!(config.points.ul_out, vec!["ip"]);
        assert_eq!(config.timing.journey_window_ms, 50.0);
        assert_eq!(config.timing.fork_window_ms, 2.0);
    }

    #[test]
    fn missing_path_falls_back_to_default() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.points.dl_in, PointsConfig::default().dl_in);
    }

    #[test]
    fn partial_override_merges_with_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latseq.toml");
        fs::write(&path, "[timing]\njourney_window_ms = 100.0\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.timing.journey_window_ms, 100.0);
        assert_eq!(config.timing.fork_window_ms, 2.0);
        assert_eq!(config.points.dl_in, PointsConfig::default().dl_in);
    }

    #[test]
    fn malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latseq.toml");
        fs::write(&path, "not valid toml [[[").unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(LatseqError::ConfigMalformed { .. })
        ));
    }
}
