use std::path::PathBuf;

use clap::Parser;
use latseq::config::Config;
use latseq::engine::Engine;
use latseq::error::LatseqError;

/// Reconstruct end-to-end packet journeys from a latency-sequence trace.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the input `.lseq` trace file.
    #[arg(short = 'l', long = "log")]
    log: PathBuf,

    /// Optional TOML config file overriding reference point/timing defaults.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Discard any prior snapshot before running, forcing a fresh parse/reconstruct.
    #[arg(short = 'C', long = "clean")]
    clean: bool,

    /// Print the canonicalized measurement stream.
    #[arg(short = 'i', long = "inputs")]
    inputs: bool,

    /// Print the flat, indexed journey view (`.lseqj` line format).
    #[arg(short = 'o', long = "out_journeys")]
    out_journeys: bool,

    /// Print one JSON object per completed journey.
    #[arg(short = 'j', long = "journeys")]
    journeys: bool,

    /// Print one JSON object per point, including per-uid durations.
    #[arg(short = 'p', long = "points")]
    points: bool,

    /// Print the enumerated paths as a single JSON object `{D:[...], U:[...]}`.
    #[arg(short = 'r', long = "paths", visible_alias = "routes")]
    paths: bool,

    /// Print one CSV row per completed journey.
    #[arg(short = 'x', long = "csv")]
    csv: bool,
}

impl Args {
    fn selected_modes(&self) -> usize {
        [self.inputs, self.out_journeys, self.journeys, self.points, self.paths, self.csv]
            .iter()
            .filter(|&&selected| selected)
            .count()
    }
}

fn main() {
    pretty_env_logger::init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), LatseqError> {
    let args = Args::parse();

    if args.selected_modes() != 1 {
        return Err(LatseqError::Usage(
            "exactly one of --inputs, --out_journeys, --journeys, --points, --paths, --csv is required".to_string(),
        ));
    }

    let config = Config::load(args.config.as_deref())?;
    let engine = Engine::load_or_build(&args.log, &config, args.clean)?;

    if args.inputs {
        for line in engine.inputs_lines() {
            println!("{line}");
        }
    } else if args.out_journeys {
        for line in engine.out_journeys_lines() {
            println!("{line}");
        }
    } else if args.journeys {
        for value in engine.journeys_json() {
            println!("{value}");
        }
    } else if args.points {
        for value in engine.points_json() {
            println!("{value}");
        }
    } else if args.paths {
        println!("{}", engine.paths_json());
    } else if args.csv {
        let (header, rows) = engine.csv_rows();
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        writer.write_record(&header).ok();
        for row in rows {
            writer.write_record(&row).ok();
        }
        writer.flush().ok();
    }

    log::info!("{} orphaned measurement(s)", engine.orphans());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_output_modes_is_a_usage_error() {
        let args = Args::parse_from(["latseq", "--log", "trace.lseq"]);
        assert_eq!(args.selected_modes(), 0);
    }

    #[test]
    fn multiple_output_modes_is_a_usage_error() {
        let args = Args::parse_from(["latseq", "--log", "trace.lseq", "--inputs", "--journeys"]);
        assert_eq!(args.selected_modes(), 2);
    }

    #[test]
    fn single_output_mode_is_accepted() {
        let args = Args::parse_from(["latseq", "--log", "trace.lseq", "--csv"]);
        assert_eq!(args.selected_modes(), 1);
    }
}
