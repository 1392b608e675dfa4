//! CLI binary for the MMA converter
//!
//! This provides the command-line interface for the mmaconv library.

use anyhow::{Context, Result};
use chrono::Duration;
use clap::{value_parser, Arg, ArgAction, Command};
use glob::glob;
use log::{debug, info, warn, LevelFilter};
use mmaconv::{
    calibrate_file, check_csv, convert_file, default_max_step, should_skip_capture,
    summary_to_json, CalibrationTable, CaptureName, CaptureSummary, ConvertOptions, Exclude,
    ExportOptions, Layout, MMAError, MeasurementWriter, Output, RawWriter, ReassemblyLimits,
    Schedule, SummaryTotals, TimingMode, DEFAULT_TABLE,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn long_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        format!(
            "{} ({} {})",
            env!("CARGO_PKG_VERSION"),
            option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
            option_env!("VERGEN_GIT_COMMIT_DATE").unwrap_or("")
        )
        .trim_end()
        .to_string()
    })
}

fn cli() -> Command {
    Command::new("mmaconv")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version())
        .about("Decode MMA accelerometer capture files and export calibrated measurements.")
        .arg(
            Arg::new("inputs")
                .help("Capture files, directories or glob patterns")
                .required(true)
                .num_args(1..)
                .index(1),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output and detailed decoding information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("table")
                .long("table")
                .short('c')
                .help("TOML calibration table overriding the reference coefficients")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("layout")
                .long("layout")
                .help("Record layout: a (sequence prefix) or b (sequence in field 0)")
                .value_name("LAYOUT")
                .value_parser(["a", "b", "legacy"]),
        )
        .arg(
            Arg::new("adjust")
                .long("adjust")
                .short('j')
                .help("Spread sub-samples over time using the table frequency")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .short('t')
                .help("Time between two sub-samples, e.g. 500us, 1ms (implies --adjust)")
                .value_name("DURATION")
                .value_parser(parse_interval),
        )
        .arg(
            Arg::new("flat")
                .long("flat")
                .short('f')
                .help("One row per record instead of one per sub-sample")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("all")
                .long("all")
                .short('a')
                .help("Write micro-ampere, scale and offset columns")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("iso")
                .long("iso")
                .short('i')
                .help("Format time as ISO 8601 instead of day-of-year")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('w')
                .help("Output file (default: stdout); parent directories are created")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("gzip")
                .long("gzip")
                .short('z')
                .help("Compress the output file")
                .requires("output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .short('o')
                .help("Order files by the acquisition time in their name")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("recurse")
                .long("recurse")
                .short('r')
                .help("Descend into sub-directories")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Process files without writing any output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("keep-duplicates")
                .long("keep-duplicates")
                .help("Keep byte-identical records")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .short('x')
                .help("Comma separated name suffixes of files to skip")
                .value_name("LIST")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("schedule")
                .long("schedule")
                .help("TOML file of [[range]] acquisition windows to keep")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("probe-size")
                .long("probe-size")
                .help("Buffered record count at which sequence jumps are checked (0 disables)")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-jump")
                .long("max-jump")
                .help("Largest sequence distance accepted by the jump check")
                .value_name("N")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .help("Dump decoded records without calibration")
                .conflicts_with_all(["summary", "check"])
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("summary")
                .long("summary")
                .short('s')
                .help("Print per-file statistics and totals instead of data")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Write the summary as JSON")
                .requires("summary")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Inputs are exported CSV files; report time and sequence discontinuities")
                .conflicts_with("summary")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-step")
                .long("max-step")
                .short('d')
                .help("Largest time step between rows accepted by --check (default: 750us)")
                .value_name("DURATION")
                .requires("check")
                .value_parser(parse_interval),
        )
}

/// Parse `<number><unit>` with unit one of ns, us, µs, ms, s
fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| format!("missing unit in '{s}' (ns, us, ms, s)"))?;
    let (number, unit) = s.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid number in '{s}'"))?;
    let scale = match unit {
        "ns" => 1.0,
        "us" | "µs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        _ => return Err(format!("unknown unit '{unit}' (ns, us, ms, s)")),
    };
    let nanos = (value * scale).round() as i64;
    if nanos <= 0 {
        return Err(format!("interval must be positive: '{s}'"));
    }
    Ok(Duration::nanoseconds(nanos))
}

fn walk_dir(dir: &Path, recurse: bool, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            if recurse {
                walk_dir(&path, recurse, out)?;
            }
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn collect_files(patterns: &[&String], recurse: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for pattern in patterns {
        debug!("Processing pattern: {pattern}");

        let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
            match glob(pattern) {
                Ok(iter) => match iter.collect::<Result<Vec<_>, _>>() {
                    Ok(paths) => {
                        debug!("Glob pattern '{pattern}' matched {} paths", paths.len());
                        paths
                    }
                    Err(e) => {
                        eprintln!("Error expanding glob pattern '{pattern}': {e}");
                        continue;
                    }
                },
                Err(e) => {
                    eprintln!("Invalid glob pattern '{pattern}': {e}");
                    continue;
                }
            }
        } else {
            vec![PathBuf::from(pattern.as_str())]
        };

        for path in paths {
            if path.is_dir() {
                if let Err(e) = walk_dir(&path, recurse, &mut files) {
                    eprintln!("Warning: cannot read directory {}: {e}", path.display());
                }
            } else if path.exists() {
                files.push(path);
            } else {
                eprintln!("Warning: File does not exist: {}", path.display());
            }
        }
    }
    files
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Calibrated,
    Raw,
    Summary { json: bool },
    Check { max_step: Duration },
}

struct Settings {
    table: CalibrationTable,
    options: ConvertOptions,
    timing: TimingMode,
    export: ExportOptions,
    schedule: Schedule,
}

impl Settings {
    fn keep(&self, path: &Path, acquired: chrono::DateTime<chrono::Utc>) -> bool {
        let (skip, reason) =
            should_skip_capture(path, Some(acquired), &self.schedule, &Exclude::default());
        if skip {
            info!("Skipping {}: {reason}", path.display());
        }
        !skip
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let debug = matches.get_flag("debug");
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let mut table = match matches.get_one::<PathBuf>("table") {
        Some(path) => CalibrationTable::from_toml_file(path)
            .with_context(|| format!("Failed to load calibration table {}", path.display()))?,
        None => DEFAULT_TABLE,
    };
    if let Some(layout) = matches.get_one::<String>("layout") {
        table.layout = layout
            .parse::<Layout>()
            .map_err(anyhow::Error::msg)
            .context("Invalid --layout")?;
    }

    let mut limits = ReassemblyLimits::default();
    if let Some(&probe) = matches.get_one::<usize>("probe-size") {
        limits.probe_size = probe;
    }
    if let Some(&window) = matches.get_one::<u32>("max-jump") {
        limits.window = window;
    }
    let options = ConvertOptions {
        layout: table.layout,
        keep_duplicates: matches.get_flag("keep-duplicates"),
        limits,
    };

    let timing = match matches.get_one::<Duration>("interval") {
        Some(&delta) => TimingMode::Interval(delta),
        None if matches.get_flag("adjust") => TimingMode::Nominal,
        None => TimingMode::Fixed,
    };

    let export = ExportOptions {
        flat: matches.get_flag("flat"),
        all_fields: matches.get_flag("all"),
        iso: matches.get_flag("iso"),
    };

    let schedule = match matches.get_one::<PathBuf>("schedule") {
        Some(path) => Schedule::from_toml_file(path)
            .with_context(|| format!("Failed to load schedule {}", path.display()))?,
        None => Schedule::default(),
    };

    let mut exclude = Exclude::default();
    if let Some(lists) = matches.get_many::<String>("exclude") {
        for list in lists {
            exclude.extend_from_list(list);
        }
    }

    let mode = if matches.get_flag("check") {
        Mode::Check {
            max_step: matches
                .get_one::<Duration>("max-step")
                .copied()
                .unwrap_or_else(default_max_step),
        }
    } else if matches.get_flag("raw") {
        Mode::Raw
    } else if matches.get_flag("summary") {
        Mode::Summary {
            json: matches.get_flag("json"),
        }
    } else {
        Mode::Calibrated
    };

    let patterns: Vec<&String> = matches
        .get_many::<String>("inputs")
        .map(|v| v.collect())
        .unwrap_or_default();
    debug!("Input patterns: {patterns:?}");

    let mut files = collect_files(&patterns, matches.get_flag("recurse"));
    if matches.get_flag("order") {
        files.sort_by(|a, b| CaptureName::compare_paths(a, b));
    }
    files.retain(|path| {
        let (skip, reason) = should_skip_capture(path, None, &schedule, &exclude);
        if skip {
            info!("Skipping {}: {reason}", path.display());
        }
        !skip
    });
    debug!("Found {} files to process", files.len());

    if files.is_empty() {
        eprintln!("Error: No capture files found to process.");
        eprintln!("Input patterns were: {patterns:?}");
        std::process::exit(1);
    }

    let output = if matches.get_flag("quiet") {
        Output::sink()
    } else {
        let path = matches.get_one::<PathBuf>("output");
        Output::open(path.map(PathBuf::as_path), matches.get_flag("gzip"))
            .context("Failed to open output")?
    };

    let settings = Settings {
        table,
        options,
        timing,
        export,
        schedule,
    };

    let processed = match mode {
        Mode::Calibrated => run_calibrated(&files, &settings, output)?,
        Mode::Raw => run_raw(&files, &settings, output)?,
        Mode::Summary { json } => run_summary(&files, &settings, output, json)?,
        Mode::Check { max_step } => run_check(&files, output, max_step)?,
    };

    if processed == 0 {
        eprintln!(
            "Error: No files were successfully processed out of {} files found.",
            files.len()
        );
        eprintln!("This could be due to:");
        eprintln!("  - Files not being MMA captures (bad magic)");
        eprintln!("  - Files shorter than the capture header");
        eprintln!("  - Every file falling outside the schedule");
        eprintln!("Use --debug flag for more detailed error information.");
        std::process::exit(1);
    }

    Ok(())
}

fn report_failure(path: &Path, err: &dyn std::fmt::Display) {
    eprintln!("Error processing {}: {err}", path.display());
    warn!("Continuing with next file...");
}

fn run_calibrated(files: &[PathBuf], settings: &Settings, output: Output) -> Result<usize> {
    let mut writer = MeasurementWriter::new(output, settings.export);
    writer.write_header().context("Failed to write CSV header")?;

    let mut processed = 0;
    for path in files {
        match calibrate_file(path, &settings.table, &settings.options, settings.timing) {
            Ok(capture) => {
                if !settings.keep(path, capture.conversion.acquired) {
                    continue;
                }
                writer
                    .write_all(&capture.measurements)
                    .with_context(|| format!("Failed to export {}", path.display()))?;
                debug!(
                    "{}: {} measurements exported",
                    path.display(),
                    capture.measurements.len()
                );
                processed += 1;
            }
            Err(e) => report_failure(path, &e),
        }
    }

    info!("{} rows written", writer.rows());
    writer.into_inner()?.finish().context("Failed to finish output")?;
    Ok(processed)
}

fn run_raw(files: &[PathBuf], settings: &Settings, output: Output) -> Result<usize> {
    let mut writer = RawWriter::new(output, settings.options.layout);
    writer.write_header().context("Failed to write CSV header")?;

    let mut processed = 0;
    let mut records = 0;
    for path in files {
        match convert_file(path, &settings.options) {
            Ok(conversion) => {
                if !settings.keep(path, conversion.acquired) {
                    continue;
                }
                records += writer
                    .write_records(&conversion.records)
                    .with_context(|| format!("Failed to export {}", path.display()))?;
                processed += 1;
            }
            Err(e) => report_failure(path, &e),
        }
    }

    info!("{records} records written");
    writer.into_inner()?.finish().context("Failed to finish output")?;
    Ok(processed)
}

fn run_summary(
    files: &[PathBuf],
    settings: &Settings,
    mut output: Output,
    json: bool,
) -> Result<usize> {
    let mut summaries = Vec::new();
    for path in files {
        match convert_file(path, &settings.options) {
            Ok(conversion) => {
                if settings.keep(path, conversion.acquired) {
                    summaries.push(CaptureSummary::from_conversion(path, &conversion));
                }
            }
            Err(e) => report_failure(path, &e),
        }
    }

    let totals = SummaryTotals::from_summaries(&summaries);
    if json {
        writeln!(output, "{}", summary_to_json(&summaries, &totals)?)?;
    } else {
        for summary in &summaries {
            writeln!(output, "{summary}")?;
        }
        if !summaries.is_empty() {
            writeln!(output, "---")?;
        }
        write!(output, "{totals}")?;
    }
    output.finish()?;
    Ok(summaries.len())
}

fn run_check(files: &[PathBuf], mut output: Output, max_step: Duration) -> Result<usize> {
    let mut processed = 0;
    for path in files {
        let issues = std::fs::File::open(path)
            .map_err(MMAError::from)
            .and_then(|file| check_csv(file, max_step));
        match issues {
            Ok(issues) => {
                if files.len() > 1 {
                    writeln!(output, "# {}", path.display())?;
                }
                for issue in &issues {
                    writeln!(output, "{issue}")?;
                }
                info!("{}: {} discontinuities", path.display(), issues.len());
                processed += 1;
            }
            Err(e) => report_failure(path, &e),
        }
    }
    output.finish()?;
    Ok(processed)
}
