//! # cxrs_framer_cli
//!
//! Part of the cxrs_framer crate family.
//!
//! This is the application to build CXRS shot datasets from the command line.
//!
//! ## Use
//!
//! To process shots 30420 to 30430 from a local signal archive
//!
//! ```bash
//! cxrs_framer_cli 30420 30430 --source-path /data/cxrs --output-path ./out
//! ```
//!
//! Every option can also be given in a YAML configuration file with `--config`;
//! options on the command line take precedence over the file. A template configuration
//! is made with
//!
//! ```bash
//! cxrs_framer_cli new config.yml
//! ```
//!
//! Shots which fail are logged and skipped. A log file `cxrs_framer.log` is written to
//! the working directory.
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc::channel;
use std::sync::Arc;

use libcxrs_framer::config::Config;
use libcxrs_framer::hdf_source::Hdf5Source;
use libcxrs_framer::process::process_range;
use libcxrs_framer::sampler::SampleMethod;
use libcxrs_framer::shot_status::{ShotOutcome, ShotStatus};

fn cli() -> Command {
    Command::new("cxrs_framer_cli")
        .about("Build a shot-indexed CXRS dataset")
        .arg_required_else_help(true)
        .args_conflicts_with_subcommands(true)
        .subcommand(
            Command::new("new")
                .about("Make a template configuration yaml file")
                .arg(Arg::new("path").required(true).help("Path to the file")),
        )
        .arg(
            Arg::new("shot_min")
                .value_parser(value_parser!(i64))
                .help("First shot to process (inclusive)"),
        )
        .arg(
            Arg::new("shot_max")
                .value_parser(value_parser!(i64))
                .help("Last shot to process (inclusive)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Path to a configuration yaml file"),
        )
        .arg(
            Arg::new("output-path")
                .short('o')
                .long("output-path")
                .value_parser(value_parser!(PathBuf))
                .help("Directory of the shot store, created if absent [default: .]"),
        )
        .arg(
            Arg::new("source-path")
                .short('s')
                .long("source-path")
                .value_parser(value_parser!(PathBuf))
                .help("Directory of the per-shot signal archive"),
        )
        .arg(
            Arg::new("sample-method")
                .long("sample-method")
                .value_parser(["random", "grid"])
                .help("How the volume time points are subsampled [default: grid]"),
        )
        .arg(
            Arg::new("num-samples")
                .short('n')
                .long("num-samples")
                .value_parser(value_parser!(usize))
                .help("Number of volume time points kept per shot [default: 10]"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .help("Seed of the random sampler [default: 42]"),
        )
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .action(ArgAction::SetTrue)
                .help("Advisory only, shots are always appended to an existing store"),
        )
}

/// Start from the config file (or the defaults) and apply the command line on top
fn build_config(matches: &ArgMatches) -> Result<Config, String> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            spdlog::info!("Loading config from {}...", path.to_string_lossy());
            Config::read_config_file(path).map_err(|e| e.to_string())?
        }
        None => Config::default(),
    };

    match (
        matches.get_one::<i64>("shot_min"),
        matches.get_one::<i64>("shot_max"),
    ) {
        (Some(first), Some(last)) => {
            config.first_shot = *first;
            config.last_shot = *last;
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(String::from("Both shot_min and shot_max must be given"))
        }
        (None, None) => {
            if !matches.contains_id("config") {
                return Err(String::from("No shot range was given"));
            }
        }
    }
    if let Some(path) = matches.get_one::<PathBuf>("output-path") {
        config.output_path = path.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("source-path") {
        config.source_path = path.clone();
    }
    if let Some(method) = matches.get_one::<String>("sample-method") {
        config.sample_method = method.parse::<SampleMethod>().map_err(|e| e.to_string())?;
    }
    if let Some(n) = matches.get_one::<usize>("num-samples") {
        config.num_samples = *n;
    }
    if let Some(seed) = matches.get_one::<u64>("seed") {
        config.seed = *seed;
    }
    if matches.get_flag("overwrite") {
        config.overwrite = true;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// The two loggers of a run. `console` writes to the terminal and the log file, `quiet`
/// only to the log file and is the default while the progress bar is drawn.
struct Loggers {
    console: Arc<spdlog::Logger>,
    quiet: Arc<spdlog::Logger>,
}

impl Loggers {
    fn use_console(&self) {
        spdlog::set_default_logger(self.console.clone());
    }

    fn use_quiet(&self) {
        spdlog::set_default_logger(self.quiet.clone());
    }
}

/// Console sinks of the default logger plus a log file
fn setup_logging(log_path: &Path) -> Result<Loggers, spdlog::Error> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(log_path)
            .formatter(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            ))
            .truncate(true)
            .build()?,
    );
    let console = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sinks(spdlog::default_logger().sinks().to_owned())
            .sink(file_sink.clone())
            .build()?,
    );
    let quiet = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    Ok(Loggers { console, quiet })
}

/// Write the default configuration to the path given to the `new` subcommand
fn make_template_config(sub_matches: &ArgMatches) -> Result<(), String> {
    let path = sub_matches
        .get_one::<String>("path")
        .map(Path::new)
        .ok_or_else(|| String::from("No path was given for the template"))?;
    spdlog::info!(
        "Making a template config at {}...",
        path.to_string_lossy()
    );
    Config::default()
        .write_config_file(path)
        .map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    let loggers = match setup_logging(Path::new("./cxrs_framer.log")) {
        Ok(l) => {
            l.use_console();
            l
        }
        Err(e) => {
            eprintln!("Could not create logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(("new", sub_matches)) = matches.subcommand() {
        return match make_template_config(sub_matches) {
            Ok(()) => {
                spdlog::info!("Done.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                spdlog::error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let config = match build_config(&matches) {
        Ok(c) => c,
        Err(e) => {
            spdlog::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    spdlog::info!("Config successfully loaded.");
    spdlog::info!("Source Path: {}", config.source_path.to_string_lossy());
    spdlog::info!("Output Path: {}", config.output_path.to_string_lossy());
    spdlog::info!(
        "First Shot: {} Last Shot: {}",
        config.first_shot,
        config.last_shot
    );
    spdlog::info!(
        "Sampling: {} with {} samples, seed {}",
        config.sample_method,
        config.num_samples,
        config.seed
    );

    let pb = ProgressBar::new(config.n_shots() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} shots {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    // Console output would be drawn over the bar; it goes to the log file until the
    // bar is finished
    loggers.use_quiet();
    let (tx, rx) = channel::<ShotStatus>();
    let handle = std::thread::spawn(move || {
        let source = Hdf5Source::new(&config.source_path);
        let mut rng = StdRng::seed_from_u64(config.seed);
        process_range(&source, &config, &mut rng, &tx)
    });

    // Ends once the batch thread drops its sender
    for status in rx {
        pb.set_position((status.progress() * status.total_shots as f32).round() as u64);
        match status.outcome {
            ShotOutcome::Started => pb.set_message(format!("shot {}", status.shot_id)),
            ShotOutcome::Failed => pb.println(format!("shot {} failed", status.shot_id)),
            ShotOutcome::Written => (),
        }
    }
    pb.finish();
    loggers.use_console();

    match handle.join() {
        Ok(Ok(summary)) => {
            spdlog::info!(
                "Wrote {} shots, {} failed",
                summary.written.len(),
                summary.failed.len()
            );
            if !summary.failed.is_empty() {
                spdlog::warn!("Some shots failed, check cxrs_framer.log for details");
            }
            spdlog::info!("Done.");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            spdlog::error!("Batch failed with error: {e}");
            ExitCode::FAILURE
        }
        Err(_) => {
            spdlog::error!("Failed to join batch task!");
            ExitCode::FAILURE
        }
    }
}
