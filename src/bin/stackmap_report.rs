//! Stack map size report
//!
//! Reads a JSON dump of functions (instruction listings with liveness
//! annotations and their table blobs) and prints one size line per
//! encoding scheme.
//!
//! ## Usage
//!
//! ```bash
//! # Default scheme set, dump read from a file
//! stackmap-report functions.json
//!
//! # Compact tables, frequency ordering, from stdin
//! stackmap-report --layout compact --order frequency - < functions.json
//!
//! # Selected schemes, with histograms and debug logging
//! stackmap-report --schemes "expanded,dedup,huffman(8)" --histograms \
//!     --log-level debug functions.json
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::FmtSubscriber;

use stackmap_compress::config::{Config, ExperimentConfig};
use stackmap_compress::experiment::{BitmapOrder, Experiment};
use stackmap_compress::stackmap::{read_functions, TableLayout};
use stackmap_compress::{Result, StackMapError};

#[derive(Parser, Debug)]
#[command(name = "stackmap-report")]
#[command(version)]
#[command(about = "Compare stack map encodings by size", long_about = None)]
struct Args {
    /// JSON function dump, or `-` for stdin
    input: PathBuf,

    /// Configuration file path (JSON); STACKMAP_* variables are used otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Table layout for deduplicated and estimated schemes (expanded, compact)
    #[arg(long)]
    layout: Option<TableLayout>,

    /// Table index order (insertion, frequency, value)
    #[arg(long)]
    order: Option<BitmapOrder>,

    /// Comma-separated schemes, e.g. "dedup,huffman(8),gr(3)"
    #[arg(long)]
    schemes: Option<String>,

    /// Only keep points where something becomes newly live
    #[arg(long)]
    filter_live_to_dead: bool,

    /// Print bitmap, bitmap-delta and pc-delta histograms
    #[arg(long)]
    histograms: bool,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::WARN,
    };

    // Library diagnostics go through `log`; the subscriber bridges them.
    let initialized = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr)
        .try_init();
    if let Err(e) = initialized {
        eprintln!("stackmap-report: logging disabled: {}", e);
    }
    stackmap_compress::init();
}

fn load_config(args: &Args) -> Result<ExperimentConfig> {
    let mut config = match &args.config {
        Some(path) => ExperimentConfig::load_from_file(path)?,
        None => ExperimentConfig::from_env()?,
    };
    if let Some(layout) = args.layout {
        config.layout = layout;
    }
    if let Some(order) = args.order {
        config.bitmap_order = order;
    }
    if let Some(list) = &args.schemes {
        config.schemes = ExperimentConfig::parse_schemes(list)?;
    }
    config.filter_live_to_dead |= args.filter_live_to_dead;
    config.validate()?;
    Ok(config)
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).map_err(|e| {
        StackMapError::io_error(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(Box::new(BufReader::new(file)))
}

fn print_histograms(experiment: &Experiment) {
    println!("# bitmaps");
    let maps = experiment.bitmap_histogram();
    for (bitmap, count) in maps.by_frequency() {
        println!("{:>8} {:b}", count, bitmap);
    }

    let (pc_deltas, bitmap_deltas) = experiment.delta_histograms();
    println!("# bitmap deltas");
    for (delta, count) in bitmap_deltas.by_frequency() {
        match delta {
            Some(delta) => println!("{:>8} {:b}", count, delta),
            None => println!("{:>8} dead", count),
        }
    }
    println!("# pc deltas");
    for (delta, count) in pc_deltas.by_frequency() {
        println!("{:>8} {}", count, delta);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let functions = read_functions(open_input(&args.input)?)?;
    log::info!("read {} functions from {}", functions.len(), args.input.display());

    let experiment = Experiment::from_functions(&functions, config)?;
    if args.histograms {
        print_histograms(&experiment);
    }

    let reports = experiment.run_all()?;
    if args.json {
        let text = serde_json::to_string_pretty(&reports)
            .map_err(|e| StackMapError::io_error(format!("cannot serialize reports: {}", e)))?;
        println!("{}", text);
    } else {
        for report in &reports {
            println!("{}", report);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{} error: {}", e.category(), e);
            eprintln!("stackmap-report: {}", e);
            if e.is_data_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
