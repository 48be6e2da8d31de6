use clap::{Parser, Subcommand};
use photoshrink::{batch, cancel::CancelFlag, config, output};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "photoshrink")]
#[command(about = "Batch-normalize a directory of images to JPEG within a size budget")]
#[command(long_about = "\
Batch-normalize a directory of images to JPEG within a size budget

Every admitted file in the input directory (jpeg/jpg, bmp, and heic when
compiled in) is converted to JPEG and, if it exceeds the configured size
budget, repeatedly shrunk until it fits:

  original/holiday.bmp   --(2 shrink steps)-->  reduced/holiday_reduced.jpeg
  original/small.jpg     --(already fits)--->   reduced/small_original.jpeg

The output directory is cleared at the start of every run, so its contents
always reflect exactly one run over the current inputs. The input directory
is never modified. One file failing (corrupt data, unreachable budget)
never aborts the batch — it is reported and the run moves on.

Run 'photoshrink gen-config' to generate a documented photoshrink.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory of source images (created empty if missing)
    #[arg(long, default_value = "original", global = true)]
    input: PathBuf,

    /// Output directory (deleted and recreated every run)
    #[arg(long, default_value = "reduced", global = true)]
    output: PathBuf,

    /// Directory for per-file intermediate artifacts
    #[arg(long, default_value = ".photoshrink-tmp", global = true)]
    work_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override values from the config file.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Config file to load (photoshrink.toml format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Byte-budget mode: maximum encoded size per output file
    #[arg(long, conflicts_with = "max_pixels")]
    max_bytes: Option<u64>,

    /// Pixel-budget mode: maximum pixel count per output file
    #[arg(long)]
    max_pixels: Option<u64>,

    /// Linear shrink per attempt (must be > 1.0)
    #[arg(long)]
    shrink_ratio: Option<f64>,

    /// JPEG quality for measurement and output (1-100)
    #[arg(long)]
    quality: Option<u32>,

    /// Resize attempts before giving up on a file
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Floor for either axis during reduction
    #[arg(long)]
    min_dimension: Option<u32>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Process the input directory into the output directory
    Run(RunArgs),
    /// List input files and how a run would classify them, without running
    Check,
    /// Print a stock photoshrink.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let run_config = resolve_config(&args)?;
            init_thread_pool(&run_config.processing);

            let cancel = CancelFlag::new();
            let handler_flag = cancel.clone();
            ctrlc::set_handler(move || handler_flag.cancel())?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_event(&event);
                }
            });

            let report = batch::run(
                &run_config,
                &cli.input,
                &cli.output,
                &cli.work_dir,
                &cancel,
                Some(tx),
            )?;
            printer.join().expect("printer thread panicked");

            output::print_summary(&report.summary, report.cancelled);

            if let Some(report_path) = args.report {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(&report_path, json)?;
                println!("Report: {}", report_path.display());
            }
        }
        Command::Check => {
            println!("==> Checking {}", cli.input.display());
            let entries = batch::check(&cli.input);
            output::print_check_output(&entries);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file (if any) and overlay the CLI flags on top.
fn resolve_config(args: &RunArgs) -> Result<config::RunConfig, config::ConfigError> {
    let mut run_config = match &args.config {
        Some(path) => config::RunConfig::load(path)?,
        None => config::RunConfig::default(),
    };

    if let Some(max_bytes) = args.max_bytes {
        run_config.budget.mode = config::BudgetMode::MaxBytes;
        run_config.budget.value = max_bytes;
    }
    if let Some(max_pixels) = args.max_pixels {
        run_config.budget.mode = config::BudgetMode::MaxPixels;
        run_config.budget.value = max_pixels;
    }
    if let Some(shrink_ratio) = args.shrink_ratio {
        run_config.reducer.shrink_ratio = shrink_ratio;
    }
    if let Some(quality) = args.quality {
        run_config.reducer.quality = quality;
    }
    if let Some(max_attempts) = args.max_attempts {
        run_config.reducer.max_attempts = max_attempts;
    }
    if let Some(min_dimension) = args.min_dimension {
        run_config.reducer.min_dimension = min_dimension;
    }

    run_config.validate()?;
    Ok(run_config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
