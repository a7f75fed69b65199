//! lane-geometry CLI: lane curvature and vehicle offset from fitted lines or frame files.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lane_geometry::core::{
    estimate_curvature_with_scale, estimate_offset_with_scale, PolynomialFit, ScaleFactors,
    UnitSystem,
};
use lane_geometry::io::{default_report_path, FramesFile, LaneGeometryConfig, LaneReportFile};
use lane_geometry::MAX_IMAGE_ROWS;
use log::info;

#[cfg(not(feature = "tracing"))]
use lane_geometry::core::init_with_level;
#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "lane-geometry")]
#[command(about = "Estimate lane curvature radius and vehicle offset from bird's-eye lane fits")]
#[command(version)]
struct Cli {
    /// Log estimator internals at debug level.
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit tracing events as JSON lines on stderr.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    trace_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Radius of curvature of two fitted lane lines.
    Curvature(CurvatureArgs),

    /// Vehicle offset from the lane center.
    Offset(OffsetArgs),

    /// Process a JSON file of frames and write a JSON report.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
struct UnitArgs {
    /// Report unit: `pixels` or `meters`.
    #[arg(long, default_value = "meters")]
    unit: UnitSystem,

    /// Meters per pixel along y (defaults to 30/720).
    #[arg(long)]
    ym_per_pix: Option<f64>,

    /// Meters per pixel along x (defaults to 3.7/700).
    #[arg(long)]
    xm_per_pix: Option<f64>,
}

impl UnitArgs {
    fn scale(&self) -> ScaleFactors {
        let default = ScaleFactors::LANE_DEFAULT;
        ScaleFactors {
            ym_per_pix: self.ym_per_pix.unwrap_or(default.ym_per_pix),
            xm_per_pix: self.xm_per_pix.unwrap_or(default.xm_per_pix),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CurvatureArgs {
    /// Left lane fit `a,b,c` for `x = a*y^2 + b*y + c`.
    #[arg(long, value_parser = parse_fit, allow_hyphen_values = true)]
    left: PolynomialFit,

    /// Right lane fit `a,b,c`.
    #[arg(long, value_parser = parse_fit, allow_hyphen_values = true)]
    right: PolynomialFit,

    /// Largest row the fits cover (the row nearest the vehicle).
    #[arg(long)]
    y_max: f64,

    /// Number of evenly spaced rows in `[0, y_max]`; every integer row when omitted.
    #[arg(long)]
    samples: Option<usize>,

    #[command(flatten)]
    units: UnitArgs,
}

#[derive(Debug, Clone, Args)]
struct OffsetArgs {
    /// Image width in pixels.
    #[arg(long)]
    width: f64,

    /// Image height in pixels.
    #[arg(long)]
    height: f64,

    /// Left lane fit `a,b,c`.
    #[arg(long, value_parser = parse_fit, allow_hyphen_values = true)]
    left: PolynomialFit,

    /// Right lane fit `a,b,c`.
    #[arg(long, value_parser = parse_fit, allow_hyphen_values = true)]
    right: PolynomialFit,

    #[command(flatten)]
    units: UnitArgs,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// JSON file with a `frames` array.
    #[arg(long)]
    frames: PathBuf,

    /// JSON config (unit, scale, thresholds); defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report path (defaults to `<frames stem>_report.json`).
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_fit(s: &str) -> Result<PolynomialFit, String> {
    let coeffs = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coefficient in {s:?}: {e}"))?;
    match coeffs.as_slice() {
        [a, b, c] => Ok(PolynomialFit::new(*a, *b, *c)),
        _ => Err(format!(
            "expected three comma-separated coefficients a,b,c, got {}",
            coeffs.len()
        )),
    }
}

fn sample_rows(y_max: f64, samples: Option<usize>) -> CliResult<Vec<f64>> {
    if !y_max.is_finite() || y_max < 0.0 {
        return Err(format!("--y-max must be a non-negative number, got {y_max}").into());
    }
    let ys = match samples {
        None if y_max >= MAX_IMAGE_ROWS as f64 => {
            return Err(format!(
                "--y-max {y_max} spans more than {MAX_IMAGE_ROWS} rows; pass --samples"
            )
            .into())
        }
        None => (0..=y_max.floor() as usize).map(|y| y as f64).collect(),
        Some(0) => return Err("--samples must be at least 1".into()),
        Some(n) if n > MAX_IMAGE_ROWS => {
            return Err(format!("--samples must be at most {MAX_IMAGE_ROWS}, got {n}").into())
        }
        Some(1) => vec![y_max],
        Some(n) => (0..n)
            .map(|i| y_max * i as f64 / (n - 1) as f64)
            .collect(),
    };
    Ok(ys)
}

fn init_logging(cli: &Cli) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        let default = if cli.verbose { "debug" } else { "warn" };
        lane_geometry::core::init_tracing_with_default(cli.trace_json, default);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        };
        init_with_level(level)?;
    }
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match &cli.command {
        Commands::Curvature(args) => run_curvature(args),
        Commands::Offset(args) => run_offset(args),
        Commands::Run(args) => run_frames(args),
    }
}

// ── curvature ─────────────────────────────────────────────────────────

fn run_curvature(args: &CurvatureArgs) -> CliResult<()> {
    let ys = sample_rows(args.y_max, args.samples)?;
    let res = estimate_curvature_with_scale(
        &ys,
        args.left,
        args.right,
        args.units.unit,
        &args.units.scale(),
    )?;
    println!("{res}");
    Ok(())
}

// ── offset ────────────────────────────────────────────────────────────

fn run_offset(args: &OffsetArgs) -> CliResult<()> {
    let res = estimate_offset_with_scale(
        args.width,
        args.height,
        args.left,
        args.right,
        args.units.unit,
        &args.units.scale(),
    )?;
    println!("{res}");
    Ok(())
}

// ── run ───────────────────────────────────────────────────────────────

fn run_frames(args: &RunArgs) -> CliResult<()> {
    let config = match &args.config {
        Some(path) => LaneGeometryConfig::load_json(path)?,
        None => LaneGeometryConfig::default(),
    };
    let frames = FramesFile::load_json(&args.frames)?;
    info!(
        "processing {} frame(s) from {}",
        frames.frames.len(),
        args.frames.display()
    );

    let report = LaneReportFile::run(&config, args.config.as_deref(), &frames);
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| default_report_path(&args.frames));
    report.write_json(&out)?;

    println!(
        "processed {} frame(s), {} failed; wrote report to {}",
        report.frames.len(),
        report.failed_frames(),
        out.display()
    );
    Ok(())
}
