//! georoots: vegetation index, rockfall risk prediction and alert
//! classification from the command line.
//!
//! # Usage
//!
//! ```text
//! georoots green site.jpg --mask-out mask.png --diagnostics
//! georoots predict --model model.json --image site.jpg \
//!     --slope-angle-deg 30 --factor-of-safety 1.2 \
//!     --rainfall-mm-day 12.5 --pore-pressure-kpa 22 --gauge-svg gauge.svg
//! georoots classify 0.23
//! georoots dataset sites.csv --json
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use georoots_export::{SvgMetadata, encode_png_gray, encode_png_rgb, risk_gauge_svg, side_by_side};
use georoots_pipeline::{
    AlertLevel, AlertThresholds, Clock, HsvThresholds, LinearModel, LowerBoundary, RiskAdapter,
    RiskScore, SiteReadings, VegetationConfig, VegetationResult, assess,
    estimate_from_bytes, estimate_with_diagnostics, summarize_csv,
};

/// Rockfall risk from site photos and geotechnical readings.
#[derive(Parser)]
#[command(name = "georoots", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate the vegetation index (green cover share) of a photo.
    Green(GreenArgs),
    /// Score a site with a trained model and classify the score.
    Predict(PredictArgs),
    /// Classify a risk score into Low / Medium / High.
    Classify(ClassifyArgs),
    /// Summarize a site dataset: column statistics, correlation and the
    /// risk score histogram.
    Dataset(DatasetArgs),
}

#[derive(Args)]
struct GreenArgs {
    /// Path to the site photo (PNG, JPEG, BMP, WebP).
    image: PathBuf,

    #[command(flatten)]
    vegetation: VegetationArgs,

    /// Write the binary vegetation mask as PNG.
    #[arg(long)]
    mask_out: Option<PathBuf>,

    /// Write the (downscaled) photo as PNG.
    #[arg(long)]
    preview_out: Option<PathBuf>,

    /// Write the photo and mask visualization side by side as PNG.
    #[arg(long)]
    panel_out: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Time every stage and print a diagnostics report.
    #[arg(long)]
    diagnostics: bool,
}

/// Vegetation estimator settings shared by `green` and `predict --image`.
#[derive(Args)]
struct VegetationArgs {
    /// Base HSV window; individual bounds below override it.
    #[arg(long, value_enum, default_value_t = Window::Standard)]
    window: Window,

    /// Lowest accepted hue in half-degrees (0-179).
    #[arg(long)]
    hue_low: Option<u8>,

    /// Highest accepted hue in half-degrees (0-179).
    #[arg(long)]
    hue_high: Option<u8>,

    /// Lowest accepted saturation (0-255).
    #[arg(long)]
    saturation_low: Option<u8>,

    /// Lowest accepted value (0-255).
    #[arg(long)]
    value_low: Option<u8>,

    /// Downscale photos wider than this many pixels.
    #[arg(long, default_value_t = VegetationConfig::DEFAULT_MAX_WIDTH, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_width: u32,

    /// Downscale filter.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Mask visualization written by `--panel-out`.
    #[arg(long, value_enum, default_value_t = View::Binary)]
    view: View,

    /// Full estimator config as a JSON string.
    ///
    /// When provided, all other estimator flags are ignored. The JSON
    /// must be a valid `VegetationConfig` serialization; missing fields
    /// take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Args)]
struct PredictArgs {
    /// Model artifact (JSON linear model).
    #[arg(long)]
    model: PathBuf,

    /// Slope angle in degrees.
    #[arg(long)]
    slope_angle_deg: f64,

    /// Factor of safety.
    #[arg(long)]
    factor_of_safety: f64,

    /// Rainfall in mm/day.
    #[arg(long)]
    rainfall_mm_day: f64,

    /// Pore pressure in kPa.
    #[arg(long)]
    pore_pressure_kpa: f64,

    /// Vegetation fraction in [0, 1], if already known.
    #[arg(long, required_unless_present = "image", conflicts_with = "image")]
    green_index: Option<f64>,

    /// Site photo to estimate the vegetation fraction from.
    #[arg(long)]
    image: Option<PathBuf>,

    #[command(flatten)]
    vegetation: VegetationArgs,

    #[command(flatten)]
    thresholds: ThresholdArgs,

    /// Write the risk gauge as SVG.
    #[arg(long)]
    gauge_svg: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ClassifyArgs {
    /// Risk score to classify.
    #[arg(allow_negative_numbers = true)]
    score: f64,

    #[command(flatten)]
    thresholds: ThresholdArgs,
}

#[derive(Args)]
struct DatasetArgs {
    /// CSV file with a header row.
    csv: PathBuf,

    /// Print the summary as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ThresholdArgs {
    /// Scores below this are Low.
    #[arg(long, default_value_t = AlertThresholds::DEFAULT_LOW)]
    low_below: f64,

    /// Scores up to this (inclusive) are Medium.
    #[arg(long, default_value_t = AlertThresholds::DEFAULT_MEDIUM)]
    medium_up_to: f64,

    /// Whether a score equal to `--low-below` is Low (inclusive) or
    /// High (exclusive).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_BOUNDARY)]
    boundary: Boundary,
}

/// Base HSV acceptance window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Window {
    /// Hue 35-85, S >= 40, V >= 40.
    Standard,
    /// Hue 72-108, S >= 42, V >= 24.
    LowLight,
}

/// Downsample resampling filter selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Filter {
    /// Disabled: keep full resolution.
    Disabled,
    /// Area averaging.
    Area,
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes.
    Lanczos3,
}

/// Mask visualization selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    /// Black and white mask.
    Binary,
    /// Photo with non-vegetation pixels blacked out.
    Composite,
}

/// Lower threshold treatment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Boundary {
    /// A score equal to the low threshold is High.
    Exclusive,
    /// A score equal to the low threshold is Low.
    Inclusive,
}

const fn filter_from_pipeline(f: georoots_pipeline::DownsampleFilter) -> Filter {
    use georoots_pipeline::DownsampleFilter as D;
    match f {
        D::Disabled => Filter::Disabled,
        D::Area => Filter::Area,
        D::Nearest => Filter::Nearest,
        D::Triangle => Filter::Triangle,
        D::CatmullRom => Filter::CatmullRom,
        D::Gaussian => Filter::Gaussian,
        D::Lanczos3 => Filter::Lanczos3,
    }
}

const fn boundary_from_pipeline(b: LowerBoundary) -> Boundary {
    match b {
        LowerBoundary::Exclusive => Boundary::Exclusive,
        LowerBoundary::Inclusive => Boundary::Inclusive,
    }
}

/// Derived from the library defaults so the two cannot drift apart.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(VegetationConfig::DEFAULT_DOWNSAMPLE_FILTER);
const CLI_DEFAULT_BOUNDARY: Boundary = boundary_from_pipeline(AlertThresholds::DEFAULT_BOUNDARY);

/// Build a [`VegetationConfig`] from CLI arguments.
///
/// If `--config-json` is provided it is parsed directly and all
/// individual estimator flags are ignored.
fn config_from_cli(args: &VegetationArgs) -> Result<VegetationConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let base = match args.window {
        Window::Standard => HsvThresholds::STANDARD,
        Window::LowLight => HsvThresholds::LOW_LIGHT,
    };
    Ok(VegetationConfig {
        thresholds: HsvThresholds {
            hue_low: args.hue_low.unwrap_or(base.hue_low),
            hue_high: args.hue_high.unwrap_or(base.hue_high),
            saturation_low: args.saturation_low.unwrap_or(base.saturation_low),
            value_low: args.value_low.unwrap_or(base.value_low),
        },
        max_width: args.max_width,
        downsample_filter: match args.filter {
            Filter::Disabled => georoots_pipeline::DownsampleFilter::Disabled,
            Filter::Area => georoots_pipeline::DownsampleFilter::Area,
            Filter::Nearest => georoots_pipeline::DownsampleFilter::Nearest,
            Filter::Triangle => georoots_pipeline::DownsampleFilter::Triangle,
            Filter::CatmullRom => georoots_pipeline::DownsampleFilter::CatmullRom,
            Filter::Gaussian => georoots_pipeline::DownsampleFilter::Gaussian,
            Filter::Lanczos3 => georoots_pipeline::DownsampleFilter::Lanczos3,
        },
        view: match args.view {
            View::Binary => georoots_pipeline::MaskView::Binary,
            View::Composite => georoots_pipeline::MaskView::Composite,
        },
    })
}

/// Build validated [`AlertThresholds`] from CLI arguments.
fn thresholds_from_cli(args: &ThresholdArgs) -> Result<AlertThresholds, String> {
    let thresholds = AlertThresholds {
        low_below: args.low_below,
        medium_up_to: args.medium_up_to,
        boundary: match args.boundary {
            Boundary::Exclusive => LowerBoundary::Exclusive,
            Boundary::Inclusive => LowerBoundary::Inclusive,
        },
    };
    thresholds.validate().map_err(|e| e.to_string())?;
    Ok(thresholds)
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), String> {
    let contents = contents.as_ref();
    std::fs::write(path, contents)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    info!("wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

fn to_json(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Error serializing output: {e}"))
}

fn write_rasters(args: &GreenArgs, result: &VegetationResult) -> Result<(), String> {
    if let Some(path) = &args.mask_out {
        write_file(path, encode_png_gray(&result.mask).map_err(|e| e.to_string())?)?;
    }
    if let Some(path) = &args.preview_out {
        write_file(path, encode_png_rgb(&result.preview).map_err(|e| e.to_string())?)?;
    }
    if let Some(path) = &args.panel_out {
        let panel = side_by_side(&result.preview, &result.visualization, 10);
        write_file(path, encode_png_rgb(&panel).map_err(|e| e.to_string())?)?;
    }
    Ok(())
}

fn run_green(args: &GreenArgs) -> Result<(), String> {
    let config = config_from_cli(&args.vegetation)?;
    let bytes = read_file(&args.image)?;
    info!("{}: {} bytes", args.image.display(), bytes.len());

    let (result, diagnostics) = if args.diagnostics {
        let (result, diagnostics) =
            estimate_with_diagnostics(&bytes, &config, &StdClock).map_err(|e| e.to_string())?;
        (result, Some(diagnostics))
    } else {
        (
            estimate_from_bytes(&bytes, &config).map_err(|e| e.to_string())?,
            None,
        )
    };

    if args.json {
        let out = serde_json::json!({
            "vegetation": result.summary(),
            "diagnostics": diagnostics,
        });
        println!("{}", to_json(&out)?);
    } else {
        println!(
            "Vegetation: {:.2}% ({} of {} pixels, {}x{}{})",
            result.percent(),
            result.vegetation_pixels,
            result.total_pixels,
            result.dimensions.width,
            result.dimensions.height,
            if result.downscaled { ", downscaled" } else { "" },
        );
        if let Some(diagnostics) = &diagnostics {
            println!();
            println!("{}", diagnostics.report());
        }
    }

    write_rasters(args, &result)
}

fn load_adapter(path: &Path) -> RiskAdapter {
    RiskAdapter::from_load(
        read_file(path).and_then(|bytes| LinearModel::from_slice(&bytes).map_err(|e| e.to_string())),
    )
}

fn run_predict(args: &PredictArgs) -> Result<(), String> {
    let thresholds = thresholds_from_cli(&args.thresholds)?;
    let adapter = load_adapter(&args.model);
    let readings = SiteReadings {
        slope_angle_deg: args.slope_angle_deg,
        factor_of_safety: args.factor_of_safety,
        rainfall_mm_day: args.rainfall_mm_day,
        pore_pressure_kpa: args.pore_pressure_kpa,
    };

    let (score, alert, summary_json): (RiskScore, AlertLevel, serde_json::Value) =
        if let Some(image) = &args.image {
            let config = config_from_cli(&args.vegetation)?;
            let bytes = read_file(image)?;
            let assessment = assess(&bytes, &config, &readings, &adapter, &thresholds)
                .map_err(|e| e.to_string())?;
            let summary = assessment.summary();
            let value = serde_json::to_value(summary).map_err(|e| e.to_string())?;
            (assessment.score, assessment.alert, value)
        } else {
            // clap guarantees one of the two sources.
            let green_index = args.green_index.unwrap_or_default();
            let record = readings.record_with(green_index).map_err(|e| e.to_string())?;
            let score = adapter.predict(&record).map_err(|e| e.to_string())?;
            let alert = thresholds.classify(score.value());
            let value = serde_json::json!({
                "record": record,
                "score": score,
                "alert": alert,
            });
            (score, alert, value)
        };

    if args.json {
        println!("{}", to_json(&summary_json)?);
    } else {
        println!("Risk score: {score}");
        println!("Alert: {alert}");
    }

    if let Some(path) = &args.gauge_svg {
        let json = serde_json::to_string(&summary_json).map_err(|e| e.to_string())?;
        let description = format!("Rockfall risk {score}, alert {alert}");
        let svg = risk_gauge_svg(
            score,
            &thresholds,
            Some(alert),
            &SvgMetadata {
                title: Some("Rockfall Risk Gauge"),
                description: Some(&description),
                assessment_json: Some(&json),
            },
        );
        write_file(path, svg)?;
    }
    Ok(())
}

fn run_classify(args: &ClassifyArgs) -> Result<(), String> {
    let thresholds = thresholds_from_cli(&args.thresholds)?;
    println!("{}", thresholds.classify(args.score));
    Ok(())
}

fn run_dataset(args: &DatasetArgs) -> Result<(), String> {
    let bytes = read_file(&args.csv)?;
    let summary = summarize_csv(&bytes)
        .map_err(|e| format!("Error reading {}: {e}", args.csv.display()))?;
    info!(
        "{}: {} rows, {} columns",
        args.csv.display(),
        summary.rows,
        summary.column_count()
    );
    if args.json {
        println!("{}", to_json(&summary)?);
    } else {
        print!("{}", summary.report());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let outcome = match &cli.command {
        Command::Green(args) => run_green(args),
        Command::Predict(args) => run_predict(args),
        Command::Classify(args) => run_classify(args),
        Command::Dataset(args) => run_dataset(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("georoots").chain(args.iter().copied())).unwrap()
    }

    fn green(args: &[&str]) -> GreenArgs {
        let mut full = vec!["green", "site.png"];
        full.extend_from_slice(args);
        match parse(&full).command {
            Command::Green(g) => g,
            _ => unreachable!(),
        }
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn default_flags_match_library_defaults() {
        let config = config_from_cli(&green(&[]).vegetation).unwrap();
        assert_eq!(config, VegetationConfig::default());
        assert_eq!(CLI_DEFAULT_FILTER, Filter::Area);
    }

    #[test]
    fn window_preset_with_override() {
        let config =
            config_from_cli(&green(&["--window", "low-light", "--value-low", "10"]).vegetation)
                .unwrap();
        assert_eq!(config.thresholds.hue_low, HsvThresholds::LOW_LIGHT.hue_low);
        assert_eq!(config.thresholds.value_low, 10);
    }

    #[test]
    fn individual_flags_are_applied() {
        let args = green(&[
            "--max-width",
            "600",
            "--filter",
            "lanczos3",
            "--view",
            "composite",
            "--hue-high",
            "90",
        ]);
        let config = config_from_cli(&args.vegetation).unwrap();
        assert_eq!(config.max_width, VegetationConfig::COMPACT_MAX_WIDTH);
        assert_eq!(
            config.downsample_filter,
            georoots_pipeline::DownsampleFilter::Lanczos3
        );
        assert_eq!(config.view, georoots_pipeline::MaskView::Composite);
        assert_eq!(config.thresholds.hue_high, 90);
    }

    #[test]
    fn config_json_overrides_flags() {
        let args = green(&[
            "--max-width",
            "100",
            "--config-json",
            r#"{"max_width": 320, "view": "Composite"}"#,
        ]);
        let config = config_from_cli(&args.vegetation).unwrap();
        assert_eq!(config.max_width, 320);
        assert_eq!(config.view, georoots_pipeline::MaskView::Composite);
        assert_eq!(config.thresholds, HsvThresholds::STANDARD);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let args = green(&["--config-json", "{not json"]);
        let err = config_from_cli(&args.vegetation).unwrap_err();
        assert!(err.starts_with("Error parsing --config-json"));
    }

    #[test]
    fn zero_max_width_is_rejected_by_the_parser() {
        let result = Cli::try_parse_from(["georoots", "green", "a.png", "--max-width", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn boundary_mapping() {
        assert_eq!(CLI_DEFAULT_BOUNDARY, Boundary::Exclusive);
        assert_eq!(
            CLI_DEFAULT_BOUNDARY,
            boundary_from_pipeline(AlertThresholds::default().boundary)
        );
        assert_eq!(
            boundary_from_pipeline(LowerBoundary::Inclusive),
            Boundary::Inclusive
        );

        let Command::Classify(args) = parse(&["classify", "0.21"]).command else {
            unreachable!()
        };
        let thresholds = thresholds_from_cli(&args.thresholds).unwrap();
        assert_eq!(thresholds.classify(args.score), AlertLevel::High);

        let Command::Classify(args) =
            parse(&["classify", "0.21", "--boundary", "inclusive"]).command
        else {
            unreachable!()
        };
        let thresholds = thresholds_from_cli(&args.thresholds).unwrap();
        assert_eq!(thresholds.classify(args.score), AlertLevel::Low);
    }

    #[test]
    fn classify_accepts_negative_scores() {
        let Command::Classify(args) = parse(&["classify", "-0.5"]).command else {
            unreachable!()
        };
        assert!((args.score + 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let Command::Classify(args) =
            parse(&["classify", "0.1", "--low-below", "0.5", "--medium-up-to", "0.3"]).command
        else {
            unreachable!()
        };
        assert!(thresholds_from_cli(&args.thresholds).is_err());
    }

    #[test]
    fn predict_needs_exactly_one_green_source() {
        let base = [
            "georoots",
            "predict",
            "--model",
            "m.json",
            "--slope-angle-deg",
            "30",
            "--factor-of-safety",
            "1.2",
            "--rainfall-mm-day",
            "12.5",
            "--pore-pressure-kpa",
            "22",
        ];
        assert!(Cli::try_parse_from(base).is_err());

        let with = |extra: &[&'static str]| {
            let mut v = base.to_vec();
            v.extend_from_slice(extra);
            Cli::try_parse_from(v)
        };
        assert!(with(&["--green-index", "0.4"]).is_ok());
        assert!(with(&["--image", "site.png"]).is_ok());
        assert!(with(&["--green-index", "0.4", "--image", "site.png"]).is_err());
    }

    #[test]
    fn missing_model_file_makes_adapter_unavailable() {
        let adapter = load_adapter(Path::new("/nonexistent/georoots-model.json"));
        assert!(!adapter.is_available());
        assert!(adapter.unavailable_reason().unwrap().contains("georoots-model.json"));
    }

    #[test]
    fn dataset_parses_path_and_json_flag() {
        let Command::Dataset(args) = parse(&["dataset", "sites.csv"]).command else {
            unreachable!()
        };
        assert_eq!(args.csv, PathBuf::from("sites.csv"));
        assert!(!args.json);

        let Command::Dataset(args) = parse(&["dataset", "sites.csv", "--json"]).command else {
            unreachable!()
        };
        assert!(args.json);
        assert!(Cli::try_parse_from(["georoots", "dataset"]).is_err());
    }

    #[test]
    fn dataset_reports_missing_file() {
        let args = DatasetArgs {
            csv: PathBuf::from("/nonexistent/georoots-sites.csv"),
            json: false,
        };
        assert!(run_dataset(&args).unwrap_err().contains("georoots-sites.csv"));
    }
}
