//! Run the rockfall early-warning animation and write frames as PNG.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use georoots_sim::{Scene, TICKS_PER_SECOND, load_dataset, render_frame, stratified_sample};

/// Animate a rockfall early-warning scene from a site dataset.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// CSV dataset with `alert_level`, `region`, `location_id` and
    /// `factor_of_safety` columns.
    #[arg(long)]
    dataset: PathBuf,

    /// Number of ticks to simulate (30 per second).
    #[arg(long, default_value_t = 60 * TICKS_PER_SECOND)]
    frames: u64,

    /// Seed for sampling and the scene. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Write every Nth frame.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    every: u64,

    /// Directory for `frame_NNNNN.png` files. Frames are not written
    /// when omitted; reports are still printed.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let records = load_dataset(&args.dataset)?;
    let mut rng = args
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

    let sample = stratified_sample(&records, &mut rng);
    let mut scene = Scene::new(&sample, &mut rng);

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut written = 0u64;
    for tick in 0..args.frames {
        for report in scene.step(&mut rng) {
            println!("{report}");
        }
        if let Some(dir) = &args.output_dir
            && tick % args.every == 0
        {
            let path = dir.join(format!("frame_{tick:05}.png"));
            render_frame(&scene).save(&path)?;
            written += 1;
        }
    }

    info!(
        "simulated {} ticks, {} reports, {written} frames written",
        args.frames,
        scene.reports().len()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
