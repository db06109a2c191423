//! `meshlod`: simplify a mesh or scene stored as JSON

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::RunConfig;
use meshlod_core::TriangleMesh;
use meshlod_scene::{optimize_scene, Scene};
use meshlod_simplification::{ProgressiveMeshSimplifier, SimplifyReport, SimplifyStatus};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "meshlod", version, about = "Progressive mesh simplification")]
struct Args {
    /// Input `TriangleMesh` JSON (a `Scene` JSON with --scene)
    input: PathBuf,

    /// Where to write the simplified mesh or scene
    #[arg(short, long)]
    output: PathBuf,

    /// Fraction of faces to keep, between 0 and 1 [default: 0.6]
    #[arg(short, long)]
    ratio: Option<f32>,

    /// Ignore texture coordinates when costing collapses
    #[arg(long)]
    no_preserve_texture: bool,

    /// TOML file with `ratio` and a `[simplify]` table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Treat the input as a scene and simplify every mesh in it
    #[arg(long)]
    scene: bool,

    /// Also write the simplification report(s) as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

fn log_report(label: &str, report: &SimplifyReport) {
    info!(
        "{}: {} -> {} faces (target {}), {} -> {} vertices, {} collapses",
        label,
        report.original_face_count,
        report.final_face_count,
        report.target_face_count,
        report.original_vertex_count,
        report.final_vertex_count,
        report.edges_collapsed
    );
    if report.status == SimplifyStatus::Infeasible {
        warn!("{}: stopped {} faces above target", label, report.shortfall());
    }
}

fn run_mesh(args: &Args, config: &RunConfig) -> Result<()> {
    let mesh: TriangleMesh = read_json(&args.input)?;
    let simplifier = ProgressiveMeshSimplifier::with_options(config.simplify.clone());
    let result = simplifier
        .simplify_with_report(&mesh, config.ratio, None)
        .with_context(|| format!("failed to simplify {}", args.input.display()))?;

    log_report(&args.input.display().to_string(), &result.report);
    write_json(&args.output, &result.mesh)?;
    if let Some(path) = &args.report {
        write_json(path, &result.report)?;
    }
    Ok(())
}

fn run_scene(args: &Args, config: &RunConfig) -> Result<()> {
    let scene = Arc::new(read_json::<Scene>(&args.input)?);
    let result = optimize_scene(&scene, &config.simplify, config.ratio, None)
        .with_context(|| format!("failed to optimize {}", args.input.display()))?;

    for entry in &result.reports {
        log_report(&format!("geometry {}", entry.geometry), &entry.report);
    }
    info!(
        "scene: {} -> {} faces over {} geometry(ies)",
        result.original_face_count(),
        result.final_face_count(),
        result.reports.len()
    );
    write_json(&args.output, &result.scene)?;
    if let Some(path) = &args.report {
        write_json(path, &result.reports)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    let config = config
        .with_overrides(args.ratio, args.no_preserve_texture)
        .context("invalid settings")?;

    if args.scene {
        run_scene(&args, &config)
    } else {
        run_mesh(&args, &config)
    }
}
