//! `prepix` CLI - Preprocess an image into a model input buffer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prepix::ops::{CenterCrop, Interpolation, Load, Rescale, Resize, Rotate, TensorLayout};
use prepix::{ColorMode, ImageShape, PipelineConfig};

/// Preprocess an image into a flat little-endian `f32` buffer.
#[derive(Parser, Debug)]
#[command(name = "prepix")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image path.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Pipeline configuration (JSON). Flags below are appended to it.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Resize to WIDTHxHEIGHT.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    resize: Option<(u32, u32)>,

    /// Interpolation used by --resize and --rotate.
    #[arg(long, value_enum, default_value_t = InterpolationArg::Bilinear)]
    interpolation: InterpolationArg,

    /// Center-crop to a square of this size, padding smaller images.
    #[arg(long, value_name = "INT")]
    center_crop: Option<i32>,

    /// Rotate clockwise by this many degrees.
    #[arg(long, value_name = "DEG", allow_negative_numbers = true)]
    rotate: Option<f32>,

    /// Channel order to decode the input in.
    #[arg(long, value_enum)]
    color: Option<ColorArg>,

    /// Divide every value by this coefficient.
    #[arg(long, value_name = "FLOAT")]
    rescale: Option<f32>,

    /// Output memory layout.
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Save every intermediate image to this directory.
    #[arg(long, value_name = "DIR")]
    snapshots: Option<PathBuf>,

    /// Write the buffer here.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InterpolationArg {
    Nearest,
    Bilinear,
}

impl From<InterpolationArg> for Interpolation {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Nearest => Self::Nearest,
            InterpolationArg::Bilinear => Self::Bilinear,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColorArg {
    Rgb,
    Bgr,
    Grayscale,
}

impl From<ColorArg> for ColorMode {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Rgb => Self::Rgb,
            ColorArg::Bgr => Self::Bgr,
            ColorArg::Grayscale => Self::Grayscale,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    /// Channels last.
    Hwc,
    /// Channels first.
    Chw,
}

impl From<LayoutArg> for TensorLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Hwc => Self::ChannelsLast,
            LayoutArg::Chw => Self::ChannelsFirst,
        }
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("{v:?}: {e}"));
    Ok((parse(w)?, parse(h)?))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("prepix={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    apply_flags(&mut config, args);

    let pipeline = config.build().context("Invalid pipeline configuration")?;
    match pipeline.final_shape(ImageShape::unknown()) {
        Ok(shape) => tracing::info!("Output shape: {shape}"),
        Err(err) => tracing::debug!("Output shape depends on the input: {err}"),
    }

    let out = pipeline
        .apply_file(&args.input)
        .with_context(|| format!("Failed to process {}", args.input.display()))?;

    if let Some(path) = &args.output {
        write_f32_le(path, &out.data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    println!(
        "{} -> {} ({} values, {:?})",
        args.input.display(),
        out.shape,
        out.data.len(),
        out.layout
    );

    Ok(())
}

fn apply_flags(config: &mut PipelineConfig, args: &Args) {
    let load = config.load.get_or_insert_with(Load::new);
    if let Some(color) = args.color {
        load.color_mode = color.into();
    }

    let interpolation = args.interpolation.into();
    if let Some((width, height)) = args.resize {
        config
            .operations
            .push(Resize::new(width, height, interpolation).into());
    }
    if let Some(size) = args.center_crop {
        config.operations.push(CenterCrop::new(size).into());
    }
    if let Some(degrees) = args.rotate {
        config
            .operations
            .push(Rotate::new(degrees).with_interpolation(interpolation).into());
    }
    if let Some(coefficient) = args.rescale {
        config.operations.push(Rescale::new(coefficient).into());
    }
    if let Some(layout) = args.layout {
        config.layout = layout.into();
    }
    if let Some(dir) = &args.snapshots {
        config.snapshots = Some(dir.clone());
    }
}

fn write_f32_le(path: &Path, data: &[f32]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for value in data {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()
}
