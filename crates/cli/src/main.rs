#![deny(unsafe_code)]
//! CLI harness for windsway.
//!
//! Subcommands:
//! - `render <image>`: animate a sprite under a scripted gust, write a PNG
//! - `classify <image>`: print pixel category counts and the weight range
//! - `params`: print every stage's parameter schema

mod error;
mod script;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use error::CliError;
use script::PointerScript;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use windsway_core::{PixelClassifier, PixelCategory};
use windsway_scene::snapshot::{load_png, write_png};
use windsway_scene::{Rasterizer, SceneConfig, Simulation};

#[derive(Parser)]
#[command(name = "windsway", about = "Pixel-art sprites swaying in pointer-driven wind")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Scene configuration as a JSON string.
    #[arg(long, default_value = "{}", conflicts_with = "config")]
    params: String,

    /// Scene configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Animate a sprite under a scripted pointer sweep and write the last frame.
    Render {
        /// Sprite image (PNG).
        image: PathBuf,

        /// Canvas width in pixels.
        #[arg(short = 'W', long, default_value_t = 512)]
        width: usize,

        /// Canvas height in pixels.
        #[arg(short = 'H', long, default_value_t = 512)]
        height: usize,

        /// Number of frames to simulate.
        #[arg(short, long, default_value_t = 120)]
        frames: usize,

        /// Simulated frames per second.
        #[arg(long, default_value_t = 60.0)]
        fps: f64,

        /// One-way pointer passes over the run.
        #[arg(long, default_value_t = 2.0)]
        sweeps: f64,

        /// Vertical pointer wobble as a fraction of the sprite height.
        #[arg(long, default_value_t = 0.3)]
        wobble: f64,

        /// Pointer pressure multiplier.
        #[arg(long, default_value_t = 1.0)]
        pressure: f64,

        /// PRNG seed; overrides the config's seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Draw the wind arrow overlay.
        #[arg(long)]
        arrows: bool,

        /// Output file path.
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Classify a sprite and print category counts and weights.
    Classify {
        /// Sprite image (PNG).
        image: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the current value and schema of every parameter.
    Params {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn load_config(args: &ConfigArgs) -> Result<SceneConfig, CliError> {
    let text = match &args.config {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| CliError::Input(format!("{}: {e}", path.display())))?,
        None => args.params.clone(),
    };
    Ok(SceneConfig::from_json_str(&text)?)
}

/// One headless render run.
struct RenderJob<'a> {
    image: &'a Path,
    output: &'a Path,
    canvas: (usize, usize),
    frames: usize,
    fps: f64,
    pressure: f64,
}

fn render(
    job: &RenderJob<'_>,
    script: &PointerScript,
    config: SceneConfig,
) -> Result<Simulation, CliError> {
    let RenderJob {
        image,
        output,
        canvas,
        frames,
        fps,
        pressure,
    } = *job;
    if !(fps.is_finite() && fps > 0.0) {
        return Err(CliError::Input(format!("--fps must be positive, got {fps}")));
    }
    let pixels = load_png(image)?;
    let sprite = (pixels.width(), pixels.height());
    let rasterizer = Rasterizer::new(config.render);
    let mut sim = Simulation::new(pixels, config, canvas.0, canvas.1)?;
    info!(frames, fps, "rendering {}", image.display());

    for i in 0..frames {
        let t = if frames > 1 {
            i as f64 / (frames - 1) as f64
        } else {
            0.0
        };
        let pointer = script.position(t, sim.projector(), sprite);
        sim.pointer_move(0, pointer, pressure);
        sim.frame(i as f64 / fps)?;
    }
    debug!(particles = sim.particles().len(), "run finished");

    let frame = rasterizer.render(&sim)?;
    write_png(&frame, output)?;
    Ok(sim)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Params { config } => {
            let config = load_config(&config)?;
            let info = json!({
                "params": config.params(),
                "schema": config.param_schema(),
            });
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                let schema = config.param_schema();
                let params = config.params();
                for (stage, fields) in schema.as_object().into_iter().flatten() {
                    println!("{stage}:");
                    for (key, spec) in fields.as_object().into_iter().flatten() {
                        println!(
                            "  {key} = {} (default {}, {})",
                            params[stage][key], spec["default"], spec["description"]
                                .as_str()
                                .unwrap_or_default()
                        );
                    }
                }
            }
        }
        Command::Classify { image, config } => {
            let config = load_config(&config)?;
            let pixels = load_png(&image)?;
            let mut classifier = PixelClassifier::new(config.classifier);
            let classification = classifier.classify(&pixels);
            let counts = classification.counts();
            let count = |c: PixelCategory| counts.get(&c).copied().unwrap_or(0);
            let range = classification.weight_range();

            if cli.json {
                let counts: serde_json::Map<_, _> = PixelCategory::ALL
                    .into_iter()
                    .map(|c| (c.as_str().to_string(), json!(count(c))))
                    .collect();
                let info = json!({
                    "image": image.display().to_string(),
                    "width": pixels.width(),
                    "height": pixels.height(),
                    "counts": counts,
                    "weight_range": range.map(|(lo, hi)| [lo, hi]),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{} ({}x{})", image.display(), pixels.width(), pixels.height());
                for c in PixelCategory::ALL {
                    println!("  {:<6} {}", c.as_str(), count(c));
                }
                match range {
                    Some((lo, hi)) => println!("  weights {lo:.2} .. {hi:.2}"),
                    None => println!("  weights: no visible pixels"),
                }
            }
        }
        Command::Render {
            image,
            width,
            height,
            frames,
            fps,
            sweeps,
            wobble,
            pressure,
            seed,
            arrows,
            output,
            config,
        } => {
            let mut config = load_config(&config)?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            config.render.wind_arrows |= arrows;
            let seed = config.seed;
            let script = PointerScript::new(seed as u32, sweeps, wobble);

            let job = RenderJob {
                image: &image,
                output: &output,
                canvas: (width, height),
                frames,
                fps,
                pressure,
            };
            let sim = render(&job, &script, config)?;

            if cli.json {
                let info = json!({
                    "image": image.display().to_string(),
                    "width": width,
                    "height": height,
                    "frames": frames,
                    "seed": seed,
                    "particles": sim.particles().len(),
                    "wind_power": sim.wind().total_power(),
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "rendered {} ({width}x{height}, {frames} frames, seed {seed}) -> {}",
                    image.display(),
                    output.display()
                );
            }
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
