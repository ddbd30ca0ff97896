use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use terrain_sculpt::brush::BrushAction;
use terrain_sculpt::export;
use terrain_sculpt::heightmap::{HeightStore, TerrainData, WorldPos};
use terrain_sculpt::inference;
use terrain_sculpt::input::{ControllerBindings, ControllerFrame, SculptEvent, Sculptor};
use terrain_sculpt::params::{InferenceBackend, SculptConfig, TerrainKind};
use terrain_sculpt::pipeline::{CommitReport, TerrainModifier};
use terrain_sculpt::tilemap::Tilemap;

#[derive(Parser, Debug)]
#[command(name = "terrain_sculpt")]
#[command(about = "Sculpt terrain heightmaps with brush strokes and generative models")]
struct Args {
    /// JSON configuration file (missing fields use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Heightmap to start from (16-bit grayscale PNG). A flat terrain is used if omitted.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the resulting heightmap
    #[arg(short, long, default_value = "terrain.png")]
    output: PathBuf,

    /// Also write a hillshaded preview here
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Heightmap resolution when no input is given (2^k + 1)
    #[arg(short = 'r', long, default_value = "513")]
    resolution: usize,

    /// Terrain width and depth in world units
    #[arg(long, default_value = "1000")]
    size: f32,

    /// Terrain height scale in world units
    #[arg(long, default_value = "600")]
    height_scale: f32,

    /// Terrain kind override (mountain, canyon, glacier)
    #[arg(short, long)]
    kind: Option<TerrainKind>,

    /// Erosion strength override (0-100)
    #[arg(short, long)]
    erosion: Option<f32>,

    /// Blur radius override
    #[arg(short, long)]
    blur: Option<u32>,

    /// Use the HTTP model server instead of the identity backend
    #[arg(long)]
    http: bool,

    /// Write per-commit snapshots into this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a rolling starting terrain from noise
    Generate {
        /// Random seed (uses random seed if not specified)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Peak relief above the baseline, in world units
        #[arg(long, default_value = "40")]
        relief: f32,
    },
    /// Draw one straight stroke at a fixed hand height and commit it
    Stroke {
        /// Start point "x,z" in world units
        #[arg(long)]
        from: String,

        /// End point "x,z" in world units
        #[arg(long)]
        to: String,

        /// Hand height above the baseline, in world units
        #[arg(long, default_value = "30")]
        lift: f32,

        /// Number of stroke updates along the line
        #[arg(long, default_value = "24")]
        steps: usize,

        /// Fill the stroke interior
        #[arg(long)]
        filled: bool,
    },
    /// Replay a JSON list of sculpt events, or controller frames with --frames
    Replay {
        script: PathBuf,

        #[arg(long)]
        frames: bool,
    },
    /// Run the generative pass over the whole terrain
    Restyle,
    /// Apply one editor brush action at a point
    Brush {
        /// 0 raise, 1 lower, 2 flatten, 3 sample, 4 sample average
        #[arg(long, default_value = "3")]
        action: usize,

        /// Center "x,z" in world units
        #[arg(long)]
        at: String,

        /// Stroke strength (raise/lower) or normalized target height (flatten)
        #[arg(long, default_value = "0")]
        value: f32,

        /// Brush size slider (brush side = slider scale * size)
        #[arg(long, default_value = "0.1")]
        size: f32,
    },
    /// Reset the terrain to the flat baseline
    Clear,
    /// Print the effective configuration as JSON
    Config,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = load_config(&args)?;
    if let Command::Config = args.command {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    let terrain = load_terrain(&args, &config)?;
    println!(
        "Terrain: {}x{} cells, {} x {} x {} world units",
        terrain.resolution(),
        terrain.resolution(),
        terrain.size().x,
        terrain.size().y,
        terrain.size().z
    );

    let loader = inference::loader_from_config(&config.inference).context("creating inference backend")?;
    let modifier = TerrainModifier::from_config(loader, &config);
    let mut sculptor = Sculptor::new(terrain, modifier, config);

    match &args.command {
        Command::Generate { seed, relief } => {
            let seed = seed.unwrap_or_else(|| rand::random());
            println!("Generating terrain with seed: {}", seed);
            let heights = generate_terrain(sculptor.terrain(), sculptor.config(), seed, *relief);
            let mut terrain = sculptor.into_terrain();
            terrain.set_heights(0, 0, &heights)?;
            return save(&args, &terrain);
        }
        Command::Stroke { from, to, lift, steps, filled } => {
            let from = parse_point(from)?;
            let to = parse_point(to)?;
            sculptor.config_mut().filled = *filled;
            let y = sculptor.terrain().position().y + sculptor.config().terrain_offset + lift;
            let steps = (*steps).max(1);

            sculptor.handle(SculptEvent::StrokeBegin(WorldPos::new(from.0, y, from.1)))?;
            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                let p = WorldPos::new(from.0 + (to.0 - from.0) * t, y, from.1 + (to.1 - from.1) * t);
                sculptor.handle(SculptEvent::StrokeUpdate(p))?;
            }
            report(sculptor.handle(SculptEvent::StrokeEnd)?);
        }
        Command::Replay { script, frames } => {
            let text = std::fs::read_to_string(script)
                .with_context(|| format!("reading {}", script.display()))?;
            let events: Vec<SculptEvent> = if *frames {
                let frames: Vec<ControllerFrame> = serde_json::from_str(&text).context("parsing controller frames")?;
                let mut bindings = ControllerBindings::new();
                frames.iter().flat_map(|f| bindings.events(f)).collect()
            } else {
                serde_json::from_str(&text).context("parsing sculpt events")?
            };
            info!("Replaying {} events", events.len());
            for event in events {
                report(sculptor.handle(event)?);
            }
            if sculptor.is_stroking() {
                println!("Script ended mid-stroke; committing");
                report(sculptor.handle(SculptEvent::StrokeEnd)?);
            }
        }
        Command::Restyle => {
            report(Some(sculptor.restyle()?));
        }
        Command::Brush { action, at, value, size } => {
            let brush = BrushAction::from_index(*action)
                .with_context(|| format!("brush action must be 0-4, got {}", action))?;
            let (x, z) = parse_point(at)?;
            let (w, h) = brush_size(sculptor.config(), *size);
            match sculptor.apply_brush_action(brush, WorldPos::new(x, 0.0, z), *value, w, h)? {
                Some(v) => {
                    println!("Height at ({}, {}): {:.5} ({:.2} world units)", x, z, v, v * sculptor.terrain().size().y);
                    return Ok(());
                }
                None if sculptor.is_stroking() => report(sculptor.handle(SculptEvent::StrokeEnd)?),
                None => {}
            }
        }
        Command::Clear => {
            sculptor.handle(SculptEvent::ClearTerrain)?;
        }
        Command::Config => return Ok(()),
    }

    save(&args, sculptor.terrain())
}

fn load_config(args: &Args) -> Result<SculptConfig> {
    let mut config = match &args.config {
        Some(path) => SculptConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => SculptConfig::default(),
    };
    if let Some(kind) = args.kind {
        config.terrain_kind = kind;
    }
    if let Some(e) = args.erosion {
        config.erosion_strength = e.clamp(0.0, 100.0);
    }
    if let Some(b) = args.blur {
        config.blur_strength = b;
    }
    if args.http {
        config.inference.backend = InferenceBackend::Http;
    }
    if args.debug_dir.is_some() {
        config.debug_dir = args.debug_dir.clone();
    }
    Ok(config)
}

fn load_terrain(args: &Args, config: &SculptConfig) -> Result<TerrainData> {
    let size = WorldPos::new(args.size, args.height_scale, args.size);
    match &args.input {
        Some(path) => {
            let heights = export::load_heightmap_png(path)
                .with_context(|| format!("loading heightmap {}", path.display()))?;
            Ok(TerrainData::from_heights(heights, size, WorldPos::default())?)
        }
        None => {
            if args.resolution < 2 {
                bail!("resolution must be at least 2, got {}", args.resolution);
            }
            let mut terrain = TerrainData::new(args.resolution, size, WorldPos::default());
            terrain.clear_terrain(config.terrain_offset)?;
            Ok(terrain)
        }
    }
}

/// Baseline plus a few octaves of Perlin relief, with randomized phase.
fn generate_terrain(terrain: &TerrainData, config: &SculptConfig, seed: u64, relief: f32) -> Tilemap<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let perlin = Perlin::new(rng.gen());
    let phase: (f64, f64) = (rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0));

    let res = terrain.resolution();
    let baseline = terrain.baseline(config.terrain_offset);
    let amplitude = relief / terrain.size().y;
    let mut heights = Tilemap::new_with(res, res, baseline);
    for (x, y, h) in heights.iter_mut() {
        let mut n = 0.0;
        let mut freq = 4.0 / res as f64;
        let mut amp = 1.0;
        for _ in 0..4 {
            n += perlin.get([x as f64 * freq + phase.0, y as f64 * freq + phase.1]) * amp;
            freq *= 2.0;
            amp *= 0.5;
        }
        *h = (baseline + (n as f32 * 0.5 + 0.5) * amplitude).clamp(0.0, 1.0);
    }
    heights
}

fn brush_size(config: &SculptConfig, size: f32) -> (usize, usize) {
    terrain_sculpt::brush::brush_size_from_slider(size, config.brush.size_slider_scale)
}

fn parse_point(s: &str) -> Result<(f32, f32)> {
    let (x, z) = s
        .split_once(',')
        .with_context(|| format!("expected \"x,z\", got \"{}\"", s))?;
    Ok((
        x.trim().parse().with_context(|| format!("bad x in \"{}\"", s))?,
        z.trim().parse().with_context(|| format!("bad z in \"{}\"", s))?,
    ))
}

fn report(result: Option<CommitReport>) {
    if let Some(r) = result {
        println!(
            "Committed {} at ({}, {}) range {}: heights {:.4}..{:.4}, max color {:.3}, {} cells changed{}",
            r.kind,
            r.region.x_offset,
            r.region.y_offset,
            r.region.range,
            r.min_height,
            r.max_height,
            r.max_color,
            r.cells_changed,
            if r.skipped { " (skipped: black output)" } else { "" }
        );
    }
}

fn save<S: HeightStore>(args: &Args, terrain: &S) -> Result<()> {
    let heights = terrain.all_heights()?;
    write_outputs(&heights, &args.output, args.preview.as_deref())
}

fn write_outputs(heights: &Tilemap<f32>, output: &Path, preview: Option<&Path>) -> Result<()> {
    export::save_heightmap_png(heights, output).with_context(|| format!("writing {}", output.display()))?;
    println!("Saved heightmap to {}", output.display());
    if let Some(path) = preview {
        export::render_hillshade(heights, 40.0)
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Saved preview to {}", path.display());
    }
    Ok(())
}
