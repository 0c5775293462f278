use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use animpace::{
    AnimpaceConfig, Category, Coordinator, FrameRate, ItemId, Size, Stage, SvgStripLoader,
};

#[derive(Parser, Debug)]
#[command(name = "animpace", version)]
struct Cli {
    /// Log scheduling and dispatch details.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play an SVG frame-strip animation on a number of items and report render counters.
    Play(PlayArgs),
    /// Print the rate a category recommends as its population grows.
    Rates(RatesArgs),
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input SVG strip JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Render width in pixels.
    #[arg(long, default_value_t = 128)]
    width: u32,

    /// Render height in pixels.
    #[arg(long, default_value_t = 128)]
    height: u32,

    /// Number of items playing the animation.
    #[arg(long, default_value_t = 1)]
    items: usize,

    /// Rate category of every item.
    #[arg(long, value_enum, default_value_t = CategoryChoice::Standard)]
    category: CategoryChoice,

    /// Loops before an item finishes; 0 plays until the time limit.
    #[arg(long, default_value_t = 1)]
    loops: u32,

    /// Fixed frame rate for items outside any category.
    #[arg(long)]
    fps: Option<u32>,

    /// Wall-clock limit in seconds.
    #[arg(long, default_value_t = 10.0)]
    seconds: f64,

    /// JSON runtime configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the last frame of the first item as a PNG.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RatesArgs {
    /// Largest population to report.
    #[arg(long, default_value_t = 60)]
    count: usize,

    /// Category to populate.
    #[arg(long, value_enum, default_value_t = CategoryChoice::Standard)]
    category: CategoryChoice,

    /// JSON runtime configuration.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CategoryChoice {
    None,
    Standard,
    Icon,
}

impl From<CategoryChoice> for Category {
    fn from(c: CategoryChoice) -> Self {
        match c {
            CategoryChoice::None => Category::None,
            CategoryChoice::Standard => Category::Standard,
            CategoryChoice::Icon => Category::Icon,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.cmd {
        Command::Play(args) => cmd_play(args),
        Command::Rates(args) => cmd_rates(args),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AnimpaceConfig> {
    match path {
        Some(p) => AnimpaceConfig::from_path(p)
            .with_context(|| format!("load config '{}'", p.display())),
        None => Ok(AnimpaceConfig::default()),
    }
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    if !args.seconds.is_finite() || args.seconds <= 0.0 {
        anyhow::bail!("--seconds must be > 0");
    }
    let cfg = load_config(args.config.as_ref())?;
    let fps = args.fps.map(FrameRate::new).transpose()?;

    let mut stage = Stage::new(&cfg, Arc::new(SvgStripLoader::new()))?;
    for _ in 0..args.items {
        let item = stage.add_item();
        item.set_category(args.category.into());
        if let Some(fps) = fps {
            item.set_frame_rate(fps);
        }
        item.set_loops(args.loops);
        item.set_source_size(Size::new(f64::from(args.width), f64::from(args.height)))?;
        item.set_source(&args.in_path)
            .with_context(|| format!("load animation '{}'", args.in_path.display()))?;
        if !item.running() {
            item.resume();
        }
    }

    let started = Instant::now();
    stage.run_until(started + Duration::from_secs_f64(args.seconds))?;
    let elapsed = started.elapsed();

    for item in stage.items() {
        let s = item.stats();
        println!(
            "{} state={:?} rate={} loop={} rendered={} failed={} dropped={}",
            item.id(),
            item.state(),
            item.frame_rate().get(),
            item.current_loop(),
            s.frames_rendered,
            s.frames_failed,
            s.ticks_dropped
        );
    }
    let total = stage.stats();
    println!(
        "items={} rendered={} elapsed_ms={}",
        stage.items().len(),
        total.frames_rendered,
        elapsed.as_millis()
    );

    if let Some(first) = stage.items().first() {
        let mut canvas = image::RgbaImage::new(args.width, args.height);
        if first.paint(&mut canvas) {
            let digest = xxhash_rust::xxh3::xxh3_64(canvas.as_raw());
            println!("digest={digest:016x}");
            if let Some(out) = &args.out {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("create output dir '{}'", parent.display()))?;
                }
                canvas
                    .save_with_format(out, image::ImageFormat::Png)
                    .with_context(|| format!("write png '{}'", out.display()))?;
                eprintln!("wrote {}", out.display());
            }
        }
    }

    stage.shutdown()?;
    Ok(())
}

fn cmd_rates(args: RatesArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let coordinator = Coordinator::new(cfg.coordinator)?;
    let category = Category::from(args.category);

    let ids: Vec<ItemId> = (0..args.count).map(|_| ItemId::next()).collect();
    let mut last = None;
    for (n, id) in ids.iter().enumerate() {
        let rate = coordinator.register(category, *id);
        if last != Some(rate) {
            println!("population={} rate={}", n + 1, rate.get());
            last = Some(rate);
        }
    }
    for id in &ids {
        coordinator.unregister(category, *id);
    }
    coordinator.shutdown()?;
    Ok(())
}
