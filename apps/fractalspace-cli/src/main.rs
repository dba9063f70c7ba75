use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use fractalspace_common::FractalSettings;
use fractalspace_kernel::{Fractal, Palette};
use fractalspace_render::{DebugTextRenderer, HostBackend, InstanceBackend, RenderedFractal, Renderer};
use fractalspace_render_wgpu::WgpuInstanceBackend;
use fractalspace_tools::{TickProfiler, TreeInspector};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fractalspace-cli", about = "CLI tool for fractalspace operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Build a fractal, tick it and publish every frame
    Run {
        /// Settings file (JSON); flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of levels
        #[arg(short, long)]
        depth: Option<u32>,
        /// Root spin in degrees per second
        #[arg(short, long)]
        speed: Option<f32>,
        /// Worker threads, 0 for one per core
        #[arg(long)]
        threads: Option<usize>,
        /// Number of frames to simulate
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Seconds per frame
        #[arg(long, default_value = "0.016666668")]
        dt: f32,
        /// Upload to a GPU device instead of host memory
        #[arg(long)]
        gpu: bool,
    },
    /// Tick a fractal, then print one node
    Inspect {
        #[arg(short, long, default_value = "4")]
        depth: u32,
        #[arg(short, long, default_value = "1")]
        ticks: u64,
        #[arg(short, long, default_value = "1")]
        level: usize,
        #[arg(short, long, default_value = "0")]
        index: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("fractalspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", fractalspace_common::crate_info());
            println!("kernel: {}", fractalspace_kernel::crate_info());
            println!("render: {}", fractalspace_render::crate_info());
            println!("tools: {}", fractalspace_tools::crate_info());
            let defaults = FractalSettings::default();
            println!(
                "defaults: depth={} children={} speed={}deg/s",
                defaults.depth, defaults.child_count, defaults.speed_rotation
            );
        }
        Commands::Run {
            config,
            depth,
            speed,
            threads,
            ticks,
            dt,
            gpu,
        } => {
            let mut settings = load_settings(config.as_deref())?;
            if let Some(depth) = depth {
                settings.depth = depth;
            }
            if let Some(speed) = speed {
                settings.speed_rotation = speed;
            }
            if let Some(threads) = threads {
                settings.worker_threads = threads;
            }

            if gpu {
                let backend = pollster::block_on(WgpuInstanceBackend::headless())
                    .context("gpu setup failed")?;
                run_frames(settings, backend, ticks, dt)?;
            } else {
                run_frames(settings, HostBackend::new(), ticks, dt)?;
            }
        }
        Commands::Inspect {
            depth,
            ticks,
            level,
            index,
        } => {
            let settings = FractalSettings {
                depth,
                ..FractalSettings::default()
            };
            let mut fractal = Fractal::new(settings, Palette::standard())?;
            fractal.build()?;
            for _ in 0..ticks {
                fractal.tick(1.0 / 60.0)?;
            }

            println!("{}", TreeInspector::summary(&fractal));
            let tree = fractal
                .tree()
                .context("fractal was torn down unexpectedly")?;
            match TreeInspector::inspect_node(tree, level, index) {
                Some(info) => println!("{info}"),
                None => anyhow::bail!("no node at level {level} index {index}"),
            }
            println!(
                "level {level} extent: {:.3}",
                TreeInspector::level_extent(tree, level)
            );
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<FractalSettings> {
    match path {
        Some(path) => FractalSettings::load_json(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(FractalSettings::default()),
    }
}

fn run_frames<B: InstanceBackend>(
    settings: FractalSettings,
    backend: B,
    ticks: u64,
    dt: f32,
) -> anyhow::Result<()> {
    println!(
        "Running fractal: depth={} children={} ticks={ticks} dt={dt}",
        settings.depth, settings.child_count
    );

    let mut rendered = RenderedFractal::new(settings, Palette::standard(), backend)?;
    rendered.build()?;

    let mut profiler = TickProfiler::new(120);
    for _ in 0..ticks {
        profiler.time(|| rendered.tick(dt).map(|_| ()))?;
    }

    let report = DebugTextRenderer::new().render(rendered.fractal(), rendered.draw_batches());
    print!("{report}");
    println!("{}", TreeInspector::summary(rendered.fractal()));
    println!("Tick timing: {profiler}");

    rendered.teardown();
    Ok(())
}
