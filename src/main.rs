use anyhow::Context;
use cgmath::{Deg, Rad, Vector3};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use terragen::render::headless::HeadlessFactory;
use terragen::render::{Camera, ShaderHandle};
use terragen::world::{HeightSource, HeightSynthesizer, StreamingManager};
use terragen::{logging, GeneratorConfig};

/// Flies a camera across the terrain, streaming chunks in and out with a headless patch backend.
#[derive(Debug, Parser)]
#[command(name = "terragen", version)]
struct Args {
    /// RON config file. Defaults to terrain.ron in the user config directory, if present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 600)]
    frames: u32,
    /// World units travelled per frame.
    #[arg(long, default_value_t = 64.0)]
    speed: f32,
    /// Direction of travel in degrees; 0 flies along +X.
    #[arg(long, default_value_t = 0.0)]
    heading: f32,
    /// Overrides `worker_threads` from the config.
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    let mut config = GeneratorConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(workers) = args.workers {
        config.worker_threads = workers;
    }
    let synthesizer = HeightSynthesizer::new(&config.recipe);
    let mut manager = StreamingManager::new(&config, HeadlessFactory::new())?;

    // Start just above the ground at the origin.
    let ground = synthesizer.height_at(cgmath::Vector2::new(0.0, 0.0));
    let mut camera = Camera::new(Vector3::new(0.0, ground + 20.0, 0.0));
    camera.heading = Rad::from(Deg(args.heading));

    let shader = ShaderHandle(0);
    let start = Instant::now();
    let mut draws = 0;
    for frame in 0..args.frames {
        camera.advance(args.speed);
        manager.update(&camera)?;
        draws += manager.render(shader);
        if frame % 100 == 99 {
            let stats = manager.stats();
            info!(
                "Frame {}: chunk {:?}, {} uploads, {} cache hits, {} in flight",
                frame + 1,
                manager.center(),
                stats.uploads,
                stats.cache_hits,
                stats.in_flight
            );
        }
    }
    manager.flush()?;

    let stats = manager.stats();
    info!(
        "Flew {} frames in {:.2}s: {} patch draws, {} uploads, {} hits, {} misses, {} discarded",
        args.frames,
        start.elapsed().as_secs_f32(),
        draws,
        stats.uploads,
        stats.cache_hits,
        stats.cache_misses,
        stats.discarded
    );
    info!(
        "Average synthesis time per chunk: {:.1}ms",
        stats.average_synthesis_time.as_secs_f64() * 1000.0
    );
    Ok(())
}
