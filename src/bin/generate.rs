use anyhow::Context;
use clap::Parser;
use image::{GrayImage, Luma, Rgb, RgbImage};
use log::info;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use terragen::util;
use terragen::world::{
    ChunkCache, ChunkCoord, ChunkImages, ChunkOrigin, ChunkSource, HeightSynthesizer,
    JobOutcome, LoadedChunk, SynthesisPool,
};
use terragen::{logging, GeneratorConfig};

/// Fills the chunk cache ahead of time for every chunk within a radius of the origin.
#[derive(Debug, Parser)]
#[command(name = "generate", version)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Chunks generated in each direction from chunk (0, 0).
    #[arg(long, default_value_t = 4)]
    radius: i32,
    /// Also write height and normal map PNGs for every chunk into this directory.
    #[arg(long)]
    preview: Option<PathBuf>,
}

struct StatTracker {
    total_items: usize,
    remaining_items: usize,
    total_item_time: f64,
    num_timed_items: f64,
    update_interval: usize,
    update_ticker: usize,
}

impl StatTracker {
    fn new(num_items: usize) -> Self {
        StatTracker {
            total_items: num_items,
            remaining_items: num_items,
            total_item_time: 0.0,
            num_timed_items: 0.0,
            update_interval: 4,
            update_ticker: 0,
        }
    }

    fn end_item(&mut self, loaded: &LoadedChunk) {
        self.remaining_items -= 1;
        if loaded.origin == ChunkOrigin::Synthesized {
            self.total_item_time += loaded.synthesis_time.as_secs_f64();
            self.num_timed_items += 1.0;
        }
    }

    fn print_status(&mut self) -> io::Result<()> {
        self.update_ticker += 1;
        if self.update_ticker < self.update_interval && self.remaining_items > 0 {
            return Ok(());
        }
        self.update_ticker = 0;
        let percent = (self.total_items - self.remaining_items) as f64 / self.total_items as f64;
        print!("\r{:.1}%", percent * 100.0);
        if self.num_timed_items > 4.0 {
            let time_per_item = self.total_item_time / self.num_timed_items;
            let remaining_seconds = (self.remaining_items as f64 * time_per_item) as u64;
            print!(
                ", ETA {:01}m{:01}s",
                remaining_seconds / 60,
                remaining_seconds % 60,
            );
        }
        print!("                    ");
        io::stdout().flush()
    }
}

fn to_byte(value: f32) -> u8 {
    (value.max(0.0).min(1.0) * 255.0) as u8
}

fn write_previews(dir: &Path, images: &ChunkImages, coord: ChunkCoord, range: (f32, f32)) -> anyhow::Result<()> {
    let size = images.size() as u32;
    let (low, high) = range;
    let heights = GrayImage::from_fn(size, size, |x, y| {
        let height = images.height(x as usize, y as usize);
        Luma([to_byte((height - low) / (high - low))])
    });
    let path = dir.join(format!("height_{}_{}.png", coord.x, coord.y));
    heights
        .save(&path)
        .with_context(|| format!("writing {:?}", path))?;

    let normals = RgbImage::from_fn(size, size, |x, y| {
        let normal = images.normal(x as usize, y as usize);
        Rgb([
            to_byte(normal.x * 0.5 + 0.5),
            to_byte(normal.y * 0.5 + 0.5),
            to_byte(normal.z * 0.5 + 0.5),
        ])
    });
    let path = dir.join(format!("normal_{}_{}.png", coord.x, coord.y));
    normals
        .save(&path)
        .with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();
    let mut config = GeneratorConfig::load(args.config.as_deref()).context("loading config")?;
    // Entries written here are meant to outlive this run.
    config.cache.persistent = true;

    if let Some(dir) = &args.preview {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    }
    // Previews share one elevation scale so neighbouring tiles line up.
    let recipe = &config.recipe;
    let preview_range = (
        recipe.transforms.sea.floor * recipe.amplitude + recipe.offset,
        recipe.transforms.mountains.peak * recipe.amplitude + recipe.offset,
    );

    let cache = ChunkCache::open(&config.cache.directory, config.chunk_size, true);
    let source = ChunkSource::new(
        Arc::new(cache),
        Arc::new(HeightSynthesizer::new(&config.recipe)),
        config.chunk_size,
    );
    let coords: Vec<_> = util::signed_square_iter((0, 0), args.radius)
        .map(|(x, y)| ChunkCoord::new(x, y))
        .collect();
    let mut stat_tracker = StatTracker::new(coords.len());
    let start = Instant::now();
    println!("\nGenerating {} chunks...", coords.len());

    let mut handle = |loaded: LoadedChunk| -> anyhow::Result<()> {
        if let Some(dir) = &args.preview {
            write_previews(dir, &loaded.images, loaded.coord, preview_range)?;
        }
        stat_tracker.end_item(&loaded);
        stat_tracker.print_status()?;
        Ok(())
    };

    if config.worker_threads > 0 {
        let pool = SynthesisPool::new(source.clone(), config.worker_threads);
        let mut queued = 0;
        for coord in &coords {
            if pool.submit(*coord) {
                queued += 1;
            } else {
                handle(source.load(*coord))?;
            }
        }
        for _ in 0..queued {
            match pool.wait_result() {
                Some(JobOutcome::Finished(loaded)) => handle(loaded)?,
                // No region is retained here, so nothing should be skipped.
                Some(JobOutcome::Skipped(coord)) => handle(source.load(coord))?,
                None => anyhow::bail!("synthesis workers exited early"),
            }
        }
    } else {
        for coord in &coords {
            handle(source.load(*coord))?;
        }
    }
    println!();
    info!(
        "Generated {} chunks into {:?} in {:.1}s",
        coords.len(),
        source.cache().storage_dir(),
        start.elapsed().as_secs_f32()
    );
    Ok(())
}
