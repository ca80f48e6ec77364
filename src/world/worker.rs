use log::{debug, error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::{ChunkCoord, ChunkSource, LoadedChunk};

/// Square of chunks, `radius` rings around `center`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRegion {
    pub center: ChunkCoord,
    pub radius: u32,
}

impl ChunkRegion {
    pub fn contains(&self, coord: &ChunkCoord) -> bool {
        self.center.ring_distance(coord) <= self.radius
    }
}

pub enum JobOutcome {
    Finished(LoadedChunk),
    /// The chunk had left the retained region by the time a worker picked it up.
    Skipped(ChunkCoord),
}

impl JobOutcome {
    pub fn coord(&self) -> ChunkCoord {
        match self {
            JobOutcome::Finished(loaded) => loaded.coord,
            JobOutcome::Skipped(coord) => *coord,
        }
    }
}

/// Background threads that run cache lookups and synthesis off the caller's thread. Finished
/// chunks come back over a channel; uploading them stays with whoever owns the pool.
pub struct SynthesisPool {
    jobs: Option<Sender<ChunkCoord>>,
    results: Receiver<JobOutcome>,
    handles: Vec<JoinHandle<()>>,
    retained: Arc<Mutex<Option<ChunkRegion>>>,
    shutdown: Arc<AtomicBool>,
}

struct WorkerShared {
    jobs: Arc<Mutex<Receiver<ChunkCoord>>>,
    retained: Arc<Mutex<Option<ChunkRegion>>>,
    shutdown: Arc<AtomicBool>,
}

fn worker_loop(source: ChunkSource, shared: WorkerShared, tx: Sender<JobOutcome>) {
    loop {
        let coord = {
            let jobs = match shared.jobs.lock() {
                Ok(jobs) => jobs,
                Err(_) => return,
            };
            match jobs.recv() {
                Ok(coord) => coord,
                Err(_) => return,
            }
        };
        // Anything still queued at shutdown is dropped unrun.
        if shared.shutdown.load(Ordering::Relaxed) {
            return;
        }
        let wanted = match shared.retained.lock() {
            Ok(region) => region.map_or(true, |region| region.contains(&coord)),
            Err(_) => true,
        };
        let outcome = if wanted {
            JobOutcome::Finished(source.load(coord))
        } else {
            JobOutcome::Skipped(coord)
        };
        if tx.send(outcome).is_err() {
            return;
        }
    }
}

impl SynthesisPool {
    pub fn new(source: ChunkSource, num_threads: usize) -> SynthesisPool {
        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (results_tx, results_rx) = mpsc::channel();
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));
        let retained = Arc::new(Mutex::new(None));
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let source = source.clone();
            let shared = WorkerShared {
                jobs: Arc::clone(&jobs_rx),
                retained: Arc::clone(&retained),
                shutdown: Arc::clone(&shutdown),
            };
            let results_tx = results_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("chunk-synthesis-{}", index))
                .spawn(move || worker_loop(source, shared, results_tx));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(err) => error!("Failed to spawn chunk synthesis thread: {}", err),
            }
        }
        debug!("Started {} chunk synthesis threads", handles.len());
        SynthesisPool {
            jobs: Some(jobs_tx),
            results: results_rx,
            handles,
            retained,
            shutdown,
        }
    }

    pub fn num_threads(&self) -> usize {
        self.handles.len()
    }

    /// Queues a chunk. Returns false if no worker is left to run it.
    pub fn submit(&self, coord: ChunkCoord) -> bool {
        match &self.jobs {
            Some(jobs) if !self.handles.is_empty() => jobs.send(coord).is_ok(),
            _ => false,
        }
    }

    /// Queued chunks outside `region` are skipped instead of synthesized. `None` runs everything.
    pub fn retain_region(&self, region: Option<ChunkRegion>) {
        match self.retained.lock() {
            Ok(mut retained) => *retained = region,
            Err(_) => error!("Chunk synthesis region lock is poisoned"),
        }
    }

    /// Every job that finished since the last call, without blocking.
    pub fn try_results(&self) -> Vec<JobOutcome> {
        self.results.try_iter().collect()
    }

    /// Blocks until the next job finishes. `None` once every worker has exited.
    pub fn wait_result(&self) -> Option<JobOutcome> {
        self.results.recv().ok()
    }
}

impl Drop for SynthesisPool {
    fn drop(&mut self) {
        // Workers finish the chunk they are on and drop the rest of the queue.
        self.shutdown.store(true, Ordering::Relaxed);
        self.jobs.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("A chunk synthesis thread panicked");
            }
        }
    }
}
