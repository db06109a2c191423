//! Background optimization that only runs the most recent request
//!
//! Requests go into a single slot guarded by a mutex. Submitting while a
//! request is still waiting replaces it, and a run already in progress is
//! cancelled, so a burst of parameter changes costs at most one completed
//! simplification. Finished results come back over a channel.

use crate::{optimize_scene, Scene, SceneOptimization};
use crossbeam_channel::{unbounded, Receiver, Sender};
use meshlod_core::{Error, Result};
use meshlod_simplification::{CancellationToken, SimplifyOptions};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Simplify `scene` keeping `ratio` of each mesh's faces
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub scene: Arc<Scene>,
    pub options: SimplifyOptions,
    pub ratio: f32,
}

/// A finished run, tagged with the generation returned by
/// [`OptimizationWorker::submit`]
#[derive(Debug)]
pub struct OptimizationOutcome {
    pub generation: u64,
    pub result: Result<SceneOptimization>,
}

#[derive(Default)]
struct Slot {
    pending: Option<(u64, OptimizationRequest)>,
    in_flight: Option<CancellationToken>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
    started: AtomicUsize,
    superseded: AtomicUsize,
}

/// Owns the background thread; dropping it stops and joins the thread
pub struct OptimizationWorker {
    shared: Arc<Shared>,
    results: Receiver<OptimizationOutcome>,
    next_generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl OptimizationWorker {
    pub fn spawn() -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let (sender, results) = unbounded();

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("meshlod-optimizer".to_string())
            .spawn(move || run(thread_shared, sender))?;

        Ok(Self {
            shared,
            results,
            next_generation: 0,
            handle: Some(handle),
        })
    }

    /// Queue `request`, replacing one that has not started yet and
    /// cancelling the run in progress. Returns the request's generation.
    pub fn submit(&mut self, request: OptimizationRequest) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;

        let mut slot = self.shared.slot.lock();
        if let Some((old, _)) = slot.pending.replace((generation, request)) {
            self.shared.superseded.fetch_add(1, Ordering::Relaxed);
            debug!("request {} superseded by {}", old, generation);
        }
        if let Some(token) = &slot.in_flight {
            token.cancel();
        }
        drop(slot);

        self.shared.wake.notify_one();
        generation
    }

    /// Newest outcome received so far, discarding older ones
    pub fn try_latest(&self) -> Option<OptimizationOutcome> {
        self.results.try_iter().last()
    }

    /// Block until an outcome for `generation` or a later request arrives
    pub fn wait_for(&self, generation: u64, timeout: Duration) -> Option<OptimizationOutcome> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.results.recv_timeout(remaining) {
                Ok(outcome) if outcome.generation >= generation => return Some(outcome),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Requests the thread has picked up, including ones later cancelled
    pub fn started(&self) -> usize {
        self.shared.started.load(Ordering::Relaxed)
    }

    /// Requests replaced before they started
    pub fn superseded(&self) -> usize {
        self.shared.superseded.load(Ordering::Relaxed)
    }

    /// Stop the thread, cancelling any run in progress, and wait for it
    pub fn shutdown(&mut self) {
        {
            let mut slot = self.shared.slot.lock();
            slot.shutdown = true;
            slot.pending = None;
            if let Some(token) = &slot.in_flight {
                token.cancel();
            }
        }
        self.shared.wake.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("optimizer thread panicked");
            }
            debug!(
                "optimizer stopped: {} request(s) started, {} superseded",
                self.started(),
                self.superseded()
            );
        }
    }
}

impl Drop for OptimizationWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: Arc<Shared>, sender: Sender<OptimizationOutcome>) {
    loop {
        let (generation, request, token) = {
            let mut slot = shared.slot.lock();
            loop {
                if slot.shutdown {
                    return;
                }
                if let Some((generation, request)) = slot.pending.take() {
                    shared.started.fetch_add(1, Ordering::Relaxed);
                    let token = CancellationToken::new();
                    slot.in_flight = Some(token.clone());
                    break (generation, request, token);
                }
                shared.wake.wait(&mut slot);
            }
        };

        debug!("running request {} (ratio {})", generation, request.ratio);
        let result = optimize_scene(&request.scene, &request.options, request.ratio, Some(&token));
        shared.slot.lock().in_flight = None;

        match &result {
            Err(Error::Cancelled) => {
                debug!("request {} cancelled", generation);
                continue;
            }
            Err(e) => warn!("request {} failed: {}", generation, e),
            Ok(done) => debug!(
                "request {} finished: {} -> {} faces",
                generation,
                done.original_face_count(),
                done.final_face_count()
            ),
        }

        if sender.send(OptimizationOutcome { generation, result }).is_err() {
            return;
        }
    }
}
