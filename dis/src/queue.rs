//! Background reformatting
//!
//! Producers push `(address, format)` requests; a single worker thread drains
//! them a slice at a time. The listing, its symbol tables, the request queue
//! and the faults raised while draining all sit behind one mutex, which the
//! worker holds for a whole slice.

use std::{
    collections::VecDeque,
    mem,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{error::DisasmError, line::Format, listing::Listing};

#[cfg(test)]
mod tests;

/// Reformat the line starting at `address`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatRequest {
    pub address: u16,
    pub format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Granularity of a slice; see [`Engine::drain_slice`].
    pub slice_size: usize,
    /// Pause after a slice before looking again.
    pub slice_yield: Duration,
    /// Pause when there was nothing to do.
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            slice_size: 5,
            slice_yield: Duration::from_millis(5),
            poll_interval: Duration::from_millis(10),
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueState {
    Stopped = 0,
    Running = 1,
    Paused = 2,
}

impl From<u8> for QueueState {
    fn from(value: u8) -> Self {
        match value {
            1 => QueueState::Running,
            2 => QueueState::Paused,
            _ => QueueState::Stopped,
        }
    }
}

/// What the lock guards.
#[derive(Debug)]
pub struct Engine {
    listing: Listing,
    queue: VecDeque<FormatRequest>,
    faults: Vec<DisasmError>,
}

impl Engine {
    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn listing_mut(&mut self) -> &mut Listing {
        &mut self.listing
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Applies the next slice of requests followed by one resync. Returns how
    /// many requests were taken.
    ///
    /// A slice is the remainder of the queue length over `slice_size`, or the
    /// whole queue when it divides evenly.
    pub fn drain_slice(&mut self, slice_size: usize) -> usize {
        let slice_size = slice_size.max(1);
        let count = self.queue.len();
        if count == 0 {
            return 0;
        }
        let take = match count % slice_size {
            0 => count,
            rest => rest,
        };

        let mut applied = 0;
        for request in self.queue.drain(..take).collect::<Vec<_>>() {
            let result = match self.listing.row_of(request.address) {
                Some(row) => self.listing.splice(row, request.format),
                None => Err(DisasmError::UnknownAddress(request.address)),
            };
            match result {
                Ok(()) => applied += 1,
                Err(err) => {
                    warn!("dropped {} at ${:04X}: {err}", request.format, request.address);
                    self.faults.push(err);
                }
            }
        }
        if applied > 0 {
            if let Err(err) = self.listing.sync_rows_labels() {
                warn!("resync failed: {err}");
                self.faults.push(err);
            }
        }
        debug!("slice of {take}, {} pending", self.queue.len());
        take
    }

    fn drain_all(&mut self, slice_size: usize) {
        while self.drain_slice(slice_size) > 0 {}
    }
}

pub struct FormatQueue {
    shared: Arc<Mutex<Engine>>,
    state: Arc<AtomicU8>,
    config: QueueConfig,
    worker: Option<JoinHandle<()>>,
}

impl FormatQueue {
    pub fn new(listing: Listing, config: QueueConfig) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Engine {
                listing,
                queue: VecDeque::new(),
                faults: Vec::new(),
            })),
            state: Arc::new(AtomicU8::new(QueueState::Stopped as u8)),
            config,
            worker: None,
        }
    }

    pub fn state(&self) -> QueueState {
        QueueState::from(self.state.load(Ordering::Acquire))
    }

    /// Starts draining, spawning the worker if there is none.
    pub fn start(&mut self) {
        self.state
            .store(QueueState::Running as u8, Ordering::Release);
        self.spawn();
    }

    /// Stops draining but keeps the worker.
    pub fn pause(&mut self) {
        self.state
            .store(QueueState::Paused as u8, Ordering::Release);
        self.spawn();
    }

    /// Tells the worker to exit and waits for it.
    pub fn stop(&mut self) {
        self.state
            .store(QueueState::Stopped as u8, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("format worker panicked");
            }
            info!("format worker stopped");
        }
    }

    fn spawn(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let shared = self.shared.clone();
        let state = self.state.clone();
        let config = self.config;
        self.worker = Some(thread::spawn(move || run(&shared, &state, config)));
        info!("format worker started");
    }

    pub fn enqueue(&self, request: FormatRequest) {
        self.lock().queue.push_back(request);
    }

    pub fn enqueue_all<I: IntoIterator<Item = FormatRequest>>(&self, requests: I) {
        self.lock().queue.extend(requests);
    }

    pub fn pending(&self) -> usize {
        self.lock().pending()
    }

    /// Locks the engine for reading or direct edits.
    pub fn lock(&self) -> MutexGuard<'_, Engine> {
        lock(&self.shared)
    }

    /// Waits for the worker to empty the queue. Without a running worker the
    /// queue is drained on the calling thread; while paused nothing happens.
    pub fn flush(&self) {
        match self.state() {
            QueueState::Running => {
                while self.pending() > 0 && self.state() == QueueState::Running {
                    thread::sleep(self.config.poll_interval);
                }
            }
            QueueState::Stopped => self.lock().drain_all(self.config.slice_size),
            QueueState::Paused => debug!("flush while paused"),
        }
    }

    /// Errors raised while draining since the last call.
    pub fn take_faults(&self) -> Vec<DisasmError> {
        mem::take(&mut self.lock().faults)
    }
}

impl Drop for FormatQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(shared: &Mutex<Engine>) -> MutexGuard<'_, Engine> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run(shared: &Mutex<Engine>, state: &AtomicU8, config: QueueConfig) {
    loop {
        match QueueState::from(state.load(Ordering::Acquire)) {
            QueueState::Stopped => break,
            QueueState::Paused => thread::sleep(config.poll_interval),
            QueueState::Running => {
                let taken = lock(shared).drain_slice(config.slice_size);
                if taken > 0 {
                    thread::sleep(config.slice_yield);
                } else {
                    thread::sleep(config.poll_interval);
                }
            }
        }
    }
}
