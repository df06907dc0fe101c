//! Single-consumer wrapper around the parser backend.
//!
//! Requests go through a one-deep slot guarded by a mutex/condvar pair: the
//! worker takes the slotted request, parses, and replies on the request's own
//! channel. A request arriving while the slot is full displaces the queued
//! one, which resolves to `None` immediately — during rapid typing the
//! backend is never asked to parse a buffer more than one behind.

use crossbeam_channel::{bounded, Sender};
use elmls_core::Module;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

type Backend = dyn Fn(&str) -> Option<Module> + Send + Sync + 'static;

struct Job {
    source: String,
    reply: Sender<Option<Arc<Module>>>,
}

#[derive(Default)]
struct Slot {
    queued: Option<Job>,
    shutdown: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    available: Condvar,
    backend: Box<Backend>,
}

pub struct ParseService {
    shared: Arc<Shared>,
}

impl ParseService {
    /// A service over the real parser.
    pub fn new() -> Self {
        Self::with_backend(|source| elmls_core::parse(source).ok())
    }

    /// A service over an arbitrary backend, for tests that need to control
    /// parse timing or simulate crashes.
    pub fn with_backend(
        backend: impl Fn(&str) -> Option<Module> + Send + Sync + 'static,
    ) -> Self {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::default()),
            available: Condvar::new(),
            backend: Box::new(backend),
        });

        let worker_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("parse-service".to_string())
            .spawn(move || worker_loop(worker_shared))
            .expect("failed to spawn parse service worker");

        ParseService { shared }
    }

    /// Parse `source`, blocking until the backend answers or this request is
    /// displaced by a newer one. `None` means parse failure or displacement;
    /// callers fall back to their last known good state.
    pub fn parse(&self, source: &str) -> Option<Arc<Module>> {
        let (reply_tx, reply_rx) = bounded(1);
        {
            let mut slot = self.shared.slot.lock().unwrap();
            if let Some(displaced) = slot.queued.take() {
                let _ = displaced.reply.send(None);
            }
            slot.queued = Some(Job {
                source: source.to_string(),
                reply: reply_tx,
            });
            self.shared.available.notify_one();
        }
        reply_rx.recv().ok().flatten()
    }
}

impl Default for ParseService {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ParseService {
    fn drop(&mut self) {
        let mut slot = self.shared.slot.lock().unwrap();
        slot.shutdown = true;
        if let Some(displaced) = slot.queued.take() {
            let _ = displaced.reply.send(None);
        }
        self.shared.available.notify_one();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut slot = shared.slot.lock().unwrap();
            loop {
                if slot.shutdown {
                    return;
                }
                match slot.queued.take() {
                    Some(job) => break job,
                    None => slot = shared.available.wait(slot).unwrap(),
                }
            }
        };

        // A panicking backend must not take the worker down with it; the
        // displaced request resolves to None and the next parse proceeds.
        let result = catch_unwind(AssertUnwindSafe(|| (shared.backend)(&job.source)))
            .ok()
            .flatten()
            .map(Arc::new);
        let _ = job.reply.send(result);
    }
}
