//! Single-slot holder for the published [DocumentGraph].
//!
//! Readers always see a complete graph: a new one is assembled off to the side and published by
//! swapping one `Arc`. At most one build runs at a time; a [GraphStore::rebuild] that arrives
//! while another is running waits for that build and returns its result instead of starting
//! its own. A failed build publishes nothing.

use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::watch;

use super::base::{build_from_source, DocumentGraph};
use crate::{
    codec::compiler::{ArtifactSource, DocumentCompiler},
    error::LamadError,
};

type BuildOutcome = Result<Arc<DocumentGraph>, LamadError>;

#[derive(Default)]
struct BuildSlot {
    outcome: Mutex<Option<BuildOutcome>>,
    done: Condvar,
}

impl BuildSlot {
    fn finish(&self, outcome: BuildOutcome) {
        let mut guard = self.outcome.lock();
        if guard.is_none() {
            *guard = Some(outcome);
        }
        self.done.notify_all();
    }

    fn wait(&self) -> BuildOutcome {
        let mut guard = self.outcome.lock();
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut guard);
        }
    }
}

/// Releases the in-flight slot even if the build closure unwinds.
struct InFlight<'a> {
    store: &'a GraphStore,
    slot: Arc<BuildSlot>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.store.in_flight.lock() = None;
        self.slot.finish(Err(LamadError::Codec(
            "graph build ended without a result".to_string(),
        )));
    }
}

pub struct GraphStore {
    current: RwLock<Option<Arc<DocumentGraph>>>,
    in_flight: Mutex<Option<Arc<BuildSlot>>>,
    published: watch::Sender<Option<Arc<DocumentGraph>>>,
}

impl Default for GraphStore {
    fn default() -> Self {
        let (published, _) = watch::channel(None);
        GraphStore {
            current: RwLock::new(None),
            in_flight: Mutex::new(None),
            published,
        }
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("is_built", &self.is_built())
            .field("building", &self.in_flight.lock().is_some())
            .finish()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently published graph, if any build has succeeded.
    pub fn current(&self) -> Option<Arc<DocumentGraph>> {
        self.current.read().clone()
    }

    pub fn is_built(&self) -> bool {
        self.current.read().is_some()
    }

    /// Observe every graph published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DocumentGraph>>> {
        self.published.subscribe()
    }

    /// Swap in `graph` and notify subscribers. Only [GraphStore::rebuild] publishes.
    pub(crate) fn publish(&self, graph: DocumentGraph) -> Arc<DocumentGraph> {
        let graph = Arc::new(graph);
        *self.current.write() = Some(graph.clone());
        self.published.send_replace(Some(graph.clone()));
        graph
    }

    /// Run `build` and publish its graph, or join the build already in flight.
    pub fn rebuild<F>(&self, build: F) -> BuildOutcome
    where
        F: FnOnce() -> Result<DocumentGraph, LamadError>,
    {
        let slot = {
            let mut in_flight = self.in_flight.lock();
            if let Some(slot) = in_flight.as_ref() {
                let slot = slot.clone();
                drop(in_flight);
                tracing::debug!("[GraphStore] joining the build already in flight");
                return slot.wait();
            }
            let slot = Arc::new(BuildSlot::default());
            *in_flight = Some(slot.clone());
            slot
        };
        let guard = InFlight {
            store: self,
            slot: slot.clone(),
        };

        let outcome = match build() {
            Ok(graph) => Ok(self.publish(graph)),
            Err(e) => {
                tracing::warn!("[GraphStore] build failed, keeping the previous graph: {e}");
                Err(e)
            }
        };
        slot.finish(outcome.clone());
        drop(guard);
        outcome
    }

    /// Compile `source` and publish the result.
    pub fn rebuild_from<S: ArtifactSource + ?Sized>(
        &self,
        compiler: &DocumentCompiler,
        source: &S,
    ) -> BuildOutcome {
        self.rebuild(|| build_from_source(compiler, source))
    }
}
