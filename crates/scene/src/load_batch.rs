//! Load batch coordination.
//!
//! A [`LoadBatch`] tracks one group of in-flight asset fetches. Outcomes are
//! fed to it in whatever order the fetches finish; it forwards successes to a
//! [`LoadSink`], logs and skips failures, and calls
//! [`LoadSink::on_all_done`] exactly once when the last outstanding name has
//! settled. An empty batch completes as soon as it is started.

use std::collections::BTreeSet;

use bevy::prelude::*;

use crate::manifest::AssetDescriptor;
use crate::model::{AssetError, LoadedModel};

/// Receiver of batch progress.
pub trait LoadSink {
    /// A descriptor loaded successfully.
    fn on_item(&mut self, model: LoadedModel, name: &str);

    /// Every descriptor has settled. Called exactly once per batch.
    fn on_all_done(&mut self);
}

/// What happened to a single settled outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Loaded,
    Failed,
    /// The name was not pending (unknown, duplicate, or batch already done).
    Ignored,
}

#[derive(Debug, Default)]
pub struct LoadBatch {
    pending: BTreeSet<String>,
    loaded: usize,
    failed: usize,
    started: bool,
    done: bool,
}

impl LoadBatch {
    pub fn new(descriptors: &[AssetDescriptor]) -> Self {
        let mut pending = BTreeSet::new();
        for descriptor in descriptors {
            if !pending.insert(descriptor.name.clone()) {
                warn!(
                    "LoadBatch: duplicate asset name '{}' only counted once",
                    descriptor.name
                );
            }
        }
        Self {
            pending,
            ..default()
        }
    }

    /// Mark the fetches as issued. Completes immediately if nothing is pending.
    pub fn start(&mut self, sink: &mut impl LoadSink) {
        if self.started {
            return;
        }
        self.started = true;
        self.finish_if_drained(sink);
    }

    /// Record the outcome for `name`.
    pub fn settle(
        &mut self,
        name: &str,
        outcome: Result<LoadedModel, AssetError>,
        sink: &mut impl LoadSink,
    ) -> Settled {
        if self.done || !self.pending.remove(name) {
            warn!("LoadBatch: ignoring result for '{}' (not pending)", name);
            return Settled::Ignored;
        }

        let settled = match outcome {
            Ok(model) => {
                self.loaded += 1;
                sink.on_item(model, name);
                Settled::Loaded
            }
            Err(err) => {
                self.failed += 1;
                error!("LoadBatch: {}", err);
                Settled::Failed
            }
        };

        if self.started {
            self.finish_if_drained(sink);
        }
        settled
    }

    fn finish_if_drained(&mut self, sink: &mut impl LoadSink) {
        if self.done || !self.pending.is_empty() {
            return;
        }
        self.done = true;
        info!(
            "LoadBatch: complete ({} loaded, {} failed)",
            self.loaded, self.failed
        );
        sink.on_all_done();
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.contains(name)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }
}
