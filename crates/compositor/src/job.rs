//! Resumable composite jobs.
//!
//! A [`CompositeJob`] mutably borrows its [`Compositor`] until it is finished
//! or dropped. Full and incremental recomputes finish in a single step; a
//! background recompute processes `background_batch_size` linear pixel
//! indices per step so a scheduler can interleave other work between
//! batches. Nothing can mutate the compositor in between, because the job
//! holds the only mutable borrow.

use crate::buffer::CompositeView;
use crate::compositor::Compositor;
use crate::engine;
use crate::strategy::CompositeStrategy;
use std::time::Instant;

/// Outcome of a single [`CompositeJob::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepState {
    /// More batches remain.
    Pending {
        /// Pixels composited so far.
        processed: usize,
        /// Pixels in the canvas.
        total: usize,
    },
    /// The buffer is fresh.
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// The buffer was already fresh.
    Cached,
    /// A recompute is running with this strategy.
    Running(CompositeStrategy),
    Done,
}

/// An in-flight composite.
///
/// Dropping an unfinished job leaves the buffer stale; the next composite
/// starts over with a full pass. The dropped job counts as neither a cache
/// miss nor a composite.
#[derive(Debug)]
pub struct CompositeJob<'a> {
    compositor: &'a mut Compositor,
    phase: Phase,
    /// Next linear pixel index for background batches.
    cursor: usize,
    started: Instant,
}

impl<'a> CompositeJob<'a> {
    pub(crate) fn new(compositor: &'a mut Compositor) -> Self {
        let started = Instant::now();

        if !compositor.buffer.stale {
            compositor.stats.record_cache_hit();
            return Self {
                compositor,
                phase: Phase::Cached,
                cursor: 0,
                started,
            };
        }

        let strategy = compositor.next_strategy();
        tracing::debug!(
            %strategy,
            layers = compositor.layers.len(),
            pending = compositor.damage.pending().len(),
            "compositing"
        );

        let refreshed = engine::refresh_layer_caches(
            &compositor.layers,
            &compositor.damage,
            &mut compositor.cache,
        );
        for id in refreshed {
            compositor.damage.clear_layer(id);
        }

        if strategy != CompositeStrategy::Incremental {
            // From here until completion the buffer holds a mix of old and
            // new pixels.
            compositor.buffer.complete = false;
        }

        Self {
            compositor,
            phase: Phase::Running(strategy),
            cursor: 0,
            started,
        }
    }

    /// Strategy of a running recompute, `None` for a cache hit.
    pub fn strategy(&self) -> Option<CompositeStrategy> {
        match self.phase {
            Phase::Running(strategy) => Some(strategy),
            Phase::Cached | Phase::Done => None,
        }
    }

    /// Whether the job was answered from a fresh buffer.
    pub fn is_cache_hit(&self) -> bool {
        self.phase == Phase::Cached
    }

    /// Advance the job by one step.
    pub fn step(&mut self) -> StepState {
        let strategy = match self.phase {
            Phase::Running(strategy) => strategy,
            Phase::Cached | Phase::Done => return StepState::Complete,
        };

        let compositor = &mut *self.compositor;
        match strategy {
            CompositeStrategy::Full => {
                engine::composite_full(&compositor.layers, &mut compositor.buffer);
            }
            CompositeStrategy::Incremental => {
                let merged = compositor.damage.merged_pending();
                engine::composite_incremental(
                    &compositor.layers,
                    &compositor.cache,
                    &mut compositor.buffer,
                    &merged,
                );
            }
            CompositeStrategy::Background => {
                let total = compositor.buffer.len();
                let batch = compositor.settings.background_batch_size.max(1);
                let end = (self.cursor + batch).min(total);

                engine::composite_range(&compositor.layers, &mut compositor.buffer, self.cursor..end);
                self.cursor = end;

                if end < total {
                    tracing::trace!(processed = end, total, "background batch done");
                    return StepState::Pending {
                        processed: end,
                        total,
                    };
                }
            }
        }

        self.complete(strategy);
        StepState::Complete
    }

    fn complete(&mut self, strategy: CompositeStrategy) {
        let compositor = &mut *self.compositor;
        compositor.buffer.stale = false;
        compositor.buffer.complete = true;
        compositor.damage.clear_pending();

        let elapsed = self.started.elapsed();
        compositor.stats.record_cache_miss();
        compositor.stats.record_composite(strategy, elapsed);
        self.phase = Phase::Done;

        tracing::debug!(%strategy, elapsed_us = elapsed.as_micros() as u64, "composite finished");
    }

    /// Run to completion without yielding and return the fresh buffer.
    pub fn finish(mut self) -> CompositeView<'a> {
        while self.step() != StepState::Complete {}
        self.into_view()
    }

    /// Run to completion, yielding to the async runtime between background
    /// batches, and return the fresh buffer.
    pub async fn finish_async(mut self) -> CompositeView<'a> {
        while self.step() != StepState::Complete {
            tokio::task::yield_now().await;
        }
        self.into_view()
    }

    fn into_view(self) -> CompositeView<'a> {
        let compositor: &'a Compositor = self.compositor;
        compositor.buffer.view()
    }
}
