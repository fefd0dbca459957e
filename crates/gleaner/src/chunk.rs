//! Chunked concurrent runner.
//!
//! The runner fans a list of inputs out over an async operation, but never has more than
//! `chunk_size` operations in flight: inputs are split into consecutive chunks, every operation of
//! a chunk is polled concurrently, and the next chunk only starts once the whole current chunk has
//! settled. A failing operation never affects its siblings or later chunks.
//!
//! Results come back aligned with the inputs, so `results[i]` always belongs to `inputs[i]`.
//!
//! # Examples
//!
//! ```
//! use gleaner::chunk::ChunkRunner;
//!
//! # async fn example() -> Result<(), gleaner::error::GleanerError> {
//! let runner = ChunkRunner::new(2)?;
//! let outcome = runner
//!   .run(vec![1, 2, 3], |n: u32| async move {
//!     if n == 2 {
//!       Err("two is not allowed")
//!     } else {
//!       Ok(n * 10)
//!     }
//!   })
//!   .await;
//!
//! assert_eq!(outcome.results, vec![Some(10), None, Some(30)]);
//! assert_eq!(outcome.errors, vec!["two is not allowed"]);
//! # Ok(())
//! # }
//! ```

use std::{
  future::Future,
  sync::atomic::{AtomicBool, Ordering},
};

use futures::future::{join_all, Ready};

use super::*;

/// Default number of operations allowed in flight at once.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Bounded-concurrency executor with per-item failure isolation.
#[derive(Debug, Clone)]
pub struct ChunkRunner {
  /// Maximum number of operations dispatched together
  chunk_size: usize,
  /// Optional cooperative cancellation, checked between chunks
  stop:       Option<StopHandle>,
}

/// Cooperative cancellation flag for a [`ChunkRunner`].
///
/// Stopping never interrupts a chunk that is already running; the runner only checks the flag
/// before scheduling the next chunk, so every draft stays in a well-defined state.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

/// Outcome of a [`ChunkRunner`] run.
#[derive(Debug)]
pub struct ChunkOutcome<T, E> {
  /// One slot per input, in input order.
  ///
  /// A slot is `None` when the operation failed and no fallback was given, or when the run was
  /// stopped before the input's chunk was scheduled.
  pub results: Vec<Option<T>>,
  /// Captured errors, in completion order within each chunk
  pub errors:  Vec<E>,
  /// Whether the run was cut short by a [`StopHandle`]
  pub stopped: bool,
}

impl StopHandle {
  /// Creates a handle that has not been triggered.
  pub fn new() -> Self { Self::default() }

  /// Requests that no further chunks are scheduled.
  pub fn stop(&self) { self.0.store(true, Ordering::SeqCst); }

  /// Whether [`StopHandle::stop`] has been called.
  pub fn is_stopped(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

impl<T, E> ChunkOutcome<T, E> {
  /// An outcome for an empty input list.
  fn empty() -> Self { Self { results: Vec::new(), errors: Vec::new(), stopped: false } }

  /// Number of slots that hold a value.
  pub fn succeeded(&self) -> usize { self.results.iter().filter(|r| r.is_some()).count() }
}

impl ChunkRunner {
  /// Creates a runner dispatching at most `chunk_size` operations at once.
  ///
  /// # Errors
  ///
  /// Returns [`GleanerError::InvalidChunkSize`] when `chunk_size` is zero.
  pub fn new(chunk_size: usize) -> Result<Self> {
    if chunk_size == 0 {
      return Err(GleanerError::InvalidChunkSize);
    }
    Ok(Self { chunk_size, stop: None })
  }

  /// Attaches a stop handle that is checked at every chunk boundary.
  pub fn with_stop(mut self, stop: StopHandle) -> Self {
    self.stop = Some(stop);
    self
  }

  /// The configured chunk size.
  pub fn chunk_size(&self) -> usize { self.chunk_size }

  /// Runs `op` over all inputs. Failed slots are left as `None`.
  pub async fn run<A, T, E, F, Fut>(&self, inputs: Vec<A>, op: F) -> ChunkOutcome<T, E>
  where
    A: Clone,
    F: Fn(A) -> Fut,
    Fut: Future<Output = core::result::Result<T, E>>, {
    self.run_inner(inputs, op, None::<fn(A) -> Ready<T>>).await
  }

  /// Runs `op` over all inputs, filling every failed slot with the output of `fallback` called
  /// on the same input.
  ///
  /// The fallback's output is stored as-is; if it represents another failure, that is for the
  /// caller to interpret.
  pub async fn run_with_fallback<A, T, E, F, Fut, G, GFut>(
    &self,
    inputs: Vec<A>,
    op: F,
    fallback: G,
  ) -> ChunkOutcome<T, E>
  where
    A: Clone,
    F: Fn(A) -> Fut,
    Fut: Future<Output = core::result::Result<T, E>>,
    G: Fn(A) -> GFut,
    GFut: Future<Output = T>,
  {
    self.run_inner(inputs, op, Some(fallback)).await
  }

  /// Shared implementation of [`ChunkRunner::run`] and [`ChunkRunner::run_with_fallback`].
  async fn run_inner<A, T, E, F, Fut, G, GFut>(
    &self,
    inputs: Vec<A>,
    op: F,
    fallback: Option<G>,
  ) -> ChunkOutcome<T, E>
  where
    A: Clone,
    F: Fn(A) -> Fut,
    Fut: Future<Output = core::result::Result<T, E>>,
    G: Fn(A) -> GFut,
    GFut: Future<Output = T>,
  {
    if inputs.is_empty() {
      return ChunkOutcome::empty();
    }

    let total = inputs.len();
    let mut outcome =
      ChunkOutcome { results: Vec::with_capacity(total), errors: Vec::new(), stopped: false };

    for (index, chunk) in inputs.chunks(self.chunk_size).enumerate() {
      if self.stop.as_ref().is_some_and(StopHandle::is_stopped) {
        debug!("Stop requested, skipping {} remaining operations", total - outcome.results.len());
        outcome.stopped = true;
        outcome.results.resize_with(total, || None);
        break;
      }

      debug!("Running chunk {} with {} operations", index, chunk.len());
      let settled = join_all(chunk.iter().cloned().map(&op)).await;

      for (args, result) in chunk.iter().zip(settled) {
        match result {
          Ok(value) => outcome.results.push(Some(value)),
          Err(error) => {
            outcome.errors.push(error);
            match &fallback {
              Some(fallback) => outcome.results.push(Some(fallback(args.clone()).await)),
              None => outcome.results.push(None),
            }
          },
        }
      }
    }

    outcome
  }
}

impl Default for ChunkRunner {
  fn default() -> Self { Self { chunk_size: DEFAULT_CHUNK_SIZE, stop: None } }
}

/// Runs `op` over `inputs` in chunks of `chunk_size`, with an optional per-item fallback.
///
/// Convenience wrapper around [`ChunkRunner`].
///
/// # Errors
///
/// Returns [`GleanerError::InvalidChunkSize`] when `chunk_size` is zero; operation failures are
/// reported inside the [`ChunkOutcome`], never here.
pub async fn chunk_run<A, T, E, F, Fut, G, GFut>(
  inputs: Vec<A>,
  op: F,
  fallback: Option<G>,
  chunk_size: usize,
) -> Result<ChunkOutcome<T, E>>
where
  A: Clone,
  F: Fn(A) -> Fut,
  Fut: Future<Output = core::result::Result<T, E>>,
  G: Fn(A) -> GFut,
  GFut: Future<Output = T>,
{
  Ok(ChunkRunner::new(chunk_size)?.run_inner(inputs, op, fallback).await)
}
