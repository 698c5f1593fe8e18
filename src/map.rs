//! # map: concurrency-bounded, order-preserving parallel mapping
//!
//! [`map_async`] captures a fixed collection of inputs (any mix of immediate and pending
//! values) and returns a [`Mapper`]. Running the mapper applies a transform to every
//! element with at most `concurrency` units in flight, where a unit is "resolve the
//! input, then transform it".
//!
//! # Scheduling
//! - Units are dispatched strictly by index and driven from the calling task; no unit
//!   starts before a slot frees up.
//! - Results land in per-index slots, so output order always matches input order.
//! - The first failure (by completion time, not index) is returned at once and nothing new
//!   is dispatched. Units already in flight are handed to the ambient Tokio runtime and
//!   finish in the background; their outcomes are discarded.
//! - Success is all-or-nothing: callers never see a partial result vector.
//!
//! All scheduling state (cursor, in-flight set, slots) belongs to a single run, so runs
//! never interfere with each other, even against the same [`SharedMapper`].

use std::sync::Arc;

use futures::future::{FutureExt, Shared};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::value::{IntoValue, Value};

/// Options for a single mapper run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MapOptions {
    /// Maximum units in flight. `None` and `Some(0)` mean unbounded.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl MapOptions {
    pub fn unbounded() -> Self {
        MapOptions { concurrency: None }
    }

    pub fn with_concurrency(concurrency: usize) -> Self {
        MapOptions {
            concurrency: Some(concurrency),
        }
    }

    /// Effective cap for a run over `len` inputs.
    pub fn limit(&self, len: usize) -> usize {
        match self.concurrency {
            Some(cap) if cap > 0 => cap.min(len),
            _ => len,
        }
    }
}

/// Captures `inputs` for later mapping. Nothing is resolved or invoked here.
pub fn map_async<T, E, I>(inputs: I) -> Mapper<T, E>
where
    I: IntoIterator,
    I::Item: Into<Value<T, E>>,
{
    Mapper {
        inputs: inputs.into_iter().map(Into::into).collect(),
    }
}

/// A fixed input collection awaiting a transform.
///
/// Pending inputs can only be driven once, so running consumes the mapper; use
/// [`Mapper::into_shared`] to run the same inputs repeatedly.
#[derive(Debug)]
pub struct Mapper<T, E> {
    inputs: Vec<Value<T, E>>,
}

impl<T, E> Mapper<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Maps every input with no concurrency cap.
    pub async fn run<F, R>(self, transform: F) -> Result<Vec<R::Output>, E>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
        R: IntoValue<E>,
        R::Output: Send + 'static,
    {
        self.run_with(transform, MapOptions::unbounded()).await
    }

    /// Maps every input, keeping at most `options.limit(len)` units in flight.
    pub async fn run_with<F, R>(
        self,
        transform: F,
        options: MapOptions,
    ) -> Result<Vec<R::Output>, E>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
        R: IntoValue<E>,
        R::Output: Send + 'static,
    {
        let total = self.inputs.len();
        if total == 0 {
            debug!("[MAP] empty input, nothing to dispatch");
            return Ok(Vec::new());
        }

        let limit = options.limit(total);
        let transform = Arc::new(transform);
        let mut slots: Vec<Option<R::Output>> =
            std::iter::repeat_with(|| None).take(total).collect();
        let mut cursor = self.inputs.into_iter().enumerate();
        let mut in_flight = FuturesUnordered::new();

        debug!(total, limit, "[MAP] starting run");

        let dispatch = |index: usize, input: Value<T, E>| {
            let transform = Arc::clone(&transform);
            async move {
                let outcome = match input.resolve().await {
                    Ok(resolved) => {
                        let next = (*transform)(resolved).into_value();
                        next.resolve().await
                    }
                    Err(error) => Err(error),
                };
                (index, outcome)
            }
            .boxed()
        };

        for (index, input) in cursor.by_ref().take(limit) {
            debug!(index, "[MAP] dispatching unit");
            in_flight.push(dispatch(index, input));
        }

        loop {
            let Some((index, outcome)) = in_flight.next().await else {
                break;
            };
            match outcome {
                Ok(output) => {
                    debug!(index, "[MAP] unit settled");
                    slots[index] = Some(output);
                }
                Err(error) => {
                    warn!(
                        index,
                        still_in_flight = in_flight.len(),
                        "[MAP] unit failed; halting dispatch"
                    );
                    detach(in_flight);
                    return Err(error);
                }
            }

            if let Some((index, input)) = cursor.next() {
                debug!(index, "[MAP] dispatching unit");
                in_flight.push(dispatch(index, input));
            }
        }

        info!(total, limit, "[MAP] run complete");
        let results: Vec<R::Output> = slots.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), total);
        Ok(results)
    }
}

impl<T, E> Mapper<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Makes the mapper re-runnable. Each pending input is resolved at most once and its
    /// outcome is shared between runs.
    pub fn into_shared(self) -> SharedMapper<T, E> {
        let inputs = self
            .inputs
            .into_iter()
            .map(|input| match input {
                Value::Immediate(value) => SharedInput::Immediate(value),
                Value::Pending(pending) => SharedInput::Pending(pending.shared()),
            })
            .collect();
        SharedMapper { inputs }
    }
}

#[derive(Clone)]
enum SharedInput<T, E> {
    Immediate(T),
    Pending(Shared<futures::future::BoxFuture<'static, Result<T, E>>>),
}

/// A mapper whose runs can be repeated, including concurrently.
#[derive(Clone)]
pub struct SharedMapper<T, E> {
    inputs: Vec<SharedInput<T, E>>,
}

impl<T, E> SharedMapper<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub async fn run<F, R>(&self, transform: F) -> Result<Vec<R::Output>, E>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
        R: IntoValue<E>,
        R::Output: Send + 'static,
    {
        self.run_with(transform, MapOptions::unbounded()).await
    }

    /// Same contract as [`Mapper::run_with`]; this run owns its own scheduling state.
    pub async fn run_with<F, R>(
        &self,
        transform: F,
        options: MapOptions,
    ) -> Result<Vec<R::Output>, E>
    where
        F: Fn(T) -> R + Send + Sync + 'static,
        R: IntoValue<E>,
        R::Output: Send + 'static,
    {
        self.snapshot().run_with(transform, options).await
    }

    fn snapshot(&self) -> Mapper<T, E> {
        let inputs = self
            .inputs
            .iter()
            .map(|input| match input {
                SharedInput::Immediate(value) => Value::Immediate(value.clone()),
                SharedInput::Pending(pending) => Value::Pending(pending.clone().boxed()),
            })
            .collect();
        Mapper { inputs }
    }
}

impl<T, E> std::fmt::Debug for SharedMapper<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMapper")
            .field("inputs", &self.inputs.len())
            .finish()
    }
}

/// Lets units that were already in flight run to completion after the run has failed.
fn detach<S>(mut in_flight: S)
where
    S: futures::Stream + Unpin + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                let mut discarded = 0usize;
                while in_flight.next().await.is_some() {
                    discarded += 1;
                }
                debug!(discarded, "[MAP] background units finished after failure");
            });
        }
        Err(_) => {
            debug!("[MAP] no runtime to detach onto; dropping in-flight units");
        }
    }
}
