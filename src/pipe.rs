//! # pipe: left-to-right composition of sync and async steps
//!
//! A [`Pipeline`] threads one value through an ordered list of steps. Each step receives
//! the resolved output of the previous one and returns something implementing
//! [`IntoValue`], so a step may answer synchronously (`Ok`/`Err`) or asynchronously
//! ([`Value::pending`]). Steps run strictly one after the other; the first failure ends
//! the call with that same error and no later step runs.
//!
//! Pipelines are immutable once built and cheap to clone. Building one runs nothing; every
//! [`Pipeline::call`] is independent of every other call.
//!
//! ```
//! use async_flow::{pipe_async, BoxError, Pipeline, Value};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let circle_area: Pipeline<f64, f64, BoxError> = pipe_async![
//!     |n: f64| Ok(n * n),
//!     |n: f64| Value::pending(async move { Ok(n * std::f64::consts::PI) }),
//!     |n: f64| Ok(n.round()),
//! ];
//!
//! assert_eq!(circle_area.call(50.0).await.unwrap(), 7854.0);
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::trace;

use crate::value::{IntoValue, Value};

type Stage<I, O, E> = dyn Fn(Value<I, E>) -> BoxFuture<'static, Result<O, E>> + Send + Sync;

/// An immutable chain of steps taking an `I` to an `O`, failing with `E`.
pub struct Pipeline<I, O, E> {
    run: Arc<Stage<I, O, E>>,
    steps: usize,
}

impl<I, E> Pipeline<I, I, E>
where
    I: Send + 'static,
    E: Send + 'static,
{
    /// The empty pipeline: resolves its input and returns it unchanged.
    pub fn new() -> Self {
        Pipeline {
            run: Arc::new(|input: Value<I, E>| input.resolve().boxed()),
            steps: 0,
        }
    }
}

impl<I, E> Default for Pipeline<I, I, E>
where
    I: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O, E> Pipeline<I, O, E>
where
    I: Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    /// Appends `step`, producing a pipeline whose output is the step's resolved output.
    pub fn then<F, R>(self, step: F) -> Pipeline<I, R::Output, E>
    where
        F: Fn(O) -> R + Send + Sync + 'static,
        R: IntoValue<E>,
        R::Output: Send + 'static,
    {
        let upstream = self.run;
        let step = Arc::new(step);
        let position = self.steps + 1;

        let run = move |input: Value<I, E>| {
            let previous = (*upstream)(input);
            let step = Arc::clone(&step);
            async move {
                let resolved = previous.await?;
                let next = (*step)(resolved).into_value();
                let outcome = next.resolve().await;
                trace!(step = position, ok = outcome.is_ok(), "[PIPE] step settled");
                outcome
            }
            .boxed()
        };

        Pipeline {
            run: Arc::new(run),
            steps: position,
        }
    }

    /// Runs every step in order against `initial`, which may itself be pending.
    pub fn call(&self, initial: impl Into<Value<I, E>>) -> BoxFuture<'static, Result<O, E>> {
        (*self.run)(initial.into())
    }

    /// Number of steps in the chain.
    pub fn len(&self) -> usize {
        self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps == 0
    }

    /// Turns the pipeline into a step, usable in another pipeline or as a mapper transform.
    pub fn into_step(self) -> impl Fn(I) -> Value<O, E> + Clone + Send + Sync + 'static {
        move |input: I| Value::Pending(self.call(input))
    }
}

impl<I, O, E> Clone for Pipeline<I, O, E> {
    fn clone(&self) -> Self {
        Pipeline {
            run: Arc::clone(&self.run),
            steps: self.steps,
        }
    }
}

impl<I, O, E> fmt::Debug for Pipeline<I, O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("steps", &self.steps).finish()
    }
}

/// Composes steps left to right: `pipe_async![a, b, c]` is
/// `Pipeline::new().then(a).then(b).then(c)`. With no steps it is the identity pipeline.
#[macro_export]
macro_rules! pipe_async {
    () => {
        $crate::pipe::Pipeline::new()
    };
    ($($step:expr),+ $(,)?) => {
        $crate::pipe::Pipeline::new()$(.then($step))+
    };
}
