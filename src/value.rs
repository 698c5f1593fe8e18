//! # value: immediate-or-pending values
//!
//! Every input handed to a mapper and every result a step returns is either already
//! known or still being computed. [`Value`] captures both cases behind one type so the
//! composers can resolve them uniformly before use.
//!
//! Steps and transforms return anything implementing [`IntoValue`]:
//! - `Ok(v)` / `Err(e)` for a synchronous success or failure,
//! - [`Value::pending`] for an asynchronous result,
//! - a [`Value`] built any other way.

use std::fmt;
use std::future::Future;

use futures::future::{self, BoxFuture, FutureExt};

/// Boxed error used by callers that do not need a dedicated error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A value that is either available now or will be produced by a future.
pub enum Value<T, E> {
    /// Already resolved.
    Immediate(T),
    /// Resolves (or fails) once the future completes.
    Pending(BoxFuture<'static, Result<T, E>>),
}

impl<T, E> Value<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn ready(value: T) -> Self {
        Value::Immediate(value)
    }

    /// Wraps a future; it is not polled until the value is resolved.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Value::Pending(future.boxed())
    }

    /// A pending value that fails with `error` when resolved.
    pub fn rejected(error: E) -> Self {
        Value::Pending(future::ready(Err(error)).boxed())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Value::Pending(_))
    }

    /// Waits for the value, surfacing the pending future's error unchanged.
    pub async fn resolve(self) -> Result<T, E> {
        match self {
            Value::Immediate(value) => Ok(value),
            Value::Pending(pending) => pending.await,
        }
    }
}

impl<T, E> From<T> for Value<T, E> {
    fn from(value: T) -> Self {
        Value::Immediate(value)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Value<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Immediate(value) => f.debug_tuple("Immediate").field(value).finish(),
            Value::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Conversion into a [`Value`]; this is what pipeline steps and mapper transforms return.
pub trait IntoValue<E> {
    type Output;

    fn into_value(self) -> Value<Self::Output, E>;
}

impl<T, E> IntoValue<E> for Value<T, E> {
    type Output = T;

    fn into_value(self) -> Value<T, E> {
        self
    }
}

impl<T, E> IntoValue<E> for Result<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;

    fn into_value(self) -> Value<T, E> {
        match self {
            Ok(value) => Value::Immediate(value),
            Err(error) => Value::rejected(error),
        }
    }
}
