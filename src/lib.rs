#![doc = "async-flow: async pipelines and a concurrency-bounded parallel mapper."]

//! Two primitives, both built on the same immediate-or-pending [`Value`]:
//! - [`Pipeline`] / [`pipe_async!`]: thread a value through sync and async steps, left to right.
//! - [`map_async`] / [`Mapper`]: transform every element of a collection with at most N
//!   transforms in flight, preserving input order and failing fast.
//!
//! The `probe` command (see [`cli`]) is a small consumer that fans out endpoint checks
//! through both primitives.

pub mod cli;
pub mod config;
pub mod contract;
pub mod load_config;
pub mod map;
pub mod pipe;
pub mod probe;
pub mod value;

pub use map::{map_async, MapOptions, Mapper, SharedMapper};
pub use pipe::Pipeline;
pub use value::{BoxError, IntoValue, Value};
