//! Operators: middle stages that are a receiver to their upstream and a
//! pipe to their downstream.

mod buffer;
mod convert;
mod map;

pub use buffer::{Buffer, Unbounded};
pub use convert::{CompleteWith, Muted, OrElse};
pub use map::{Map, TryMap};
