//! Commonly used imports
//!
//! Use `use rill::prelude::*;` for quick access to the most common types and
//! traits.

// Core contract
pub use crate::{Emitter, Pipe, PipeRef, Receiver};

// Specialized receivers
pub use crate::{ManyReceiver, MaybeReceiver, MonoReceiver, MuteReceiver};

// Arity wrappers and their constructor modules
pub use crate::{many, maybe, mono, mute, Many, Maybe, Mono, Mute};

// Violation handling and failure values
pub use crate::{Fault, OnViolation, ProtocolError};

// Coroutine sink
pub use crate::Emit;
