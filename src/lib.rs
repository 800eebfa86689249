#![forbid(unsafe_code)]
//! # Rill: Demand-Driven Reactive Dataflow
//!
//! Compose asynchronous producers and consumers of values with explicit,
//! request-based flow control and deterministic termination signaling.
//!
//! ## Core Contract
//!
//! - **[`Emitter`]**: a source of a typed signal stream; `subscribe` builds a
//!   fresh private chain per receiver
//! - **[`Receiver`]**: consumes the stream as `Open · Item* · (Complete | Error)?`
//! - **[`Pipe`]**: the control handle lent to the receiver at `Open`; carries
//!   demand upstream (`request`) and cancellation (`close`)
//!
//! Items are only ever delivered up to the demand the receiver has requested;
//! demand flows upstream, signals flow downstream, and everything runs
//! synchronously on the caller's thread.
//!
//! ## Arity
//!
//! Streams carry a type-level promise about how many items they deliver:
//! [`Mute`] (none), [`Mono`] (exactly one), [`Maybe`] (zero or one), and
//! [`Many`] (any number). Each has a specialized receiver trait, and a guard
//! that polices misbehaving upstreams per a configurable [`OnViolation`]
//! policy.
//!
//! ## Example
//!
//! ```rust
//! use rill::probe::{Event, Recorder};
//!
//! // A coroutine-driven source: `emit` suspends until demand arrives.
//! let stream = rill::many::generate(|co| async move {
//!     for n in 1..=3 {
//!         co.emit(n * n).await?;
//!     }
//!     Ok(())
//! });
//!
//! let (probe, tap) = Recorder::new();
//! stream.map(|n| n + 1).subscribe_raw(probe);
//!
//! tap.request(2); // nothing moves without demand
//! tap.request_all();
//! assert_eq!(
//!     tap.events(),
//!     vec![
//!         Event::Opened,
//!         Event::Item(2),
//!         Event::Item(5),
//!         Event::Item(10),
//!         Event::Completed,
//!     ],
//! );
//! ```
//!
//! ## Module Organization
//!
//! - **[`demand`]** - The outstanding-demand register
//! - **[`error`]** - Failure values carried by `Error` signals
//! - **[`guard`]** - Arity enforcement over specialized receivers
//! - **[`stage`]** - Plumbing shared by generator and operator stages
//! - **[`source`]** - Leaf sources (`just`, iterables, `never`)
//! - **[`op`]** - Operators (`map`, buffers, conversions)
//! - **[`generate`]** - The coroutine generator and its `emit` sink
//! - **[`probe`]** - Recording receivers for scripted traces
//! - **[`prelude`]** - Common imports for quick start
//!
//! ## Common Constructors
//!
//! - [`mono::just(v)`](mono::just), [`maybe::just(v)`](maybe::just),
//!   [`maybe::empty()`](maybe::empty), [`mute::just()`](mute::just)
//! - [`many::just(items)`](many::just) - any iterable, in order
//! - [`many::generate(body)`](many::generate) - coroutine-driven stream
//! - `never()` in every arity module

// Core modules (essential types)
mod arity;
mod protocol;

// Capability modules
pub mod demand;
pub mod error;
pub mod generate;
pub mod guard;
pub mod op;
pub mod probe;
pub mod source;
pub mod stage;

// Convenience
pub mod prelude;

// Re-export essential types at root
pub use arity::{many, maybe, mono, mute, Many, Maybe, Mono, Mute};
pub use error::{Canceled, Fault, ProtocolError};
pub use generate::Emit;
pub use guard::OnViolation;
pub use protocol::{
    Emitter, Idle, ManyReceiver, MaybeReceiver, MonoReceiver, MuteReceiver, Pipe,
    PipeRef, Receiver,
};
