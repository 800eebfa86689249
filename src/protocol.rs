//! The three-party publish/subscribe contract.
//!
//! An [`Emitter`] delivers, to each subscribed [`Receiver`], the signal
//! sequence `Open · Item* · (Complete | Error)?` — `Open` exactly once and
//! first, items only up to the demand requested through the [`Pipe`] handed
//! over at `Open`, and at most one terminal. Demand flows upstream through
//! the pipe; signals flow downstream through the receiver.
//!
//! Everything here executes synchronously on the caller's thread. A call to
//! [`Pipe::request`] may drive the upstream stage, which may deliver items
//! re-entrantly before the call returns; receivers and stages must tolerate
//! being called from within their own calls.

use std::rc::Rc;

use crate::error::Fault;

/// The upstream-facing control handle lent to a receiver at `open`.
///
/// A pipe conveys exactly two effects: demand and close. It exposes no
/// queryable state. Both effects are idempotent once the subscription has
/// terminated or closed; calling them afterwards is a no-op.
pub trait Pipe {
    /// Authorize up to `n` more items.
    ///
    /// `n == 0` is a no-op. `n < 0` means "all remaining": demand latches to
    /// infinite and stays there.
    fn request(&self, n: i64);

    /// Authorize all remaining items. Equivalent to `request(-1)`.
    fn request_all(&self) {
        self.request(-1);
    }

    /// Ask the upstream to stop. Advisory: the emitter must cease all
    /// further items in a bounded number of steps, though it may still
    /// deliver a terminal it had already committed to.
    fn close(&self);
}

/// Shared handle to a pipe. Receivers keep a clone of this for the lifetime
/// of the subscription; it is a non-owning back-reference.
pub type PipeRef = Rc<dyn Pipe>;

/// A pipe whose effects go nowhere. Handed out by `never` sources.
pub struct Idle;

impl Pipe for Idle {
    fn request(&self, _n: i64) {}
    fn close(&self) {}
}

/// The general receiver: the union of every arity's callbacks.
///
/// Conforming receivers observe `open` exactly once and first, then zero or
/// more `receive` calls bounded by their requested demand, then at most one
/// of `complete`/`error`. The arity-specialized traits below express
/// narrower contracts at the type level; [`crate::guard`] adapts them to
/// this union while policing upstream behavior.
pub trait Receiver<T> {
    /// The subscription is live; `pipe` is the demand/close channel.
    fn open(&mut self, pipe: PipeRef);

    /// One item, covered by previously requested demand.
    fn receive(&mut self, item: T);

    /// Graceful end of the stream. No further signals follow.
    fn complete(&mut self);

    /// Failed end of the stream. No further signals follow.
    fn error(&mut self, fault: Fault);
}

/// Receiver for a stream that delivers no items.
pub trait MuteReceiver {
    /// Default: authorize everything — a mute stream has nothing to pace.
    fn open(&mut self, pipe: PipeRef) {
        pipe.request_all();
    }

    fn complete(&mut self);

    fn error(&mut self, fault: Fault);
}

/// Receiver for a stream that delivers exactly one item.
///
/// Completion *combines* the item with termination: a conforming upstream
/// either calls `complete_with` once or `error` once.
pub trait MonoReceiver<T> {
    /// Default: authorize everything.
    fn open(&mut self, pipe: PipeRef) {
        pipe.request_all();
    }

    fn complete_with(&mut self, item: T);

    fn error(&mut self, fault: Fault);
}

/// Receiver for a stream that delivers zero or one item.
pub trait MaybeReceiver<T> {
    /// Default: authorize everything.
    fn open(&mut self, pipe: PipeRef) {
        pipe.request_all();
    }

    /// The stream held a value and has ended.
    fn complete_with(&mut self, item: T);

    /// The stream was empty and has ended.
    fn complete_empty(&mut self);

    fn error(&mut self, fault: Fault);
}

/// Receiver for a stream of any number of items.
pub trait ManyReceiver<T> {
    /// Default: authorize everything.
    fn open(&mut self, pipe: PipeRef) {
        pipe.request_all();
    }

    fn receive(&mut self, item: T);

    fn complete(&mut self);

    fn error(&mut self, fault: Fault);
}

/// A source of a typed signal stream.
///
/// Emitters are cheap blueprints: `subscribe` consumes the blueprint and
/// builds a fresh, private chain for this one receiver. There is no shared
/// fan-out; subscribing twice requires two blueprints.
pub trait Emitter {
    /// The element kind carried by `Item` signals.
    type Item;

    /// Build the chain and deliver `Open` to `receiver`.
    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<Self::Item> + 'static;
}
