//! Plumbing shared by every generator and operator stage.
//!
//! A source stage owns a [`Downstream`] (its receiver plus the closed flag)
//! and a [`Gate`] around its drive loop; an operator additionally owns an
//! [`Upstream`] (the back-pipe acquired at `open`). The helpers encode the
//! re-entrancy discipline of the protocol: state flags are updated *before*
//! any callback is invoked, the receiver is never borrowed across a point
//! where a callback could reach back into it, and terminal delivery drops
//! the receiver so the `Rc` back-reference cycle between a stage and its
//! receiver's pipe handle is broken.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;

use crate::demand::RequestCount;
use crate::error::Fault;
use crate::protocol::{PipeRef, Receiver};

/// A stage's exclusive hold on its receiver, with the closed flag.
pub struct Downstream<T, R> {
    target: RefCell<Option<R>>,
    closed: Cell<bool>,
    _item: PhantomData<fn(T)>,
}

impl<T, R> Downstream<T, R>
where
    R: Receiver<T>,
{
    pub fn new(receiver: R) -> Self {
        Downstream {
            target: RefCell::new(Some(receiver)),
            closed: Cell::new(false),
            _item: PhantomData,
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Deliver `open`. The receiver is taken out for the duration of the
    /// call: demand it requests re-entrantly reaches the stage's register
    /// (behind its [`Gate`]) but cannot re-enter the receiver itself.
    pub fn accept(&self, pipe: PipeRef) {
        let receiver = self.target.borrow_mut().take();
        let Some(mut receiver) = receiver else { return };
        receiver.open(pipe);
        if !self.closed.get() {
            *self.target.borrow_mut() = Some(receiver);
        }
    }

    /// Forward one item if the stage is still open.
    ///
    /// Returns the "still open" indicator: `false` once the receiver has
    /// closed the pipe, so drive loops can short-circuit.
    pub fn emit(&self, item: T) -> bool {
        if self.closed.get() {
            return false;
        }
        {
            let mut target = self.target.borrow_mut();
            if let Some(receiver) = target.as_mut() {
                receiver.receive(item);
            }
        }
        if self.closed.get() {
            self.release();
            false
        } else {
            true
        }
    }

    /// Mark closed, then forward `complete`. No-op if already closed.
    pub fn emit_complete(&self) {
        if self.closed.get() {
            return;
        }
        self.closed.set(true);
        let receiver = self.target.borrow_mut().take();
        if let Some(mut receiver) = receiver {
            receiver.complete();
        }
    }

    /// Mark closed, then forward `error`. No-op if already closed.
    pub fn emit_error(&self, fault: Fault) {
        if self.closed.get() {
            return;
        }
        self.closed.set(true);
        let receiver = self.target.borrow_mut().take();
        if let Some(mut receiver) = receiver {
            receiver.error(fault);
        }
    }

    /// Close without any terminal signal (the receiver asked us to stop).
    pub fn shut(&self) {
        if self.closed.get() {
            return;
        }
        self.closed.set(true);
        self.release();
    }

    fn release(&self) {
        // A close that lands while `emit` holds the borrow leaves the drop
        // to `emit`'s epilogue.
        if let Ok(mut target) = self.target.try_borrow_mut() {
            target.take();
        }
    }
}

/// An operator's non-owning hold on its upstream pipe.
///
/// Demand that arrives before the pipe is attached (the downstream `open`
/// runs first) is parked in a register and flushed on attach.
pub struct Upstream {
    pipe: RefCell<Option<PipeRef>>,
    pending: RequestCount,
}

impl Upstream {
    pub fn new() -> Self {
        Upstream {
            pipe: RefCell::new(None),
            pending: RequestCount::new(),
        }
    }

    /// Store the pipe and flush any demand parked before attach.
    pub fn attach(&self, pipe: PipeRef) {
        *self.pipe.borrow_mut() = Some(pipe.clone());
        if self.pending.infinite() {
            pipe.request(-1);
        } else {
            let parked = self.pending.withdraw(i64::MAX);
            if parked > 0 {
                pipe.request(parked);
            }
        }
    }

    /// Forward demand upstream, or park it if not yet attached.
    pub fn take(&self, n: i64) {
        if n == 0 {
            return;
        }
        let pipe = self.pipe.borrow().clone();
        match pipe {
            Some(pipe) => pipe.request(n),
            None => self.pending.request(n),
        }
    }

    /// Forward infinite demand upstream.
    pub fn take_all(&self) {
        self.take(-1);
    }

    /// Close the upstream pipe and drop the back-reference. Idempotent.
    pub fn close(&self) {
        let pipe = self.pipe.borrow_mut().take();
        if let Some(pipe) = pipe {
            pipe.close();
        }
    }

    /// Drop the back-reference without closing (upstream already
    /// terminated on its own).
    pub fn clear(&self) {
        self.pipe.borrow_mut().take();
    }
}

impl Default for Upstream {
    fn default() -> Self {
        Upstream::new()
    }
}

/// Re-entrancy guard around a drive loop.
///
/// A `request` that lands while the loop is already running must only
/// update demand and return; the running loop picks the new demand up on
/// its next pass.
pub struct Gate {
    busy: Cell<bool>,
}

impl Gate {
    pub fn new() -> Self {
        Gate {
            busy: Cell::new(false),
        }
    }

    /// Try to enter. Returns `false` when the loop is already running.
    #[inline]
    pub fn enter(&self) -> bool {
        if self.busy.get() {
            false
        } else {
            self.busy.set(true);
            true
        }
    }

    #[inline]
    pub fn leave(&self) {
        self.busy.set(false);
    }
}

impl Default for Gate {
    fn default() -> Self {
        Gate::new()
    }
}
