//! The coroutine generator: a suspendable producer gated on demand.
//!
//! The producer body is an async block that receives an [`Emit`] sink.
//! `emit(item).await` suspends while local demand is zero, consumes one
//! unit of demand when it proceeds, and resolves to `Err(Canceled)` once
//! the pipe has been closed — the body propagates that with `?` and must
//! not catch it. The stage drives the body cooperatively on the caller's
//! thread with a no-op waker; no thread or executor is involved, and
//! `emit` is the only suspension point the stage can resume.
//!
//! The body is not started at `open`; it starts on the first nonzero
//! request. A request that lands while the body is running only updates
//! demand — the running drive loop picks it up on its next pass.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use crate::demand::RequestCount;
use crate::error::{is_canceled, Canceled, Fault, ProtocolError};
use crate::protocol::{Emitter, Pipe, PipeRef, Receiver};
use crate::stage::{Downstream, Gate};

fn noop_waker() -> Waker {
    struct Noop;
    impl Wake for Noop {
        fn wake(self: Arc<Self>) {}
    }
    Waker::from(Arc::new(Noop))
}

struct EmitState<T> {
    demand: RequestCount,
    closed: Cell<bool>,
    staged: RefCell<VecDeque<T>>,
    emitted: Cell<u64>,
    limit: Option<u64>,
}

/// The sink handle passed to a generator body.
pub struct Emit<T> {
    state: Rc<EmitState<T>>,
}

impl<T> Emit<T> {
    /// Hand one item downstream, suspending until demand covers it.
    ///
    /// Resolves to `Err(Canceled)` once the pipe is closed; a body
    /// propagates that with `?`. Under a single-item arity cap a second
    /// call resolves to an over-arity [`ProtocolError`] instead.
    pub fn emit(&self, item: T) -> EmitFuture<T> {
        EmitFuture {
            state: self.state.clone(),
            item: Some(item),
        }
    }
}

/// Future returned by [`Emit::emit`].
pub struct EmitFuture<T> {
    state: Rc<EmitState<T>>,
    item: Option<T>,
}

impl<T> Unpin for EmitFuture<T> {}

impl<T> Future for EmitFuture<T> {
    type Output = Result<(), Fault>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if this.state.closed.get() {
            return Poll::Ready(Err(Box::new(Canceled)));
        }
        if let Some(limit) = this.state.limit {
            if this.state.emitted.get() >= limit {
                return Poll::Ready(Err(Box::new(ProtocolError::OverArity)));
            }
        }
        if !this.state.demand.has(1) {
            return Poll::Pending;
        }
        let Some(item) = this.item.take() else {
            return Poll::Ready(Ok(()));
        };
        this.state.demand.withdraw(1);
        this.state.emitted.set(this.state.emitted.get() + 1);
        this.state.staged.borrow_mut().push_back(item);
        Poll::Ready(Ok(()))
    }
}

/// Generator blueprint built by `many::generate`, `maybe::generate`, and
/// `mono::generate`.
pub struct Generate<T, F> {
    body: F,
    limit: Option<u64>,
    require_one: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T, F> Generate<T, F> {
    pub(crate) fn new(body: F, limit: Option<u64>, require_one: bool) -> Self {
        Generate {
            body,
            limit,
            require_one,
            _item: PhantomData,
        }
    }
}

enum BodyState<F, Fut> {
    NotStarted(F),
    Running(Pin<Box<Fut>>),
    Finished,
}

struct GenerateStage<T, F, Fut, R>
where
    R: Receiver<T>,
{
    link: Downstream<T, R>,
    state: Rc<EmitState<T>>,
    body: RefCell<BodyState<F, Fut>>,
    require_one: bool,
    gate: Gate,
}

impl<T, F, Fut, R> GenerateStage<T, F, Fut, R>
where
    F: FnOnce(Emit<T>) -> Fut,
    Fut: Future<Output = Result<(), Fault>>,
    R: Receiver<T>,
{
    fn pump(&self) {
        if !self.gate.enter() {
            return;
        }
        self.drive();
        self.gate.leave();
    }

    fn drive(&self) {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        loop {
            {
                let mut body = self.body.borrow_mut();
                match &mut *body {
                    BodyState::Finished => return,
                    BodyState::NotStarted(_) => {
                        if self.state.closed.get() {
                            // Never started, so there is nothing to unwind.
                            *body = BodyState::Finished;
                            return;
                        }
                        if !self.state.demand.has(1) {
                            return;
                        }
                        if let BodyState::NotStarted(f) =
                            std::mem::replace(&mut *body, BodyState::Finished)
                        {
                            let sink = Emit {
                                state: self.state.clone(),
                            };
                            *body = BodyState::Running(Box::pin(f(sink)));
                        }
                    }
                    BodyState::Running(_) => {
                        if !self.state.closed.get()
                            && !self.state.demand.has(1)
                            && self.state.staged.borrow().is_empty()
                        {
                            return;
                        }
                    }
                }
            }

            let before = (self.state.emitted.get(), self.state.closed.get());
            // The body only touches the shared sink state while polled; it
            // cannot reach back into `self.body`.
            let polled = {
                let mut body = self.body.borrow_mut();
                match &mut *body {
                    BodyState::Running(fut) => Some(fut.as_mut().poll(&mut cx)),
                    _ => None,
                }
            };
            self.flush();
            match polled {
                None => return,
                Some(Poll::Pending) => {
                    let after = (self.state.emitted.get(), self.state.closed.get());
                    if after == before {
                        // Parked on something other than fresh demand; the
                        // next request or close re-enters.
                        return;
                    }
                }
                Some(Poll::Ready(outcome)) => {
                    *self.body.borrow_mut() = BodyState::Finished;
                    self.finish(outcome);
                    return;
                }
            }
        }
    }

    fn flush(&self) {
        loop {
            if self.link.is_closed() || self.state.closed.get() {
                self.state.staged.borrow_mut().clear();
                return;
            }
            let item = self.state.staged.borrow_mut().pop_front();
            match item {
                Some(item) => {
                    self.link.emit(item);
                }
                None => return,
            }
        }
    }

    fn finish(&self, outcome: Result<(), Fault>) {
        match outcome {
            Ok(()) => {
                if self.require_one && self.state.emitted.get() == 0 {
                    self.link
                        .emit_error(Box::new(ProtocolError::MissingItem));
                } else {
                    self.link.emit_complete();
                }
            }
            Err(fault) if is_canceled(&fault) => {
                log::debug!("generator body unwound by cancellation");
                self.link.shut();
            }
            Err(fault) => self.link.emit_error(fault),
        }
    }
}

impl<T, F, Fut, R> Pipe for GenerateStage<T, F, Fut, R>
where
    F: FnOnce(Emit<T>) -> Fut,
    Fut: Future<Output = Result<(), Fault>>,
    R: Receiver<T>,
{
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.state.demand.request(n);
        self.pump();
    }

    fn close(&self) {
        if self.state.closed.get() {
            return;
        }
        self.state.closed.set(true);
        self.link.shut();
        self.state.staged.borrow_mut().clear();
        // A body suspended in `emit` is resumed with the cancellation; if
        // the drive loop is running above us, it delivers the cancellation
        // at the body's next suspension instead.
        self.pump();
    }
}

impl<T, F, Fut> Emitter for Generate<T, F>
where
    T: 'static,
    F: FnOnce(Emit<T>) -> Fut + 'static,
    Fut: Future<Output = Result<(), Fault>> + 'static,
{
    type Item = T;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<T> + 'static,
    {
        let stage = Rc::new(GenerateStage {
            link: Downstream::new(receiver),
            state: Rc::new(EmitState {
                demand: RequestCount::new(),
                closed: Cell::new(false),
                staged: RefCell::new(VecDeque::new()),
                emitted: Cell::new(0),
                limit: self.limit,
            }),
            body: RefCell::new(BodyState::NotStarted(self.body)),
            require_one: self.require_one,
            gate: Gate::new(),
        });
        let pipe: PipeRef = stage.clone();
        stage.gate.enter();
        stage.link.accept(pipe);
        stage.gate.leave();
        stage.pump();
    }
}
