//! Leaf sources: generators with no upstream.
//!
//! Each source is a cheap blueprint; `subscribe` consumes it and builds the
//! live stage. The stage itself is the pipe it hands downstream. Production
//! is entirely demand-driven: nothing is emitted until the receiver
//! requests, and a request placed during `open` is honored as soon as
//! `open` returns.

use std::cell::RefCell;
use std::iter::Peekable;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::demand::RequestCount;
use crate::error::Fault;
use crate::protocol::{Emitter, Idle, Pipe, PipeRef, Receiver};
use crate::stage::{Downstream, Gate};

/// Completes on the first positive request, without ever emitting.
#[derive(Clone)]
pub struct Empty<T> {
    _item: PhantomData<T>,
}

impl<T> Empty<T> {
    pub(crate) fn new() -> Self {
        Empty { _item: PhantomData }
    }
}

struct EmptyStage<T, R>
where
    R: Receiver<T>,
{
    link: Downstream<T, R>,
    demand: RequestCount,
    gate: Gate,
}

impl<T, R> EmptyStage<T, R>
where
    R: Receiver<T>,
{
    fn pump(&self) {
        if !self.gate.enter() {
            return;
        }
        if self.demand.has(1) {
            self.link.emit_complete();
        }
        self.gate.leave();
    }
}

impl<T, R> Pipe for EmptyStage<T, R>
where
    R: Receiver<T>,
{
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.demand.request(n);
        self.pump();
    }

    fn close(&self) {
        self.link.shut();
    }
}

impl<T: 'static> Emitter for Empty<T> {
    type Item = T;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<T> + 'static,
    {
        let stage = Rc::new(EmptyStage {
            link: Downstream::new(receiver),
            demand: RequestCount::new(),
            gate: Gate::new(),
        });
        let pipe: PipeRef = stage.clone();
        stage.gate.enter();
        stage.link.accept(pipe);
        stage.gate.leave();
        stage.pump();
    }
}

/// Emits one value then completes, on the first nonzero request.
#[derive(Clone)]
pub struct Just<T> {
    value: T,
}

impl<T> Just<T> {
    pub(crate) fn new(value: T) -> Self {
        Just { value }
    }
}

struct JustStage<T, R>
where
    R: Receiver<T>,
{
    link: Downstream<T, R>,
    value: RefCell<Option<T>>,
    demand: RequestCount,
    gate: Gate,
}

impl<T, R> JustStage<T, R>
where
    R: Receiver<T>,
{
    fn pump(&self) {
        if !self.gate.enter() {
            return;
        }
        if self.demand.has(1) && !self.link.is_closed() {
            if let Some(value) = self.value.borrow_mut().take() {
                self.demand.withdraw(1);
                if self.link.emit(value) {
                    self.link.emit_complete();
                }
            }
        }
        self.gate.leave();
    }
}

impl<T, R> Pipe for JustStage<T, R>
where
    R: Receiver<T>,
{
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.demand.request(n);
        self.pump();
    }

    fn close(&self) {
        self.link.shut();
        self.value.borrow_mut().take();
    }
}

impl<T: 'static> Emitter for Just<T> {
    type Item = T;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<T> + 'static,
    {
        let stage = Rc::new(JustStage {
            link: Downstream::new(receiver),
            value: RefCell::new(Some(self.value)),
            demand: RequestCount::new(),
            gate: Gate::new(),
        });
        let pipe: PipeRef = stage.clone();
        stage.gate.enter();
        stage.link.accept(pipe);
        stage.gate.leave();
        stage.pump();
    }
}

/// Emits the items of a one-shot iterator, pacing pulls by demand.
///
/// After each delivered item the iterator is probed for exhaustion so the
/// completion is emitted as soon as it is known, without waiting for
/// another request.
#[derive(Clone)]
pub struct FromIter<I> {
    iter: I,
}

impl<I> FromIter<I> {
    pub(crate) fn new(iter: I) -> Self {
        FromIter { iter }
    }
}

struct FromIterStage<I, R>
where
    I: Iterator,
    R: Receiver<I::Item>,
{
    link: Downstream<I::Item, R>,
    iter: RefCell<Peekable<I>>,
    demand: RequestCount,
    gate: Gate,
}

impl<I, R> FromIterStage<I, R>
where
    I: Iterator,
    R: Receiver<I::Item>,
{
    fn pump(&self) {
        if !self.gate.enter() {
            return;
        }
        self.drive();
        self.gate.leave();
    }

    fn drive(&self) {
        loop {
            if self.link.is_closed() || !self.demand.has(1) {
                return;
            }
            let next = self.iter.borrow_mut().next();
            match next {
                Some(item) => {
                    self.demand.withdraw(1);
                    if !self.link.emit(item) {
                        return;
                    }
                    if self.iter.borrow_mut().peek().is_none() {
                        self.link.emit_complete();
                        return;
                    }
                }
                None => {
                    self.link.emit_complete();
                    return;
                }
            }
        }
    }
}

impl<I, R> Pipe for FromIterStage<I, R>
where
    I: Iterator,
    R: Receiver<I::Item>,
{
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.demand.request(n);
        self.pump();
    }

    fn close(&self) {
        self.link.shut();
    }
}

impl<I> Emitter for FromIter<I>
where
    I: Iterator + 'static,
{
    type Item = I::Item;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<I::Item> + 'static,
    {
        let stage = Rc::new(FromIterStage {
            link: Downstream::new(receiver),
            iter: RefCell::new(self.iter.peekable()),
            demand: RequestCount::new(),
            gate: Gate::new(),
        });
        let pipe: PipeRef = stage.clone();
        stage.gate.enter();
        stage.link.accept(pipe);
        stage.gate.leave();
        stage.pump();
    }
}

/// As [`FromIter`], over an iterator of results: the first `Err` is
/// forwarded as an `Error` signal and the stage closes.
#[derive(Clone)]
pub struct TryFromIter<I> {
    iter: I,
}

impl<I> TryFromIter<I> {
    pub(crate) fn new(iter: I) -> Self {
        TryFromIter { iter }
    }
}

struct TryFromIterStage<T, E, I, R>
where
    I: Iterator<Item = Result<T, E>>,
    R: Receiver<T>,
{
    link: Downstream<T, R>,
    iter: RefCell<Peekable<I>>,
    demand: RequestCount,
    gate: Gate,
}

impl<T, E, I, R> TryFromIterStage<T, E, I, R>
where
    I: Iterator<Item = Result<T, E>>,
    E: Into<Fault>,
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
        loop {
            if self.link.is_closed() || !self.demand.has(1) {
                return;
            }
            let next = self.iter.borrow_mut().next();
            match next {
                Some(Ok(item)) => {
                    self.demand.withdraw(1);
                    if !self.link.emit(item) {
                        return;
                    }
                    if self.iter.borrow_mut().peek().is_none() {
                        self.link.emit_complete();
                        return;
                    }
                }
                Some(Err(fault)) => {
                    self.link.emit_error(fault.into());
                    return;
                }
                None => {
                    self.link.emit_complete();
                    return;
                }
            }
        }
    }
}

impl<T, E, I, R> Pipe for TryFromIterStage<T, E, I, R>
where
    I: Iterator<Item = Result<T, E>>,
    E: Into<Fault>,
    R: Receiver<T>,
{
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.demand.request(n);
        self.pump();
    }

    fn close(&self) {
        self.link.shut();
    }
}

impl<T, E, I> Emitter for TryFromIter<I>
where
    T: 'static,
    E: Into<Fault> + 'static,
    I: Iterator<Item = Result<T, E>> + 'static,
{
    type Item = T;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<T> + 'static,
    {
        let stage = Rc::new(TryFromIterStage {
            link: Downstream::new(receiver),
            iter: RefCell::new(self.iter.peekable()),
            demand: RequestCount::new(),
            gate: Gate::new(),
        });
        let pipe: PipeRef = stage.clone();
        stage.gate.enter();
        stage.link.accept(pipe);
        stage.gate.leave();
        stage.pump();
    }
}

/// Delivers `Open` with a pipe whose effects go nowhere, then stays silent
/// forever.
#[derive(Clone)]
pub struct Never<T> {
    _item: PhantomData<T>,
}

impl<T> Never<T> {
    pub(crate) fn new() -> Self {
        Never { _item: PhantomData }
    }
}

impl<T: 'static> Emitter for Never<T> {
    type Item = T;

    fn subscribe<R>(self, mut receiver: R)
    where
        R: Receiver<T> + 'static,
    {
        receiver.open(Rc::new(Idle));
    }
}
