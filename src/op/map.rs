//! Synchronous per-item transformation.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::Fault;
use crate::protocol::{Emitter, Pipe, PipeRef, Receiver};
use crate::stage::{Downstream, Upstream};

/// Applies an infallible function to each item; terminals and demand pass
/// through untouched.
#[derive(Clone)]
pub struct Map<E, F> {
    source: E,
    f: F,
}

impl<E, F> Map<E, F> {
    pub(crate) fn new(source: E, f: F) -> Self {
        Map { source, f }
    }
}

struct MapShared<I, O, F, R>
where
    R: Receiver<O>,
{
    f: RefCell<F>,
    link: Downstream<O, R>,
    upstream: Upstream,
    _input: PhantomData<fn(I)>,
}

impl<I, O, F, R> Pipe for MapShared<I, O, F, R>
where
    R: Receiver<O>,
{
    fn request(&self, n: i64) {
        if self.link.is_closed() {
            return;
        }
        self.upstream.take(n);
    }

    fn close(&self) {
        self.link.shut();
        self.upstream.close();
    }
}

struct MapOp<I, O, F, R>(Rc<MapShared<I, O, F, R>>)
where
    R: Receiver<O>;

impl<I, O, F, R> Receiver<I> for MapOp<I, O, F, R>
where
    F: FnMut(I) -> O,
    R: Receiver<O>,
    MapShared<I, O, F, R>: 'static,
{
    fn open(&mut self, pipe: PipeRef) {
        let as_pipe: PipeRef = self.0.clone();
        self.0.link.accept(as_pipe);
        self.0.upstream.attach(pipe);
    }

    fn receive(&mut self, item: I) {
        let out = (self.0.f.borrow_mut())(item);
        self.0.link.emit(out);
    }

    fn complete(&mut self) {
        self.0.upstream.clear();
        self.0.link.emit_complete();
    }

    fn error(&mut self, fault: Fault) {
        self.0.upstream.clear();
        self.0.link.emit_error(fault);
    }
}

impl<E, O, F> Emitter for Map<E, F>
where
    E: Emitter,
    E::Item: 'static,
    O: 'static,
    F: FnMut(E::Item) -> O + 'static,
{
    type Item = O;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<O> + 'static,
    {
        let shared = Rc::new(MapShared {
            f: RefCell::new(self.f),
            link: Downstream::new(receiver),
            upstream: Upstream::new(),
            _input: PhantomData,
        });
        self.source.subscribe(MapOp(shared));
    }
}

/// As [`Map`], with a fallible function: the first `Err` closes the
/// upstream pipe and travels downstream as an `Error` signal.
#[derive(Clone)]
pub struct TryMap<E, F> {
    source: E,
    f: F,
}

impl<E, F> TryMap<E, F> {
    pub(crate) fn new(source: E, f: F) -> Self {
        TryMap { source, f }
    }
}

struct TryMapOp<I, O, F, R>(Rc<MapShared<I, O, F, R>>)
where
    R: Receiver<O>;

impl<I, O, X, F, R> Receiver<I> for TryMapOp<I, O, F, R>
where
    F: FnMut(I) -> Result<O, X>,
    X: Into<Fault>,
    R: Receiver<O>,
    MapShared<I, O, F, R>: 'static,
{
    fn open(&mut self, pipe: PipeRef) {
        let as_pipe: PipeRef = self.0.clone();
        self.0.link.accept(as_pipe);
        self.0.upstream.attach(pipe);
    }

    fn receive(&mut self, item: I) {
        let out = (self.0.f.borrow_mut())(item);
        match out {
            Ok(out) => {
                self.0.link.emit(out);
            }
            Err(fault) => {
                self.0.upstream.close();
                self.0.link.emit_error(fault.into());
            }
        }
    }

    fn complete(&mut self) {
        self.0.upstream.clear();
        self.0.link.emit_complete();
    }

    fn error(&mut self, fault: Fault) {
        self.0.upstream.clear();
        self.0.link.emit_error(fault);
    }
}

impl<E, O, X, F> Emitter for TryMap<E, F>
where
    E: Emitter,
    E::Item: 'static,
    O: 'static,
    X: Into<Fault> + 'static,
    F: FnMut(E::Item) -> Result<O, X> + 'static,
{
    type Item = O;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<O> + 'static,
    {
        let shared = Rc::new(MapShared {
            f: RefCell::new(self.f),
            link: Downstream::new(receiver),
            upstream: Upstream::new(),
            _input: PhantomData,
        });
        self.source.subscribe(TryMapOp(shared));
    }
}
