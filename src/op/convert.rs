//! Arity-narrowing and muting operators.
//!
//! Widening conversions are pure marker changes and live on the arity
//! wrappers; the stages here are the ones that actually touch the signal
//! flow. Stages whose downstream demand has no one-to-one item mapping
//! (`Muted`, `CompleteWith`) request all remaining upstream on attach —
//! leaf sources only reach their terminal under positive demand — and gate
//! any synthesized item on a local register so the downstream backpressure
//! law still holds.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use crate::demand::RequestCount;
use crate::error::Fault;
use crate::protocol::{Emitter, Pipe, PipeRef, Receiver};
use crate::stage::{Downstream, Upstream};

/// Discards every item; terminals pass through.
#[derive(Clone)]
pub struct Muted<E> {
    source: E,
}

impl<E> Muted<E> {
    pub(crate) fn new(source: E) -> Self {
        Muted { source }
    }
}

struct MutedShared<T, R>
where
    R: Receiver<T>,
{
    link: Downstream<T, R>,
    upstream: Upstream,
}

impl<T, R> Pipe for MutedShared<T, R>
where
    R: Receiver<T>,
{
    fn request(&self, _n: i64) {
        // Upstream already runs under infinite demand; downstream demand
        // has no items to meter.
    }

    fn close(&self) {
        self.link.shut();
        self.upstream.close();
    }
}

struct MutedOp<T, R>(Rc<MutedShared<T, R>>)
where
    R: Receiver<T>;

impl<T, R> Receiver<T> for MutedOp<T, R>
where
    T: 'static,
    R: Receiver<T> + 'static,
{
    fn open(&mut self, pipe: PipeRef) {
        let as_pipe: PipeRef = self.0.clone();
        self.0.link.accept(as_pipe);
        self.0.upstream.attach(pipe);
        self.0.upstream.take_all();
    }

    fn receive(&mut self, _item: T) {}

    fn complete(&mut self) {
        self.0.upstream.clear();
        self.0.link.emit_complete();
    }

    fn error(&mut self, fault: Fault) {
        self.0.upstream.clear();
        self.0.link.emit_error(fault);
    }
}

impl<E> Emitter for Muted<E>
where
    E: Emitter,
    E::Item: 'static,
{
    type Item = E::Item;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<E::Item> + 'static,
    {
        let shared = Rc::new(MutedShared {
            link: Downstream::new(receiver),
            upstream: Upstream::new(),
        });
        self.source.subscribe(MutedOp(shared));
    }
}

/// Turns a mute upstream into a single-item stream: on upstream
/// completion the completer's value is delivered, combined with completion.
#[derive(Clone)]
pub struct CompleteWith<E, F> {
    source: E,
    completer: F,
}

impl<E, F> CompleteWith<E, F> {
    pub(crate) fn new(source: E, completer: F) -> Self {
        CompleteWith { source, completer }
    }
}

struct CompleteWithShared<I, T, F, R>
where
    R: Receiver<T>,
{
    link: Downstream<T, R>,
    upstream: Upstream,
    completer: RefCell<Option<F>>,
    finished: Cell<bool>,
    demand: RequestCount,
    _input: PhantomData<fn(I)>,
}

impl<I, T, F, R> CompleteWithShared<I, T, F, R>
where
    F: FnOnce() -> T,
    R: Receiver<T>,
{
    /// Deliver the synthesized completion once both the upstream terminal
    /// and one unit of demand have arrived.
    fn settle(&self) {
        if !self.finished.get() || self.link.is_closed() || !self.demand.has(1) {
            return;
        }
        let completer = self.completer.borrow_mut().take();
        if let Some(completer) = completer {
            self.demand.withdraw(1);
            if self.link.emit(completer()) {
                self.link.emit_complete();
            }
        }
    }
}

impl<I, T, F, R> Pipe for CompleteWithShared<I, T, F, R>
where
    F: FnOnce() -> T,
    R: Receiver<T>,
{
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.demand.request(n);
        self.settle();
    }

    fn close(&self) {
        self.link.shut();
        self.completer.borrow_mut().take();
        self.upstream.close();
    }
}

struct CompleteWithOp<I, T, F, R>(Rc<CompleteWithShared<I, T, F, R>>)
where
    R: Receiver<T>;

impl<I, T, F, R> Receiver<I> for CompleteWithOp<I, T, F, R>
where
    F: FnOnce() -> T,
    R: Receiver<T>,
    CompleteWithShared<I, T, F, R>: 'static,
{
    fn open(&mut self, pipe: PipeRef) {
        let as_pipe: PipeRef = self.0.clone();
        self.0.link.accept(as_pipe);
        self.0.upstream.attach(pipe);
        self.0.upstream.take_all();
    }

    fn receive(&mut self, _item: I) {
        // The upstream is mute by contract; a stray item carries nothing
        // the completer could use.
    }

    fn complete(&mut self) {
        self.0.upstream.clear();
        self.0.finished.set(true);
        self.0.settle();
    }

    fn error(&mut self, fault: Fault) {
        self.0.upstream.clear();
        self.0.completer.borrow_mut().take();
        self.0.link.emit_error(fault);
    }
}

impl<E, T, F> Emitter for CompleteWith<E, F>
where
    E: Emitter,
    E::Item: 'static,
    T: 'static,
    F: FnOnce() -> T + 'static,
{
    type Item = T;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<T> + 'static,
    {
        let shared = Rc::new(CompleteWithShared {
            link: Downstream::new(receiver),
            upstream: Upstream::new(),
            completer: RefCell::new(Some(self.completer)),
            finished: Cell::new(false),
            demand: RequestCount::new(),
            _input: PhantomData,
        });
        self.source.subscribe(CompleteWithOp(shared));
    }
}

/// Turns a zero-or-one upstream into a single-item stream: a present item
/// passes through; an empty completion delivers the absent-provider's
/// value instead.
#[derive(Clone)]
pub struct OrElse<E, F> {
    source: E,
    absent: F,
}

impl<E, F> OrElse<E, F> {
    pub(crate) fn new(source: E, absent: F) -> Self {
        OrElse { source, absent }
    }
}

struct OrElseShared<T, F, R>
where
    R: Receiver<T>,
{
    link: Downstream<T, R>,
    upstream: Upstream,
    absent: RefCell<Option<F>>,
    got_item: Cell<bool>,
    finished: Cell<bool>,
    demand: RequestCount,
}

impl<T, F, R> OrElseShared<T, F, R>
where
    F: FnOnce() -> T,
    R: Receiver<T>,
{
    fn settle(&self) {
        if !self.finished.get() || self.link.is_closed() || !self.demand.has(1) {
            return;
        }
        let absent = self.absent.borrow_mut().take();
        if let Some(absent) = absent {
            self.demand.withdraw(1);
            if self.link.emit(absent()) {
                self.link.emit_complete();
            }
        }
    }
}

impl<T, F, R> Pipe for OrElseShared<T, F, R>
where
    F: FnOnce() -> T,
    R: Receiver<T>,
{
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.demand.request(n);
        self.upstream.take(n);
        self.settle();
    }

    fn close(&self) {
        self.link.shut();
        self.absent.borrow_mut().take();
        self.upstream.close();
    }
}

struct OrElseOp<T, F, R>(Rc<OrElseShared<T, F, R>>)
where
    R: Receiver<T>;

impl<T, F, R> Receiver<T> for OrElseOp<T, F, R>
where
    F: FnOnce() -> T,
    R: Receiver<T>,
    OrElseShared<T, F, R>: 'static,
{
    fn open(&mut self, pipe: PipeRef) {
        let as_pipe: PipeRef = self.0.clone();
        self.0.link.accept(as_pipe);
        self.0.upstream.attach(pipe);
    }

    fn receive(&mut self, item: T) {
        self.0.got_item.set(true);
        self.0.demand.withdraw(1);
        self.0.link.emit(item);
    }

    fn complete(&mut self) {
        self.0.upstream.clear();
        if self.0.got_item.get() {
            self.0.link.emit_complete();
        } else {
            self.0.finished.set(true);
            self.0.settle();
        }
    }

    fn error(&mut self, fault: Fault) {
        self.0.upstream.clear();
        self.0.absent.borrow_mut().take();
        self.0.link.emit_error(fault);
    }
}

impl<E, F> Emitter for OrElse<E, F>
where
    E: Emitter,
    E::Item: 'static,
    F: FnOnce() -> E::Item + 'static,
{
    type Item = E::Item;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<E::Item> + 'static,
    {
        let shared = Rc::new(OrElseShared {
            link: Downstream::new(receiver),
            upstream: Upstream::new(),
            absent: RefCell::new(Some(self.absent)),
            got_item: Cell::new(false),
            finished: Cell::new(false),
            demand: RequestCount::new(),
        });
        self.source.subscribe(OrElseOp(shared));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{Event, Recorder};
    use crate::source::{Empty, FromIter, Just};

    #[test]
    fn test_muted_swallows_items_and_forwards_complete() {
        let (probe, tap) = Recorder::with_request(-1);
        Muted::new(FromIter::new(vec![1, 2, 3].into_iter())).subscribe(probe);
        assert_eq!(tap.events(), vec![Event::Opened, Event::Completed]);
    }

    #[test]
    fn test_muted_drains_upstream_without_downstream_demand() {
        let (probe, tap) = Recorder::<i32>::new();
        Muted::new(FromIter::new(vec![1, 2].into_iter())).subscribe(probe);
        assert_eq!(tap.events(), vec![Event::Opened, Event::Completed]);
    }

    #[test]
    fn test_complete_with_synthesizes_the_value() {
        let (probe, tap) = Recorder::with_request(-1);
        CompleteWith::new(Empty::<()>::new(), || 7).subscribe(probe);
        assert_eq!(
            tap.events(),
            vec![Event::Opened, Event::Item(7), Event::Completed]
        );
    }

    #[test]
    fn test_complete_with_waits_for_demand() {
        let (probe, tap) = Recorder::<i32>::new();
        CompleteWith::new(Empty::<()>::new(), || 7).subscribe(probe);
        assert_eq!(tap.events(), vec![Event::Opened]);

        tap.request(1);
        assert_eq!(
            tap.events(),
            vec![Event::Opened, Event::Item(7), Event::Completed]
        );
    }

    #[test]
    fn test_or_else_passes_a_present_item() {
        let (probe, tap) = Recorder::with_request(-1);
        OrElse::new(Just::new(5), || 0).subscribe(probe);
        assert_eq!(
            tap.events(),
            vec![Event::Opened, Event::Item(5), Event::Completed]
        );
    }

    #[test]
    fn test_or_else_fills_in_the_absent_value() {
        let (probe, tap) = Recorder::with_request(-1);
        OrElse::new(Empty::new(), || 9).subscribe(probe);
        assert_eq!(
            tap.events(),
            vec![Event::Opened, Event::Item(9), Event::Completed]
        );
    }

    #[test]
    fn test_or_else_forwards_errors() {
        let items: Vec<Result<i32, crate::error::ProtocolError>> =
            vec![Err(crate::error::ProtocolError::MissingItem)];
        let (probe, tap) = Recorder::with_request(-1);
        OrElse::new(crate::source::TryFromIter::new(items.into_iter()), || 0)
            .subscribe(probe);
        assert_eq!(
            tap.events(),
            vec![
                Event::Opened,
                Event::Faulted(
                    "completion without an item on a single-item stream".into()
                ),
            ]
        );
    }
}
