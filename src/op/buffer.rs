//! Buffering operators: decoupling upstream delivery from downstream demand.
//!
//! Items *and* terminal signals are queued; a terminal is never delivered
//! while buffered items precede it. Items are demand-gated on the way out;
//! a terminal at the queue front is dispatched as soon as it gets there.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::demand::RequestCount;
use crate::error::Fault;
use crate::protocol::{Emitter, Pipe, PipeRef, Receiver};
use crate::stage::{Downstream, Gate, Upstream};

enum Slot<T> {
    Item(T),
    Complete,
    Fault(Fault),
}

/// Fixed-capacity prefetch buffer.
///
/// The capacity is a prefetch window, not a drop threshold: at `open` the
/// operator requests `capacity` items upstream, and each downstream request
/// for `k` items triggers an upstream top-up of `k` plus the shortfall back
/// to the high-water mark. No item is ever discarded.
#[derive(Clone)]
pub struct Buffer<E> {
    source: E,
    capacity: usize,
}

impl<E> Buffer<E> {
    pub(crate) fn new(source: E, capacity: usize) -> Self {
        Buffer { source, capacity }
    }
}

/// Unbounded buffer: requests all remaining upstream at `open` and paces
/// delivery purely by downstream demand.
#[derive(Clone)]
pub struct Unbounded<E> {
    source: E,
}

impl<E> Unbounded<E> {
    pub(crate) fn new(source: E) -> Self {
        Unbounded { source }
    }
}

struct BufferShared<T, R>
where
    R: Receiver<T>,
{
    link: Downstream<T, R>,
    upstream: Upstream,
    queue: RefCell<VecDeque<Slot<T>>>,
    demand: RequestCount,
    gate: Gate,
    capacity: Option<usize>,
}

impl<T, R> BufferShared<T, R>
where
    R: Receiver<T>,
{
    fn pump(&self) {
        if !self.gate.enter() {
            return;
        }
        self.drain();
        self.gate.leave();
    }

    fn drain(&self) {
        loop {
            if self.link.is_closed() {
                self.queue.borrow_mut().clear();
                return;
            }
            let slot = {
                let mut queue = self.queue.borrow_mut();
                let deliverable = match queue.front() {
                    None => false,
                    Some(Slot::Item(_)) => self.demand.has(1),
                    Some(_) => true,
                };
                if !deliverable {
                    return;
                }
                queue.pop_front()
            };
            match slot {
                Some(Slot::Item(item)) => {
                    self.demand.withdraw(1);
                    self.link.emit(item);
                }
                Some(Slot::Complete) => {
                    self.link.emit_complete();
                    return;
                }
                Some(Slot::Fault(fault)) => {
                    self.link.emit_error(fault);
                    return;
                }
                None => return,
            }
        }
    }

    fn enqueue(&self, slot: Slot<T>) {
        if self.link.is_closed() {
            return;
        }
        self.queue.borrow_mut().push_back(slot);
        self.pump();
    }
}

impl<T, R> Pipe for BufferShared<T, R>
where
    R: Receiver<T>,
{
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.demand.request(n);
        self.pump();
        if self.link.is_closed() {
            return;
        }
        if let Some(capacity) = self.capacity {
            if self.demand.infinite() {
                self.upstream.take_all();
            } else {
                let shortfall =
                    capacity.saturating_sub(self.queue.borrow().len()) as i64;
                self.upstream.take(n.saturating_add(shortfall));
            }
        }
    }

    fn close(&self) {
        self.link.shut();
        self.queue.borrow_mut().clear();
        self.upstream.close();
    }
}

struct BufferOp<T, R>(Rc<BufferShared<T, R>>)
where
    R: Receiver<T>;

impl<T, R> Receiver<T> for BufferOp<T, R>
where
    T: 'static,
    R: Receiver<T> + 'static,
{
    fn open(&mut self, pipe: PipeRef) {
        let as_pipe: PipeRef = self.0.clone();
        self.0.link.accept(as_pipe);
        self.0.upstream.attach(pipe);
        match self.0.capacity {
            Some(capacity) => self.0.upstream.take(capacity as i64),
            None => self.0.upstream.take_all(),
        }
    }

    fn receive(&mut self, item: T) {
        self.0.enqueue(Slot::Item(item));
    }

    fn complete(&mut self) {
        self.0.upstream.clear();
        self.0.enqueue(Slot::Complete);
    }

    fn error(&mut self, fault: Fault) {
        self.0.upstream.clear();
        self.0.enqueue(Slot::Fault(fault));
    }
}

fn subscribe_buffered<E, R>(source: E, capacity: Option<usize>, receiver: R)
where
    E: Emitter,
    E::Item: 'static,
    R: Receiver<E::Item> + 'static,
{
    let shared = Rc::new(BufferShared {
        link: Downstream::new(receiver),
        upstream: Upstream::new(),
        queue: RefCell::new(VecDeque::new()),
        demand: RequestCount::new(),
        gate: Gate::new(),
        capacity,
    });
    source.subscribe(BufferOp(shared));
}

impl<E> Emitter for Buffer<E>
where
    E: Emitter,
    E::Item: 'static,
{
    type Item = E::Item;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<E::Item> + 'static,
    {
        subscribe_buffered(self.source, Some(self.capacity), receiver);
    }
}

impl<E> Emitter for Unbounded<E>
where
    E: Emitter,
    E::Item: 'static,
{
    type Item = E::Item;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<E::Item> + 'static,
    {
        subscribe_buffered(self.source, None, receiver);
    }
}
