//! Recording receivers for scripting and asserting signal traces.
//!
//! A recorder pushes every callback it observes into a shared [`Tap`] as an
//! [`Event`]; the tap also captures the pipe handed over at `open`, so a
//! test can script demand after subscription (`request`, `request_all`,
//! `close`) and then assert on the collected trace. Each arity has its own
//! recorder speaking the matching specialized receiver trait; [`Recorder`]
//! speaks the general one.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Fault;
use crate::protocol::{
    ManyReceiver, MaybeReceiver, MonoReceiver, MuteReceiver, PipeRef, Receiver,
};

/// One observed callback. Faults are captured by display text so traces
/// compare with `assert_eq!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T> {
    Opened,
    Item(T),
    Completed,
    CompletedWith(T),
    CompletedEmpty,
    Faulted(String),
}

struct TapState<T> {
    events: RefCell<Vec<Event<T>>>,
    pipe: RefCell<Option<PipeRef>>,
}

/// The test's half of a recorder: reads the trace and drives the pipe.
pub struct Tap<T> {
    state: Rc<TapState<T>>,
}

impl<T> Tap<T> {
    /// Snapshot of the trace so far.
    pub fn events(&self) -> Vec<Event<T>>
    where
        T: Clone,
    {
        self.state.events.borrow().clone()
    }

    /// Request `n` more items through the captured pipe. Does nothing
    /// before `open`.
    pub fn request(&self, n: i64) {
        let pipe = self.state.pipe.borrow().clone();
        if let Some(pipe) = pipe {
            pipe.request(n);
        }
    }

    /// Request all remaining items.
    pub fn request_all(&self) {
        self.request(-1);
    }

    /// Close the captured pipe.
    pub fn close(&self) {
        let pipe = self.state.pipe.borrow().clone();
        if let Some(pipe) = pipe {
            pipe.close();
        }
    }
}

fn tap_pair<T>() -> (Rc<TapState<T>>, Tap<T>) {
    let state = Rc::new(TapState {
        events: RefCell::new(Vec::new()),
        pipe: RefCell::new(None),
    });
    (state.clone(), Tap { state })
}

fn record_open<T>(state: &Rc<TapState<T>>, pipe: PipeRef, opening: Option<i64>) {
    *state.pipe.borrow_mut() = Some(pipe.clone());
    state.events.borrow_mut().push(Event::Opened);
    if let Some(n) = opening {
        pipe.request(n);
    }
}

/// General-receiver recorder.
pub struct Recorder<T> {
    state: Rc<TapState<T>>,
    opening: Option<i64>,
}

impl<T> Recorder<T> {
    /// A recorder that requests nothing at `open`; demand is scripted
    /// through the tap.
    pub fn new() -> (Self, Tap<T>) {
        Self::build(None)
    }

    /// A recorder that requests `n` at `open` (`-1` for all remaining).
    pub fn with_request(n: i64) -> (Self, Tap<T>) {
        Self::build(Some(n))
    }

    fn build(opening: Option<i64>) -> (Self, Tap<T>) {
        let (state, tap) = tap_pair();
        (Recorder { state, opening }, tap)
    }
}

impl<T> Receiver<T> for Recorder<T> {
    fn open(&mut self, pipe: PipeRef) {
        record_open(&self.state, pipe, self.opening);
    }

    fn receive(&mut self, item: T) {
        self.state.events.borrow_mut().push(Event::Item(item));
    }

    fn complete(&mut self) {
        self.state.events.borrow_mut().push(Event::Completed);
    }

    fn error(&mut self, fault: Fault) {
        self.state
            .events
            .borrow_mut()
            .push(Event::Faulted(fault.to_string()));
    }
}

/// [`MuteReceiver`] recorder.
pub struct MuteRecorder {
    state: Rc<TapState<()>>,
    opening: Option<i64>,
}

impl MuteRecorder {
    /// A recorder relying on the default infinite demand at `open`.
    pub fn new() -> (Self, Tap<()>) {
        Self::build(Some(-1))
    }

    /// A recorder that requests `n` at `open`.
    pub fn with_request(n: i64) -> (Self, Tap<()>) {
        Self::build(Some(n))
    }

    fn build(opening: Option<i64>) -> (Self, Tap<()>) {
        let (state, tap) = tap_pair();
        (MuteRecorder { state, opening }, tap)
    }
}

impl MuteReceiver for MuteRecorder {
    fn open(&mut self, pipe: PipeRef) {
        record_open(&self.state, pipe, self.opening);
    }

    fn complete(&mut self) {
        self.state.events.borrow_mut().push(Event::Completed);
    }

    fn error(&mut self, fault: Fault) {
        self.state
            .events
            .borrow_mut()
            .push(Event::Faulted(fault.to_string()));
    }
}

/// [`MonoReceiver`] recorder.
pub struct MonoRecorder<T> {
    state: Rc<TapState<T>>,
    opening: Option<i64>,
}

impl<T> MonoRecorder<T> {
    /// A recorder relying on the default infinite demand at `open`.
    pub fn new() -> (Self, Tap<T>) {
        Self::build(Some(-1))
    }

    /// A recorder that requests `n` at `open`.
    pub fn with_request(n: i64) -> (Self, Tap<T>) {
        Self::build(Some(n))
    }

    fn build(opening: Option<i64>) -> (Self, Tap<T>) {
        let (state, tap) = tap_pair();
        (MonoRecorder { state, opening }, tap)
    }
}

impl<T> MonoReceiver<T> for MonoRecorder<T> {
    fn open(&mut self, pipe: PipeRef) {
        record_open(&self.state, pipe, self.opening);
    }

    fn complete_with(&mut self, item: T) {
        self.state
            .events
            .borrow_mut()
            .push(Event::CompletedWith(item));
    }

    fn error(&mut self, fault: Fault) {
        self.state
            .events
            .borrow_mut()
            .push(Event::Faulted(fault.to_string()));
    }
}

/// [`MaybeReceiver`] recorder.
pub struct MaybeRecorder<T> {
    state: Rc<TapState<T>>,
    opening: Option<i64>,
}

impl<T> MaybeRecorder<T> {
    /// A recorder relying on the default infinite demand at `open`.
    pub fn new() -> (Self, Tap<T>) {
        Self::build(Some(-1))
    }

    /// A recorder that requests `n` at `open`.
    pub fn with_request(n: i64) -> (Self, Tap<T>) {
        Self::build(Some(n))
    }

    fn build(opening: Option<i64>) -> (Self, Tap<T>) {
        let (state, tap) = tap_pair();
        (MaybeRecorder { state, opening }, tap)
    }
}

impl<T> MaybeReceiver<T> for MaybeRecorder<T> {
    fn open(&mut self, pipe: PipeRef) {
        record_open(&self.state, pipe, self.opening);
    }

    fn complete_with(&mut self, item: T) {
        self.state
            .events
            .borrow_mut()
            .push(Event::CompletedWith(item));
    }

    fn complete_empty(&mut self) {
        self.state.events.borrow_mut().push(Event::CompletedEmpty);
    }

    fn error(&mut self, fault: Fault) {
        self.state
            .events
            .borrow_mut()
            .push(Event::Faulted(fault.to_string()));
    }
}

/// [`ManyReceiver`] recorder.
pub struct ManyRecorder<T> {
    state: Rc<TapState<T>>,
    opening: Option<i64>,
}

impl<T> ManyRecorder<T> {
    /// A recorder relying on the default infinite demand at `open`.
    pub fn new() -> (Self, Tap<T>) {
        Self::build(Some(-1))
    }

    /// A recorder that requests `n` at `open`.
    pub fn with_request(n: i64) -> (Self, Tap<T>) {
        Self::build(Some(n))
    }

    fn build(opening: Option<i64>) -> (Self, Tap<T>) {
        let (state, tap) = tap_pair();
        (ManyRecorder { state, opening }, tap)
    }
}

impl<T> ManyReceiver<T> for ManyRecorder<T> {
    fn open(&mut self, pipe: PipeRef) {
        record_open(&self.state, pipe, self.opening);
    }

    fn receive(&mut self, item: T) {
        self.state.events.borrow_mut().push(Event::Item(item));
    }

    fn complete(&mut self) {
        self.state.events.borrow_mut().push(Event::Completed);
    }

    fn error(&mut self, fault: Fault) {
        self.state
            .events
            .borrow_mut()
            .push(Event::Faulted(fault.to_string()));
    }
}
