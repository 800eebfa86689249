//! The arity taxonomy: `Mute`, `Mono`, `Maybe`, `Many`.
//!
//! Each wrapper refines an inner [`Emitter`] with a type-level promise
//! about the maximum number of items it delivers, and offers the typed
//! subscription doors for the matching specialized receiver. Widening a
//! wrapper is a pure marker change — the underlying pipeline is reused
//! verbatim; narrowing and muting splice a conversion stage in.
//!
//! Constructors live in the arity-scoped modules [`mute`], [`mono`],
//! [`maybe`], and [`many`].

use crate::guard::{ManyGuard, MaybeGuard, MonoGuard, MuteGuard, OnViolation};
use crate::op::{Buffer, CompleteWith, Map, Muted, OrElse, TryMap, Unbounded};
use crate::protocol::{
    Emitter, ManyReceiver, MaybeReceiver, MonoReceiver, MuteReceiver, Receiver,
};

/// A stream that delivers no items: only a terminal.
#[derive(Clone)]
pub struct Mute<E>(E);

/// A stream that delivers exactly one item, combined with its completion.
#[derive(Clone)]
pub struct Mono<E>(E);

/// A stream that delivers zero or one item.
#[derive(Clone)]
pub struct Maybe<E>(E);

/// A stream that delivers any number of items.
#[derive(Clone)]
pub struct Many<E>(E);

impl<E: Emitter> Mute<E> {
    /// Bless an emitter as mute. Unchecked: the guard at subscription
    /// polices the promise.
    pub fn new(emitter: E) -> Self {
        Mute(emitter)
    }

    /// Subscribe a [`MuteReceiver`], policing the contract with the
    /// default [`OnViolation::Ignore`] policy.
    pub fn subscribe<R>(self, receiver: R)
    where
        E::Item: 'static,
        R: MuteReceiver + 'static,
    {
        self.subscribe_with(OnViolation::default(), receiver);
    }

    /// Subscribe a [`MuteReceiver`] under an explicit violation policy.
    pub fn subscribe_with<R>(self, policy: OnViolation, receiver: R)
    where
        E::Item: 'static,
        R: MuteReceiver + 'static,
    {
        self.0.subscribe(MuteGuard::with_policy(receiver, policy));
    }

    /// Subscribe a general receiver with no arity policing.
    pub fn subscribe_raw<R>(self, receiver: R)
    where
        R: Receiver<E::Item> + 'static,
    {
        self.0.subscribe(receiver);
    }

    /// Widen to zero-or-one. The pipeline is reused verbatim.
    pub fn as_maybe(self) -> Maybe<E> {
        Maybe(self.0)
    }

    /// Widen to any-number. The pipeline is reused verbatim.
    pub fn as_many(self) -> Many<E> {
        Many(self.0)
    }

    /// Narrow to a single-item stream: on upstream completion the
    /// completer's value is delivered, combined with completion.
    ///
    /// ```rust
    /// use rill::probe::{Event, Recorder};
    ///
    /// let (probe, tap) = Recorder::with_request(-1);
    /// rill::mute::just().into_mono(|| 7).subscribe_raw(probe);
    /// assert_eq!(
    ///     tap.events(),
    ///     vec![Event::Opened, Event::Item(7), Event::Completed],
    /// );
    /// ```
    pub fn into_mono<T, F>(self, completer: F) -> Mono<CompleteWith<E, F>>
    where
        F: FnOnce() -> T,
    {
        Mono(CompleteWith::new(self.0, completer))
    }
}

impl<E: Emitter> Mono<E> {
    /// Bless an emitter as single-item. Unchecked: the guard at
    /// subscription polices the promise.
    pub fn new(emitter: E) -> Self {
        Mono(emitter)
    }

    /// Subscribe a [`MonoReceiver`]. The guard buffers the item and
    /// delivers it combined with completion, under the default
    /// [`OnViolation::Ignore`] policy.
    pub fn subscribe<R>(self, receiver: R)
    where
        E::Item: 'static,
        R: MonoReceiver<E::Item> + 'static,
    {
        self.subscribe_with(OnViolation::default(), receiver);
    }

    /// Subscribe a [`MonoReceiver`] under an explicit violation policy.
    pub fn subscribe_with<R>(self, policy: OnViolation, receiver: R)
    where
        E::Item: 'static,
        R: MonoReceiver<E::Item> + 'static,
    {
        self.0.subscribe(MonoGuard::with_policy(receiver, policy));
    }

    /// Subscribe a general receiver with no arity policing.
    pub fn subscribe_raw<R>(self, receiver: R)
    where
        R: Receiver<E::Item> + 'static,
    {
        self.0.subscribe(receiver);
    }

    /// Transform the item.
    pub fn map<O, F>(self, f: F) -> Mono<Map<E, F>>
    where
        F: FnMut(E::Item) -> O,
    {
        Mono(Map::new(self.0, f))
    }

    /// Transform the item fallibly; an `Err` becomes an `Error` signal.
    pub fn try_map<O, X, F>(self, f: F) -> Mono<TryMap<E, F>>
    where
        F: FnMut(E::Item) -> Result<O, X>,
    {
        Mono(TryMap::new(self.0, f))
    }

    /// Widen to zero-or-one. The pipeline is reused verbatim.
    pub fn as_maybe(self) -> Maybe<E> {
        Maybe(self.0)
    }

    /// Widen to any-number. The pipeline is reused verbatim.
    pub fn as_many(self) -> Many<E> {
        Many(self.0)
    }

    /// Discard the item; only the terminal passes.
    pub fn mute(self) -> Mute<Muted<E>> {
        Mute(Muted::new(self.0))
    }
}

impl<E: Emitter> Maybe<E> {
    /// Bless an emitter as zero-or-one. Unchecked: the guard at
    /// subscription polices the promise.
    pub fn new(emitter: E) -> Self {
        Maybe(emitter)
    }

    /// Subscribe a [`MaybeReceiver`] under the default
    /// [`OnViolation::Ignore`] policy.
    pub fn subscribe<R>(self, receiver: R)
    where
        E::Item: 'static,
        R: MaybeReceiver<E::Item> + 'static,
    {
        self.subscribe_with(OnViolation::default(), receiver);
    }

    /// Subscribe a [`MaybeReceiver`] under an explicit violation policy.
    pub fn subscribe_with<R>(self, policy: OnViolation, receiver: R)
    where
        E::Item: 'static,
        R: MaybeReceiver<E::Item> + 'static,
    {
        self.0.subscribe(MaybeGuard::with_policy(receiver, policy));
    }

    /// Subscribe a general receiver with no arity policing.
    pub fn subscribe_raw<R>(self, receiver: R)
    where
        R: Receiver<E::Item> + 'static,
    {
        self.0.subscribe(receiver);
    }

    /// Transform the item.
    pub fn map<O, F>(self, f: F) -> Maybe<Map<E, F>>
    where
        F: FnMut(E::Item) -> O,
    {
        Maybe(Map::new(self.0, f))
    }

    /// Transform the item fallibly; an `Err` becomes an `Error` signal.
    pub fn try_map<O, X, F>(self, f: F) -> Maybe<TryMap<E, F>>
    where
        F: FnMut(E::Item) -> Result<O, X>,
    {
        Maybe(TryMap::new(self.0, f))
    }

    /// Widen to any-number. The pipeline is reused verbatim.
    pub fn as_many(self) -> Many<E> {
        Many(self.0)
    }

    /// Narrow to a single-item stream, filling the empty case in with the
    /// absent-provider's value.
    pub fn into_mono<F>(self, absent: F) -> Mono<OrElse<E, F>>
    where
        F: FnOnce() -> E::Item,
    {
        Mono(OrElse::new(self.0, absent))
    }

    /// Narrow to a single-item stream of optional payloads: a present
    /// item arrives as `Some`, an empty completion as `None`.
    pub fn into_mono_option(
        self,
    ) -> Mono<impl Emitter<Item = Option<E::Item>>>
    where
        E::Item: 'static,
        E: 'static,
    {
        Mono(OrElse::new(Map::new(self.0, Some), || None))
    }

    /// Discard the item; only the terminal passes.
    pub fn mute(self) -> Mute<Muted<E>> {
        Mute(Muted::new(self.0))
    }
}

impl<E: Emitter> Many<E> {
    /// Bless an emitter as any-number. The guard at subscription polices
    /// signal ordering.
    pub fn new(emitter: E) -> Self {
        Many(emitter)
    }

    /// Subscribe a [`ManyReceiver`] under the default
    /// [`OnViolation::Ignore`] policy.
    pub fn subscribe<R>(self, receiver: R)
    where
        E::Item: 'static,
        R: ManyReceiver<E::Item> + 'static,
    {
        self.subscribe_with(OnViolation::default(), receiver);
    }

    /// Subscribe a [`ManyReceiver`] under an explicit violation policy.
    pub fn subscribe_with<R>(self, policy: OnViolation, receiver: R)
    where
        E::Item: 'static,
        R: ManyReceiver<E::Item> + 'static,
    {
        self.0.subscribe(ManyGuard::with_policy(receiver, policy));
    }

    /// Subscribe a general receiver with no arity policing.
    pub fn subscribe_raw<R>(self, receiver: R)
    where
        R: Receiver<E::Item> + 'static,
    {
        self.0.subscribe(receiver);
    }

    /// Transform every item.
    ///
    /// ```rust
    /// use rill::probe::{Event, Recorder};
    ///
    /// let (probe, tap) = Recorder::with_request(-1);
    /// rill::many::just([1, 2]).map(|n| n * 10).subscribe_raw(probe);
    /// assert_eq!(
    ///     tap.events(),
    ///     vec![
    ///         Event::Opened,
    ///         Event::Item(10),
    ///         Event::Item(20),
    ///         Event::Completed,
    ///     ],
    /// );
    /// ```
    pub fn map<O, F>(self, f: F) -> Many<Map<E, F>>
    where
        F: FnMut(E::Item) -> O,
    {
        Many(Map::new(self.0, f))
    }

    /// Transform every item fallibly; the first `Err` becomes an `Error`
    /// signal and the upstream is closed.
    pub fn try_map<O, X, F>(self, f: F) -> Many<TryMap<E, F>>
    where
        F: FnMut(E::Item) -> Result<O, X>,
    {
        Many(TryMap::new(self.0, f))
    }

    /// Decouple upstream delivery from downstream demand through a
    /// fixed-capacity prefetch buffer.
    pub fn buffer(self, capacity: usize) -> Many<Buffer<E>> {
        Many(Buffer::new(self.0, capacity))
    }

    /// Decouple through an unbounded buffer: upstream runs under infinite
    /// demand; downstream demand paces delivery.
    pub fn buffer_unbounded(self) -> Many<Unbounded<E>> {
        Many(Unbounded::new(self.0))
    }

    /// Discard all items; only the terminal passes.
    pub fn mute(self) -> Mute<Muted<E>> {
        Mute(Muted::new(self.0))
    }
}

/// Constructors for [`Mute`] streams.
pub mod mute {
    use super::Mute;
    use crate::source::{Empty, Never};

    /// A mute stream that completes on first demand.
    pub fn just() -> Mute<Empty<()>> {
        empty()
    }

    /// Same as [`just`]: the canonical empty mute stream.
    pub fn empty() -> Mute<Empty<()>> {
        Mute(Empty::new())
    }

    /// A mute stream that never terminates.
    pub fn never() -> Mute<Never<()>> {
        Mute(Never::new())
    }
}

/// Constructors for [`Mono`] streams.
pub mod mono {
    use std::future::Future;

    use super::Mono;
    use crate::error::Fault;
    use crate::generate::{Emit, Generate};
    use crate::source::{Just, Never};

    /// A stream of exactly `value`.
    ///
    /// ```rust
    /// use rill::probe::{Event, Recorder};
    ///
    /// let (probe, tap) = Recorder::with_request(-1);
    /// rill::mono::just(3).subscribe_raw(probe);
    /// assert_eq!(
    ///     tap.events(),
    ///     vec![Event::Opened, Event::Item(3), Event::Completed],
    /// );
    /// ```
    pub fn just<T>(value: T) -> Mono<Just<T>> {
        Mono(Just::new(value))
    }

    /// A single-item stream that never delivers anything.
    pub fn never<T>() -> Mono<Never<T>> {
        Mono(Never::new())
    }

    /// A coroutine-driven single-item stream. The body must `emit`
    /// exactly once before returning normally; an extra `emit` or a
    /// normal return with none becomes an `Error`.
    pub fn generate<T, F, Fut>(body: F) -> Mono<Generate<T, F>>
    where
        F: FnOnce(Emit<T>) -> Fut,
        Fut: Future<Output = Result<(), Fault>>,
    {
        Mono(Generate::new(body, Some(1), true))
    }
}

/// Constructors for [`Maybe`] streams.
pub mod maybe {
    use std::future::Future;

    use super::Maybe;
    use crate::error::Fault;
    use crate::generate::{Emit, Generate};
    use crate::source::{Empty, Just, Never};

    /// A stream of exactly `value`.
    pub fn just<T>(value: T) -> Maybe<Just<T>> {
        Maybe(Just::new(value))
    }

    /// A stream that completes without a value.
    pub fn empty<T>() -> Maybe<Empty<T>> {
        Maybe(Empty::new())
    }

    /// A zero-or-one stream that never delivers anything.
    pub fn never<T>() -> Maybe<Never<T>> {
        Maybe(Never::new())
    }

    /// A coroutine-driven zero-or-one stream. A second `emit` becomes an
    /// `Error`.
    pub fn generate<T, F, Fut>(body: F) -> Maybe<Generate<T, F>>
    where
        F: FnOnce(Emit<T>) -> Fut,
        Fut: Future<Output = Result<(), Fault>>,
    {
        Maybe(Generate::new(body, Some(1), false))
    }
}

/// Constructors for [`Many`] streams.
pub mod many {
    use std::future::Future;

    use super::Many;
    use crate::error::Fault;
    use crate::generate::{Emit, Generate};
    use crate::source::{FromIter, Never, TryFromIter};

    /// A stream of the given items, in order. Accepts anything iterable:
    /// arrays, vectors, one-shot iterators.
    ///
    /// ```rust
    /// use rill::probe::{Event, Recorder};
    ///
    /// let (probe, tap) = Recorder::with_request(-1);
    /// rill::many::just([6, 7]).subscribe_raw(probe);
    /// assert_eq!(
    ///     tap.events(),
    ///     vec![
    ///         Event::Opened,
    ///         Event::Item(6),
    ///         Event::Item(7),
    ///         Event::Completed,
    ///     ],
    /// );
    /// ```
    pub fn just<I>(items: I) -> Many<FromIter<I::IntoIter>>
    where
        I: IntoIterator,
    {
        Many(FromIter::new(items.into_iter()))
    }

    /// A stream over fallible items: the first `Err` travels downstream
    /// as an `Error` signal.
    pub fn results<T, X, I>(items: I) -> Many<TryFromIter<I::IntoIter>>
    where
        I: IntoIterator<Item = Result<T, X>>,
    {
        Many(TryFromIter::new(items.into_iter()))
    }

    /// A stream that never delivers anything.
    pub fn never<T>() -> Many<Never<T>> {
        Many(Never::new())
    }

    /// A coroutine-driven stream: the body `emit`s any number of items,
    /// suspending whenever demand runs out.
    ///
    /// ```rust
    /// use rill::probe::{Event, Recorder};
    ///
    /// let (probe, tap) = Recorder::with_request(-1);
    /// rill::many::generate(|co| async move {
    ///     co.emit(1).await?;
    ///     co.emit(2).await?;
    ///     Ok(())
    /// })
    /// .subscribe_raw(probe);
    /// assert_eq!(
    ///     tap.events(),
    ///     vec![
    ///         Event::Opened,
    ///         Event::Item(1),
    ///         Event::Item(2),
    ///         Event::Completed,
    ///     ],
    /// );
    /// ```
    pub fn generate<T, F, Fut>(body: F) -> Many<Generate<T, F>>
    where
        F: FnOnce(Emit<T>) -> Fut,
        Fut: Future<Output = Result<(), Fault>>,
    {
        Many(Generate::new(body, None, false))
    }
}
