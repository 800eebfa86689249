//! End-to-end protocol scenarios driven through the public surface.

use std::cell::RefCell;
use std::rc::Rc;

use rill::demand::RequestCount;
use rill::guard::MonoGuard;
use rill::probe::{Event, ManyRecorder, MaybeRecorder, MonoRecorder, MuteRecorder, Recorder};
use rill::stage::{Downstream, Gate};
use rill::{many, maybe, mono, mute, Emitter, OnViolation, Pipe, PipeRef, Receiver};

#[test]
fn mono_just_emits_then_completes() {
    let (probe, tap) = Recorder::with_request(-1);
    mono::just(3).subscribe_raw(probe);
    assert_eq!(
        tap.events(),
        vec![Event::Opened, Event::Item(3), Event::Completed]
    );
}

#[test]
fn mono_just_combines_for_a_mono_receiver() {
    let (probe, tap) = MonoRecorder::new();
    mono::just(3).subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened, Event::CompletedWith(3)]);
}

#[test]
fn mute_just_only_completes() {
    let (probe, tap) = MuteRecorder::new();
    mute::just().subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened, Event::Completed]);
}

#[test]
fn maybe_empty_and_maybe_just() {
    let (probe, tap) = MaybeRecorder::<i32>::new();
    maybe::empty().subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened, Event::CompletedEmpty]);

    let (probe, tap) = MaybeRecorder::new();
    maybe::just(3).subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened, Event::CompletedWith(3)]);
}

#[test]
fn many_just_delivers_in_order() {
    let (probe, tap) = ManyRecorder::new();
    many::just([6, 7, 4, 2]).subscribe(probe);
    assert_eq!(
        tap.events(),
        vec![
            Event::Opened,
            Event::Item(6),
            Event::Item(7),
            Event::Item(4),
            Event::Item(2),
            Event::Completed,
        ]
    );
}

#[test]
fn many_just_accepts_any_iterable_with_the_same_trace() {
    let expected = vec![
        Event::Opened,
        Event::Item(6),
        Event::Item(7),
        Event::Item(4),
        Event::Item(2),
        Event::Completed,
    ];

    let (probe, tap) = Recorder::with_request(-1);
    many::just(vec![6, 7, 4, 2]).subscribe_raw(probe);
    assert_eq!(tap.events(), expected);

    let (probe, tap) = Recorder::with_request(-1);
    many::just([6, 7, 4, 2].into_iter()).subscribe_raw(probe);
    assert_eq!(tap.events(), expected);
}

#[test]
fn generate_respects_staged_demand() {
    let (probe, tap) = Recorder::with_request(2);
    many::generate(|co| async move {
        co.emit(1).await?;
        co.emit(2).await?;
        co.emit(3).await?;
        Ok(())
    })
    .subscribe_raw(probe);

    // Two units of demand were granted at open: exactly two items arrive.
    assert_eq!(
        tap.events(),
        vec![Event::Opened, Event::Item(1), Event::Item(2)]
    );

    tap.request_all();
    assert_eq!(
        tap.events(),
        vec![
            Event::Opened,
            Event::Item(1),
            Event::Item(2),
            Event::Item(3),
            Event::Completed,
        ]
    );
}

/// A source that emits sequential integers on request and records every
/// requested amount, for asserting upstream demand traffic.
struct Meter {
    requests: Rc<RefCell<Vec<i64>>>,
}

struct MeterStage<R: Receiver<i64>> {
    link: Downstream<i64, R>,
    requests: Rc<RefCell<Vec<i64>>>,
    demand: RequestCount,
    next: std::cell::Cell<i64>,
    gate: Gate,
}

impl<R: Receiver<i64>> MeterStage<R> {
    fn pump(&self) {
        if !self.gate.enter() {
            return;
        }
        while !self.link.is_closed() && self.demand.has(1) {
            self.demand.withdraw(1);
            let n = self.next.get();
            self.next.set(n + 1);
            if !self.link.emit(n) {
                break;
            }
        }
        self.gate.leave();
    }
}

impl<R: Receiver<i64>> Pipe for MeterStage<R> {
    fn request(&self, n: i64) {
        if n == 0 {
            return;
        }
        self.requests.borrow_mut().push(n);
        self.demand.request(n);
        self.pump();
    }

    fn close(&self) {
        self.link.shut();
    }
}

impl Emitter for Meter {
    type Item = i64;

    fn subscribe<R>(self, receiver: R)
    where
        R: Receiver<i64> + 'static,
    {
        let stage = Rc::new(MeterStage {
            link: Downstream::new(receiver),
            requests: self.requests,
            demand: RequestCount::new(),
            next: std::cell::Cell::new(0),
            gate: Gate::new(),
        });
        let pipe: PipeRef = stage.clone();
        stage.gate.enter();
        stage.link.accept(pipe);
        stage.gate.leave();
        stage.pump();
    }
}

fn meter() -> (rill::Many<Meter>, Rc<RefCell<Vec<i64>>>) {
    let requests = Rc::new(RefCell::new(Vec::new()));
    (
        rill::Many::new(Meter {
            requests: requests.clone(),
        }),
        requests,
    )
}

#[test]
fn fixed_buffer_primes_then_tops_up_per_request() {
    let (source, requests) = meter();
    let (probe, tap) = Recorder::<i64>::new();
    source.buffer(4).subscribe_raw(probe);

    // The first upstream request, at open, is for the full window.
    assert_eq!(&*requests.borrow(), &[4]);

    // One consumer request delivers exactly one item and triggers the
    // 1 + (4 - 3) top-up upstream.
    tap.request(1);
    assert_eq!(tap.events(), vec![Event::Opened, Event::Item(0)]);
    assert_eq!(&*requests.borrow(), &[4, 2]);

    // Still one item per request.
    tap.request(1);
    assert_eq!(
        tap.events(),
        vec![Event::Opened, Event::Item(0), Event::Item(1)]
    );
}

#[test]
fn mono_receiver_on_a_many_stream_delegate_policy() {
    let (probe, tap) = MonoRecorder::new();
    let guard = MonoGuard::with_policy(probe, OnViolation::Delegate);
    many::just([1, 2]).subscribe_raw(guard);
    assert_eq!(
        tap.events(),
        vec![
            Event::Opened,
            Event::Faulted(
                "more than one item delivered to a single-item receiver".into()
            ),
        ]
    );
}

#[test]
fn mono_receiver_on_a_many_stream_ignore_policy() {
    let (probe, tap) = MonoRecorder::new();
    let guard = MonoGuard::with_policy(probe, OnViolation::Ignore);
    many::just([1, 2]).subscribe_raw(guard);
    assert_eq!(tap.events(), vec![Event::Opened, Event::CompletedWith(1)]);
}

#[test]
fn items_never_exceed_requested_demand() {
    let (source, _) = meter();
    let (probe, tap) = Recorder::<i64>::new();
    source.subscribe_raw(probe);

    tap.request(3);
    tap.request(0);
    tap.request(2);

    let items = tap
        .events()
        .iter()
        .filter(|event| matches!(event, Event::Item(_)))
        .count();
    assert_eq!(items, 5);
}

#[test]
fn request_zero_is_a_no_op() {
    let (probe, tap) = Recorder::<i32>::new();
    many::just([1, 2, 3]).subscribe_raw(probe);
    tap.request(0);
    assert_eq!(tap.events(), vec![Event::Opened]);
}

#[test]
fn no_items_after_close() {
    let (source, _) = meter();
    let (probe, tap) = Recorder::<i64>::new();
    source.subscribe_raw(probe);

    tap.request(2);
    tap.close();
    tap.request(100);
    tap.request_all();

    assert_eq!(
        tap.events(),
        vec![Event::Opened, Event::Item(0), Event::Item(1)]
    );
}

#[test]
fn map_over_terminating_source_preserves_the_terminal() {
    let (probe, tap) = Recorder::with_request(-1);
    many::just([1, 2, 3]).map(|n| n * 2).subscribe_raw(probe);
    assert_eq!(
        tap.events(),
        vec![
            Event::Opened,
            Event::Item(2),
            Event::Item(4),
            Event::Item(6),
            Event::Completed,
        ]
    );
}

#[test]
fn try_map_cuts_the_stream_at_the_failing_item() {
    #[derive(Debug, thiserror::Error)]
    #[error("odd input: {0}")]
    struct Odd(i32);

    let (probe, tap) = Recorder::with_request(-1);
    many::just([2, 4, 5, 6])
        .try_map(|n| if n % 2 == 0 { Ok(n / 2) } else { Err(Odd(n)) })
        .subscribe_raw(probe);
    assert_eq!(
        tap.events(),
        vec![
            Event::Opened,
            Event::Item(1),
            Event::Item(2),
            Event::Faulted("odd input: 5".into()),
        ]
    );
}

#[test]
fn mute_conversions_round_trip() {
    // asMaybe over a mute stream completes empty.
    let (probe, tap) = MaybeRecorder::<()>::new();
    mute::just().as_maybe().subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened, Event::CompletedEmpty]);

    // asMono with a completer synthesizes the item.
    let (probe, tap) = MonoRecorder::new();
    mute::just().into_mono(|| 11).subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened, Event::CompletedWith(11)]);
}

#[test]
fn maybe_into_mono_fills_the_absent_case() {
    let (probe, tap) = MonoRecorder::new();
    maybe::empty::<i32>().into_mono(|| 42).subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened, Event::CompletedWith(42)]);

    let (probe, tap) = MonoRecorder::new();
    maybe::just(5).into_mono(|| 42).subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened, Event::CompletedWith(5)]);
}

#[test]
fn never_streams_stay_silent_in_every_arity() {
    let (probe, tap) = Recorder::<i32>::with_request(-1);
    many::never().subscribe_raw(probe);
    tap.request(5);
    assert_eq!(tap.events(), vec![Event::Opened]);

    let (probe, tap) = MonoRecorder::<i32>::new();
    mono::never().subscribe(probe);
    assert_eq!(tap.events(), vec![Event::Opened]);
}

#[test]
fn generator_cancellation_unwinds_without_signals() {
    let reached_end = Rc::new(std::cell::Cell::new(false));
    let flag = reached_end.clone();

    let (probe, tap) = Recorder::<i32>::with_request(1);
    many::generate(move |co| async move {
        co.emit(1).await?;
        co.emit(2).await?;
        flag.set(true);
        Ok(())
    })
    .subscribe_raw(probe);

    tap.close();
    assert!(!reached_end.get());
    assert_eq!(tap.events(), vec![Event::Opened, Event::Item(1)]);
}

#[test]
fn buffered_chain_end_to_end() {
    let (probe, tap) = Recorder::<i32>::new();
    many::just([1, 2, 3, 4, 5])
        .map(|n| n * 10)
        .buffer(2)
        .subscribe_raw(probe);

    tap.request(1);
    tap.request(1);
    assert_eq!(
        tap.events(),
        vec![Event::Opened, Event::Item(10), Event::Item(20)]
    );

    tap.request_all();
    assert_eq!(
        tap.events(),
        vec![
            Event::Opened,
            Event::Item(10),
            Event::Item(20),
            Event::Item(30),
            Event::Item(40),
            Event::Item(50),
            Event::Completed,
        ]
    );
}
