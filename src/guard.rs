//! Arity enforcement: adapting specialized receivers to the general contract.
//!
//! Each guard presents a specialized receiver (mute, mono, maybe, many) as a
//! general [`Receiver`] while policing the upstream's behavior against that
//! arity's state machine. A detected breach — an item on a mute stream, a
//! second item on a single-item stream, an item after a terminal, a double
//! terminal, a mono completion with no item — is diverted through the
//! configured [`OnViolation`] policy instead of reaching the delegate.
//!
//! The mono and maybe guards buffer the received item until the terminal
//! arrives, then deliver the combined `complete_with` to the delegate.

use crate::error::{Fault, ProtocolError};
use crate::protocol::{
    ManyReceiver, MaybeReceiver, MonoReceiver, MuteReceiver, PipeRef, Receiver,
};

/// What a guard does with a detected contract breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnViolation {
    /// Swallow the offending signal; guard state is left untouched.
    #[default]
    Ignore,
    /// Synthesize an `Error` carrying the breach and deliver it to the
    /// delegate, unless the delegate is already done — then drop.
    Delegate,
    /// Panic on the calling thread. The panic propagates out of the
    /// emitter call; meant for debugging.
    Panic,
}

fn breach<F>(policy: OnViolation, violation: ProtocolError, deliver: F)
where
    F: FnOnce(Fault),
{
    match policy {
        OnViolation::Ignore => {
            log::debug!("ignoring protocol violation: {violation}");
        }
        OnViolation::Delegate => deliver(Box::new(violation)),
        OnViolation::Panic => panic!("protocol violation: {violation}"),
    }
}

/// Presents a [`MuteReceiver`] as a general receiver; any item is a breach.
pub struct MuteGuard<R> {
    delegate: R,
    done: bool,
    policy: OnViolation,
}

impl<R> MuteGuard<R> {
    pub fn new(delegate: R) -> Self {
        Self::with_policy(delegate, OnViolation::default())
    }

    pub fn with_policy(delegate: R, policy: OnViolation) -> Self {
        MuteGuard {
            delegate,
            done: false,
            policy,
        }
    }

    fn breach(&mut self, violation: ProtocolError)
    where
        R: MuteReceiver,
    {
        let (done, delegate) = (&mut self.done, &mut self.delegate);
        breach(self.policy, violation, |fault| {
            if !*done {
                *done = true;
                delegate.error(fault);
            }
        });
    }
}

impl<T, R> Receiver<T> for MuteGuard<R>
where
    R: MuteReceiver,
{
    fn open(&mut self, pipe: PipeRef) {
        self.delegate.open(pipe);
    }

    fn receive(&mut self, _item: T) {
        self.breach(ProtocolError::ItemOnMute);
    }

    fn complete(&mut self) {
        if self.done {
            self.breach(ProtocolError::DoubleTerminal);
        } else {
            self.done = true;
            self.delegate.complete();
        }
    }

    fn error(&mut self, fault: Fault) {
        if self.done {
            self.breach(ProtocolError::DoubleTerminal);
        } else {
            self.done = true;
            self.delegate.error(fault);
        }
    }
}

enum SingleState<T> {
    Init,
    Received(T),
    Done,
}

/// Presents a [`MonoReceiver`] as a general receiver.
///
/// The single item is held until the terminal arrives; `Complete` straight
/// from the initial state (no item seen) is a breach.
pub struct MonoGuard<T, R> {
    delegate: R,
    state: SingleState<T>,
    policy: OnViolation,
}

impl<T, R> MonoGuard<T, R> {
    pub fn new(delegate: R) -> Self {
        Self::with_policy(delegate, OnViolation::default())
    }

    pub fn with_policy(delegate: R, policy: OnViolation) -> Self {
        MonoGuard {
            delegate,
            state: SingleState::Init,
            policy,
        }
    }

    fn breach(&mut self, violation: ProtocolError)
    where
        R: MonoReceiver<T>,
    {
        let (state, delegate) = (&mut self.state, &mut self.delegate);
        breach(self.policy, violation, |fault| {
            if !matches!(state, SingleState::Done) {
                *state = SingleState::Done;
                delegate.error(fault);
            }
        });
    }
}

impl<T, R> Receiver<T> for MonoGuard<T, R>
where
    R: MonoReceiver<T>,
{
    fn open(&mut self, pipe: PipeRef) {
        self.delegate.open(pipe);
    }

    fn receive(&mut self, item: T) {
        match self.state {
            SingleState::Init => self.state = SingleState::Received(item),
            SingleState::Received(_) => self.breach(ProtocolError::OverArity),
            SingleState::Done => self.breach(ProtocolError::ItemAfterTerminal),
        }
    }

    fn complete(&mut self) {
        match std::mem::replace(&mut self.state, SingleState::Done) {
            SingleState::Received(item) => self.delegate.complete_with(item),
            SingleState::Init => {
                self.state = SingleState::Init;
                self.breach(ProtocolError::MissingItem);
            }
            SingleState::Done => self.breach(ProtocolError::DoubleTerminal),
        }
    }

    fn error(&mut self, fault: Fault) {
        match std::mem::replace(&mut self.state, SingleState::Done) {
            SingleState::Done => self.breach(ProtocolError::DoubleTerminal),
            _ => self.delegate.error(fault),
        }
    }
}

/// Presents a [`MaybeReceiver`] as a general receiver.
///
/// As [`MonoGuard`], except `Complete` from the initial state is legitimate
/// and is delivered as `complete_empty`.
pub struct MaybeGuard<T, R> {
    delegate: R,
    state: SingleState<T>,
    policy: OnViolation,
}

impl<T, R> MaybeGuard<T, R> {
    pub fn new(delegate: R) -> Self {
        Self::with_policy(delegate, OnViolation::default())
    }

    pub fn with_policy(delegate: R, policy: OnViolation) -> Self {
        MaybeGuard {
            delegate,
            state: SingleState::Init,
            policy,
        }
    }

    fn breach(&mut self, violation: ProtocolError)
    where
        R: MaybeReceiver<T>,
    {
        let (state, delegate) = (&mut self.state, &mut self.delegate);
        breach(self.policy, violation, |fault| {
            if !matches!(state, SingleState::Done) {
                *state = SingleState::Done;
                delegate.error(fault);
            }
        });
    }
}

impl<T, R> Receiver<T> for MaybeGuard<T, R>
where
    R: MaybeReceiver<T>,
{
    fn open(&mut self, pipe: PipeRef) {
        self.delegate.open(pipe);
    }

    fn receive(&mut self, item: T) {
        match self.state {
            SingleState::Init => self.state = SingleState::Received(item),
            SingleState::Received(_) => self.breach(ProtocolError::OverArity),
            SingleState::Done => self.breach(ProtocolError::ItemAfterTerminal),
        }
    }

    fn complete(&mut self) {
        match std::mem::replace(&mut self.state, SingleState::Done) {
            SingleState::Received(item) => self.delegate.complete_with(item),
            SingleState::Init => self.delegate.complete_empty(),
            SingleState::Done => self.breach(ProtocolError::DoubleTerminal),
        }
    }

    fn error(&mut self, fault: Fault) {
        match std::mem::replace(&mut self.state, SingleState::Done) {
            SingleState::Done => self.breach(ProtocolError::DoubleTerminal),
            _ => self.delegate.error(fault),
        }
    }
}

/// Presents a [`ManyReceiver`] as a general receiver; only ordering is
/// policed (no signal after a terminal).
pub struct ManyGuard<R> {
    delegate: R,
    done: bool,
    policy: OnViolation,
}

impl<R> ManyGuard<R> {
    pub fn new(delegate: R) -> Self {
        Self::with_policy(delegate, OnViolation::default())
    }

    pub fn with_policy(delegate: R, policy: OnViolation) -> Self {
        ManyGuard {
            delegate,
            done: false,
            policy,
        }
    }

    fn breach<T>(&mut self, violation: ProtocolError)
    where
        R: ManyReceiver<T>,
    {
        let (done, delegate) = (&mut self.done, &mut self.delegate);
        breach(self.policy, violation, |fault| {
            if !*done {
                *done = true;
                delegate.error(fault);
            }
        });
    }
}

impl<T, R> Receiver<T> for ManyGuard<R>
where
    R: ManyReceiver<T>,
{
    fn open(&mut self, pipe: PipeRef) {
        self.delegate.open(pipe);
    }

    fn receive(&mut self, item: T) {
        if self.done {
            self.breach::<T>(ProtocolError::ItemAfterTerminal);
        } else {
            self.delegate.receive(item);
        }
    }

    fn complete(&mut self) {
        if self.done {
            self.breach::<T>(ProtocolError::DoubleTerminal);
        } else {
            self.done = true;
            self.delegate.complete();
        }
    }

    fn error(&mut self, fault: Fault) {
        if self.done {
            self.breach::<T>(ProtocolError::DoubleTerminal);
        } else {
            self.done = true;
            self.delegate.error(fault);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct MonoLog(Log);

    impl MonoReceiver<i32> for MonoLog {
        fn complete_with(&mut self, item: i32) {
            self.0.borrow_mut().push(format!("complete_with({item})"));
        }
        fn error(&mut self, fault: Fault) {
            self.0.borrow_mut().push(format!("error({fault})"));
        }
    }

    struct MaybeLog(Log);

    impl MaybeReceiver<i32> for MaybeLog {
        fn complete_with(&mut self, item: i32) {
            self.0.borrow_mut().push(format!("complete_with({item})"));
        }
        fn complete_empty(&mut self) {
            self.0.borrow_mut().push("complete_empty".into());
        }
        fn error(&mut self, fault: Fault) {
            self.0.borrow_mut().push(format!("error({fault})"));
        }
    }

    struct MuteLog(Log);

    impl MuteReceiver for MuteLog {
        fn complete(&mut self) {
            self.0.borrow_mut().push("complete".into());
        }
        fn error(&mut self, fault: Fault) {
            self.0.borrow_mut().push(format!("error({fault})"));
        }
    }

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_mono_buffers_the_item_until_complete() {
        let events = log();
        let mut guard = MonoGuard::new(MonoLog(events.clone()));
        guard.receive(3);
        assert!(events.borrow().is_empty());
        guard.complete();
        assert_eq!(&*events.borrow(), &["complete_with(3)"]);
    }

    #[test]
    fn test_mono_ignore_swallows_the_overage() {
        let events = log();
        let mut guard = MonoGuard::new(MonoLog(events.clone()));
        guard.receive(1);
        guard.receive(2);
        guard.complete();
        assert_eq!(&*events.borrow(), &["complete_with(1)"]);
    }

    #[test]
    fn test_mono_delegate_converts_the_overage_to_an_error() {
        let events = log();
        let mut guard =
            MonoGuard::with_policy(MonoLog(events.clone()), OnViolation::Delegate);
        guard.receive(1);
        guard.receive(2);
        guard.complete();
        assert_eq!(
            &*events.borrow(),
            &["error(more than one item delivered to a single-item receiver)"]
        );
    }

    #[test]
    #[should_panic(expected = "protocol violation")]
    fn test_mono_panic_policy_raises() {
        let events = log();
        let mut guard = MonoGuard::with_policy(MonoLog(events), OnViolation::Panic);
        guard.receive(1);
        guard.receive(2);
    }

    #[test]
    fn test_mono_complete_without_item_is_a_breach() {
        let events = log();
        let mut guard =
            MonoGuard::with_policy(MonoLog(events.clone()), OnViolation::Delegate);
        guard.complete();
        assert_eq!(
            &*events.borrow(),
            &["error(completion without an item on a single-item stream)"]
        );
    }

    #[test]
    fn test_mono_error_before_item_forwards() {
        let events = log();
        let mut guard = MonoGuard::new(MonoLog(events.clone()));
        guard.error(Box::new(ProtocolError::OverArity));
        assert_eq!(events.borrow().len(), 1);
        guard.complete();
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_maybe_complete_from_init_is_empty() {
        let events = log();
        let mut guard = MaybeGuard::new(MaybeLog(events.clone()));
        guard.complete();
        assert_eq!(&*events.borrow(), &["complete_empty"]);
    }

    #[test]
    fn test_maybe_complete_with_item() {
        let events = log();
        let mut guard = MaybeGuard::new(MaybeLog(events.clone()));
        guard.receive(9);
        guard.complete();
        assert_eq!(&*events.borrow(), &["complete_with(9)"]);
    }

    #[test]
    fn test_maybe_double_terminal_is_dropped_when_done() {
        let events = log();
        let mut guard =
            MaybeGuard::with_policy(MaybeLog(events.clone()), OnViolation::Delegate);
        guard.complete();
        guard.complete();
        assert_eq!(&*events.borrow(), &["complete_empty"]);
    }

    #[test]
    fn test_mute_item_is_a_breach() {
        let events = log();
        let mut guard =
            MuteGuard::with_policy(MuteLog(events.clone()), OnViolation::Delegate);
        guard.receive(1);
        assert_eq!(
            &*events.borrow(),
            &["error(item delivered to a mute receiver)"]
        );
        Receiver::<i32>::complete(&mut guard);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_mute_ignore_leaves_state_untouched() {
        let events = log();
        let mut guard = MuteGuard::new(MuteLog(events.clone()));
        guard.receive(1);
        Receiver::<i32>::complete(&mut guard);
        assert_eq!(&*events.borrow(), &["complete"]);
    }

    #[test]
    fn test_many_guard_polices_ordering_only() {
        struct ManyLog(Log);
        impl ManyReceiver<i32> for ManyLog {
            fn receive(&mut self, item: i32) {
                self.0.borrow_mut().push(format!("receive({item})"));
            }
            fn complete(&mut self) {
                self.0.borrow_mut().push("complete".into());
            }
            fn error(&mut self, fault: Fault) {
                self.0.borrow_mut().push(format!("error({fault})"));
            }
        }

        let events = log();
        let mut guard = ManyGuard::new(ManyLog(events.clone()));
        guard.receive(1);
        guard.receive(2);
        guard.complete();
        guard.receive(3);
        guard.complete();
        assert_eq!(&*events.borrow(), &["receive(1)", "receive(2)", "complete"]);
    }
}
