//! Failure values carried by `Error` signals.
//!
//! Every fault travels downstream as an opaque [`Fault`]. The crate itself
//! contributes two concrete kinds: [`ProtocolError`] for contract breaches
//! detected by the arity guards and coroutine sinks, and [`Canceled`] for
//! close-induced unwinding of a suspended coroutine body. `Canceled` is not
//! an error in the protocol sense; stages recognize it by downcast and stop
//! silently.

use thiserror::Error;

/// The opaque failure payload of an `Error` signal.
pub type Fault = Box<dyn std::error::Error + 'static>;

/// A breach of the signal-order or arity contract, detected by a guard or a
/// coroutine sink.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// An item was delivered to a receiver whose arity forbids items.
    #[error("item delivered to a mute receiver")]
    ItemOnMute,
    /// A second item was delivered to a single-item receiver.
    #[error("more than one item delivered to a single-item receiver")]
    OverArity,
    /// An item arrived after a terminal signal had already been delivered.
    #[error("item delivered after a terminal signal")]
    ItemAfterTerminal,
    /// A second terminal signal arrived.
    #[error("terminal signal delivered twice")]
    DoubleTerminal,
    /// A single-item stream completed without delivering its item.
    #[error("completion without an item on a single-item stream")]
    MissingItem,
}

/// Marker carried out of a suspended `emit` when the pipe closes.
///
/// A coroutine body propagates this with `?` and must not catch it; the
/// generator stage recognizes it by downcast and stops without signaling.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("emission canceled by a closed pipe")]
pub struct Canceled;

/// Whether a fault is the cooperative-cancellation marker.
pub(crate) fn is_canceled(fault: &Fault) -> bool {
    fault.is::<Canceled>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_messages_name_the_breach() {
        assert_eq!(
            ProtocolError::ItemOnMute.to_string(),
            "item delivered to a mute receiver"
        );
        assert_eq!(
            ProtocolError::DoubleTerminal.to_string(),
            "terminal signal delivered twice"
        );
    }

    #[test]
    fn test_canceled_is_detected_through_the_opaque_payload() {
        let fault: Fault = Box::new(Canceled);
        assert!(is_canceled(&fault));

        let fault: Fault = Box::new(ProtocolError::OverArity);
        assert!(!is_canceled(&fault));
    }
}
