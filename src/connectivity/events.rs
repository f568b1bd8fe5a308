//! Link events and the supervisor inbox
//!
//! Platform callbacks run outside the device loop. They must not touch the
//! connectivity state directly; instead they post a [`LinkEvent`] through a
//! [`LinkEventSender`] and the supervisor drains the [`LinkEventInbox`] at the
//! start of its next tick.

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

/// Asynchronous notification from the network stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Association with the access point completed.
    LinkUp,
    /// An address was assigned.
    AddressAcquired,
    /// Association was lost.
    LinkDown,
    /// The assigned address was lost.
    AddressLost,
}

impl LinkEvent {
    /// Whether this event reports the link coming up.
    pub fn is_up(self) -> bool {
        matches!(self, LinkEvent::LinkUp | LinkEvent::AddressAcquired)
    }
}

/// Create a bounded event channel.
///
/// `capacity` is clamped to at least one slot.
pub fn inbox(capacity: usize) -> (LinkEventSender, LinkEventInbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LinkEventSender { tx }, LinkEventInbox { rx })
}

/// Producer side, handed to platform callbacks.
#[derive(Debug, Clone)]
pub struct LinkEventSender {
    tx: mpsc::Sender<LinkEvent>,
}

impl LinkEventSender {
    /// Post an event without blocking.
    ///
    /// Returns `false` if the event was dropped because the inbox is full or
    /// the supervisor is gone. A dropped event is recovered by the periodic
    /// status poll.
    pub fn notify(&self, event: LinkEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "Link event inbox full; event dropped");
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::debug!(?event, "Link event inbox closed");
                false
            }
        }
    }
}

/// Consumer side, owned by the supervisor.
#[derive(Debug)]
pub struct LinkEventInbox {
    rx: mpsc::Receiver<LinkEvent>,
}

impl LinkEventInbox {
    /// Take every event queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}
