//! Loopback context transport.
//!
//! Links two channel halves through in-process queues. Used by tests and by
//! hosts that run both roles in one process (simulator pairing).

use crate::error::{SyncError, SyncResult};
use crate::payload::{ChannelEvent, ContextChannel, ContextUpdate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffer size for queued channel events.
const EVENT_QUEUE_CAPACITY: usize = 64;

/// In-process implementation of [`ContextChannel`].
///
/// Created in linked pairs: what one half sends arrives as a
/// [`ChannelEvent::ContextReceived`] on the other half's event stream.
pub struct InMemoryChannel {
    reachable: AtomicBool,
    /// Delivers to the paired half's event stream.
    peer_sender: mpsc::Sender<ChannelEvent>,
    /// Injects events into this half's own stream (activation).
    own_sender: mpsc::Sender<ChannelEvent>,
    /// Event stream, consumed exactly once by the coordinator worker.
    events: Mutex<Option<mpsc::Receiver<ChannelEvent>>>,
}

impl InMemoryChannel {
    /// Creates a linked pair of channel halves, both starting reachable.
    pub fn pair() -> (InMemoryChannel, InMemoryChannel) {
        let (first_sender, first_receiver) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (second_sender, second_receiver) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        let first = InMemoryChannel {
            reachable: AtomicBool::new(true),
            peer_sender: second_sender.clone(),
            own_sender: first_sender.clone(),
            events: Mutex::new(Some(first_receiver)),
        };
        let second = InMemoryChannel {
            reachable: AtomicBool::new(true),
            peer_sender: first_sender,
            own_sender: second_sender,
            events: Mutex::new(Some(second_receiver)),
        };

        (first, second)
    }

    /// Flips reachability. Becoming reachable surfaces an `Activated` event
    /// on this half's own stream, mirroring a transport reconnect.
    pub fn set_reachable(&self, reachable: bool) {
        let was_reachable = self.reachable.swap(reachable, Ordering::SeqCst);
        if reachable && !was_reachable {
            self.activate();
        }
    }

    /// Injects an `Activated` event into this half's own stream.
    pub fn activate(&self) {
        if let Err(err) = self.own_sender.try_send(ChannelEvent::Activated) {
            warn!(error = %err, "Failed to queue channel activation event");
        }
    }
}

impl ContextChannel for InMemoryChannel {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    fn send_context(&self, update: ContextUpdate) -> SyncResult<()> {
        if !self.is_reachable() {
            return Err(SyncError::Unreachable);
        }

        self.peer_sender
            .try_send(ChannelEvent::ContextReceived(update))
            .map_err(|err| {
                debug!(error = %err, "Context delivery to paired half failed");
                SyncError::Closed
            })
    }

    fn take_events(&self) -> Option<mpsc::Receiver<ChannelEvent>> {
        self.events.lock().expect("lock poisoned").take()
    }
}
