//! Delivery of completed card records.
//!
//! Every completed frame is published to an [`EventSink`], which offers two
//! independent ways to consume it:
//!
//! - **Push**: an optional handler called once per frame, synchronously, in
//!   the context that detected completion.
//! - **Pull**: [`EventSink::poll`] returns the latest record together with
//!   a sequence number that counts completed frames.
//!
//! Both are updated at the same commit point. Registering a handler does not
//! disable polling.

use std::sync::{Mutex, PoisonError};
use wiegand_core::CardRecord;

/// Handler invoked with each completed, unparsed card record.
pub type CardHandler = Box<dyn Fn(CardRecord) + Send + Sync>;

/// Latest record and frame counter.
#[derive(Debug, Default)]
struct Slot {
    last: Option<CardRecord>,
    sequence: u64,
}

/// Push/poll delivery point for completed frames.
///
/// # Examples
///
/// ```
/// use wiegand_reader::sink::EventSink;
/// use wiegand_core::CardRecord;
///
/// let sink = EventSink::new(None);
/// assert_eq!(sink.poll(), (None, 0));
///
/// sink.publish(CardRecord::new(0b1011, 4));
/// let (card, sequence) = sink.poll();
/// assert_eq!(card.unwrap().raw_value(), 0b1011);
/// assert_eq!(sequence, 1);
/// ```
pub struct EventSink {
    handler: Option<CardHandler>,
    slot: Mutex<Slot>,
}

impl EventSink {
    pub fn new(handler: Option<CardHandler>) -> Self {
        Self {
            handler,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Record a completed frame and notify the handler.
    ///
    /// The poll slot is updated and released before the handler runs, so a
    /// panicking handler leaves the sink usable. Returns the new sequence
    /// number.
    pub fn publish(&self, card: CardRecord) -> u64 {
        let sequence = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.sequence += 1;
            slot.last = Some(card.clone());
            slot.sequence
        };

        if let Some(handler) = &self.handler {
            handler(card);
        }

        sequence
    }

    /// Latest record and the number of frames completed so far.
    ///
    /// The sequence number starts at 0 and grows by one per completed
    /// frame, so a poller can tell a new read apart from a repeated card.
    pub fn poll(&self) -> (Option<CardRecord>, u64) {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        (slot.last.clone(), slot.sequence)
    }

    /// Number of frames completed so far.
    pub fn sequence(&self) -> u64 {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sequence
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("has_handler", &self.has_handler())
            .field("sequence", &self.sequence())
            .finish()
    }
}
