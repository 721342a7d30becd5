//! Reusable storage for the event block passed with the process-events opcode.

use crate::region::NativeRegion;
use smallvec::SmallVec;
use vsthost_abi::abi::VstEvents;
use vsthost_abi::layout::{event_block_size, write_event_block, LayoutError};
use vsthost_abi::{Event, MidiEvent};

/// Events for one block. Inline for the usual handful per block.
pub type EventBatch = SmallVec<[Event; 16]>;

pub fn midi_batch(midi: &[MidiEvent]) -> EventBatch {
    midi.iter().copied().map(Event::from).collect()
}

/// Grows to fit the largest batch seen so far and is reused afterwards.
#[derive(Debug, Default)]
pub struct EventBuffer {
    region: NativeRegion,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Lays out `events` and returns the block address for the plugin.
    ///
    /// The pointer stays valid until the next call or [`release`](Self::release).
    pub fn build(&mut self, events: &[Event]) -> Result<*mut VstEvents, LayoutError> {
        let size = event_block_size(events);
        if self.region.ensure(size) {
            tracing::debug!(bytes = size, events = events.len(), "grew event buffer");
        }
        write_event_block(events, self.region.as_bytes_mut())?;
        Ok(self.region.as_mut_ptr() as *mut VstEvents)
    }

    pub fn release(&mut self) {
        self.region.release();
    }
}
