use std::sync::Arc;

use crate::frame::FrameGeometry;

/// A frame copied out of the acquisition buffer, ready for the fit worker.
///
/// Holding a `StagedFrame` keeps its staging slot reserved: the pool will not
/// write into a slot while any clone of its `data` is alive.
#[derive(Clone, Debug)]
pub struct StagedFrame {
    pub data: Arc<Vec<u8>>,
    pub geometry: FrameGeometry,
    pub slot: usize,
    /// Admitted through a single-shot request rather than auto-fetch.
    pub single_shot: bool,
}

impl StagedFrame {
    pub fn bytes(&self) -> &[u8] {
        self.data.as_slice()
    }
}

/// Fixed-size ring of equally sized staging buffers.
///
/// The producer copies into the slot after the one most recently written.
/// Slots are reference counted, so a slot still read downstream is refused
/// instead of overwritten, and reallocation leaves readers of the old
/// buffers untouched.
#[derive(Debug)]
pub struct StagingPool {
    slots: Vec<Arc<Vec<u8>>>,
    bytes_per_slot: usize,
    last_written: usize,
}

impl StagingPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: (0..size).map(|_| Arc::new(Vec::new())).collect(),
            bytes_per_slot: 0,
            last_written: size - 1,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bytes_per_slot(&self) -> usize {
        self.bytes_per_slot
    }

    pub fn is_allocated(&self) -> bool {
        self.bytes_per_slot > 0
    }

    /// Replace every slot with a fresh zeroed buffer of `bytes_per_slot` bytes.
    pub fn reallocate(&mut self, bytes_per_slot: usize) {
        self.slots = (0..self.slots.len())
            .map(|_| Arc::new(vec![0u8; bytes_per_slot]))
            .collect();
        self.bytes_per_slot = bytes_per_slot;
        self.last_written = self.slots.len() - 1;
    }

    /// Index the next copy will go to.
    pub fn next_slot(&self) -> usize {
        (self.last_written + 1) % self.slots.len()
    }

    /// True when nothing outside the pool references `slot`.
    pub fn is_slot_free(&self, slot: usize) -> bool {
        Arc::strong_count(&self.slots[slot]) == 1
    }

    /// Copy `src` into the next slot.
    ///
    /// Returns `None` (and leaves the write index alone) when that slot is
    /// still referenced downstream or `src` does not match the slot size.
    pub fn stage(&mut self, src: &[u8]) -> Option<(usize, Arc<Vec<u8>>)> {
        if src.len() != self.bytes_per_slot {
            return None;
        }
        let slot = self.next_slot();
        let buffer = Arc::get_mut(&mut self.slots[slot])?;
        buffer.copy_from_slice(src);
        self.last_written = slot;
        Some((slot, Arc::clone(&self.slots[slot])))
    }
}
