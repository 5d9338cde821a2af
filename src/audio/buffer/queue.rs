//! Fixed-capacity PCM buffers and the FIFO queues they circulate through.
//!
//! A [`PcmBuffer`] is owned by exactly one queue (or by whichever thread
//! popped it) at any time; moving it between queues moves the allocation, so
//! two queues can never reference the same region.

use std::collections::VecDeque;

/// An owned byte region of fixed capacity plus the number of valid bytes.
#[derive(Debug)]
pub struct PcmBuffer {
    slot: usize,
    data: Vec<u8>,
    length: usize,
}

impl PcmBuffer {
    /// Allocate a zeroed buffer. `slot` identifies it for the lifetime of a pool.
    pub fn new(slot: usize, capacity: usize) -> Self {
        Self {
            slot,
            data: vec![0; capacity],
            length: capacity,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The valid bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// The whole region, regardless of `len`.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy `src` in, truncated to capacity; the tail is zeroed.
    /// Returns the number of bytes taken from `src`.
    pub fn fill_from(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.data.len());
        self.data[..n].copy_from_slice(&src[..n]);
        self.data[n..].fill(0);
        self.length = self.data.len();
        n
    }

    /// Copy the valid bytes out, truncated to `dst.len()`.
    pub fn copy_to(&self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.length);
        dst[..n].copy_from_slice(&self.data[..n]);
        n
    }

    pub fn set_len(&mut self, length: usize) {
        self.length = length.min(self.data.len());
    }
}

/// FIFO of owned buffers: tail insertion, head removal.
///
/// Not synchronised; the pipeline keeps all of its queues behind one mutex.
#[derive(Debug, Default)]
pub struct BufferQueue {
    nodes: VecDeque<PcmBuffer>,
}

impl BufferQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, buffer: PcmBuffer) {
        self.nodes.push_back(buffer);
    }

    pub fn pop(&mut self) -> Option<PcmBuffer> {
        self.nodes.pop_front()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Slot ids in queue order.
    pub fn slots(&self) -> Vec<usize> {
        self.nodes.iter().map(PcmBuffer::slot).collect()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
