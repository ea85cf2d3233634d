//! Pending queue for list deletion
//!
//! Deleting a list may release holds on other lists (its sublists and its descriptor
//! list), which may in turn reach zero and need reclaiming. Rather than recursing, the
//! deletion loop drains this queue, so arbitrarily deep nesting cannot overflow the
//! stack.

use crate::handle::CellId;

/// Queue of headers whose hold is being released
pub struct PendingQueue {
    queue: Vec<CellId>,
}

impl PendingQueue {
    /// Create a new empty queue
    pub const fn new() -> PendingQueue {
        PendingQueue { queue: Vec::new() }
    }

    /// Queue the release of one hold on a header
    #[inline]
    pub fn push(&mut self, header: CellId) {
        self.queue.push(header);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<CellId> {
        self.queue.pop()
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new()
    }
}
