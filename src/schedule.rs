use crate::hash::PadHashBuilder;
use core::cmp::Reverse;
use priority_queue::PriorityQueue;

/// Pending note-offs, earliest due first. At most one entry per pad.
pub struct NoteOffQueue {
    pending: PriorityQueue<usize, Reverse<u32>, PadHashBuilder>,
}

impl NoteOffQueue {
    pub fn new(capacity: usize) -> Self {
        Self { pending: PriorityQueue::with_capacity_and_default_hasher(capacity) }
    }

    /// Queue `pad` for release at `due`. Replaces any earlier entry for the same pad.
    pub fn schedule(&mut self, pad: usize, due: u32) {
        self.pending.push(pad, Reverse(due));
    }

    /// Take the pad out of the queue if it was waiting.
    pub fn cancel(&mut self, pad: usize) -> bool {
        self.pending.remove(&pad).is_some()
    }

    /// Next pad whose release time has been reached by `now`.
    pub fn pop_due(&mut self, now: u32) -> Option<usize> {
        let (_, Reverse(due)) = self.pending.peek()?;
        // signed distance so a due time just past a clock wrap still counts as reached
        if (now.wrapping_sub(*due) as i32) < 0 {
            return None;
        }
        self.pending.pop().map(|(pad, _)| pad)
    }

    /// Take everything, due or not.
    pub fn pop_any(&mut self) -> Option<usize> {
        self.pending.pop().map(|(pad, _)| pad)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
