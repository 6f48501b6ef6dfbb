// Tiny hasher for the note-off queue. priority-queue needs a BuildHasher when built without std,
// and its keys here are just pad indices, so a rotate-xor fold is plenty.

use core::hash::{BuildHasher, Hasher};

#[derive(Default)]
pub struct PadHasher {
    state: u32,
}

impl Hasher for PadHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = (self.state ^ u32::from(byte)).rotate_left(5);
        }
    }

    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

#[derive(Default, Clone, Copy)]
pub struct PadHashBuilder;

impl BuildHasher for PadHashBuilder {
    type Hasher = PadHasher;

    fn build_hasher(&self) -> PadHasher {
        PadHasher::default()
    }
}
