use crate::kit::DrumNote;

/// One playing surface: its note and when it last fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pad {
    pub index: usize,
    pub note: DrumNote,
    last_hit: Option<u32>,
}

impl Pad {
    pub const fn new(index: usize, note: DrumNote) -> Self {
        Self { index, note, last_hit: None }
    }

    /// Inside the refractory window after a hit? Millisecond clock may wrap.
    pub fn is_settling(&self, now: u32, retrigger_ms: u32) -> bool {
        match self.last_hit {
            Some(t) => now.wrapping_sub(t) < retrigger_ms,
            None => false,
        }
    }

    pub fn mark_hit(&mut self, now: u32) {
        self.last_hit = Some(now);
    }

    pub fn last_hit(&self) -> Option<u32> {
        self.last_hit
    }
}

/// Fixed table of pads, indexed by pad id. Sized at build time.
#[derive(Clone, Debug)]
pub struct PadTable<const N: usize> {
    pads: [Pad; N],
}

impl<const N: usize> PadTable<N> {
    pub fn new(notes: [DrumNote; N]) -> Self {
        let mut i = 0;
        Self {
            pads: notes.map(|note| {
                let pad = Pad::new(i, note);
                i += 1;
                pad
            }),
        }
    }

    pub fn get(&self, pad: usize) -> &Pad {
        &self.pads[pad]
    }

    pub fn get_mut(&mut self, pad: usize) -> &mut Pad {
        &mut self.pads[pad]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pad> {
        self.pads.iter()
    }
}
