// Pad scanner: one pass over every pad per loop iteration, turning activations into note pairs.

use crate::config::Profile;
use crate::kit::DrumNote;
use crate::midi::{MidiSink, PERCUSSION};
use crate::pad::PadTable;
use crate::schedule::NoteOffQueue;
use crate::sensor::{Activation, SensingMode};
use embedded_hal::delay::DelayNs;
use ufmt::uWrite;

/// How the note-off following a note-on is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldPolicy {
    /// Sleep `hold_ms` right after the note-on. Stalls every other pad for that long.
    Blocking { hold_ms: u32 },
    /// Queue the note-off and send it from a later pass once `hold_ms` has elapsed.
    Deferred { hold_ms: u32 },
}

impl HoldPolicy {
    pub const fn hold_ms(&self) -> u32 {
        match *self {
            HoldPolicy::Blocking { hold_ms } | HoldPolicy::Deferred { hold_ms } => hold_ms,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub pad: usize,
    pub note: DrumNote,
    pub velocity: u8,
}

pub struct Scanner<S: SensingMode, M: MidiSink, const N: usize> {
    sensing: S,
    midi: M,
    pads: PadTable<N>,
    retrigger_ms: u32,
    hold: HoldPolicy,
    releases: NoteOffQueue,
}

impl<S: SensingMode, M: MidiSink, const N: usize> Scanner<S, M, N> {
    pub fn new(sensing: S, midi: M, notes: [DrumNote; N], retrigger_ms: u32, hold: HoldPolicy) -> Self {
        Self {
            sensing,
            midi,
            pads: PadTable::new(notes),
            retrigger_ms,
            hold,
            releases: NoteOffQueue::new(N),
        }
    }

    pub fn from_profile(sensing: S, midi: M, notes: [DrumNote; N], profile: &Profile) -> Self {
        Self::new(sensing, midi, notes, profile.retrigger_ms, profile.hold)
    }

    pub fn calibrate<D: DelayNs, L: uWrite>(&mut self, delay: &mut D, log: &mut L) {
        self.sensing.calibrate(delay, log);
    }

    /// One pass. Returns how many pads fired.
    pub fn scan<D: DelayNs, L: uWrite>(&mut self, now: u32, delay: &mut D, log: &mut L) -> usize {
        self.release_due(now, log);

        let mut hits = 0;
        for pad in 0..N {
            if self.pads.get(pad).is_settling(now, self.retrigger_ms) {
                continue;
            }

            if let Activation::Hit { velocity } = self.sensing.probe(pad) {
                let note = self.pads.get(pad).note;
                self.emit(Hit { pad, note, velocity }, now, delay, log);
                self.pads.get_mut(pad).mark_hit(now);
                hits += 1;
            }
        }
        hits
    }

    /// Send every deferred note-off whose time has come.
    pub fn release_due<L: uWrite>(&mut self, now: u32, log: &mut L) {
        while let Some(pad) = self.releases.pop_due(now) {
            let note = self.pads.get(pad).note;
            self.note_off(note, log);
        }
    }

    /// Send all deferred note-offs now (before a restart, for instance).
    pub fn release_all<L: uWrite>(&mut self, log: &mut L) {
        while let Some(pad) = self.releases.pop_any() {
            let note = self.pads.get(pad).note;
            self.note_off(note, log);
        }
    }

    fn emit<D: DelayNs, L: uWrite>(&mut self, hit: Hit, now: u32, delay: &mut D, log: &mut L) {
        // keep on/off strictly paired if the pad retriggers before its release went out
        if self.releases.cancel(hit.pad) {
            self.note_off(hit.note, log);
        }

        diag!(log, "Hit pad {} ({} {}): velocity {}\r", hit.pad, hit.note.name(), hit.note.number(), hit.velocity);
        if self.midi.note_on(hit.note.number(), hit.velocity, PERCUSSION).is_err() {
            diag!(log, "MIDI note-on failed\r");
        }

        match self.hold {
            HoldPolicy::Blocking { hold_ms } => {
                delay.delay_ms(hold_ms);
                self.note_off(hit.note, log);
            }
            HoldPolicy::Deferred { hold_ms } => self.releases.schedule(hit.pad, now.wrapping_add(hold_ms)),
        }
    }

    fn note_off<L: uWrite>(&mut self, note: DrumNote, log: &mut L) {
        if self.midi.note_off(note.number(), 0, PERCUSSION).is_err() {
            diag!(log, "MIDI note-off failed\r");
        }
    }

    pub fn sensing_mut(&mut self) -> &mut S {
        &mut self.sensing
    }

    pub fn sensing(&self) -> &S {
        &self.sensing
    }

    pub fn midi(&self) -> &M {
        &self.midi
    }

    pub fn midi_mut(&mut self) -> &mut M {
        &mut self.midi
    }

    pub fn pads(&self) -> &PadTable<N> {
        &self.pads
    }

    pub fn pending_releases(&self) -> usize {
        self.releases.len()
    }
}
