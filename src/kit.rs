// General MIDI percussion key map (channel 10). Numbers are fixed by the GM standard; downstream
// drum modules depend on them, so don't renumber.

use crate::config::NUM_PADS;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrumNote {
    AcousticBassDrum = 35,
    BassDrum = 36,
    SideStick = 37,
    AcousticSnare = 38,
    HandClap = 39,
    ElectricSnare = 40,
    LowFloorTom = 41,
    ClosedHiHat = 42,
    HighFloorTom = 43,
    PedalHiHat = 44,
    LowTom = 45,
    OpenHiHat = 46,
    LowMidTom = 47,
    HiMidTom = 48,
    CrashCymbal1 = 49,
    HighTom = 50,
    RideCymbal1 = 51,
    ChineseCymbal = 52,
    RideBell = 53,
    Tambourine = 54,
    SplashCymbal = 55,
    Cowbell = 56,
    CrashCymbal2 = 57,
}

impl DrumNote {
    pub const fn number(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            DrumNote::AcousticBassDrum => "Acoustic Bass Drum",
            DrumNote::BassDrum => "Kick",
            DrumNote::SideStick => "Side Stick",
            DrumNote::AcousticSnare => "Snare",
            DrumNote::HandClap => "Hand Clap",
            DrumNote::ElectricSnare => "Electric Snare",
            DrumNote::LowFloorTom => "Low Floor Tom",
            DrumNote::ClosedHiHat => "Closed Hi-Hat",
            DrumNote::HighFloorTom => "High Floor Tom",
            DrumNote::PedalHiHat => "Pedal Hi-Hat",
            DrumNote::LowTom => "Low Tom",
            DrumNote::OpenHiHat => "Open Hi-Hat",
            DrumNote::LowMidTom => "Low-Mid Tom",
            DrumNote::HiMidTom => "Mid Tom",
            DrumNote::CrashCymbal1 => "Crash",
            DrumNote::HighTom => "High Tom",
            DrumNote::RideCymbal1 => "Ride",
            DrumNote::ChineseCymbal => "China",
            DrumNote::RideBell => "Ride Bell",
            DrumNote::Tambourine => "Tambourine",
            DrumNote::SplashCymbal => "Splash",
            DrumNote::Cowbell => "Cowbell",
            DrumNote::CrashCymbal2 => "Crash 2",
        }
    }
}

/// Default pad layout, pad 0 first.
pub const PAD_NOTES: [DrumNote; NUM_PADS] = [
    DrumNote::BassDrum,
    DrumNote::AcousticSnare,
    DrumNote::ClosedHiHat,
    DrumNote::OpenHiHat,
    DrumNote::LowTom,
    DrumNote::HiMidTom,
    DrumNote::HighTom,
    DrumNote::CrashCymbal1,
    DrumNote::RideCymbal1,
    DrumNote::SideStick,
];
