// Build-time tuning. There is no persistent configuration: a profile is picked by cargo feature
// and baked into the image.

use crate::scanner::HoldPolicy;
use crate::velocity::{ReferenceMax, VelocityRange};

pub const NUM_PADS: usize = 10;
pub const BOOT_PAD: usize = 0; // ← held at power-up selects update mode

pub const POWER_UP_PAUSE_MS: u32 = 1000;
pub const SETTLE_MS: u32 = 2000; // ← hands off the pads
pub const LOOP_PAUSE_MS: u32 = 1;

pub const HIT_FLASH_MS: u32 = 50;
pub const STARTUP_FLASHES: u8 = 3;
pub const STARTUP_FLASH_MS: u32 = 200;
pub const READY_FLASH_MS: u32 = 500;

pub const CONSOLE_BAUD: u32 = 57600;
pub const MIDI_BAUD: u32 = 31250;

pub const UPLOAD_IDLE_TIMEOUT_MS: u32 = 5000;

/// Staged images bigger than this cannot be flashed: 256 KiB program memory less the 8 KiB
/// bootloader section.
pub const MAX_IMAGE_BYTES: u32 = (256 - 8) * 1024;
/// External NOR flash used for staging (W25Q32).
pub const STAGE_FLASH_BYTES: u32 = 4 * 1024 * 1024;

pub const CPU_HZ: u32 = 16_000_000;
pub const TICK_PRESCALER: u32 = 64;

/// OCRnA value for a CTC timer firing at `tick_hz`. The counter runs from 0 to the compare
/// value inclusive, so the period is one count longer than the value.
pub const fn ctc_compare(clock_hz: u32, prescaler: u32, tick_hz: u32) -> u32 {
    clock_hz / prescaler / tick_hz - 1
}

/// Calibration sampling rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationWindow {
    pub samples: u8,
    pub interval_ms: u32,
    /// Readings must satisfy `0 < r < valid_below`.
    pub valid_below: u16,
    pub min_accepted: u8,
    /// Used when too few samples pass. Low enough that any real touch clears the threshold.
    pub fallback: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalogProfile {
    pub threshold: u16,
    pub velocity: VelocityRange,
    pub reference: ReferenceMax,
    pub calibration: CalibrationWindow,
    /// Raw reading under this at power-up counts as the boot pad being held.
    pub boot_hold_below: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigitalProfile {
    pub velocity: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sensing {
    Analog(AnalogProfile),
    Digital(DigitalProfile),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profile {
    pub sensing: Sensing,
    pub retrigger_ms: u32,
    pub hold: HoldPolicy,
}

impl Profile {
    pub const fn analog(&self) -> Option<AnalogProfile> {
        match self.sensing {
            Sensing::Analog(a) => Some(a),
            Sensing::Digital(_) => None,
        }
    }

    pub const fn digital(&self) -> Option<DigitalProfile> {
        match self.sensing {
            Sensing::Digital(d) => Some(d),
            Sensing::Analog(_) => None,
        }
    }
}

/// Low-threshold capacitive pads (sensor envelope ~0-200).
pub const CAPACITIVE: Profile = Profile {
    sensing: Sensing::Analog(AnalogProfile {
        threshold: 15,
        velocity: VelocityRange { min: 40, max: 127 },
        reference: ReferenceMax::HalfBaseline,
        calibration: CalibrationWindow {
            samples: 10,
            interval_ms: 10,
            valid_below: 200,
            min_accepted: 1,
            fallback: 50,
        },
        boot_hold_below: 25,
    }),
    retrigger_ms: 50,
    hold: HoldPolicy::Blocking { hold_ms: 10 },
};

/// Higher-range capacitive pads (~0-300). Saturates against a fixed reference instead of the baseline.
pub const CAPACITIVE_WIDE: Profile = Profile {
    sensing: Sensing::Analog(AnalogProfile {
        threshold: 20,
        velocity: VelocityRange { min: 40, max: 127 },
        reference: ReferenceMax::Fixed(120),
        calibration: CalibrationWindow {
            samples: 20,
            interval_ms: 10,
            valid_below: 300,
            min_accepted: 6,
            fallback: 100,
        },
        boot_hold_below: 50,
    }),
    retrigger_ms: 30,
    hold: HoldPolicy::Deferred { hold_ms: 10 },
};

/// Pads wired to pulled-up inputs; touching grounds the pin.
pub const GROUNDED: Profile = Profile {
    sensing: Sensing::Digital(DigitalProfile { velocity: 100 }),
    retrigger_ms: 30,
    hold: HoldPolicy::Blocking { hold_ms: 10 },
};

#[cfg(feature = "grounded")]
pub const ACTIVE: Profile = GROUNDED;
#[cfg(all(not(feature = "grounded"), feature = "wide-range"))]
pub const ACTIVE: Profile = CAPACITIVE_WIDE;
#[cfg(all(not(feature = "grounded"), not(feature = "wide-range")))]
pub const ACTIVE: Profile = CAPACITIVE;

// `VelocityRange::clamp` panics on an inverted range.
const _: () = match ACTIVE.sensing {
    Sensing::Analog(a) => assert!(a.velocity.min <= a.velocity.max),
    Sensing::Digital(d) => assert!(d.velocity > 0 && d.velocity <= 127),
};
