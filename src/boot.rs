use crate::sensor::SensingMode;

/// Session mode, decided once shortly after power-up and never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootMode {
    /// Pads only.
    Play,
    /// Pads plus the firmware upload service.
    Update,
}

impl BootMode {
    pub const fn name(self) -> &'static str {
        match self {
            BootMode::Play => "play",
            BootMode::Update => "update",
        }
    }
}

/// Holding `pad` while the board comes up enables the update service.
pub fn select_boot_mode<S: SensingMode>(sensing: &mut S, pad: usize) -> BootMode {
    if sensing.held_at_boot(pad) {
        BootMode::Update
    } else {
        BootMode::Play
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CAPACITIVE, GROUNDED};
    use crate::sensor::mock::{FakePin, ScriptedTouch};
    use crate::sensor::{AnalogThresholdSensor, DigitalStateSensor};

    #[test]
    fn boot_grounded_pad_held() {
        let mut s = DigitalStateSensor::new([FakePin { grounded: true, ..Default::default() }], GROUNDED.digital().unwrap());
        assert_eq!(select_boot_mode(&mut s, 0), BootMode::Update);
    }

    #[test]
    fn boot_grounded_pad_free() {
        let mut s = DigitalStateSensor::new([FakePin::default()], GROUNDED.digital().unwrap());
        assert_eq!(select_boot_mode(&mut s, 0), BootMode::Play);
    }

    #[test]
    fn boot_touch_pad() {
        let mut s: AnalogThresholdSensor<_, 2> =
            AnalogThresholdSensor::new(ScriptedTouch::idle([110, 10]), CAPACITIVE.analog().unwrap());

        assert_eq!(select_boot_mode(&mut s, 0), BootMode::Play);
        assert_eq!(select_boot_mode(&mut s, 1), BootMode::Update);
    }

    #[test]
    fn boot_dead_channel_is_play() {
        let mut s: AnalogThresholdSensor<_, 1> =
            AnalogThresholdSensor::new(ScriptedTouch::idle([0]), CAPACITIVE.analog().unwrap());
        assert_eq!(select_boot_mode(&mut s, 0), BootMode::Play);
    }
}
