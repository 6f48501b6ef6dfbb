// Sensing modes. A pad is either an analog touch electrode (reading drops when touched) or a
// pulled-up digital input that a touch pulls to ground. Which one is a build-time choice.

use crate::calibrate::{calibrate, Baselines};
use crate::config::{AnalogProfile, DigitalProfile};
use crate::velocity::velocity_for;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use ufmt::uWrite;

/// Raw touch magnitude source, one channel per pad.
pub trait TouchRead {
    fn touch_read(&mut self, pad: usize) -> u16;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    Idle,
    Hit { velocity: u8 },
}

/// What the scanner needs from a sensing mode.
pub trait SensingMode {
    /// One-shot startup work. Only the first call has any effect.
    fn calibrate<D: DelayNs, L: uWrite>(&mut self, delay: &mut D, log: &mut L);

    /// Fresh reading for `pad`, classified.
    fn probe(&mut self, pad: usize) -> Activation;

    /// Raw "is someone holding this pad" check used before calibration (boot mode selection).
    fn held_at_boot(&mut self, pad: usize) -> bool;
}

pub struct AnalogThresholdSensor<R: TouchRead, const N: usize> {
    reader: R,
    profile: AnalogProfile,
    baselines: Baselines<N>,
    calibrated: bool,
}

impl<R: TouchRead, const N: usize> AnalogThresholdSensor<R, N> {
    /// Until calibrated every pad sits at the profile's fallback baseline.
    pub fn new(reader: R, profile: AnalogProfile) -> Self {
        Self {
            reader,
            profile,
            baselines: Baselines::from_values([profile.calibration.fallback; N]),
            calibrated: false,
        }
    }

    /// Skip sampling and use known baselines (bench rigs, tests).
    pub fn with_baselines(reader: R, profile: AnalogProfile, baselines: Baselines<N>) -> Self {
        Self { reader, profile, baselines, calibrated: true }
    }

    pub fn baselines(&self) -> &Baselines<N> {
        &self.baselines
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

impl<R: TouchRead, const N: usize> SensingMode for AnalogThresholdSensor<R, N> {
    fn calibrate<D: DelayNs, L: uWrite>(&mut self, delay: &mut D, log: &mut L) {
        if self.calibrated {
            return;
        }
        self.baselines = calibrate(&mut self.reader, delay, &self.profile.calibration, log);
        self.calibrated = true;
    }

    fn probe(&mut self, pad: usize) -> Activation {
        let reading = self.reader.touch_read(pad);
        let baseline = self.baselines.get(pad);
        let strength = baseline as i32 - reading as i32;

        if strength <= self.profile.threshold as i32 {
            return Activation::Idle;
        }

        let reference = self.profile.reference.resolve(baseline);
        Activation::Hit { velocity: velocity_for(strength, self.profile.threshold, reference, self.profile.velocity) }
    }

    fn held_at_boot(&mut self, pad: usize) -> bool {
        let r = self.reader.touch_read(pad);
        r > 0 && r < self.profile.boot_hold_below
    }
}

pub struct DigitalStateSensor<P: InputPin, const N: usize> {
    pins: [P; N],
    velocity: u8,
}

impl<P: InputPin, const N: usize> DigitalStateSensor<P, N> {
    pub fn new(pins: [P; N], profile: DigitalProfile) -> Self {
        Self { pins, velocity: profile.velocity }
    }

    pub fn pins_mut(&mut self) -> &mut [P; N] {
        &mut self.pins
    }

    // A pin that can't be read counts as released.
    fn grounded(&mut self, pad: usize) -> bool {
        self.pins[pad].is_low().unwrap_or(false)
    }
}

impl<P: InputPin, const N: usize> SensingMode for DigitalStateSensor<P, N> {
    fn calibrate<D: DelayNs, L: uWrite>(&mut self, _delay: &mut D, _log: &mut L) {}

    fn probe(&mut self, pad: usize) -> Activation {
        if self.grounded(pad) {
            Activation::Hit { velocity: self.velocity }
        } else {
            Activation::Idle
        }
    }

    fn held_at_boot(&mut self, pad: usize) -> bool {
        self.grounded(pad)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use crate::config::{CAPACITIVE, GROUNDED};
    use crate::diag::NullLog;

    fn analog(levels: [u16; 2], baselines: [u16; 2]) -> AnalogThresholdSensor<ScriptedTouch<2>, 2> {
        AnalogThresholdSensor::with_baselines(
            ScriptedTouch::idle(levels),
            CAPACITIVE.analog().unwrap(),
            Baselines::from_values(baselines),
        )
    }

    #[test]
    fn analog_idle_near_baseline() {
        let mut s = analog([95, 100], [100, 100]);
        assert_eq!(s.probe(0), Activation::Idle);
        assert_eq!(s.probe(1), Activation::Idle);
    }

    #[test]
    fn analog_threshold_is_strict() {
        // strength exactly 15 doesn't fire, 16 does
        let mut s = analog([85, 84], [100, 100]);
        assert_eq!(s.probe(0), Activation::Idle);
        assert!(matches!(s.probe(1), Activation::Hit { .. }));
    }

    #[test]
    fn analog_hit_velocity() {
        let mut s = analog([70, 100], [100, 100]);
        assert_eq!(s.probe(0), Activation::Hit { velocity: 77 });
    }

    #[test]
    fn analog_reading_above_baseline() {
        let mut s = analog([180, 100], [100, 100]);
        assert_eq!(s.probe(0), Activation::Idle);
    }

    #[test]
    fn analog_calibrates_once() {
        let mut s: AnalogThresholdSensor<_, 2> =
            AnalogThresholdSensor::new(ScriptedTouch::idle([120, 90]), CAPACITIVE.analog().unwrap());
        assert_eq!(s.baselines().as_slice(), &[50, 50]);

        s.calibrate(&mut TickDelay::default(), &mut NullLog);
        assert!(s.is_calibrated());
        assert_eq!(s.baselines().as_slice(), &[120, 90]);

        s.reader_mut().levels = [10, 10];
        s.calibrate(&mut TickDelay::default(), &mut NullLog);
        assert_eq!(s.baselines().as_slice(), &[120, 90]);
    }

    #[test]
    fn analog_fallback_baseline_fires_on_touch() {
        let mut s: AnalogThresholdSensor<_, 1> =
            AnalogThresholdSensor::new(ScriptedTouch::idle([0]), CAPACITIVE.analog().unwrap());
        s.calibrate(&mut TickDelay::default(), &mut NullLog);

        s.reader_mut().levels = [20];
        assert!(matches!(s.probe(0), Activation::Hit { .. }));
    }

    #[test]
    fn analog_boot_hold() {
        let mut s = analog([12, 110], [100, 100]);
        assert!(s.held_at_boot(0));
        assert!(!s.held_at_boot(1));
    }

    #[test]
    fn digital_low_fires_fixed_velocity() {
        let mut s = DigitalStateSensor::new([FakePin { grounded: true, ..Default::default() }], GROUNDED.digital().unwrap());
        assert_eq!(s.probe(0), Activation::Hit { velocity: 100 });
    }

    #[test]
    fn digital_high_is_idle() {
        let mut s = DigitalStateSensor::new([FakePin::default()], GROUNDED.digital().unwrap());
        assert_eq!(s.probe(0), Activation::Idle);
    }

    #[test]
    fn digital_read_fault_is_idle() {
        let mut s = DigitalStateSensor::new([FakePin { grounded: true, broken: true }], GROUNDED.digital().unwrap());
        assert_eq!(s.probe(0), Activation::Idle);
        assert!(!s.held_at_boot(0));
    }
}
