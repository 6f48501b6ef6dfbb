// Startup baseline calibration for analog pads.
//
// Pads must be untouched while this runs. Baselines are taken once; nothing re-calibrates later.

use crate::config::CalibrationWindow;
use crate::sensor::TouchRead;
use embedded_hal::delay::DelayNs;
use ufmt::uWrite;

/// Outcome for a single pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PadBaseline {
    pub value: u16,
    pub accepted: u8,
    pub fallback: bool,
}

/// Per-pad idle readings. Read-only once built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Baselines<const N: usize> {
    values: [u16; N],
}

impl<const N: usize> Baselines<N> {
    pub const fn from_values(values: [u16; N]) -> Self {
        Self { values }
    }

    pub fn get(&self, pad: usize) -> u16 {
        self.values[pad]
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.values
    }
}

/// Mean of the in-range samples, or the window's fallback if too few survive.
pub fn baseline_from<I>(samples: I, window: &CalibrationWindow) -> PadBaseline
where
    I: IntoIterator<Item = u16>,
{
    let mut sum = 0u32;
    let mut accepted = 0u8;

    for r in samples {
        if r > 0 && r < window.valid_below {
            sum += r as u32;
            accepted = accepted.saturating_add(1);
        }
    }

    if accepted == 0 || accepted < window.min_accepted {
        return PadBaseline { value: window.fallback, accepted, fallback: true };
    }

    PadBaseline { value: (sum / accepted as u32) as u16, accepted, fallback: false }
}

/// Sample every pad `window.samples` times, `window.interval_ms` apart, and build the table.
pub fn calibrate<R, D, L, const N: usize>(
    reader: &mut R,
    delay: &mut D,
    window: &CalibrationWindow,
    log: &mut L,
) -> Baselines<N>
where
    R: TouchRead,
    D: DelayNs,
    L: uWrite,
{
    let mut values = [0u16; N];

    for (pad, value) in values.iter_mut().enumerate() {
        let samples = (0..window.samples).map(|_| {
            let r = reader.touch_read(pad);
            delay.delay_ms(window.interval_ms);
            r
        });
        let result = baseline_from(samples, window);

        if result.fallback {
            diag!(log, "Pad {}: {} valid readings, default baseline {}\r", pad, result.accepted, result.value);
        } else {
            diag!(log, "Pad {}: baseline {}\r", pad, result.value);
        }
        *value = result.value;
    }

    Baselines { values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CAPACITIVE;
    use crate::diag::NullLog;
    use crate::sensor::mock::{ScriptedTouch, TickDelay};
    use heapless::String;

    fn window() -> CalibrationWindow {
        CAPACITIVE.analog().unwrap().calibration
    }

    #[test]
    fn cal_mean_of_valid() {
        let b = baseline_from([100, 102, 98, 100], &window());
        assert_eq!(b, PadBaseline { value: 100, accepted: 4, fallback: false });
    }

    #[test]
    fn cal_mean_truncates() {
        assert_eq!(baseline_from([100, 101], &window()).value, 100);
    }

    #[test]
    fn cal_rejects_out_of_range() {
        // 0 and 200 are both outside (0, 200)
        let b = baseline_from([0, 90, 200, 110, 4000], &window());
        assert_eq!(b.value, 100);
        assert_eq!(b.accepted, 2);
    }

    #[test]
    fn cal_fallback_when_nothing_valid() {
        let b = baseline_from([0, 0, 250, 1023], &window());
        assert_eq!(b, PadBaseline { value: 50, accepted: 0, fallback: true });
    }

    #[test]
    fn cal_min_accepted() {
        let strict = CalibrationWindow { min_accepted: 6, fallback: 100, valid_below: 300, ..window() };

        let b = baseline_from([150, 150, 150, 150, 150, 0, 0], &strict);
        assert!(b.fallback);
        assert_eq!(b.value, 100);

        let b = baseline_from([150, 150, 150, 150, 150, 156], &strict);
        assert!(!b.fallback);
        assert_eq!(b.value, 151);
    }

    #[test]
    fn cal_samples_every_pad() {
        let mut touch = ScriptedTouch::<3>::idle([120, 0, 80]);
        let mut delay = TickDelay::default();

        let baselines: Baselines<3> = calibrate(&mut touch, &mut delay, &window(), &mut NullLog);

        assert_eq!(baselines.as_slice(), &[120, 50, 80]);
        assert_eq!(touch.reads, [10, 10, 10]);
        assert_eq!(delay.elapsed_ms, 30 * 10);
    }

    #[test]
    fn cal_logs_each_pad() {
        let mut touch = ScriptedTouch::<2>::idle([120, 0]);
        let mut log: String<128> = String::new();

        let _: Baselines<2> = calibrate(&mut touch, &mut TickDelay::default(), &window(), &mut log);

        assert!(log.contains("Pad 0: baseline 120"));
        assert!(log.contains("Pad 1: 0 valid readings, default baseline 50"));
    }
}
