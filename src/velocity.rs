// Touch strength → MIDI velocity.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VelocityRange {
    pub min: u8,
    pub max: u8,
}

impl VelocityRange {
    pub fn clamp(&self, v: i32) -> u8 {
        v.clamp(self.min as i32, self.max as i32) as u8
    }
}

/// Upper end of the strength range, i.e. the strength at which velocity saturates.
///
/// `HalfBaseline` scales with each pad (a pad idling at 100 saturates at strength 50), `Fixed`
/// gives every pad the same curve regardless of its idle level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceMax {
    Fixed(u16),
    HalfBaseline,
}

impl ReferenceMax {
    pub fn resolve(&self, baseline: u16) -> i32 {
        match *self {
            ReferenceMax::Fixed(r) => r as i32,
            ReferenceMax::HalfBaseline => (baseline / 2) as i32,
        }
    }
}

/// Integer linear map (truncating), same shape as the Arduino `map()`.
///
/// An empty or inverted input range yields `None`.
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> Option<i32> {
    let run = in_max - in_min;
    if run <= 0 {
        return None;
    }
    Some((x - in_min) * (out_max - out_min) / run + out_min)
}

/// Velocity for a hit of `strength = baseline - reading`, clamped to `range`.
/// Degenerate reference ranges (reference ≤ threshold) pin the result to `range.min`.
pub fn velocity_for(strength: i32, threshold: u16, reference: i32, range: VelocityRange) -> u8 {
    match map_range(strength, threshold as i32, reference, range.min as i32, range.max as i32) {
        Some(v) => range.clamp(v),
        None => range.min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: VelocityRange = VelocityRange { min: 40, max: 127 };

    #[test]
    fn vel_half_baseline_example() {
        // baseline 100, reading 70
        let reference = ReferenceMax::HalfBaseline.resolve(100);
        assert_eq!(reference, 50);
        assert_eq!(velocity_for(30, 15, reference, RANGE), 77);
    }

    #[test]
    fn vel_at_threshold_is_min() {
        assert_eq!(velocity_for(15, 15, 50, RANGE), 40);
    }

    #[test]
    fn vel_saturates() {
        assert_eq!(velocity_for(50, 15, 50, RANGE), 127);
        assert_eq!(velocity_for(400, 15, 50, RANGE), 127);
    }

    #[test]
    fn vel_below_threshold_clamped() {
        assert_eq!(velocity_for(3, 15, 50, RANGE), 40);
        assert_eq!(velocity_for(-20, 15, 50, RANGE), 40);
    }

    #[test]
    fn vel_degenerate_reference() {
        // baseline 30 → reference 15 == threshold
        assert_eq!(velocity_for(25, 15, ReferenceMax::HalfBaseline.resolve(30), RANGE), 40);
        assert_eq!(velocity_for(25, 15, 10, RANGE), 40);
    }

    #[test]
    fn vel_fixed_reference() {
        assert_eq!(ReferenceMax::Fixed(120).resolve(7), 120);
        // (70 - 20) * 87 / 100 + 40
        assert_eq!(velocity_for(70, 20, 120, RANGE), 83);
    }

    #[test]
    fn vel_monotonic() {
        for reference in [ReferenceMax::HalfBaseline.resolve(180), 60, 16] {
            let mut last = 0u8;
            for strength in -10..300 {
                let v = velocity_for(strength, 15, reference, RANGE);
                assert!(v >= last, "strength {} dropped velocity", strength);
                assert!((40..=127).contains(&v));
                last = v;
            }
        }
    }

    #[test]
    fn map_truncates() {
        assert_eq!(map_range(1, 0, 3, 0, 10), Some(3));
        assert_eq!(map_range(5, 5, 5, 0, 10), None);
    }
}
