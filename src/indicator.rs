// Status LED: startup patterns (blocking) and a short flash per hit (non-blocking, cleared by the loop).

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

pub struct Indicator<P: OutputPin> {
    led: P,
    off_at: Option<u32>,
}

impl<P: OutputPin> Indicator<P> {
    pub fn new(mut led: P) -> Self {
        let _ = led.set_low();
        Self { led, off_at: None }
    }

    /// `times` flashes of `on_ms`, each followed by the same time dark.
    pub fn blink<D: DelayNs>(&mut self, delay: &mut D, times: u8, on_ms: u32) {
        for _ in 0..times {
            let _ = self.led.set_high();
            delay.delay_ms(on_ms);
            let _ = self.led.set_low();
            delay.delay_ms(on_ms);
        }
    }

    /// One long flash, no trailing pause.
    pub fn pulse<D: DelayNs>(&mut self, delay: &mut D, on_ms: u32) {
        let _ = self.led.set_high();
        delay.delay_ms(on_ms);
        let _ = self.led.set_low();
    }

    /// Light up now, go dark `ms` later (see `update`). A new flash extends the current one.
    pub fn flash(&mut self, now: u32, ms: u32) {
        let _ = self.led.set_high();
        self.off_at = Some(now.wrapping_add(ms));
    }

    pub fn update(&mut self, now: u32) {
        if let Some(t) = self.off_at {
            if (now.wrapping_sub(t) as i32) >= 0 {
                let _ = self.led.set_low();
                self.off_at = None;
            }
        }
    }

    pub fn is_lit(&self) -> bool {
        self.off_at.is_some()
    }

    pub fn release(self) -> P {
        self.led
    }
}
