// Millisecond clock: TC0 in CTC mode, one compare-match interrupt per millisecond.

use core::cell::Cell;
use touchdrum::config::{ctc_compare, CPU_HZ, TICK_PRESCALER};

const COMPARE: u32 = ctc_compare(CPU_HZ, TICK_PRESCALER, 1000);
const _: () = assert!(COMPARE <= u8::MAX as u32);
const _: () = assert!(TICK_PRESCALER == 64); // prescale_64 in `init`

static MILLIS: avr_device::interrupt::Mutex<Cell<u32>> = avr_device::interrupt::Mutex::new(Cell::new(0));

#[avr_device::interrupt(atmega2560)]
fn TIMER0_COMPA() {
    avr_device::interrupt::free(|cs| {
        let ms = MILLIS.borrow(cs);
        ms.set(ms.get().wrapping_add(1));
    })
}

/// Start the clock from zero. Interrupts still have to be enabled globally afterwards.
pub fn init(tc0: arduino_hal::pac::TC0) {
    tc0.tccr0a.write(|w| w.wgm0().ctc());
    tc0.ocr0a.write(|w| w.bits(COMPARE as u8));
    tc0.tccr0b.write(|w| w.cs0().prescale_64());
    tc0.timsk0.write(|w| w.ocie0a().set_bit());

    avr_device::interrupt::free(|cs| MILLIS.borrow(cs).set(0));
}

/// Milliseconds since `init`, wrapping after about 49 days.
pub fn now() -> u32 {
    avr_device::interrupt::free(|cs| MILLIS.borrow(cs).get())
}
