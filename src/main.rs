#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
extern crate alloc;

mod millis;

use arduino_hal::hal::port::{PD2, PD3};
use arduino_hal::hal::usart::BaudrateArduinoExt;
use arduino_hal::hal::wdt;
use arduino_hal::pac::USART1;
use arduino_hal::port::mode::{Input, Output};
use arduino_hal::port::Pin;
use arduino_hal::prelude::*;
use arduino_hal::{spi, Usart};
use core::convert::Infallible;
use embedded_alloc::LlffHeap as Heap;
use embedded_hal::delay::DelayNs;
use panic_halt as _;
use touchdrum::app::{Action, App};
use touchdrum::config::{ACTIVE, CONSOLE_BAUD, LOOP_PAUSE_MS, MAX_IMAGE_BYTES, MIDI_BAUD, STAGE_FLASH_BYTES};
use touchdrum::kit::PAD_NOTES;
#[cfg(not(feature = "usb-midi"))]
use touchdrum::midi::SerialMidi;
#[cfg(feature = "usb-midi")]
use touchdrum::midi::UsbPacketMidi;
use touchdrum::scanner::Scanner;
use touchdrum::serial::{ByteSink, ByteSource};
use touchdrum::update::flash::SpiNorFlash;
use touchdrum::update::stage::FlashStage;
use ufmt::uWrite;

// priority-queue backs the deferred note-offs
const HEAP_SIZE: usize = 512;

#[global_allocator]
static HEAP: Heap = Heap::empty();

type ConsolePort = arduino_hal::hal::usart::Usart0<arduino_hal::DefaultClock>;
type MidiPort = Usart<USART1, Pin<Input, PD2>, Pin<Output, PD3>>;

/// USB serial: diagnostics out, and the update service's transport in update mode.
struct Console(ConsolePort);

impl uWrite for Console {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        self.0.write_str(s)
    }
}

impl ByteSource for Console {
    type Error = Infallible;

    fn pull_byte(&mut self) -> nb::Result<u8, Infallible> {
        self.0.read()
    }
}

/// MIDI out on TX1: a DIN socket, or a USB-MIDI bridge with `usb-midi`.
struct MidiOut(MidiPort);

impl ByteSink for MidiOut {
    type Error = Infallible;

    fn push_byte(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        self.0.write_byte(byte);
        Ok(())
    }

    fn drain(&mut self) {
        self.0.flush();
    }
}

#[cfg(not(feature = "grounded"))]
mod pads {
    use arduino_hal::adc::Channel;
    use arduino_hal::Adc;
    use touchdrum::config::{AnalogProfile, Sensing, ACTIVE, NUM_PADS};
    use touchdrum::sensor::{AnalogThresholdSensor, TouchRead};

    pub const PROFILE: AnalogProfile = match ACTIVE.sensing {
        Sensing::Analog(p) => p,
        Sensing::Digital(_) => panic!("analog build with a digital profile"),
    };

    /// One ADC channel per pad, A0..A9.
    pub struct AdcPads {
        pub adc: Adc,
        pub channels: [Channel; NUM_PADS],
    }

    impl TouchRead for AdcPads {
        fn touch_read(&mut self, pad: usize) -> u16 {
            self.adc.read_blocking(&self.channels[pad])
        }
    }

    pub type PadSensor = AnalogThresholdSensor<AdcPads, NUM_PADS>;
}

#[cfg(feature = "grounded")]
mod pads {
    use arduino_hal::hal::port::Dynamic;
    use arduino_hal::port::mode::{Input, PullUp};
    use arduino_hal::port::Pin;
    use touchdrum::config::{DigitalProfile, Sensing as Kind, ACTIVE, NUM_PADS};
    use touchdrum::sensor::DigitalStateSensor;

    pub const PROFILE: DigitalProfile = match ACTIVE.sensing {
        Kind::Digital(p) => p,
        Kind::Analog(_) => panic!("grounded build with an analog profile"),
    };

    pub type PadSensor = DigitalStateSensor<Pin<Input<PullUp>, Dynamic>, NUM_PADS>;
}

fn restart(watchdog: &mut wdt::Wdt) -> ! {
    let _ = watchdog.start(wdt::Timeout::Ms16);
    loop {}
}

#[arduino_hal::entry]
fn main() -> ! {
    {
        use core::mem::MaybeUninit;
        static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
        unsafe { HEAP.init(core::ptr::addr_of_mut!(HEAP_MEM) as usize, HEAP_SIZE) }
    }

    let Some(dp) = arduino_hal::Peripherals::take() else {
        loop {}
    };
    let pins = arduino_hal::pins!(dp);

    let mut watchdog = wdt::Wdt::new(dp.WDT, &dp.CPU.mcusr);
    let mut console = Console(arduino_hal::default_serial!(dp, pins, CONSOLE_BAUD));
    let midi_port = MidiOut(Usart::new(dp.USART1, pins.d19, pins.d18.into_output(), MIDI_BAUD.into_baudrate()));
    #[cfg(not(feature = "usb-midi"))]
    let midi = SerialMidi::new(midi_port);
    #[cfg(feature = "usb-midi")]
    let midi = UsbPacketMidi::new(midi_port, 0);

    // Staging flash on the hardware SPI header, chip select on D53
    let (spi, flash_cs) = arduino_hal::Spi::new(
        dp.SPI,
        pins.d52.into_output(),
        pins.d51.into_output(),
        pins.d50.into_pull_up_input(),
        pins.d53.into_output(),
        spi::Settings::default(),
    );
    let stage = FlashStage::new(SpiNorFlash::new(spi, flash_cs, STAGE_FLASH_BYTES), MAX_IMAGE_BYTES);
    let led = pins.d13.into_output();
    let mut delay = arduino_hal::Delay::new();

    #[cfg(not(feature = "grounded"))]
    let sensing: pads::PadSensor = {
        let mut adc = arduino_hal::Adc::new(dp.ADC, Default::default());
        let channels = [
            pins.a0.into_analog_input(&mut adc).into_channel(),
            pins.a1.into_analog_input(&mut adc).into_channel(),
            pins.a2.into_analog_input(&mut adc).into_channel(),
            pins.a3.into_analog_input(&mut adc).into_channel(),
            pins.a4.into_analog_input(&mut adc).into_channel(),
            pins.a5.into_analog_input(&mut adc).into_channel(),
            pins.a6.into_analog_input(&mut adc).into_channel(),
            pins.a7.into_analog_input(&mut adc).into_channel(),
            pins.a8.into_analog_input(&mut adc).into_channel(),
            pins.a9.into_analog_input(&mut adc).into_channel(),
        ];
        touchdrum::sensor::AnalogThresholdSensor::new(pads::AdcPads { adc, channels }, pads::PROFILE)
    };

    #[cfg(feature = "grounded")]
    let sensing: pads::PadSensor = touchdrum::sensor::DigitalStateSensor::new(
        [
            pins.d22.into_pull_up_input().downgrade(),
            pins.d23.into_pull_up_input().downgrade(),
            pins.d24.into_pull_up_input().downgrade(),
            pins.d25.into_pull_up_input().downgrade(),
            pins.d26.into_pull_up_input().downgrade(),
            pins.d27.into_pull_up_input().downgrade(),
            pins.d28.into_pull_up_input().downgrade(),
            pins.d29.into_pull_up_input().downgrade(),
            pins.d30.into_pull_up_input().downgrade(),
            pins.d31.into_pull_up_input().downgrade(),
        ],
        pads::PROFILE,
    );

    millis::init(dp.TC0);
    // Enable interrupts globally
    unsafe { avr_device::interrupt::enable() };

    let scanner = Scanner::from_profile(sensing, midi, PAD_NOTES, &ACTIVE);
    let mut app = App::new(scanner, led, stage);
    app.start(&mut delay, &mut console);

    loop {
        if app.tick(millis::now(), &mut delay, &mut console) == Action::Restart {
            console.0.flush();
            restart(&mut watchdog);
        }
        delay.delay_ms(LOOP_PAUSE_MS);
    }
}
