// Top-level firmware behavior: the startup sequence and one main-loop iteration. main.rs owns
// the peripherals and the clock and calls into this.

use crate::boot::{select_boot_mode, BootMode};
use crate::config::{
    BOOT_PAD, HIT_FLASH_MS, POWER_UP_PAUSE_MS, READY_FLASH_MS, SETTLE_MS, STARTUP_FLASHES, STARTUP_FLASH_MS,
    UPLOAD_IDLE_TIMEOUT_MS,
};
use crate::diag::NullLog;
use crate::indicator::Indicator;
use crate::midi::MidiSink;
use crate::scanner::Scanner;
use crate::sensor::SensingMode;
use crate::serial::ByteSource;
use crate::update::{ImageWriter, Reply, UpdateServer};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use ufmt::uWrite;

/// Upper bound on console bytes handled per loop pass, so pads keep getting scanned mid-upload.
pub const POLL_BUDGET: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    /// A new image is staged; the board should reset into it.
    Restart,
}

pub struct App<S, M, P, W, const N: usize>
where
    S: SensingMode,
    M: MidiSink,
    P: OutputPin,
    W: ImageWriter,
{
    scanner: Scanner<S, M, N>,
    indicator: Indicator<P>,
    update: UpdateServer<W>,
    mode: BootMode,
}

impl<S, M, P, W, const N: usize> App<S, M, P, W, N>
where
    S: SensingMode,
    M: MidiSink,
    P: OutputPin,
    W: ImageWriter,
{
    pub fn new(scanner: Scanner<S, M, N>, led: P, writer: W) -> Self {
        Self {
            scanner,
            indicator: Indicator::new(led),
            update: UpdateServer::new(writer, UPLOAD_IDLE_TIMEOUT_MS),
            mode: BootMode::Play,
        }
    }

    /// Power-up pause, LED pattern, boot-mode check, settle, calibration, ready flash.
    ///
    /// Also reports a staged image that is still flagged pending, i.e. the bootloader skipped it.
    pub fn start<D: DelayNs, L: uWrite>(&mut self, delay: &mut D, log: &mut L) -> BootMode {
        delay.delay_ms(POWER_UP_PAUSE_MS);
        diag!(log, "touchdrum {}: {} pads\r", env!("CARGO_PKG_VERSION"), N);
        for pad in self.scanner.pads().iter() {
            diag!(log, "Pad {} plays {} ({})\r", pad.index, pad.note.name(), pad.note.number());
        }
        if let Some(bytes) = self.update.staged_image() {
            diag!(log, "Staged image of {} bytes was not applied\r", bytes);
        }
        self.indicator.blink(delay, STARTUP_FLASHES, STARTUP_FLASH_MS);

        self.mode = select_boot_mode(self.scanner.sensing_mut(), BOOT_PAD);
        diag!(log, "Boot mode: {}\r", self.mode.name());
        if self.mode == BootMode::Update {
            diag!(log, "Upload page: GET /, image: POST /update\r");
        }

        diag!(log, "Calibrating, hands off the pads\r");
        delay.delay_ms(SETTLE_MS);
        self.scanner.calibrate(delay, log);

        self.indicator.pulse(delay, READY_FLASH_MS);
        diag!(log, "Ready\r");
        self.mode
    }

    /// One pass of the main loop at time `now`.
    ///
    /// In update mode the console carries HTTP, so scan diagnostics are dropped there.
    pub fn tick<D, C>(&mut self, now: u32, delay: &mut D, console: &mut C) -> Action
    where
        D: DelayNs,
        C: uWrite + ByteSource,
    {
        let hits = match self.mode {
            BootMode::Play => self.scanner.scan(now, delay, console),
            BootMode::Update => self.scanner.scan(now, delay, &mut NullLog),
        };
        if hits > 0 {
            self.indicator.flash(now, HIT_FLASH_MS);
        }

        if self.mode == BootMode::Play {
            self.indicator.update(now);
            return Action::Continue;
        }

        let reply = self.serve(now, console);
        // LED stays lit while an image is coming in
        if self.update.is_uploading() {
            self.indicator.flash(now, HIT_FLASH_MS);
        }
        self.indicator.update(now);

        match reply {
            Some(reply) => {
                let _ = reply.write_to(console);
                if reply.restart() {
                    self.scanner.release_all(&mut NullLog);
                    return Action::Restart;
                }
                Action::Continue
            }
            None => Action::Continue,
        }
    }

    fn serve<C: ByteSource>(&mut self, now: u32, console: &mut C) -> Option<Reply> {
        for _ in 0..POLL_BUDGET {
            let Ok(byte) = console.pull_byte() else {
                break;
            };
            if let Some(reply) = self.update.feed(byte, now) {
                return Some(reply);
            }
        }
        self.update.expire(now)
    }

    pub fn mode(&self) -> BootMode {
        self.mode
    }

    pub fn scanner(&self) -> &Scanner<S, M, N> {
        &self.scanner
    }

    pub fn scanner_mut(&mut self) -> &mut Scanner<S, M, N> {
        &mut self.scanner
    }

    pub fn indicator(&self) -> &Indicator<P> {
        &self.indicator
    }

    pub fn update(&self) -> &UpdateServer<W> {
        &self.update
    }
}
