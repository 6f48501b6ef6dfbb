// 25-series SPI NOR flash (W25Qxx and compatibles) on a bare SPI bus with its own chip select.
// Every erase and program waits for the chip to go idle before returning.

use super::stage::{Flash, FlashFault, PAGE, SECTOR};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

const WRITE_ENABLE: u8 = 0x06;
const READ_STATUS: u8 = 0x05;
const READ_DATA: u8 = 0x03;
const PAGE_PROGRAM: u8 = 0x02;
const SECTOR_ERASE: u8 = 0x20;

const STATUS_BUSY: u8 = 0x01;

// A sector erase can take 400 ms; one status poll is a few microseconds on the wire.
const BUSY_POLLS: u32 = 200_000;

pub struct SpiNorFlash<B, CS> {
    bus: B,
    cs: CS,
    size: u32,
}

impl<B: SpiBus, CS: OutputPin> SpiNorFlash<B, CS> {
    /// `size` in bytes, e.g. 4 MiB for a W25Q32.
    pub fn new(bus: B, mut cs: CS, size: u32) -> Self {
        let _ = cs.set_high();
        Self { bus, cs, size }
    }

    pub fn release(self) -> (B, CS) {
        (self.bus, self.cs)
    }

    /// One chip-select frame: `header`, then `data` out, then `reply` in.
    fn frame(&mut self, header: &[u8], data: &[u8], reply: &mut [u8]) -> Result<(), FlashFault> {
        self.cs.set_low().map_err(|_| FlashFault)?;
        let sent = self
            .bus
            .write(header)
            .and_then(|_| self.bus.write(data))
            .and_then(|_| self.bus.read(reply))
            .and_then(|_| self.bus.flush());
        // deselect even after a failed transfer
        let released = self.cs.set_high();
        sent.map_err(|_| FlashFault)?;
        released.map_err(|_| FlashFault)
    }

    fn wait_idle(&mut self) -> Result<(), FlashFault> {
        for _ in 0..BUSY_POLLS {
            let mut status = [0u8];
            self.frame(&[READ_STATUS], &[], &mut status)?;
            if status[0] & STATUS_BUSY == 0 {
                return Ok(());
            }
        }
        Err(FlashFault)
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<(), FlashFault> {
        match addr.checked_add(len as u32) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(FlashFault),
        }
    }

    fn write_cycle(&mut self, op: u8, addr: u32, data: &[u8]) -> Result<(), FlashFault> {
        self.frame(&[WRITE_ENABLE], &[], &mut [])?;
        self.frame(&addressed(op, addr), data, &mut [])?;
        self.wait_idle()
    }
}

fn addressed(op: u8, addr: u32) -> [u8; 4] {
    let [_, a2, a1, a0] = addr.to_be_bytes();
    [op, a2, a1, a0]
}

impl<B: SpiBus, CS: OutputPin> Flash for SpiNorFlash<B, CS> {
    fn size(&self) -> u32 {
        self.size
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashFault> {
        self.check_range(addr, buf.len())?;
        self.frame(&addressed(READ_DATA, addr), &[], buf)
    }

    fn erase_sector(&mut self, addr: u32) -> Result<(), FlashFault> {
        self.check_range(addr, 1)?;
        self.write_cycle(SECTOR_ERASE, addr - addr % SECTOR, &[])
    }

    fn program(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashFault> {
        self.check_range(addr, data.len())?;
        // the chip wraps inside the page instead of carrying over
        if addr % PAGE + data.len() as u32 > PAGE {
            return Err(FlashFault);
        }
        self.write_cycle(PAGE_PROGRAM, addr, data)
    }
}
