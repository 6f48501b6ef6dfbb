// Image staging on NOR flash, for the bootloader to copy into program memory on the next reset.
//
// Layout: sector 0 holds the header (magic, little-endian length, boot flag), the image starts
// at sector 1. The header sector is erased when an upload begins and only programmed once the
// whole image is in, so a torn upload never looks valid.

use super::{ImageWriter, UpdateError};

pub const SECTOR: u32 = 4096;
pub const PAGE: u32 = 256;

const IMAGE_BASE: u32 = SECTOR;
const MAGIC: [u8; 4] = *b"TDFW";
const HEADER_LEN: usize = 9;

/// Header flag for an image the bootloader has not applied yet. It clears the flag once done.
pub const BOOT_PENDING: u8 = 0xA5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashFault;

/// Erase-before-write memory: 4 KiB erase sectors, 256-byte program pages.
pub trait Flash {
    /// Total size in bytes.
    fn size(&self) -> u32;

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), FlashFault>;

    /// Erase the sector holding `addr` back to 0xFF.
    fn erase_sector(&mut self, addr: u32) -> Result<(), FlashFault>;

    /// Program `data` at `addr`. Must not cross a page boundary.
    fn program(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashFault>;
}

pub struct FlashStage<F: Flash> {
    flash: F,
    capacity: u32,
}

impl<F: Flash> FlashStage<F> {
    /// `max_image` is the most the bootloader can take; the chip may cap it lower.
    pub fn new(flash: F, max_image: u32) -> Self {
        let capacity = flash.size().saturating_sub(IMAGE_BASE).min(max_image);
        Self { flash, capacity }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Length of a committed image still waiting for the bootloader.
    pub fn staged_len(&mut self) -> Option<u32> {
        let mut raw = [0u8; HEADER_LEN];
        self.flash.read(0, &mut raw).ok()?;

        let len = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        let valid = raw[..4] == MAGIC && raw[8] == BOOT_PENDING && len > 0 && len <= self.capacity;
        valid.then_some(len)
    }

    pub fn release(self) -> F {
        self.flash
    }

    // Split at page boundaries.
    fn program_span(&mut self, mut addr: u32, mut data: &[u8]) -> Result<(), UpdateError> {
        while !data.is_empty() {
            let room = (PAGE - addr % PAGE) as usize;
            let (head, rest) = data.split_at(room.min(data.len()));
            self.flash.program(addr, head).map_err(|_| UpdateError::Storage)?;
            addr += head.len() as u32;
            data = rest;
        }
        Ok(())
    }
}

impl<F: Flash> ImageWriter for FlashStage<F> {
    fn begin(&mut self) -> Result<(), UpdateError> {
        self.flash.erase_sector(0).map_err(|_| UpdateError::Storage)
    }

    fn write(&mut self, offset: u32, chunk: &[u8]) -> Result<(), UpdateError> {
        let end = offset.saturating_add(chunk.len() as u32);
        if end > self.capacity {
            return Err(UpdateError::TooLarge { size: end, capacity: self.capacity });
        }

        // erase each sector as the image first reaches it
        let mut sector = offset.next_multiple_of(SECTOR);
        while sector < end {
            self.flash.erase_sector(IMAGE_BASE + sector).map_err(|_| UpdateError::Storage)?;
            sector += SECTOR;
        }
        self.program_span(IMAGE_BASE + offset, chunk)
    }

    fn commit(&mut self, len: u32) -> Result<(), UpdateError> {
        if len > self.capacity {
            return Err(UpdateError::TooLarge { size: len, capacity: self.capacity });
        }
        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(&MAGIC);
        header[4..8].copy_from_slice(&len.to_le_bytes());
        header[8] = BOOT_PENDING;
        self.program_span(0, &header)
    }

    fn abort(&mut self) {
        let _ = self.flash.erase_sector(0);
    }

    fn staged(&mut self) -> Option<u32> {
        self.staged_len()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::RamFlash;
    use super::*;
    use crate::update::mock::upload_request;
    use crate::update::{Reply, UpdateServer, UpdateSession};
    use std::vec::Vec as StdVec;

    const MAX_IMAGE: u32 = 248 * 1024;

    fn image(len: usize) -> StdVec<u8> {
        (0..len).map(|i| (i * 13 % 241) as u8).collect()
    }

    #[test]
    fn stage_erased_is_empty() {
        let mut stage = FlashStage::new(RamFlash::erased(64 * 1024), MAX_IMAGE);
        assert_eq!(stage.capacity(), 60 * 1024);
        assert_eq!(stage.staged_len(), None);
    }

    #[test]
    fn stage_capacity_capped_by_bootloader() {
        let stage = FlashStage::new(RamFlash::erased(1024 * 1024), MAX_IMAGE);
        assert_eq!(stage.capacity(), MAX_IMAGE);
    }

    #[test]
    fn stage_commit_sets_header() {
        let mut s = UpdateSession::new(FlashStage::new(RamFlash::erased(16 * 1024), MAX_IMAGE));
        s.begin(None).unwrap();
        s.write(b"firmware").unwrap();
        assert_eq!(s.finish(true), Ok(8));

        assert_eq!(s.writer_mut().staged_len(), Some(8));
        let cells = &s.writer().flash.cells;
        assert_eq!(&cells[..4], b"TDFW");
        assert_eq!(cells[8], BOOT_PENDING);
        assert_eq!(&cells[4096..4104], b"firmware");
    }

    #[test]
    fn stage_full_size_image_through_server() {
        let img = image(12_000);
        let mut server = UpdateServer::new(FlashStage::new(RamFlash::erased(64 * 1024), MAX_IMAGE), 5000);

        let req = upload_request("----fw", &img, 0);
        let replies: StdVec<Reply> = req.iter().enumerate().filter_map(|(i, &b)| server.feed(b, i as u32)).collect();

        assert_eq!(replies, [Reply::Uploaded { bytes: 12_000 }]);
        let flash = &server.session().writer().flash;
        assert_eq!(&flash.cells[4096..4096 + 12_000], &img[..]);
        // header sector, then three image sectors
        assert_eq!(flash.erases, 4);
        assert_eq!(server.staged_image(), Some(12_000));
    }

    #[test]
    fn stage_torn_upload_invalid() {
        let mut s = UpdateSession::new(FlashStage::new(RamFlash::erased(16 * 1024), MAX_IMAGE));
        s.begin(None).unwrap();
        s.write(&image(5000)).unwrap();
        assert!(s.finish(false).is_err());

        assert_eq!(s.writer_mut().staged_len(), None);
    }

    #[test]
    fn stage_replaces_previous_image() {
        let mut s = UpdateSession::new(FlashStage::new(RamFlash::erased(16 * 1024), MAX_IMAGE));
        s.begin(None).unwrap();
        s.write(b"old image").unwrap();
        s.finish(true).unwrap();

        // a new upload invalidates the old one straight away
        s.begin(None).unwrap();
        assert_eq!(s.writer_mut().staged_len(), None);

        s.write(b"new").unwrap();
        assert_eq!(s.finish(true), Ok(3));
        assert_eq!(&s.writer().flash.cells[4096..4099], b"new");
    }

    #[test]
    fn stage_too_large() {
        let mut s = UpdateSession::new(FlashStage::new(RamFlash::erased(8 * 1024), MAX_IMAGE));
        s.begin(None).unwrap();

        let err = s.write(&[1; 5000]).unwrap_err();
        assert_eq!(err, UpdateError::TooLarge { size: 4160, capacity: 4096 });
        assert!(s.finish(true).is_err());
        assert_eq!(s.writer_mut().staged_len(), None);
    }

    #[test]
    fn stage_unaligned_write_splits_pages() {
        let mut stage = FlashStage::new(RamFlash::erased(16 * 1024), MAX_IMAGE);
        stage.begin().unwrap();
        stage.write(0, &[7; 200]).unwrap();
        // 200..500 straddles the 256-byte page edge
        stage.write(200, &[9; 300]).unwrap();

        let cells = &stage.release().cells;
        assert_eq!(cells[4096 + 199], 7);
        assert!(cells[4096 + 200..4096 + 500].iter().all(|&b| b == 9));
    }

    #[test]
    fn stage_storage_fault() {
        let mut flash = RamFlash::erased(16 * 1024);
        flash.broken = true;
        let mut stage = FlashStage::new(flash, MAX_IMAGE);

        assert_eq!(stage.begin(), Err(UpdateError::Storage));
    }
}
