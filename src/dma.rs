//! The NES had a primitive DMA engine allowing bulk data transfer from
//! CPU memory into the PPU's OAM.
//!
//! This module encapsulates that logic in [`DmaController`]. Writing a
//! page number to $4014 starts a transfer of the 256 bytes at
//! `page << 8` into OAM. While it runs the CPU is suspended: the
//! transfer first waits for an odd master tick to align itself, then
//! alternates read (even tick) and write (odd tick) for 256 byte pairs,
//! taking 513 or 514 CPU cycles in total.

use log::debug;

use crate::types::{SharedBus, SharedPpu};

pub struct DmaController {
    /// high 8 bits of the main bus address being copied
    page: u8,

    /// low 8 bits of the main bus address being copied
    addr: u8,

    /// byte most recently read from the CPU side, pending its OAM write
    data: u8,

    transfer_in_progress: bool,

    /// set until the transfer has aligned itself to an odd master tick
    waiting: bool,
}

impl DmaController {
    pub fn new() -> Self {
        Self {
            page: 0x00,
            addr: 0x00,
            data: 0x00,
            transfer_in_progress: false,
            waiting: true,
        }
    }

    pub fn reset(&mut self) {
        self.page = 0x00;
        self.addr = 0x00;
        self.data = 0x00;
        self.transfer_in_progress = false;
        self.waiting = true;
    }

    /// Begin a transfer of page `page << 8 | 0x00..=0xFF`
    pub fn start_transfer(&mut self, page: u8) {
        self.page = page;
        self.addr = 0x00;
        self.transfer_in_progress = true;
        self.waiting = true;
    }

    pub fn is_transfer_in_progress(&self) -> bool {
        self.transfer_in_progress
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Run one DMA slot in place of the CPU. `system_clock` is the master
    /// tick counter, whose parity schedules the read/write alternation.
    pub fn oam_dma_transfer(&mut self, system_clock: u64, bus: &SharedBus, ppu: &SharedPpu) {
        if self.waiting {
            if system_clock % 2 == 1 {
                self.waiting = false;
            }
        } else if system_clock % 2 == 0 {
            self.read_data(bus);
        } else {
            let (addr, data) = self.take_last_read();
            ppu.borrow_mut().oam_dma_write(addr, data);
        }
    }

    fn read_data(&mut self, bus: &SharedBus) {
        let address = (self.page as u16) << 8 | self.addr as u16;
        self.data = bus.borrow_mut().cpu_read(address, false);
    }

    // Hand out the byte read on the previous tick and advance. Once the
    // offset wraps around, 256 byte pairs have been moved and the
    // transfer ends.
    fn take_last_read(&mut self) -> (u8, u8) {
        let addr = self.addr;
        self.addr = self.addr.wrapping_add(1);
        if self.addr == 0x00 {
            self.finish_transfer();
        }
        (addr, self.data)
    }

    fn finish_transfer(&mut self) {
        self.transfer_in_progress = false;
        self.waiting = true;
        debug!("OAM DMA finished");
    }
}

impl Default for DmaController {
    fn default() -> Self {
        Self::new()
    }
}
