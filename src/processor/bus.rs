use log::debug;

use crate::hardware::{
    CONTROLLER_PORT_1, CONTROLLER_PORT_2, NUM_CONTROLLERS, OAMDMA, PPU_REGISTERS_END,
    PPU_REGISTERS_START, PPU_REGISTER_MASK, RAM_END, RAM_MASK, RAM_SIZE, RAM_START,
};
use crate::interfaces::CpuBus;
use crate::types::{SharedCartridge, SharedDma, SharedPpu};

/// Main bus: decodes every CPU (and DMA) memory access.
///
/// The cartridge mapper gets the first chance to claim an address.
/// Otherwise the decode is, in order: the mirrored 2 kB RAM, the PPU
/// register window, the DMA trigger, and the controller ports. Anything
/// else is a no-op and reads as zero.
pub struct Bus {
    ram: [u8; RAM_SIZE],

    // Live controller state written by the host, and the serial shift
    // registers latched from it on a strobe write
    controllers: [u8; NUM_CONTROLLERS],
    controller_state: [u8; NUM_CONTROLLERS],

    cartridge: Option<SharedCartridge>,
    ppu: Option<SharedPpu>,
    dma: Option<SharedDma>,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            ram: [0; RAM_SIZE],
            controllers: [0; NUM_CONTROLLERS],
            controller_state: [0; NUM_CONTROLLERS],
            cartridge: None,
            ppu: None,
            dma: None,
        }
    }

    pub fn set_cartridge(&mut self, cartridge: SharedCartridge) {
        self.cartridge = Some(cartridge);
    }

    pub fn set_ppu(&mut self, ppu: SharedPpu) {
        self.ppu = Some(ppu);
    }

    pub fn set_dma(&mut self, dma: SharedDma) {
        self.dma = Some(dma);
    }

    pub fn cpu_read(&mut self, address: u16, read_only: bool) -> u8 {
        if let Some(cartridge) = &self.cartridge {
            if let Some(data) = cartridge.borrow().cpu_read(address) {
                return data;
            }
        }

        match address {
            RAM_START..=RAM_END => self.ram[(address & RAM_MASK) as usize],
            PPU_REGISTERS_START..=PPU_REGISTERS_END => match &self.ppu {
                Some(ppu) => ppu
                    .borrow_mut()
                    .cpu_read(address & PPU_REGISTER_MASK, read_only),
                None => 0,
            },
            CONTROLLER_PORT_1 | CONTROLLER_PORT_2 => {
                // Serial read-out: emit the MSB of the latched state
                let idx = (address & 0x0001) as usize;
                let data = (self.controller_state[idx] & 0x80 > 0) as u8;
                if !read_only {
                    self.controller_state[idx] <<= 1;
                }
                data
            }
            _ => 0, // unmapped
        }
    }

    pub fn cpu_write(&mut self, address: u16, data: u8) {
        if let Some(cartridge) = &self.cartridge {
            if cartridge.borrow_mut().cpu_write(address, data) {
                return;
            }
        }

        match address {
            RAM_START..=RAM_END => {
                self.ram[(address & RAM_MASK) as usize] = data;
            }
            PPU_REGISTERS_START..=PPU_REGISTERS_END => {
                if let Some(ppu) = &self.ppu {
                    ppu.borrow_mut()
                        .cpu_write(address & PPU_REGISTER_MASK, data);
                }
            }
            OAMDMA => {
                debug!("OAM DMA starts for page ${data:0>2X}");
                if let Some(dma) = &self.dma {
                    dma.borrow_mut().start_transfer(data);
                }
            }
            CONTROLLER_PORT_1 | CONTROLLER_PORT_2 => {
                // Strobe: snapshot the live state into the shift register
                let idx = (address & 0x0001) as usize;
                self.controller_state[idx] = self.controllers[idx];
            }
            _ => {} // unmapped
        }
    }

    // Host-facing controller state. Two controllers only; other indices
    // are programmer errors.

    pub fn controller_state(&self, controller_idx: usize) -> u8 {
        assert!(controller_idx < NUM_CONTROLLERS);
        self.controllers[controller_idx]
    }

    pub fn clear_controller_state(&mut self, controller_idx: usize) {
        assert!(controller_idx < NUM_CONTROLLERS);
        self.controllers[controller_idx] = 0x00;
    }

    /// OR `data` into the controller's accumulated input byte
    pub fn write_controller_state(&mut self, controller_idx: usize, data: u8) {
        assert!(controller_idx < NUM_CONTROLLERS);
        self.controllers[controller_idx] |= data;
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBus for Bus {
    fn read(&mut self, address: u16) -> u8 {
        self.cpu_read(address, false)
    }

    fn read_only(&mut self, address: u16) -> u8 {
        self.cpu_read(address, true)
    }

    fn write(&mut self, address: u16, data: u8) {
        self.cpu_write(address, data);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::dma::DmaController;
    use crate::graphics::ppu::Ppu;

    #[test]
    fn test_ram_reads_zero_before_any_write() {
        let mut bus = Bus::new();

        for address in (RAM_START..=RAM_END).step_by(0x101) {
            assert_eq!(bus.cpu_read(address, false), 0);
        }
    }

    #[test]
    fn test_ram_mirroring() {
        let mut bus = Bus::new();

        bus.cpu_write(0x0000, 0xAB);
        assert_eq!(bus.cpu_read(0x0000, false), 0xAB);
        assert_eq!(bus.cpu_read(0x0800, false), 0xAB);
        assert_eq!(bus.cpu_read(0x1000, false), 0xAB);
        assert_eq!(bus.cpu_read(0x1800, false), 0xAB);

        bus.cpu_write(0x1FFF, 0xCD);
        assert_eq!(bus.cpu_read(0x07FF, false), 0xCD);
    }

    #[test]
    fn test_unmapped_reads_yield_zero() {
        let mut bus = Bus::new();

        bus.cpu_write(0x4000, 0xFF);
        assert_eq!(bus.cpu_read(0x4000, false), 0);
        assert_eq!(bus.cpu_read(0x5123, false), 0);
    }

    #[test]
    fn test_ppu_register_window_is_mirrored() {
        let mut bus = Bus::new();
        bus.set_ppu(Rc::new(RefCell::new(Ppu::new())));

        // OAMADDR via a mirror, OAMDATA via another mirror
        bus.cpu_write(0x200B, 0x05); // $2003
        bus.cpu_write(0x3FFC, 0x42); // $2004
        assert_eq!(bus.cpu_read(0x2004, false), 0x42);
    }

    #[test]
    fn test_oamdma_write_triggers_transfer() {
        let mut bus = Bus::new();
        let dma = Rc::new(RefCell::new(DmaController::new()));
        bus.set_dma(Rc::clone(&dma));

        assert!(!dma.borrow().is_transfer_in_progress());
        bus.cpu_write(OAMDMA, 0x02);
        assert!(dma.borrow().is_transfer_in_progress());
    }

    #[test]
    fn test_controller_latch_and_serial_read() {
        let mut bus = Bus::new();
        bus.write_controller_state(0, 0b1010_0000);
        bus.write_controller_state(0, 0b0000_0001); // accumulates

        // strobe latches the accumulated state
        bus.cpu_write(CONTROLLER_PORT_1, 1);

        let bits: Vec<u8> = (0..8).map(|_| bus.cpu_read(CONTROLLER_PORT_1, false)).collect();
        assert_eq!(bits, vec![1, 0, 1, 0, 0, 0, 0, 1]);

        // drained register reads zero
        assert_eq!(bus.cpu_read(CONTROLLER_PORT_1, false), 0);
    }

    #[test]
    fn test_controller_clear() {
        let mut bus = Bus::new();
        bus.write_controller_state(1, 0xFF);
        assert_eq!(bus.controller_state(1), 0xFF);

        bus.clear_controller_state(1);
        assert_eq!(bus.controller_state(1), 0x00);
    }

    #[test]
    #[should_panic]
    fn test_controller_index_out_of_range() {
        let bus = Bus::new();
        bus.controller_state(2);
    }
}
