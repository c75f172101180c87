//! Nintendo Entertainment System (NES) console abstraction.
//!
//! The [`Nes`] owns the four core components (CPU, PPU, DMA engine and
//! main bus) plus the inserted cartridge, and drives them from a single
//! master clock. The PPU ticks on every master clock; the CPU (or the
//! DMA engine, when a transfer is running) ticks on every third one.
//! NMIs raised by the PPU are serviced between those two phases and the
//! next master tick.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use log::debug;

use crate::cartridge::Cartridge;
use crate::controller::ControllerButtons;
use crate::dma::DmaController;
use crate::graphics::ppu::Ppu;
use crate::graphics::Frame;
use crate::metrics::{Collector, Metrics};
use crate::processor::bus::Bus;
use crate::processor::cpu::Cpu;
use crate::types::{SharedBus, SharedDma, SharedPpu};

pub struct Nes {
    bus: SharedBus,
    cpu: Cpu,
    ppu: SharedPpu,
    dma: SharedDma,

    cartridge_loaded: bool,
    system_clock_counter: u64,
    metrics: Collector,
}

impl Nes {
    pub fn new() -> Self {
        let bus = Rc::new(RefCell::new(Bus::new()));
        let ppu = Rc::new(RefCell::new(Ppu::new()));
        let dma = Rc::new(RefCell::new(DmaController::new()));

        bus.borrow_mut().set_ppu(Rc::clone(&ppu));
        bus.borrow_mut().set_dma(Rc::clone(&dma));

        let cpu = Cpu::new(Rc::clone(&bus) as _);

        Self {
            bus,
            cpu,
            ppu,
            dma,
            cartridge_loaded: false,
            system_clock_counter: 0,
            metrics: Collector::new(),
        }
    }

    /// Connect a cartridge to both buses and reset the console
    pub fn insert_cartridge(&mut self, cartridge: Cartridge) {
        debug!("Inserting cartridge: {cartridge}");
        let cartridge = Rc::new(RefCell::new(cartridge));

        self.bus.borrow_mut().set_cartridge(Rc::clone(&cartridge));
        self.ppu.borrow_mut().connect_cartridge(cartridge);
        self.cartridge_loaded = true;

        self.reset();
    }

    pub fn is_cartridge_loaded(&self) -> bool {
        self.cartridge_loaded
    }

    pub fn reset(&mut self) {
        if !self.cartridge_loaded {
            return;
        }
        self.cpu.reset();
        self.dma.borrow_mut().reset();
        self.system_clock_counter = 0;
    }

    pub fn system_clock_counter(&self) -> u64 {
        self.system_clock_counter
    }

    /// Advance the console by one master tick.
    ///
    /// Phase order matters and is observable: the PPU first, then every
    /// third tick either the DMA engine (which steals the CPU's slot
    /// while a transfer runs) or the CPU, and finally the NMI latch is
    /// sampled so an interrupt never lands mid-instruction.
    pub fn clock(&mut self) {
        self.ppu.borrow_mut().clock();

        if self.system_clock_counter % 3 == 0 {
            let dma_in_progress = self.dma.borrow().is_transfer_in_progress();
            if dma_in_progress {
                self.dma.borrow_mut().oam_dma_transfer(
                    self.system_clock_counter,
                    &self.bus,
                    &self.ppu,
                );
            } else {
                self.cpu.clock();
            }
        }

        let nmi_requested = self.ppu.borrow_mut().needs_to_do_nmi();
        if nmi_requested {
            self.cpu.non_maskable_interrupt();
        }

        self.system_clock_counter += 1;
    }

    /// Run master ticks until the PPU completes the current frame, then
    /// drain the in-flight CPU instruction
    pub fn do_frame(&mut self) {
        if !self.cartridge_loaded {
            return;
        }

        let clock_at_frame_start = self.system_clock_counter;
        while !self.ppu.borrow().is_frame_completed() {
            self.clock();
        }

        while !self.cpu.is_instruction_complete() {
            self.cpu.clock();
        }

        self.ppu.borrow_mut().start_new_frame();

        self.metrics
            .observe_system_clocks(self.system_clock_counter - clock_at_frame_start);
        self.metrics.observe_frame_ready();
    }

    /// Emulation rates observed since the last collection
    pub fn collect_metrics(&mut self) -> Metrics {
        self.metrics.collect()
    }

    pub fn is_frame_completed(&self) -> bool {
        self.ppu.borrow().is_frame_completed()
    }

    /// The last rendered 256x240 ARGB frame
    pub fn frame(&self) -> Ref<'_, Frame> {
        Ref::map(self.ppu.borrow(), |ppu| ppu.frame())
    }

    // Controller state. The host ORs buttons in as they are pressed and
    // clears between polls; games latch and serially read the state
    // through $4016/$4017.

    pub fn controller(&self, controller_idx: usize) -> ControllerButtons {
        ControllerButtons::from_bits_truncate(
            self.bus.borrow().controller_state(controller_idx),
        )
    }

    pub fn write_controller(&mut self, controller_idx: usize, buttons: ControllerButtons) {
        self.bus
            .borrow_mut()
            .write_controller_state(controller_idx, buttons.bits());
    }

    pub fn clear_controller(&mut self, controller_idx: usize) {
        self.bus.borrow_mut().clear_controller_state(controller_idx);
    }
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::OAMDMA;

    // Build an iNES image with one 16 kB PRG bank (mirrored at $8000 and
    // $C000) and one CHR bank. `program` lands at $8000, the reset
    // vector points to it, and the NMI vector points to $9000.
    fn test_cartridge(program: &[u8]) -> Cartridge {
        let mut prg = vec![0; 16 * 1024];
        prg[..program.len()].copy_from_slice(program);
        prg[0x3FFC] = 0x00; // reset vector = $8000
        prg[0x3FFD] = 0x80;
        prg[0x3FFA] = 0x00; // NMI vector = $9000
        prg[0x3FFB] = 0x90;

        let mut image = Vec::new();
        image.extend_from_slice(&[0x4E, 0x45, 0x53, 0x1A, 1, 1]);
        image.extend_from_slice(&[0; 10]);
        image.extend_from_slice(&prg);
        image.extend_from_slice(&vec![0; 8 * 1024]);

        Cartridge::from_bytes(&image).unwrap()
    }

    fn test_nes(program: &[u8]) -> Nes {
        let mut nes = Nes::new();
        nes.insert_cartridge(test_cartridge(program));
        nes
    }

    // The CPU spends 8 cycles on reset before fetching the first opcode
    fn drain_reset(nes: &mut Nes) {
        for _ in 0..8 * 3 {
            nes.clock();
        }
    }

    #[test]
    fn test_reset_state() {
        let nes = test_nes(&[0xEA]);

        assert_eq!(nes.cpu.acc, 0);
        assert_eq!(nes.cpu.x_reg, 0);
        assert_eq!(nes.cpu.y_reg, 0);
        assert_eq!(nes.cpu.sp, 0xFD);
        assert_eq!(u8::from(nes.cpu.sr), 0x20);
        assert_eq!(nes.cpu.pc, 0x8000);
        assert!(!nes.cpu.is_instruction_complete());
        assert_eq!(nes.system_clock_counter(), 0);
    }

    #[test]
    fn test_cpu_runs_every_third_master_tick() {
        // LDA #$42
        let mut nes = test_nes(&[0xA9, 0x42]);
        drain_reset(&mut nes);

        // the next master tick is a CPU slot: the whole instruction
        // executes at its fetch tick
        assert_eq!(nes.cpu.acc, 0x00);
        nes.clock();
        assert_eq!(nes.cpu.acc, 0x42);

        // the remaining cycle drains on the following CPU slot, three
        // master ticks later
        assert!(!nes.cpu.is_instruction_complete());
        for _ in 0..3 {
            nes.clock();
        }
        assert!(nes.cpu.is_instruction_complete());
    }

    #[test]
    fn test_do_frame_completes_and_rearms() {
        let mut nes = test_nes(&[0x4C, 0x03, 0x80, 0x4C, 0x00, 0x80]); // jmp ping-pong
        nes.do_frame();

        assert!(!nes.is_frame_completed());
        assert!(nes.cpu.is_instruction_complete());
        // scanlines 0..=260 of the first frame, one master tick each cycle
        assert!(nes.system_clock_counter() >= 341 * 261);
    }

    #[test]
    fn test_dma_transfer_alignment_and_contents() {
        let mut nes = test_nes(&[0x4C, 0x00, 0x80]); // jmp $8000
        drain_reset(&mut nes);

        for i in 0..=255u16 {
            nes.bus.borrow_mut().cpu_write(0x0200 + i, (255 - i) as u8);
        }

        // trigger the transfer from the bus, like a STA $4014 would
        let pc_before = nes.cpu.pc;
        nes.bus.borrow_mut().cpu_write(OAMDMA, 0x02);

        let mut cpu_slots = 0;
        while nes.dma.borrow().is_transfer_in_progress() {
            let slot = nes.system_clock_counter() % 3 == 0;
            nes.clock();
            cpu_slots += slot as u64;
        }

        assert!(cpu_slots == 513 || cpu_slots == 514);
        for i in 0..=255u8 {
            assert_eq!(nes.ppu.borrow().oam_read(i), 255 - i);
        }
        // the CPU was suspended for the whole transfer
        assert_eq!(nes.cpu.pc, pc_before);
    }

    #[test]
    fn test_vblank_nmi_sequence() {
        let mut nes = test_nes(&[0x4C, 0x00, 0x80]); // jmp $8000
        drain_reset(&mut nes);

        // enable NMI generation
        nes.bus.borrow_mut().cpu_write(0x2000, 0x80);
        let sp_before = nes.cpu.sp;

        // run up to the tick processing scanline 241, cycle 1: the
        // same master tick services the interrupt
        while nes.cpu.pc < 0x9000 {
            nes.clock();
            assert!(
                nes.system_clock_counter() < 341 * 262,
                "NMI did not fire within one frame"
            );
        }

        assert_eq!(nes.cpu.pc, 0x9000);
        // PC high, PC low and status were pushed
        assert_eq!(nes.cpu.sp, sp_before.wrapping_sub(3));
        assert!(!nes.cpu.is_instruction_complete());
    }

    #[test]
    fn test_ppu_advances_exactly_one_cycle_per_tick() {
        let mut nes = test_nes(&[0x4C, 0x00, 0x80]);

        for ticks in 1..=1000u64 {
            nes.clock();
            assert_eq!(nes.system_clock_counter(), ticks);
        }
        // 1000 PPU cycles = 2 full scanlines plus 318 cycles
        let ppu = nes.ppu.borrow();
        assert_eq!(ppu.current_scanline(), 2);
        assert_eq!(ppu.current_cycle(), 318);
    }

    #[test]
    fn test_do_frame_feeds_the_metrics_collector() {
        let mut nes = test_nes(&[0x4C, 0x00, 0x80]);
        nes.do_frame();

        let metrics = nes.collect_metrics();
        assert!(metrics.master_clock_hz > 0);
        assert!(metrics.frames_per_second > 0);

        // the window was restarted
        let metrics = nes.collect_metrics();
        assert_eq!(metrics.frames_per_second, 0);
    }

    #[test]
    fn test_controller_facade() {
        let mut nes = test_nes(&[0xEA]);

        nes.write_controller(0, ControllerButtons::A | ControllerButtons::START);
        nes.write_controller(0, ControllerButtons::LEFT);
        assert_eq!(
            nes.controller(0),
            ControllerButtons::A | ControllerButtons::START | ControllerButtons::LEFT
        );

        nes.clear_controller(0);
        assert!(nes.controller(0).is_empty());
    }

    #[test]
    fn test_reset_without_cartridge_is_a_no_op() {
        let mut nes = Nes::new();
        nes.reset();
        nes.do_frame();

        assert!(!nes.is_cartridge_loaded());
        assert_eq!(nes.system_clock_counter(), 0);
    }
}
