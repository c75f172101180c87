use log::debug;

use crate::hardware::{NMI_VECTOR, RESET_VECTOR, STACK_BASE};
use crate::processor::instruction::{AddressingMode, Instruction, InstructionKind, Opcode};
use crate::processor::instruction_set::legal_opcode_set;
use crate::processor::status_register::{StatusRegister, StatusRegisterFlag};
use crate::types::SharedCpuBus;

use StatusRegisterFlag::*;

/// MOS 6502 processor emulator.
///
/// The CPU is connected to a main bus to perform read and write
/// operations on it.
///
/// Execution is cycle counted: `clock` fetches and executes a whole
/// instruction when the previous one has exhausted its cycles, then burns
/// the remaining ticks doing nothing. Timing-sensitive peripherals
/// observe memory traffic at the fetch tick, which is accurate enough for
/// the rest of the console.
///
/// This implementation covers the legal opcode instruction set. Illegal
/// opcodes execute as no-ops without consuming cycles.
pub struct Cpu {
    pub(crate) acc: u8,   // Accumulator
    pub(crate) x_reg: u8, // X register
    pub(crate) y_reg: u8, // Y register
    pub(crate) sp: u8,    // Stack Pointer
    pub(crate) pc: u16,   // Program Counter
    pub(crate) sr: StatusRegister,

    // Per-instruction decode state
    opcode: Opcode,
    cycles: u8,
    pub(crate) addr_absolute: u16,
    pub(crate) addr_relative: u16,

    // Whether the addressing mode walked into a different page. Combined
    // with the instruction's own page-cross sensitivity this charges one
    // extra cycle.
    page_boundary_crossed: bool,

    bus: SharedCpuBus,
}

impl Cpu {
    /// Create a new CPU and connect it to the main bus
    pub fn new(bus: SharedCpuBus) -> Self {
        Self {
            acc: 0,
            x_reg: 0,
            y_reg: 0,
            sp: 0,
            pc: 0,
            sr: StatusRegister::new(),
            opcode: 0,
            cycles: 0,
            addr_absolute: 0,
            addr_relative: 0,
            page_boundary_crossed: false,
            bus,
        }
    }

    /// Put the CPU in its power-up state and load the program counter
    /// from the reset vector
    pub fn reset(&mut self) {
        self.acc = 0;
        self.x_reg = 0;
        self.y_reg = 0;
        self.sr.reset();

        self.pc = self.read_u16(RESET_VECTOR);
        self.sp = 0xFD;

        self.cycles = 8;
    }

    /// Advance the CPU by one cycle. A new instruction is fetched and
    /// executed when the previous one has finished.
    pub fn clock(&mut self) {
        if self.cycles == 0 {
            self.opcode = self.read_from_pc();

            self.sr.set(Unused);

            match legal_opcode_set().lookup(self.opcode) {
                Some(instruction) => {
                    self.cycles = instruction.cycles;
                    self.page_boundary_crossed = false;

                    self.resolve_addressing(instruction.addressing_mode);
                    self.execute(instruction);

                    if self.page_boundary_crossed && instruction.page_cross_penalty {
                        self.cycles += 1;
                    }
                }
                None => {
                    debug!("Illegal opcode ${:0>2X}, skipping", self.opcode);
                }
            }

            self.sr.set(Unused);
        }

        // illegal opcodes charge no cycles, don't let the counter wrap
        self.cycles = self.cycles.saturating_sub(1);
    }

    /// True exactly when the next `clock` call will fetch a new
    /// instruction
    pub fn is_instruction_complete(&self) -> bool {
        self.cycles == 0
    }

    /// Non-maskable interrupt: stash PC and status and jump through the
    /// NMI vector. Fired by the PPU at the start of vertical blank.
    pub fn non_maskable_interrupt(&mut self) {
        self.push((self.pc >> 8) as u8);
        self.push(self.pc as u8);

        self.sr.clear(Break);
        self.sr.set(Unused);
        self.sr.set(InterruptDisable);
        self.push(self.sr.into());

        self.pc = self.read_u16(NMI_VECTOR);

        self.cycles = 8;
    }

    // Bus access

    pub(crate) fn read(&mut self, address: u16) -> u8 {
        self.bus.borrow_mut().read(address)
    }

    pub(crate) fn read_u16(&mut self, address: u16) -> u16 {
        let lo = self.read(address) as u16;
        let hi = self.read(address.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn write(&mut self, address: u16, data: u8) {
        self.bus.borrow_mut().write(address, data);
    }

    fn read_from_pc(&mut self) -> u8 {
        let data = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        data
    }

    fn read_u16_from_pc(&mut self) -> u16 {
        let lo = self.read_from_pc() as u16;
        let hi = self.read_from_pc() as u16;
        (hi << 8) | lo
    }

    // Stack discipline: pushes write to $0100 + SP then decrement,
    // pulls increment then read. SP wraps modulo 256.

    pub(crate) fn push(&mut self, data: u8) {
        self.write(STACK_BASE + self.sp as u16, data);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pull(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        self.read(STACK_BASE + self.sp as u16)
    }

    // Addressing modes. Each resolves into `addr_absolute` or
    // `addr_relative` and may flag a page boundary crossing.

    fn resolve_addressing(&mut self, mode: AddressingMode) {
        match mode {
            AddressingMode::Implied | AddressingMode::Accumulator => {}
            AddressingMode::Immediate => {
                self.addr_absolute = self.pc;
                self.pc = self.pc.wrapping_add(1);
            }
            AddressingMode::ZeroPage => {
                self.addr_absolute = (self.read_from_pc() as u16) & 0x00FF;
            }
            AddressingMode::ZeroPageX => {
                self.addr_absolute =
                    (self.read_from_pc() as u16 + self.x_reg as u16) & 0x00FF;
            }
            AddressingMode::ZeroPageY => {
                self.addr_absolute =
                    (self.read_from_pc() as u16 + self.y_reg as u16) & 0x00FF;
            }
            AddressingMode::Absolute => {
                self.addr_absolute = self.read_u16_from_pc();
            }
            AddressingMode::AbsoluteX => {
                let base = self.read_u16_from_pc();
                self.addr_absolute = base.wrapping_add(self.x_reg as u16);
                self.page_boundary_crossed =
                    (self.addr_absolute & 0xFF00) != (base & 0xFF00);
            }
            AddressingMode::AbsoluteY => {
                let base = self.read_u16_from_pc();
                self.addr_absolute = base.wrapping_add(self.y_reg as u16);
                self.page_boundary_crossed =
                    (self.addr_absolute & 0xFF00) != (base & 0xFF00);
            }
            AddressingMode::Indirect => {
                let pointer = self.read_u16_from_pc();

                // Simulate the page boundary hardware bug: when the
                // pointer sits at the end of a page, its high byte comes
                // from the start of the same page
                let hi_address = if pointer & 0x00FF == 0x00FF {
                    pointer & 0xFF00
                } else {
                    pointer.wrapping_add(1)
                };
                let lo = self.read(pointer) as u16;
                let hi = self.read(hi_address) as u16;
                self.addr_absolute = (hi << 8) | lo;
            }
            AddressingMode::IndirectX => {
                let base = self.read_from_pc() as u16;
                let lo = self.read((base + self.x_reg as u16) & 0x00FF) as u16;
                let hi = self.read((base + self.x_reg as u16 + 1) & 0x00FF) as u16;
                self.addr_absolute = (hi << 8) | lo;
            }
            AddressingMode::IndirectY => {
                let base = self.read_from_pc() as u16;
                let lo = self.read(base & 0x00FF) as u16;
                let hi = self.read((base + 1) & 0x00FF) as u16;

                self.addr_absolute = ((hi << 8) | lo).wrapping_add(self.y_reg as u16);
                self.page_boundary_crossed = (self.addr_absolute & 0xFF00) != (hi << 8);
            }
            AddressingMode::Relative => {
                // sign-extend the 8-bit offset
                self.addr_relative = self.read_from_pc() as i8 as i16 as u16;
            }
        }
    }

    fn execute(&mut self, instruction: &Instruction) {
        match instruction.instruction {
            InstructionKind::SingleByte(operation) => operation(self),
            InstructionKind::OnOperand(operation) => {
                let operand = self.read(self.addr_absolute);
                operation(self, operand);
            }
            InstructionKind::Store(operation) => {
                let data = operation(self);
                self.write(self.addr_absolute, data);
            }
            InstructionKind::Modify(operation) => {
                let operand = self.read(self.addr_absolute);
                let result = operation(self, operand);
                self.write(self.addr_absolute, result);
            }
            InstructionKind::Branch(condition) => {
                if condition(self) {
                    self.take_branch();
                }
            }
            InstructionKind::Jump(operation) => operation(self, self.addr_absolute),
        }
    }

    // A taken branch costs one extra cycle, two when the target sits in
    // a different page than the instruction following the branch
    fn take_branch(&mut self) {
        self.cycles += 1;

        let target = self.pc.wrapping_add(self.addr_relative);
        if (target & 0xFF00) != (self.pc & 0xFF00) {
            self.cycles += 1;
        }
        self.pc = target;
    }
}
