use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::hardware::IRQ_VECTOR;
use crate::processor::cpu::Cpu;
use crate::processor::instruction::{AddressingMode, Instruction, InstructionKind, Opcode};
use crate::processor::status_register::{StatusRegister, StatusRegisterFlag};
use crate::utils;

use AddressingMode::*;
use InstructionKind::*;
use StatusRegisterFlag::*;

/// The legal MOS 6502 instruction set, keyed by opcode.
///
/// Opcodes outside this set are illegal and handled by the CPU as silent
/// no-ops.
pub struct InstructionSet {
    instruction_set: HashMap<Opcode, Instruction>,
}

static LEGAL_OPCODES: Lazy<InstructionSet> = Lazy::new(InstructionSet::new_legal_opcode_set);

pub fn legal_opcode_set() -> &'static InstructionSet {
    &LEGAL_OPCODES
}

// Entries marked `+1` charge one extra cycle when the addressing mode
// crosses a page boundary
macro_rules! instruction {
    ($set:expr, $opcode:literal, $name:literal, $kind:expr, $mode:expr, $cycles:literal) => {
        $set.insert(
            $opcode as Opcode,
            Instruction {
                name: $name,
                instruction: $kind,
                addressing_mode: $mode,
                cycles: $cycles,
                page_cross_penalty: false,
            },
        );
    };
    ($set:expr, $opcode:literal, $name:literal, $kind:expr, $mode:expr, $cycles:literal, +1) => {
        $set.insert(
            $opcode as Opcode,
            Instruction {
                name: $name,
                instruction: $kind,
                addressing_mode: $mode,
                cycles: $cycles,
                page_cross_penalty: true,
            },
        );
    };
}

impl InstructionSet {
    pub fn lookup(&self, opcode: Opcode) -> Option<&Instruction> {
        self.instruction_set.get(&opcode)
    }

    pub fn len(&self) -> usize {
        self.instruction_set.len()
    }

    pub fn new_legal_opcode_set() -> Self {
        let mut set = HashMap::new();

        // Transfer instructions
        instruction!(set, 0xA9, "LDA", OnOperand(lda), Immediate, 2, +1);
        instruction!(set, 0xA5, "LDA", OnOperand(lda), ZeroPage, 3, +1);
        instruction!(set, 0xB5, "LDA", OnOperand(lda), ZeroPageX, 4, +1);
        instruction!(set, 0xAD, "LDA", OnOperand(lda), Absolute, 4, +1);
        instruction!(set, 0xBD, "LDA", OnOperand(lda), AbsoluteX, 4, +1);
        instruction!(set, 0xB9, "LDA", OnOperand(lda), AbsoluteY, 4, +1);
        instruction!(set, 0xA1, "LDA", OnOperand(lda), IndirectX, 6, +1);
        instruction!(set, 0xB1, "LDA", OnOperand(lda), IndirectY, 5, +1);

        instruction!(set, 0xA2, "LDX", OnOperand(ldx), Immediate, 2, +1);
        instruction!(set, 0xA6, "LDX", OnOperand(ldx), ZeroPage, 3, +1);
        instruction!(set, 0xB6, "LDX", OnOperand(ldx), ZeroPageY, 4, +1);
        instruction!(set, 0xAE, "LDX", OnOperand(ldx), Absolute, 4, +1);
        instruction!(set, 0xBE, "LDX", OnOperand(ldx), AbsoluteY, 4, +1);

        instruction!(set, 0xA0, "LDY", OnOperand(ldy), Immediate, 2, +1);
        instruction!(set, 0xA4, "LDY", OnOperand(ldy), ZeroPage, 3, +1);
        instruction!(set, 0xB4, "LDY", OnOperand(ldy), ZeroPageX, 4, +1);
        instruction!(set, 0xAC, "LDY", OnOperand(ldy), Absolute, 4, +1);
        instruction!(set, 0xBC, "LDY", OnOperand(ldy), AbsoluteX, 4, +1);

        instruction!(set, 0x85, "STA", Store(sta), ZeroPage, 3);
        instruction!(set, 0x95, "STA", Store(sta), ZeroPageX, 4);
        instruction!(set, 0x8D, "STA", Store(sta), Absolute, 4);
        instruction!(set, 0x9D, "STA", Store(sta), AbsoluteX, 5);
        instruction!(set, 0x99, "STA", Store(sta), AbsoluteY, 5);
        instruction!(set, 0x81, "STA", Store(sta), IndirectX, 6);
        instruction!(set, 0x91, "STA", Store(sta), IndirectY, 6);

        instruction!(set, 0x86, "STX", Store(stx), ZeroPage, 3);
        instruction!(set, 0x96, "STX", Store(stx), ZeroPageY, 4);
        instruction!(set, 0x8E, "STX", Store(stx), Absolute, 4);

        instruction!(set, 0x84, "STY", Store(sty), ZeroPage, 3);
        instruction!(set, 0x94, "STY", Store(sty), ZeroPageX, 4);
        instruction!(set, 0x8C, "STY", Store(sty), Absolute, 4);

        instruction!(set, 0xAA, "TAX", SingleByte(tax), Implied, 2);
        instruction!(set, 0xA8, "TAY", SingleByte(tay), Implied, 2);
        instruction!(set, 0xBA, "TSX", SingleByte(tsx), Implied, 2);
        instruction!(set, 0x8A, "TXA", SingleByte(txa), Implied, 2);
        instruction!(set, 0x9A, "TXS", SingleByte(txs), Implied, 2);
        instruction!(set, 0x98, "TYA", SingleByte(tya), Implied, 2);

        // Stack instructions
        instruction!(set, 0x48, "PHA", SingleByte(pha), Implied, 3);
        instruction!(set, 0x08, "PHP", SingleByte(php), Implied, 3);
        instruction!(set, 0x68, "PLA", SingleByte(pla), Implied, 4);
        instruction!(set, 0x28, "PLP", SingleByte(plp), Implied, 4);

        // Decrements and increments
        instruction!(set, 0xC6, "DEC", Modify(dec), ZeroPage, 5);
        instruction!(set, 0xD6, "DEC", Modify(dec), ZeroPageX, 6);
        instruction!(set, 0xCE, "DEC", Modify(dec), Absolute, 6);
        instruction!(set, 0xDE, "DEC", Modify(dec), AbsoluteX, 7);

        instruction!(set, 0xCA, "DEX", SingleByte(dex), Implied, 2);
        instruction!(set, 0x88, "DEY", SingleByte(dey), Implied, 2);

        instruction!(set, 0xE6, "INC", Modify(inc), ZeroPage, 5);
        instruction!(set, 0xF6, "INC", Modify(inc), ZeroPageX, 6);
        instruction!(set, 0xEE, "INC", Modify(inc), Absolute, 6);
        instruction!(set, 0xFE, "INC", Modify(inc), AbsoluteX, 7);

        instruction!(set, 0xE8, "INX", SingleByte(inx), Implied, 2);
        instruction!(set, 0xC8, "INY", SingleByte(iny), Implied, 2);

        // Arithmetic operations
        instruction!(set, 0x69, "ADC", OnOperand(adc), Immediate, 2, +1);
        instruction!(set, 0x65, "ADC", OnOperand(adc), ZeroPage, 3, +1);
        instruction!(set, 0x75, "ADC", OnOperand(adc), ZeroPageX, 4, +1);
        instruction!(set, 0x6D, "ADC", OnOperand(adc), Absolute, 4, +1);
        instruction!(set, 0x7D, "ADC", OnOperand(adc), AbsoluteX, 4, +1);
        instruction!(set, 0x79, "ADC", OnOperand(adc), AbsoluteY, 4, +1);
        instruction!(set, 0x61, "ADC", OnOperand(adc), IndirectX, 6, +1);
        instruction!(set, 0x71, "ADC", OnOperand(adc), IndirectY, 5, +1);

        instruction!(set, 0xE9, "SBC", OnOperand(sbc), Immediate, 2, +1);
        instruction!(set, 0xE5, "SBC", OnOperand(sbc), ZeroPage, 3, +1);
        instruction!(set, 0xF5, "SBC", OnOperand(sbc), ZeroPageX, 4, +1);
        instruction!(set, 0xED, "SBC", OnOperand(sbc), Absolute, 4, +1);
        instruction!(set, 0xFD, "SBC", OnOperand(sbc), AbsoluteX, 4, +1);
        instruction!(set, 0xF9, "SBC", OnOperand(sbc), AbsoluteY, 4, +1);
        instruction!(set, 0xE1, "SBC", OnOperand(sbc), IndirectX, 6, +1);
        instruction!(set, 0xF1, "SBC", OnOperand(sbc), IndirectY, 5, +1);

        // Logic operations
        instruction!(set, 0x29, "AND", OnOperand(and), Immediate, 2, +1);
        instruction!(set, 0x25, "AND", OnOperand(and), ZeroPage, 3, +1);
        instruction!(set, 0x35, "AND", OnOperand(and), ZeroPageX, 4, +1);
        instruction!(set, 0x2D, "AND", OnOperand(and), Absolute, 4, +1);
        instruction!(set, 0x3D, "AND", OnOperand(and), AbsoluteX, 4, +1);
        instruction!(set, 0x39, "AND", OnOperand(and), AbsoluteY, 4, +1);
        instruction!(set, 0x21, "AND", OnOperand(and), IndirectX, 6, +1);
        instruction!(set, 0x31, "AND", OnOperand(and), IndirectY, 5, +1);

        instruction!(set, 0x49, "EOR", OnOperand(eor), Immediate, 2, +1);
        instruction!(set, 0x45, "EOR", OnOperand(eor), ZeroPage, 3, +1);
        instruction!(set, 0x55, "EOR", OnOperand(eor), ZeroPageX, 4, +1);
        instruction!(set, 0x4D, "EOR", OnOperand(eor), Absolute, 4, +1);
        instruction!(set, 0x5D, "EOR", OnOperand(eor), AbsoluteX, 4, +1);
        instruction!(set, 0x59, "EOR", OnOperand(eor), AbsoluteY, 4, +1);
        instruction!(set, 0x41, "EOR", OnOperand(eor), IndirectX, 6, +1);
        instruction!(set, 0x51, "EOR", OnOperand(eor), IndirectY, 5, +1);

        instruction!(set, 0x09, "ORA", OnOperand(ora), Immediate, 2, +1);
        instruction!(set, 0x05, "ORA", OnOperand(ora), ZeroPage, 3, +1);
        instruction!(set, 0x15, "ORA", OnOperand(ora), ZeroPageX, 4, +1);
        instruction!(set, 0x0D, "ORA", OnOperand(ora), Absolute, 4, +1);
        instruction!(set, 0x1D, "ORA", OnOperand(ora), AbsoluteX, 4, +1);
        instruction!(set, 0x19, "ORA", OnOperand(ora), AbsoluteY, 4, +1);
        instruction!(set, 0x01, "ORA", OnOperand(ora), IndirectX, 6, +1);
        instruction!(set, 0x11, "ORA", OnOperand(ora), IndirectY, 5, +1);

        // Shift & rotate instructions
        instruction!(set, 0x0A, "ASL", SingleByte(asl_accumulator), Accumulator, 2);
        instruction!(set, 0x06, "ASL", Modify(asl), ZeroPage, 5);
        instruction!(set, 0x16, "ASL", Modify(asl), ZeroPageX, 6);
        instruction!(set, 0x0E, "ASL", Modify(asl), Absolute, 6);
        instruction!(set, 0x1E, "ASL", Modify(asl), AbsoluteX, 7);

        instruction!(set, 0x4A, "LSR", SingleByte(lsr_accumulator), Accumulator, 2);
        instruction!(set, 0x46, "LSR", Modify(lsr), ZeroPage, 5);
        instruction!(set, 0x56, "LSR", Modify(lsr), ZeroPageX, 6);
        instruction!(set, 0x4E, "LSR", Modify(lsr), Absolute, 6);
        instruction!(set, 0x5E, "LSR", Modify(lsr), AbsoluteX, 7);

        instruction!(set, 0x2A, "ROL", SingleByte(rol_accumulator), Accumulator, 2);
        instruction!(set, 0x26, "ROL", Modify(rol), ZeroPage, 5);
        instruction!(set, 0x36, "ROL", Modify(rol), ZeroPageX, 6);
        instruction!(set, 0x2E, "ROL", Modify(rol), Absolute, 6);
        instruction!(set, 0x3E, "ROL", Modify(rol), AbsoluteX, 7);

        instruction!(set, 0x6A, "ROR", SingleByte(ror_accumulator), Accumulator, 2);
        instruction!(set, 0x66, "ROR", Modify(ror), ZeroPage, 5);
        instruction!(set, 0x76, "ROR", Modify(ror), ZeroPageX, 6);
        instruction!(set, 0x6E, "ROR", Modify(ror), Absolute, 6);
        instruction!(set, 0x7E, "ROR", Modify(ror), AbsoluteX, 7);

        // Flag instructions
        instruction!(set, 0x18, "CLC", SingleByte(clc), Implied, 2);
        instruction!(set, 0xD8, "CLD", SingleByte(cld), Implied, 2);
        instruction!(set, 0x58, "CLI", SingleByte(cli), Implied, 2);
        instruction!(set, 0xB8, "CLV", SingleByte(clv), Implied, 2);
        instruction!(set, 0x38, "SEC", SingleByte(sec), Implied, 2);
        instruction!(set, 0xF8, "SED", SingleByte(sed), Implied, 2);
        instruction!(set, 0x78, "SEI", SingleByte(sei), Implied, 2);

        // Comparisons
        instruction!(set, 0xC9, "CMP", OnOperand(cmp), Immediate, 2, +1);
        instruction!(set, 0xC5, "CMP", OnOperand(cmp), ZeroPage, 3, +1);
        instruction!(set, 0xD5, "CMP", OnOperand(cmp), ZeroPageX, 4, +1);
        instruction!(set, 0xCD, "CMP", OnOperand(cmp), Absolute, 4, +1);
        instruction!(set, 0xDD, "CMP", OnOperand(cmp), AbsoluteX, 4, +1);
        instruction!(set, 0xD9, "CMP", OnOperand(cmp), AbsoluteY, 4, +1);
        instruction!(set, 0xC1, "CMP", OnOperand(cmp), IndirectX, 6, +1);
        instruction!(set, 0xD1, "CMP", OnOperand(cmp), IndirectY, 5, +1);

        instruction!(set, 0xE0, "CPX", OnOperand(cpx), Immediate, 2);
        instruction!(set, 0xE4, "CPX", OnOperand(cpx), ZeroPage, 3);
        instruction!(set, 0xEC, "CPX", OnOperand(cpx), Absolute, 4);

        instruction!(set, 0xC0, "CPY", OnOperand(cpy), Immediate, 2);
        instruction!(set, 0xC4, "CPY", OnOperand(cpy), ZeroPage, 3);
        instruction!(set, 0xCC, "CPY", OnOperand(cpy), Absolute, 4);

        // Conditional branches
        instruction!(set, 0x90, "BCC", Branch(bcc), Relative, 2);
        instruction!(set, 0xB0, "BCS", Branch(bcs), Relative, 2);
        instruction!(set, 0xF0, "BEQ", Branch(beq), Relative, 2);
        instruction!(set, 0x30, "BMI", Branch(bmi), Relative, 2);
        instruction!(set, 0xD0, "BNE", Branch(bne), Relative, 2);
        instruction!(set, 0x10, "BPL", Branch(bpl), Relative, 2);
        instruction!(set, 0x50, "BVC", Branch(bvc), Relative, 2);
        instruction!(set, 0x70, "BVS", Branch(bvs), Relative, 2);

        // Jumps, subroutines and interrupts
        instruction!(set, 0x4C, "JMP", Jump(jmp), Absolute, 3);
        instruction!(set, 0x6C, "JMP", Jump(jmp), Indirect, 5);
        instruction!(set, 0x20, "JSR", Jump(jsr), Absolute, 6);
        instruction!(set, 0x60, "RTS", SingleByte(rts), Implied, 6);
        instruction!(set, 0x00, "BRK", SingleByte(brk), Implied, 7);
        instruction!(set, 0x40, "RTI", SingleByte(rti), Implied, 6);

        // Other
        instruction!(set, 0x24, "BIT", OnOperand(bit), ZeroPage, 3);
        instruction!(set, 0x2C, "BIT", OnOperand(bit), Absolute, 4);

        instruction!(set, 0xEA, "NOP", SingleByte(nop), Implied, 2);

        Self {
            instruction_set: set,
        }
    }
}

// Transfer instructions

/// LDA - Load Accumulator with Memory
///
/// Operation:
/// M -> A
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn lda(cpu: &mut Cpu, operand: u8) {
    cpu.acc = operand;
    cpu.sr.auto_set(Negative, cpu.acc);
    cpu.sr.auto_set(Zero, cpu.acc);
}

/// LDX - Load Index X with Memory
///
/// Operation:
/// M -> X
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn ldx(cpu: &mut Cpu, operand: u8) {
    cpu.x_reg = operand;
    cpu.sr.auto_set(Negative, cpu.x_reg);
    cpu.sr.auto_set(Zero, cpu.x_reg);
}

/// LDY - Load Index Y with Memory
///
/// Operation:
/// M -> Y
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn ldy(cpu: &mut Cpu, operand: u8) {
    cpu.y_reg = operand;
    cpu.sr.auto_set(Negative, cpu.y_reg);
    cpu.sr.auto_set(Zero, cpu.y_reg);
}

/// STA - Store Accumulator in Memory
///
/// Operation:
/// A -> M
///
/// Status Register
/// N Z C I D V
/// - - - - - -
pub fn sta(cpu: &mut Cpu) -> u8 {
    cpu.acc
}

/// STX - Store Index X in Memory
///
/// Operation:
/// X -> M
///
/// Status Register
/// N Z C I D V
/// - - - - - -
pub fn stx(cpu: &mut Cpu) -> u8 {
    cpu.x_reg
}

/// STY - Store Index Y in Memory
///
/// Operation:
/// Y -> M
///
/// Status Register
/// N Z C I D V
/// - - - - - -
pub fn sty(cpu: &mut Cpu) -> u8 {
    cpu.y_reg
}

/// TAX - Transfer Accumulator to Index X
///
/// Operation:
/// A -> X
///
/// Status Register:
/// N Z C I D V
/// + + - - - -
pub fn tax(cpu: &mut Cpu) {
    cpu.x_reg = cpu.acc;
    cpu.sr.auto_set(Negative, cpu.x_reg);
    cpu.sr.auto_set(Zero, cpu.x_reg);
}

/// TAY - Transfer Accumulator to Index Y
///
/// Operation:
/// A -> Y
///
/// Status Register:
/// N Z C I D V
/// + + - - - -
pub fn tay(cpu: &mut Cpu) {
    cpu.y_reg = cpu.acc;
    cpu.sr.auto_set(Negative, cpu.y_reg);
    cpu.sr.auto_set(Zero, cpu.y_reg);
}

/// TSX - Transfer Stack Pointer to Index X
///
/// Operation:
/// SP -> X
///
/// Status Register:
/// N Z C I D V
/// + + - - - -
pub fn tsx(cpu: &mut Cpu) {
    cpu.x_reg = cpu.sp;
    cpu.sr.auto_set(Negative, cpu.x_reg);
    cpu.sr.auto_set(Zero, cpu.x_reg);
}

/// TXA - Transfer Index X to Accumulator
///
/// Operation:
/// X -> A
///
/// Status Register:
/// N Z C I D V
/// + + - - - -
pub fn txa(cpu: &mut Cpu) {
    cpu.acc = cpu.x_reg;
    cpu.sr.auto_set(Negative, cpu.acc);
    cpu.sr.auto_set(Zero, cpu.acc);
}

/// TXS - Transfer Index X to Stack Pointer
///
/// Operation:
/// X -> SP
///
/// Status Register:
/// N Z C I D V
/// - - - - - -
pub fn txs(cpu: &mut Cpu) {
    cpu.sp = cpu.x_reg;
}

/// TYA - Transfer Index Y to Accumulator
///
/// Operation:
/// Y -> A
///
/// Status Register:
/// N Z C I D V
/// + + - - - -
pub fn tya(cpu: &mut Cpu) {
    cpu.acc = cpu.y_reg;
    cpu.sr.auto_set(Negative, cpu.acc);
    cpu.sr.auto_set(Zero, cpu.acc);
}

// Stack instructions

/// PHA - Push Accumulator on Stack
///
/// Operation:
/// push A
///
/// Status Register:
/// N Z C I D V
/// - - - - - -
pub fn pha(cpu: &mut Cpu) {
    cpu.push(cpu.acc);
}

/// PHP - Push Processor Status on Stack
///
/// The status register will be pushed with the break flag and bit 5 set
/// to 1.
///
/// Operation:
/// push SR
///
/// Status Register:
/// N Z C I D V
/// - - - - - -
pub fn php(cpu: &mut Cpu) {
    let sr: u8 = cpu.sr.into();
    cpu.push(sr | (1 << Break as u8) | (1 << Unused as u8));
    cpu.sr.clear(Break);
}

/// PLA - Pull Accumulator from Stack
///
/// Operation:
/// pull A
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn pla(cpu: &mut Cpu) {
    cpu.acc = cpu.pull();
    cpu.sr.auto_set(Negative, cpu.acc);
    cpu.sr.auto_set(Zero, cpu.acc);
}

/// PLP - Pull Processor Status from Stack
///
/// The status register will be pulled with bit 5 forced back to 1.
///
/// Operation:
/// pull SR
///
/// Status Register
/// N Z C I D V
/// from stack
pub fn plp(cpu: &mut Cpu) {
    cpu.sr = StatusRegister::from(cpu.pull());
    cpu.sr.set(Unused);
}

// Decrements and increments

/// DEC - Decrement Memory by One
///
/// Operation:
/// M - 1 -> M
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn dec(cpu: &mut Cpu, operand: u8) -> u8 {
    let res = operand.wrapping_sub(1);
    cpu.sr.auto_set(Negative, res);
    cpu.sr.auto_set(Zero, res);
    res
}

/// DEX - Decrement Index X by One
///
/// Operation:
/// X - 1 -> X
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn dex(cpu: &mut Cpu) {
    cpu.x_reg = cpu.x_reg.wrapping_sub(1);
    cpu.sr.auto_set(Negative, cpu.x_reg);
    cpu.sr.auto_set(Zero, cpu.x_reg);
}

/// DEY - Decrement Index Y by One
///
/// Operation:
/// Y - 1 -> Y
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn dey(cpu: &mut Cpu) {
    cpu.y_reg = cpu.y_reg.wrapping_sub(1);
    cpu.sr.auto_set(Negative, cpu.y_reg);
    cpu.sr.auto_set(Zero, cpu.y_reg);
}

/// INC - Increment Memory by One
///
/// Operation:
/// M + 1 -> M
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn inc(cpu: &mut Cpu, operand: u8) -> u8 {
    let res = operand.wrapping_add(1);
    cpu.sr.auto_set(Negative, res);
    cpu.sr.auto_set(Zero, res);
    res
}

/// INX - Increment Index X by One
///
/// Operation:
/// X + 1 -> X
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn inx(cpu: &mut Cpu) {
    cpu.x_reg = cpu.x_reg.wrapping_add(1);
    cpu.sr.auto_set(Negative, cpu.x_reg);
    cpu.sr.auto_set(Zero, cpu.x_reg);
}

/// INY - Increment Index Y by One
///
/// Operation:
/// Y + 1 -> Y
///
/// Status Register
/// N Z C I D V
/// + + - - - -
pub fn iny(cpu: &mut Cpu) {
    cpu.y_reg = cpu.y_reg.wrapping_add(1);
    cpu.sr.auto_set(Negative, cpu.y_reg);
    cpu.sr.auto_set(Zero, cpu.y_reg);
}

// Arithmetic operations

/// ADC - Add Memory to Accumulator with Carry
///
/// Operation:
/// A + M + C -> A, C
///
/// Status Register:
/// N Z C I D V
/// + + + - - +
pub fn adc(cpu: &mut Cpu, operand: u8) {
    let carry = cpu.sr.get(Carry) as u16;
    let accumulator = cpu.acc as u16;
    let operand = operand as u16;

    let res = accumulator + operand + carry;
    let overflow = (!(accumulator ^ operand) & (accumulator ^ res)) & 0x0080 != 0;

    cpu.acc = res as u8;
    cpu.sr.set_value(Carry, res > 0xFF);
    cpu.sr.auto_set(Zero, cpu.acc);
    cpu.sr.auto_set(Negative, cpu.acc);
    cpu.sr.set_value(Overflow, overflow);
}

/// SBC - Subtract Memory from Accumulator with Borrow
///
/// Implemented as an addition with the operand inverted, which makes the
/// carry act as the borrow.
///
/// Operation:
/// A - M - (1 - C) -> A
///
/// Status Register:
/// N Z C I D V
/// + + + - - +
pub fn sbc(cpu: &mut Cpu, operand: u8) {
    adc(cpu, operand ^ 0xFF);
}

// Logic operations

/// AND - AND Memory with Accumulator
///
/// Operation:
/// A AND M -> A
///
/// Status Register:
/// N Z C I D V
/// + + - - - -
pub fn and(cpu: &mut Cpu, operand: u8) {
    cpu.acc &= operand;
    cpu.sr.auto_set(Negative, cpu.acc);
    cpu.sr.auto_set(Zero, cpu.acc);
}

/// EOR - Exclusive-OR Memory with Accumulator
///
/// Operation:
/// A EOR M -> A
///
/// Status Register:
/// N Z C I D V
/// + + - - - -
pub fn eor(cpu: &mut Cpu, operand: u8) {
    cpu.acc ^= operand;
    cpu.sr.auto_set(Negative, cpu.acc);
    cpu.sr.auto_set(Zero, cpu.acc);
}

/// ORA - OR Memory with Accumulator
///
/// Operation:
/// A OR M -> A
///
/// Status Register:
/// N Z C I D V
/// + + - - - -
pub fn ora(cpu: &mut Cpu, operand: u8) {
    cpu.acc |= operand;
    cpu.sr.auto_set(Negative, cpu.acc);
    cpu.sr.auto_set(Zero, cpu.acc);
}

// Shift & rotate instructions

fn shifted_left(cpu: &mut Cpu, value: u8, carry_in: u8) -> u8 {
    let res = (value << 1) | carry_in;
    cpu.sr.set_value(Carry, utils::bv(value, 7) != 0);
    cpu.sr.auto_set(Negative, res);
    cpu.sr.auto_set(Zero, res);
    res
}

fn shifted_right(cpu: &mut Cpu, value: u8, carry_in: u8) -> u8 {
    let res = (value >> 1) | (carry_in << 7);
    cpu.sr.set_value(Carry, utils::bv(value, 0) != 0);
    cpu.sr.auto_set(Negative, res);
    cpu.sr.auto_set(Zero, res);
    res
}

/// ASL - Shift Left One Bit (Memory or Accumulator)
///
/// Operation:
/// C <- [76543210] <- 0
///
/// Status Register:
/// N Z C I D V
/// + + + - - -
pub fn asl(cpu: &mut Cpu, operand: u8) -> u8 {
    shifted_left(cpu, operand, 0)
}

pub fn asl_accumulator(cpu: &mut Cpu) {
    let value = cpu.acc;
    cpu.acc = shifted_left(cpu, value, 0);
}

/// LSR - Shift One Bit Right (Memory or Accumulator)
///
/// Operation:
/// 0 -> [76543210] -> C
///
/// Status Register:
/// N Z C I D V
/// 0 + + - - -
pub fn lsr(cpu: &mut Cpu, operand: u8) -> u8 {
    shifted_right(cpu, operand, 0)
}

pub fn lsr_accumulator(cpu: &mut Cpu) {
    let value = cpu.acc;
    cpu.acc = shifted_right(cpu, value, 0);
}

/// ROL - Rotate One Bit Left (Memory or Accumulator)
///
/// Operation:
/// C <- [76543210] <- C
///
/// Status Register:
/// N Z C I D V
/// + + + - - -
pub fn rol(cpu: &mut Cpu, operand: u8) -> u8 {
    let carry = cpu.sr.get(Carry) as u8;
    shifted_left(cpu, operand, carry)
}

pub fn rol_accumulator(cpu: &mut Cpu) {
    let carry = cpu.sr.get(Carry) as u8;
    let value = cpu.acc;
    cpu.acc = shifted_left(cpu, value, carry);
}

/// ROR - Rotate One Bit Right (Memory or Accumulator)
///
/// Operation:
/// C -> [76543210] -> C
///
/// Status Register:
/// N Z C I D V
/// + + + - - -
pub fn ror(cpu: &mut Cpu, operand: u8) -> u8 {
    let carry = cpu.sr.get(Carry) as u8;
    shifted_right(cpu, operand, carry)
}

pub fn ror_accumulator(cpu: &mut Cpu) {
    let carry = cpu.sr.get(Carry) as u8;
    let value = cpu.acc;
    cpu.acc = shifted_right(cpu, value, carry);
}

// Flag instructions

/// CLC - Clear Carry Flag
///
/// Operation:
/// 0 -> C
pub fn clc(cpu: &mut Cpu) {
    cpu.sr.clear(Carry);
}

/// CLD - Clear Decimal Mode
///
/// Operation:
/// 0 -> D
pub fn cld(cpu: &mut Cpu) {
    cpu.sr.clear(Decimal);
}

/// CLI - Clear Interrupt Disable Bit
///
/// Operation:
/// 0 -> I
pub fn cli(cpu: &mut Cpu) {
    cpu.sr.clear(InterruptDisable);
}

/// CLV - Clear Overflow Flag
///
/// Operation:
/// 0 -> V
pub fn clv(cpu: &mut Cpu) {
    cpu.sr.clear(Overflow);
}

/// SEC - Set Carry Flag
///
/// Operation:
/// 1 -> C
pub fn sec(cpu: &mut Cpu) {
    cpu.sr.set(Carry);
}

/// SED - Set Decimal Flag
///
/// Operation:
/// 1 -> D
pub fn sed(cpu: &mut Cpu) {
    cpu.sr.set(Decimal);
}

/// SEI - Set Interrupt Disable Status
///
/// Operation:
/// 1 -> I
pub fn sei(cpu: &mut Cpu) {
    cpu.sr.set(InterruptDisable);
}

// Comparisons

fn generic_cmp(cpu: &mut Cpu, register: u8, operand: u8) {
    let res = (register as u16).wrapping_sub(operand as u16);
    cpu.sr.set_value(Carry, register >= operand);
    cpu.sr.auto_set(Zero, res as u8);
    cpu.sr.auto_set(Negative, res as u8);
}

/// CMP - Compare Memory with Accumulator
///
/// Operation:
/// A - M
///
/// Status Register:
/// N Z C I D V
/// + + + - - -
pub fn cmp(cpu: &mut Cpu, operand: u8) {
    let register = cpu.acc;
    generic_cmp(cpu, register, operand);
}

/// CPX - Compare Memory and Index X
///
/// Operation:
/// X - M
///
/// Status Register:
/// N Z C I D V
/// + + + - - -
pub fn cpx(cpu: &mut Cpu, operand: u8) {
    let register = cpu.x_reg;
    generic_cmp(cpu, register, operand);
}

/// CPY - Compare Memory and Index Y
///
/// Operation:
/// Y - M
///
/// Status Register:
/// N Z C I D V
/// + + + - - -
pub fn cpy(cpu: &mut Cpu, operand: u8) {
    let register = cpu.y_reg;
    generic_cmp(cpu, register, operand);
}

// Conditional branches. Each returns whether its flag condition holds;
// the CPU core retargets the program counter and charges the cycles.

/// BCC - Branch on Carry Clear
pub fn bcc(cpu: &Cpu) -> bool {
    !cpu.sr.get(Carry)
}

/// BCS - Branch on Carry Set
pub fn bcs(cpu: &Cpu) -> bool {
    cpu.sr.get(Carry)
}

/// BEQ - Branch on Result Zero
pub fn beq(cpu: &Cpu) -> bool {
    cpu.sr.get(Zero)
}

/// BMI - Branch on Result Minus
pub fn bmi(cpu: &Cpu) -> bool {
    cpu.sr.get(Negative)
}

/// BNE - Branch on Result not Zero
pub fn bne(cpu: &Cpu) -> bool {
    !cpu.sr.get(Zero)
}

/// BPL - Branch on Result Plus
pub fn bpl(cpu: &Cpu) -> bool {
    !cpu.sr.get(Negative)
}

/// BVC - Branch on Overflow Clear
pub fn bvc(cpu: &Cpu) -> bool {
    !cpu.sr.get(Overflow)
}

/// BVS - Branch on Overflow Set
pub fn bvs(cpu: &Cpu) -> bool {
    cpu.sr.get(Overflow)
}

// Jumps and subroutines

/// JMP - Jump to New Location
///
/// Operation:
/// (PC+1) -> PCL
/// (PC+2) -> PCH
///
/// Status Register:
/// N Z C I D V
/// - - - - - -
pub fn jmp(cpu: &mut Cpu, address: u16) {
    cpu.pc = address;
}

/// JSR - Jump to New Location Saving Return Address
///
/// Operation:
/// push (PC-1)
/// (PC+1) -> PCL
/// (PC+2) -> PCH
///
/// Status Register:
/// N Z C I D V
/// - - - - - -
pub fn jsr(cpu: &mut Cpu, address: u16) {
    let return_address = cpu.pc.wrapping_sub(1);
    cpu.push((return_address >> 8) as u8);
    cpu.push(return_address as u8);
    cpu.pc = address;
}

/// RTS - Return from Subroutine
///
/// Operation:
/// pull PC, PC+1 -> PC
///
/// Status Register:
/// N Z C I D V
/// - - - - - -
pub fn rts(cpu: &mut Cpu) {
    let pcl = cpu.pull() as u16;
    let pch = cpu.pull() as u16;
    cpu.pc = ((pch << 8) | pcl).wrapping_add(1);
}

// Interrupts

/// BRK - Force Break
///
/// BRK initiates a software interrupt similar to a hardware interrupt
/// (IRQ). The return address pushed to the stack is PC+2, providing an
/// extra byte of spacing for a break mark (identifying a reason for the
/// break).
///
/// The status register will be pushed to the stack with the break flag
/// set to 1. However, when retrieved during RTI or by a PLP instruction,
/// the break flag will be ignored.
///
/// Operation:
/// interrupt, push PC+2, push SR
///
/// Status Register:
/// N Z C I D V
/// - - - 1 - -
pub fn brk(cpu: &mut Cpu) {
    // skip the padding byte after the opcode
    cpu.pc = cpu.pc.wrapping_add(1);
    cpu.push((cpu.pc >> 8) as u8);
    cpu.push(cpu.pc as u8);

    cpu.sr.set(Break);
    cpu.push(cpu.sr.into());
    cpu.sr.clear(Break);
    cpu.sr.set(InterruptDisable);

    cpu.pc = cpu.read_u16(IRQ_VECTOR);
}

/// RTI - Return from Interrupt
///
/// The status register is pulled with the break flag and bit 5 ignored.
/// Then PC is pulled from the stack.
///
/// Operation:
/// pull SR, pull PC
///
/// Status Register:
///  N Z C I D V
///  from stack
pub fn rti(cpu: &mut Cpu) {
    cpu.sr = StatusRegister::from(cpu.pull());
    cpu.sr.clear(Break);
    cpu.sr.clear(Unused);

    let pcl = cpu.pull() as u16;
    let pch = cpu.pull() as u16;
    cpu.pc = (pch << 8) | pcl;
}

// Other

/// BIT - Test Bits in Memory with Accumulator
///
/// Bits 7 and 6 of the operand are transfered to bits 7 and 6 of SR
/// (N, V); the zero flag is set to the result of operand AND
/// accumulator.
///
/// Operation:
/// A AND M, M7 -> N, M6 -> V
///
/// Status Register:
///  N Z C I D V
/// M7 + - - - M6
pub fn bit(cpu: &mut Cpu, operand: u8) {
    let res = cpu.acc & operand;
    cpu.sr.set_value(Negative, utils::bv(operand, 7) != 0);
    cpu.sr.set_value(Overflow, utils::bv(operand, 6) != 0);
    cpu.sr.auto_set(Zero, res);
}

/// NOP - No Operation
///
/// Operation:
/// ---
///
/// Status Register:
/// N Z C I D V
/// - - - - - -
pub fn nop(_: &mut Cpu) {}
