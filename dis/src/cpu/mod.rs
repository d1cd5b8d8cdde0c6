//! NMOS 6502 Instruction Table

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Implied,
    Immediate,
    ZeroPage,
    ZeroPageIndirect,  // (ZP)
    ZeroPageX,         // ZP,X
    ZeroPageY,         // ZP,Y
    ZeroPageIndirectX, // (ZP,X)
    ZeroPageIndirectY, // (ZP),Y
    Absolute,
    AbsoluteIndirectX, // (ABS,X)
    AbsoluteX,         // ABS,X
    AbsoluteY,         // ABS,Y
    Indirect,          // (ABS)
    Relative,
    ZeroPageRelative, // ZP,REL
    Accumulator,
}

impl Mode {
    /// Total instruction length in bytes, opcode included.
    pub const fn size(self) -> usize {
        match self {
            Mode::Implied | Mode::Accumulator => 1,
            Mode::Immediate
            | Mode::ZeroPage
            | Mode::ZeroPageIndirect
            | Mode::ZeroPageX
            | Mode::ZeroPageY
            | Mode::ZeroPageIndirectX
            | Mode::ZeroPageIndirectY
            | Mode::Relative => 2,
            Mode::Absolute
            | Mode::AbsoluteIndirectX
            | Mode::AbsoluteX
            | Mode::AbsoluteY
            | Mode::Indirect
            | Mode::ZeroPageRelative => 3,
        }
    }
}

/// A decoded opcode. An empty mnemonic marks an undefined opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub mode: Mode,
}

impl Instruction {
    pub const ILLEGAL: Self = Self {
        mnemonic: "",
        mode: Mode::Implied,
    };

    pub fn is_legal(&self) -> bool {
        !self.mnemonic.is_empty()
    }

    pub fn size(&self) -> usize {
        self.mode.size()
    }
}

pub fn decode(byte: u8) -> Instruction {
    TABLE[byte as usize]
}

type Op = (&'static str, &'static [(Mode, u8)]);

use Mode::{
    Absolute as ABS, AbsoluteX as ABS_X, AbsoluteY as ABS_Y, Accumulator as ACCUM,
    Immediate as IMM, Implied as IMPL, Indirect as IND_ABS, Relative as REL, ZeroPage as ZP,
    ZeroPageIndirectX as IND_X, ZeroPageIndirectY as IND_Y, ZeroPageX as ZP_X,
    ZeroPageY as ZP_Y,
};

#[rustfmt::skip]
const OPS: &[Op] = &[
    ("BRK", &[(IMPL, 0x00)]),
    ("CLC", &[(IMPL, 0x18)]),
    ("CLD", &[(IMPL, 0xD8)]),
    ("CLI", &[(IMPL, 0x58)]),
    ("CLV", &[(IMPL, 0xB8)]),
    ("DEX", &[(IMPL, 0xCA)]),
    ("DEY", &[(IMPL, 0x88)]),
    ("INX", &[(IMPL, 0xE8)]),
    ("INY", &[(IMPL, 0xC8)]),
    ("NOP", &[(IMPL, 0xEA)]),
    ("PHA", &[(IMPL, 0x48)]),
    ("PHP", &[(IMPL, 0x08)]),
    ("PLA", &[(IMPL, 0x68)]),
    ("PLP", &[(IMPL, 0x28)]),
    ("RTI", &[(IMPL, 0x40)]),
    ("RTS", &[(IMPL, 0x60)]),
    ("SEC", &[(IMPL, 0x38)]),
    ("SED", &[(IMPL, 0xF8)]),
    ("SEI", &[(IMPL, 0x78)]),
    ("TAX", &[(IMPL, 0xAA)]),
    ("TAY", &[(IMPL, 0xA8)]),
    ("TSX", &[(IMPL, 0xBA)]),
    ("TXA", &[(IMPL, 0x8A)]),
    ("TXS", &[(IMPL, 0x9A)]),
    ("TYA", &[(IMPL, 0x98)]),

    ("ADC", &[(IMM, 0x69), (ZP, 0x65), (ZP_X, 0x75), (ABS, 0x6D), (ABS_X, 0x7D), (ABS_Y, 0x79), (IND_X, 0x61), (IND_Y, 0x71)]),
    ("AND", &[(IMM, 0x29), (ZP, 0x25), (ZP_X, 0x35), (ABS, 0x2D), (ABS_X, 0x3D), (ABS_Y, 0x39), (IND_X, 0x21), (IND_Y, 0x31)]),
    ("ASL", &[(ACCUM, 0x0A), (ZP, 0x06), (ZP_X, 0x16), (ABS, 0x0E), (ABS_X, 0x1E)]),
    ("BIT", &[(ZP, 0x24), (ABS, 0x2C)]),
    ("BCC", &[(REL, 0x90)]),
    ("BCS", &[(REL, 0xB0)]),
    ("BEQ", &[(REL, 0xF0)]),
    ("BMI", &[(REL, 0x30)]),
    ("BNE", &[(REL, 0xD0)]),
    ("BPL", &[(REL, 0x10)]),
    ("BVC", &[(REL, 0x50)]),
    ("BVS", &[(REL, 0x70)]),
    ("CMP", &[(IMM, 0xC9), (ZP, 0xC5), (ZP_X, 0xD5), (ABS, 0xCD), (ABS_X, 0xDD), (ABS_Y, 0xD9), (IND_X, 0xC1), (IND_Y, 0xD1)]),
    ("CPX", &[(IMM, 0xE0), (ZP, 0xE4), (ABS, 0xEC)]),
    ("CPY", &[(IMM, 0xC0), (ZP, 0xC4), (ABS, 0xCC)]),
    ("DEC", &[(ZP, 0xC6), (ZP_X, 0xD6), (ABS, 0xCE), (ABS_X, 0xDE)]),
    ("EOR", &[(IMM, 0x49), (ZP, 0x45), (ZP_X, 0x55), (ABS, 0x4D), (ABS_X, 0x5D), (ABS_Y, 0x59), (IND_X, 0x41), (IND_Y, 0x51)]),
    ("INC", &[(ZP, 0xE6), (ZP_X, 0xF6), (ABS, 0xEE), (ABS_X, 0xFE)]),
    ("JMP", &[(ABS, 0x4C), (IND_ABS, 0x6C)]),
    ("JSR", &[(ABS, 0x20)]),
    ("LDA", &[(IMM, 0xA9), (ZP, 0xA5), (ZP_X, 0xB5), (ABS, 0xAD), (ABS_X, 0xBD), (ABS_Y, 0xB9), (IND_X, 0xA1), (IND_Y, 0xB1)]),
    ("LDX", &[(IMM, 0xA2), (ZP, 0xA6), (ZP_Y, 0xB6), (ABS, 0xAE), (ABS_Y, 0xBE)]),
    ("LDY", &[(IMM, 0xA0), (ZP, 0xA4), (ZP_X, 0xB4), (ABS, 0xAC), (ABS_X, 0xBC)]),
    ("LSR", &[(ACCUM, 0x4A), (ZP, 0x46), (ZP_X, 0x56), (ABS, 0x4E), (ABS_X, 0x5E)]),
    ("ORA", &[(IMM, 0x09), (ZP, 0x05), (ZP_X, 0x15), (ABS, 0x0D), (ABS_X, 0x1D), (ABS_Y, 0x19), (IND_X, 0x01), (IND_Y, 0x11)]),
    ("ROL", &[(ACCUM, 0x2A), (ZP, 0x26), (ZP_X, 0x36), (ABS, 0x2E), (ABS_X, 0x3E)]),
    ("ROR", &[(ACCUM, 0x6A), (ZP, 0x66), (ZP_X, 0x76), (ABS, 0x6E), (ABS_X, 0x7E)]),
    ("SBC", &[(IMM, 0xE9), (ZP, 0xE5), (ZP_X, 0xF5), (ABS, 0xED), (ABS_X, 0xFD), (ABS_Y, 0xF9), (IND_X, 0xE1), (IND_Y, 0xF1)]),
    ("STA", &[(ZP, 0x85), (ZP_X, 0x95), (ABS, 0x8D), (ABS_X, 0x9D), (ABS_Y, 0x99), (IND_X, 0x81), (IND_Y, 0x91)]),
    ("STX", &[(ZP, 0x86), (ZP_Y, 0x96), (ABS, 0x8E)]),
    ("STY", &[(ZP, 0x84), (ZP_X, 0x94), (ABS, 0x8C)]),
];

const TABLE: [Instruction; 256] = build_table();

const fn build_table() -> [Instruction; 256] {
    let mut table = [Instruction::ILLEGAL; 256];
    let mut i = 0;
    while i < OPS.len() {
        let (mnemonic, modes) = OPS[i];
        let mut j = 0;
        while j < modes.len() {
            let (mode, opcode) = modes[j];
            table[opcode as usize] = Instruction { mnemonic, mode };
            j += 1;
        }
        i += 1;
    }
    table
}
