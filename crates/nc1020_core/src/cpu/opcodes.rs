//! Opcode dispatch table.
//!
//! Each defined opcode maps to an `{operation, addressing mode, base
//! cycles}` entry; the execution engine combines these with shared
//! addressing-mode and ALU helpers. Undefined opcodes stay `None` and are
//! treated as zero-cycle no-ops, matching the gaps in the device's
//! dispatch. Base cycle counts follow the device, including its
//! divergences from a stock 6502 (read-modify-write absolute,X costs 6).

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    IndirectX,
    IndirectY,
    Indirect,
    Relative,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Instr {
    pub(crate) op: Op,
    pub(crate) mode: Mode,
    pub(crate) cycles: u32,
}

const fn instr(op: Op, mode: Mode, cycles: u32) -> Option<Instr> {
    Some(Instr { op, mode, cycles })
}

pub(crate) const OPCODES: [Option<Instr>; 256] = build_table();

#[rustfmt::skip]
const fn build_table() -> [Option<Instr>; 256] {
    use Mode::*;
    use Op::*;

    let mut t: [Option<Instr>; 256] = [None; 256];

    t[0x69] = instr(Adc, Immediate, 2);
    t[0x65] = instr(Adc, ZeroPage, 3);
    t[0x75] = instr(Adc, ZeroPageX, 4);
    t[0x6D] = instr(Adc, Absolute, 4);
    t[0x7D] = instr(Adc, AbsoluteX, 4);
    t[0x79] = instr(Adc, AbsoluteY, 4);
    t[0x61] = instr(Adc, IndirectX, 6);
    t[0x71] = instr(Adc, IndirectY, 5);

    t[0x29] = instr(And, Immediate, 2);
    t[0x25] = instr(And, ZeroPage, 3);
    t[0x35] = instr(And, ZeroPageX, 4);
    t[0x2D] = instr(And, Absolute, 4);
    t[0x3D] = instr(And, AbsoluteX, 4);
    t[0x39] = instr(And, AbsoluteY, 4);
    t[0x21] = instr(And, IndirectX, 6);
    t[0x31] = instr(And, IndirectY, 5);

    t[0x0A] = instr(Asl, Accumulator, 2);
    t[0x06] = instr(Asl, ZeroPage, 5);
    t[0x16] = instr(Asl, ZeroPageX, 6);
    t[0x0E] = instr(Asl, Absolute, 6);
    t[0x1E] = instr(Asl, AbsoluteX, 6);

    t[0x90] = instr(Bcc, Relative, 2);
    t[0xB0] = instr(Bcs, Relative, 2);
    t[0xF0] = instr(Beq, Relative, 2);
    t[0x30] = instr(Bmi, Relative, 2);
    t[0xD0] = instr(Bne, Relative, 2);
    t[0x10] = instr(Bpl, Relative, 2);
    t[0x50] = instr(Bvc, Relative, 2);
    t[0x70] = instr(Bvs, Relative, 2);

    t[0x24] = instr(Bit, ZeroPage, 3);
    t[0x2C] = instr(Bit, Absolute, 4);

    t[0x00] = instr(Brk, Implied, 7);

    t[0x18] = instr(Clc, Implied, 2);
    t[0xD8] = instr(Cld, Implied, 2);
    t[0x58] = instr(Cli, Implied, 2);
    t[0xB8] = instr(Clv, Implied, 2);

    t[0xC9] = instr(Cmp, Immediate, 2);
    t[0xC5] = instr(Cmp, ZeroPage, 3);
    t[0xD5] = instr(Cmp, ZeroPageX, 4);
    t[0xCD] = instr(Cmp, Absolute, 4);
    t[0xDD] = instr(Cmp, AbsoluteX, 4);
    t[0xD9] = instr(Cmp, AbsoluteY, 4);
    t[0xC1] = instr(Cmp, IndirectX, 6);
    t[0xD1] = instr(Cmp, IndirectY, 5);

    t[0xE0] = instr(Cpx, Immediate, 2);
    t[0xE4] = instr(Cpx, ZeroPage, 3);
    t[0xEC] = instr(Cpx, Absolute, 4);

    t[0xC0] = instr(Cpy, Immediate, 2);
    t[0xC4] = instr(Cpy, ZeroPage, 3);
    t[0xCC] = instr(Cpy, Absolute, 4);

    t[0xC6] = instr(Dec, ZeroPage, 5);
    t[0xD6] = instr(Dec, ZeroPageX, 6);
    t[0xCE] = instr(Dec, Absolute, 6);
    t[0xDE] = instr(Dec, AbsoluteX, 6);

    t[0xCA] = instr(Dex, Implied, 2);
    t[0x88] = instr(Dey, Implied, 2);

    t[0x49] = instr(Eor, Immediate, 2);
    t[0x45] = instr(Eor, ZeroPage, 3);
    t[0x55] = instr(Eor, ZeroPageX, 4);
    t[0x4D] = instr(Eor, Absolute, 4);
    t[0x5D] = instr(Eor, AbsoluteX, 4);
    t[0x59] = instr(Eor, AbsoluteY, 4);
    t[0x41] = instr(Eor, IndirectX, 6);
    t[0x51] = instr(Eor, IndirectY, 5);

    t[0xE6] = instr(Inc, ZeroPage, 5);
    t[0xF6] = instr(Inc, ZeroPageX, 6);
    t[0xEE] = instr(Inc, Absolute, 6);
    t[0xFE] = instr(Inc, AbsoluteX, 6);

    t[0xE8] = instr(Inx, Implied, 2);
    t[0xC8] = instr(Iny, Implied, 2);

    t[0x4C] = instr(Jmp, Absolute, 3);
    t[0x6C] = instr(Jmp, Indirect, 6);
    t[0x20] = instr(Jsr, Absolute, 6);

    t[0xA9] = instr(Lda, Immediate, 2);
    t[0xA5] = instr(Lda, ZeroPage, 3);
    t[0xB5] = instr(Lda, ZeroPageX, 4);
    t[0xAD] = instr(Lda, Absolute, 4);
    t[0xBD] = instr(Lda, AbsoluteX, 4);
    t[0xB9] = instr(Lda, AbsoluteY, 4);
    t[0xA1] = instr(Lda, IndirectX, 6);
    t[0xB1] = instr(Lda, IndirectY, 5);

    t[0xA2] = instr(Ldx, Immediate, 2);
    t[0xA6] = instr(Ldx, ZeroPage, 3);
    t[0xB6] = instr(Ldx, ZeroPageY, 4);
    t[0xAE] = instr(Ldx, Absolute, 4);
    t[0xBE] = instr(Ldx, AbsoluteY, 4);

    t[0xA0] = instr(Ldy, Immediate, 2);
    t[0xA4] = instr(Ldy, ZeroPage, 3);
    t[0xB4] = instr(Ldy, ZeroPageX, 4);
    t[0xAC] = instr(Ldy, Absolute, 4);
    t[0xBC] = instr(Ldy, AbsoluteX, 4);

    t[0x4A] = instr(Lsr, Accumulator, 2);
    t[0x46] = instr(Lsr, ZeroPage, 5);
    t[0x56] = instr(Lsr, ZeroPageX, 6);
    t[0x4E] = instr(Lsr, Absolute, 6);
    t[0x5E] = instr(Lsr, AbsoluteX, 6);

    t[0xEA] = instr(Nop, Implied, 2);

    t[0x09] = instr(Ora, Immediate, 2);
    t[0x05] = instr(Ora, ZeroPage, 3);
    t[0x15] = instr(Ora, ZeroPageX, 4);
    t[0x0D] = instr(Ora, Absolute, 4);
    t[0x1D] = instr(Ora, AbsoluteX, 4);
    t[0x19] = instr(Ora, AbsoluteY, 4);
    t[0x01] = instr(Ora, IndirectX, 6);
    t[0x11] = instr(Ora, IndirectY, 5);

    t[0x48] = instr(Pha, Implied, 3);
    t[0x08] = instr(Php, Implied, 3);
    t[0x68] = instr(Pla, Implied, 4);
    t[0x28] = instr(Plp, Implied, 4);

    t[0x2A] = instr(Rol, Accumulator, 2);
    t[0x26] = instr(Rol, ZeroPage, 5);
    t[0x36] = instr(Rol, ZeroPageX, 6);
    t[0x2E] = instr(Rol, Absolute, 6);
    t[0x3E] = instr(Rol, AbsoluteX, 6);

    t[0x6A] = instr(Ror, Accumulator, 2);
    t[0x66] = instr(Ror, ZeroPage, 5);
    t[0x76] = instr(Ror, ZeroPageX, 6);
    t[0x6E] = instr(Ror, Absolute, 6);
    t[0x7E] = instr(Ror, AbsoluteX, 6);

    t[0x40] = instr(Rti, Implied, 6);
    t[0x60] = instr(Rts, Implied, 6);

    t[0xE9] = instr(Sbc, Immediate, 2);
    t[0xE5] = instr(Sbc, ZeroPage, 3);
    t[0xF5] = instr(Sbc, ZeroPageX, 4);
    t[0xED] = instr(Sbc, Absolute, 4);
    t[0xFD] = instr(Sbc, AbsoluteX, 4);
    t[0xF9] = instr(Sbc, AbsoluteY, 4);
    t[0xE1] = instr(Sbc, IndirectX, 6);
    t[0xF1] = instr(Sbc, IndirectY, 5);

    t[0x38] = instr(Sec, Implied, 2);
    t[0xF8] = instr(Sed, Implied, 2);
    t[0x78] = instr(Sei, Implied, 2);

    t[0x85] = instr(Sta, ZeroPage, 3);
    t[0x95] = instr(Sta, ZeroPageX, 4);
    t[0x8D] = instr(Sta, Absolute, 4);
    t[0x9D] = instr(Sta, AbsoluteX, 5);
    t[0x99] = instr(Sta, AbsoluteY, 5);
    t[0x81] = instr(Sta, IndirectX, 6);
    t[0x91] = instr(Sta, IndirectY, 6);

    t[0x86] = instr(Stx, ZeroPage, 3);
    t[0x96] = instr(Stx, ZeroPageY, 4);
    t[0x8E] = instr(Stx, Absolute, 4);

    t[0x84] = instr(Sty, ZeroPage, 3);
    t[0x94] = instr(Sty, ZeroPageX, 4);
    t[0x8C] = instr(Sty, Absolute, 4);

    t[0xAA] = instr(Tax, Implied, 2);
    t[0xA8] = instr(Tay, Implied, 2);
    t[0xBA] = instr(Tsx, Implied, 2);
    t[0x8A] = instr(Txa, Implied, 2);
    t[0x9A] = instr(Txs, Implied, 2);
    t[0x98] = instr(Tya, Implied, 2);

    t
}
