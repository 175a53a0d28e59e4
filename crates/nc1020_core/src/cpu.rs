mod opcodes;
mod regs;

#[cfg(test)]
mod tests;

use opcodes::{Instr, Mode, Op, OPCODES};
pub use regs::{flag, Registers};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Bus interface for the 6502 core.
///
/// `peek` is the raw fetch path used for opcodes and operands; it resolves
/// through the memory windows without touching I/O registers. `load` and
/// `store` are the data paths, which additionally dispatch I/O registers
/// and the flash command interpreter. The stack helpers access the fixed
/// 256-byte stack page directly, as the hardware does.
pub trait Bus {
    fn peek(&self, addr: u16) -> u8;
    fn load(&mut self, addr: u16) -> u8;
    fn store(&mut self, addr: u16, value: u8);

    fn stack_read(&self, offset: u8) -> u8;
    fn stack_write(&mut self, offset: u8, value: u8);

    fn peek_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.peek(addr), self.peek(addr.wrapping_add(1))])
    }
}

/// 6502-family CPU core.
///
/// One `step` executes a single instruction and returns the cycles it
/// consumed, like the other cores in this workspace. Interrupt delivery is
/// a separate entry point so the machine can inject IRQs between
/// instructions.
#[derive(Default)]
pub struct Cpu {
    pub regs: Registers,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    fn fetch_byte<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let b = bus.peek(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        b
    }

    fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let w = bus.peek_word(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(2);
        w
    }

    /// Resolve the effective address for a memory addressing mode.
    ///
    /// `penalize` enables the +1 cycle page-cross cost, which applies to
    /// read-class operations in absolute,X / absolute,Y / (zp),Y modes
    /// only; stores and read-modify-write operations never pay it.
    fn effective_addr<B: Bus>(
        &mut self,
        bus: &mut B,
        mode: Mode,
        penalize: bool,
        cycles: &mut u32,
    ) -> u16 {
        match mode {
            Mode::Immediate => {
                let addr = self.regs.pc;
                self.regs.pc = self.regs.pc.wrapping_add(1);
                addr
            }
            Mode::ZeroPage => u16::from(self.fetch_byte(bus)),
            Mode::ZeroPageX => {
                let base = self.fetch_byte(bus);
                u16::from(base.wrapping_add(self.regs.x))
            }
            Mode::ZeroPageY => {
                let base = self.fetch_byte(bus);
                u16::from(base.wrapping_add(self.regs.y))
            }
            Mode::Absolute => self.fetch_word(bus),
            Mode::AbsoluteX => {
                let base = self.fetch_word(bus);
                if penalize && (base & 0xFF) + u16::from(self.regs.x) > 0xFF {
                    *cycles += 1;
                }
                base.wrapping_add(u16::from(self.regs.x))
            }
            Mode::AbsoluteY => {
                let base = self.fetch_word(bus);
                if penalize && (base & 0xFF) + u16::from(self.regs.y) > 0xFF {
                    *cycles += 1;
                }
                base.wrapping_add(u16::from(self.regs.y))
            }
            Mode::IndirectX => {
                let zp = self.fetch_byte(bus).wrapping_add(self.regs.x);
                bus.peek_word(u16::from(zp))
            }
            Mode::IndirectY => {
                let zp = self.fetch_byte(bus);
                let base = bus.peek_word(u16::from(zp));
                if penalize && (base & 0xFF) + u16::from(self.regs.y) > 0xFF {
                    *cycles += 1;
                }
                base.wrapping_add(u16::from(self.regs.y))
            }
            Mode::Indirect => {
                let ptr = self.fetch_word(bus);
                bus.peek_word(ptr)
            }
            Mode::Implied | Mode::Accumulator | Mode::Relative => {
                unreachable!("mode {mode:?} has no effective address")
            }
        }
    }

    fn push<B: Bus>(&mut self, bus: &mut B, value: u8) {
        bus.stack_write(self.regs.sp, value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    fn pop<B: Bus>(&mut self, bus: &mut B) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        bus.stack_read(self.regs.sp)
    }

    fn set_nz(&mut self, value: u8) {
        let ps = self.regs.ps & !(flag::NEGATIVE | flag::ZERO);
        self.regs.ps = ps | (value & 0x80) | (u8::from(value == 0) << 1);
    }

    fn adc(&mut self, operand: u8) {
        let a = self.regs.a;
        let sum = u16::from(a) + u16::from(operand) + u16::from(self.regs.ps & flag::CARRY);
        let result = sum as u8;
        let mut ps = self.regs.ps
            & !(flag::NEGATIVE | flag::OVERFLOW | flag::ZERO | flag::CARRY);
        ps |= (result & 0x80) | (u8::from(result == 0) << 1);
        ps |= u8::from(sum > 0xFF);
        ps |= ((a ^ operand ^ 0x80) & (a ^ result) & 0x80) >> 1;
        self.regs.ps = ps;
        self.regs.a = result;
    }

    fn sbc(&mut self, operand: u8) {
        let a = self.regs.a;
        let diff =
            i16::from(a) - i16::from(operand) + i16::from(self.regs.ps & flag::CARRY) - 1;
        let result = diff as u8;
        let mut ps = self.regs.ps
            & !(flag::NEGATIVE | flag::OVERFLOW | flag::ZERO | flag::CARRY);
        ps |= (result & 0x80) | (u8::from(result == 0) << 1);
        ps |= u8::from(diff >= 0);
        ps |= ((a ^ operand) & (a ^ result) & 0x80) >> 1;
        self.regs.ps = ps;
        self.regs.a = result;
    }

    fn compare(&mut self, reg: u8, operand: u8) {
        let diff = i16::from(reg) - i16::from(operand);
        let result = diff as u8;
        let mut ps = self.regs.ps & !(flag::NEGATIVE | flag::ZERO | flag::CARRY);
        ps |= (result & 0x80) | (u8::from(result == 0) << 1) | u8::from(diff >= 0);
        self.regs.ps = ps;
    }

    fn bit(&mut self, operand: u8) {
        let mut ps = self.regs.ps & !(flag::NEGATIVE | flag::OVERFLOW | flag::ZERO);
        ps |= (u8::from(self.regs.a & operand == 0) << 1) | (operand & 0xC0);
        self.regs.ps = ps;
    }

    fn asl(&mut self, value: u8) -> u8 {
        let result = value << 1;
        let mut ps = self.regs.ps & !(flag::NEGATIVE | flag::ZERO | flag::CARRY);
        ps |= value >> 7;
        ps |= (result & 0x80) | (u8::from(result == 0) << 1);
        self.regs.ps = ps;
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        let mut ps = self.regs.ps & !(flag::NEGATIVE | flag::ZERO | flag::CARRY);
        ps |= value & 0x01;
        ps |= u8::from(result == 0) << 1;
        self.regs.ps = ps;
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let result = (value << 1) | (self.regs.ps & flag::CARRY);
        let mut ps = self.regs.ps & !(flag::NEGATIVE | flag::ZERO | flag::CARRY);
        ps |= (result & 0x80) | (u8::from(result == 0) << 1) | (value >> 7);
        self.regs.ps = ps;
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | ((self.regs.ps & flag::CARRY) << 7);
        let mut ps = self.regs.ps & !(flag::NEGATIVE | flag::ZERO | flag::CARRY);
        ps |= (result & 0x80) | (u8::from(result == 0) << 1) | (value & 0x01);
        self.regs.ps = ps;
        result
    }

    /// Relative branch. A taken branch costs 2 extra cycles when the
    /// target stays on the same page as the post-operand program counter;
    /// a page-crossing taken branch costs nothing extra.
    fn branch<B: Bus>(&mut self, bus: &mut B, taken: bool, cycles: &mut u32) {
        let offset = self.fetch_byte(bus) as i8;
        let target = self.regs.pc.wrapping_add(offset as u16);
        if taken {
            if (self.regs.pc ^ target) & 0xFF00 == 0 {
                *cycles += 2;
            }
            self.regs.pc = target;
        }
    }

    fn read_operand<B: Bus>(&mut self, bus: &mut B, mode: Mode, cycles: &mut u32) -> u8 {
        let addr = self.effective_addr(bus, mode, true, cycles);
        bus.load(addr)
    }

    fn modify<B: Bus>(
        &mut self,
        bus: &mut B,
        mode: Mode,
        cycles: &mut u32,
        f: impl Fn(&mut Self, u8) -> u8,
    ) {
        if mode == Mode::Accumulator {
            let result = f(self, self.regs.a);
            self.regs.a = result;
        } else {
            let addr = self.effective_addr(bus, mode, false, cycles);
            let value = bus.load(addr);
            let result = f(self, value);
            bus.store(addr, result);
        }
    }

    /// Execute a single instruction and return the number of cycles
    /// consumed. Undefined opcodes are zero-cycle no-ops.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let at = self.regs.pc;
        let opcode = self.fetch_byte(bus);
        let Some(Instr { op, mode, cycles }) = OPCODES[opcode as usize] else {
            log::debug!("undefined opcode {opcode:02X} at {at:04X}");
            return 0;
        };
        let mut cycles = cycles;

        match op {
            Op::Lda => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.regs.a = v;
                self.set_nz(v);
            }
            Op::Ldx => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.regs.x = v;
                self.set_nz(v);
            }
            Op::Ldy => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.regs.y = v;
                self.set_nz(v);
            }
            Op::Sta => {
                let addr = self.effective_addr(bus, mode, false, &mut cycles);
                bus.store(addr, self.regs.a);
            }
            Op::Stx => {
                let addr = self.effective_addr(bus, mode, false, &mut cycles);
                bus.store(addr, self.regs.x);
            }
            Op::Sty => {
                let addr = self.effective_addr(bus, mode, false, &mut cycles);
                bus.store(addr, self.regs.y);
            }

            Op::Ora => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.regs.a |= v;
                self.set_nz(self.regs.a);
            }
            Op::And => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.regs.a &= v;
                self.set_nz(self.regs.a);
            }
            Op::Eor => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.regs.a ^= v;
                self.set_nz(self.regs.a);
            }
            Op::Adc => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.adc(v);
            }
            Op::Sbc => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.sbc(v);
            }
            Op::Cmp => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.compare(self.regs.a, v);
            }
            Op::Cpx => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.compare(self.regs.x, v);
            }
            Op::Cpy => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.compare(self.regs.y, v);
            }
            Op::Bit => {
                let v = self.read_operand(bus, mode, &mut cycles);
                self.bit(v);
            }

            Op::Asl => self.modify(bus, mode, &mut cycles, Self::asl),
            Op::Lsr => self.modify(bus, mode, &mut cycles, Self::lsr),
            Op::Rol => self.modify(bus, mode, &mut cycles, Self::rol),
            Op::Ror => self.modify(bus, mode, &mut cycles, Self::ror),
            Op::Inc => self.modify(bus, mode, &mut cycles, |cpu, v| {
                let r = v.wrapping_add(1);
                cpu.set_nz(r);
                r
            }),
            Op::Dec => self.modify(bus, mode, &mut cycles, |cpu, v| {
                let r = v.wrapping_sub(1);
                cpu.set_nz(r);
                r
            }),

            Op::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.set_nz(self.regs.x);
            }
            Op::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.set_nz(self.regs.y);
            }
            Op::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.set_nz(self.regs.x);
            }
            Op::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.set_nz(self.regs.y);
            }

            Op::Tax => {
                self.regs.x = self.regs.a;
                self.set_nz(self.regs.a);
            }
            Op::Tay => {
                self.regs.y = self.regs.a;
                self.set_nz(self.regs.a);
            }
            Op::Txa => {
                self.regs.a = self.regs.x;
                self.set_nz(self.regs.a);
            }
            Op::Tya => {
                self.regs.a = self.regs.y;
                self.set_nz(self.regs.a);
            }
            Op::Tsx => {
                self.regs.x = self.regs.sp;
                self.set_nz(self.regs.x);
            }
            Op::Txs => {
                self.regs.sp = self.regs.x;
            }

            Op::Pha => {
                let a = self.regs.a;
                self.push(bus, a);
            }
            Op::Php => {
                let ps = self.regs.ps;
                self.push(bus, ps);
            }
            Op::Pla => {
                let v = self.pop(bus);
                self.regs.a = v;
                self.set_nz(v);
            }
            Op::Plp => {
                self.regs.ps = self.pop(bus);
            }

            Op::Clc => self.regs.ps &= !flag::CARRY,
            Op::Sec => self.regs.ps |= flag::CARRY,
            Op::Cli => self.regs.ps &= !flag::IRQ_DISABLE,
            Op::Sei => self.regs.ps |= flag::IRQ_DISABLE,
            Op::Clv => self.regs.ps &= !flag::OVERFLOW,
            Op::Cld => self.regs.ps &= !flag::DECIMAL,
            Op::Sed => self.regs.ps |= flag::DECIMAL,

            Op::Bpl => {
                let taken = self.regs.ps & flag::NEGATIVE == 0;
                self.branch(bus, taken, &mut cycles);
            }
            Op::Bmi => {
                let taken = self.regs.ps & flag::NEGATIVE != 0;
                self.branch(bus, taken, &mut cycles);
            }
            Op::Bvc => {
                let taken = self.regs.ps & flag::OVERFLOW == 0;
                self.branch(bus, taken, &mut cycles);
            }
            Op::Bvs => {
                let taken = self.regs.ps & flag::OVERFLOW != 0;
                self.branch(bus, taken, &mut cycles);
            }
            Op::Bcc => {
                let taken = self.regs.ps & flag::CARRY == 0;
                self.branch(bus, taken, &mut cycles);
            }
            Op::Bcs => {
                let taken = self.regs.ps & flag::CARRY != 0;
                self.branch(bus, taken, &mut cycles);
            }
            Op::Bne => {
                let taken = self.regs.ps & flag::ZERO == 0;
                self.branch(bus, taken, &mut cycles);
            }
            Op::Beq => {
                let taken = self.regs.ps & flag::ZERO != 0;
                self.branch(bus, taken, &mut cycles);
            }

            Op::Jmp => {
                let addr = self.effective_addr(bus, mode, false, &mut cycles);
                self.regs.pc = addr;
            }
            Op::Jsr => {
                let addr = self.fetch_word(bus);
                // The pushed return address is the last operand byte; RTS
                // adds one after popping.
                let ret = self.regs.pc.wrapping_sub(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                self.regs.pc = addr;
            }
            Op::Rts => {
                let lo = u16::from(self.pop(bus));
                let hi = u16::from(self.pop(bus));
                self.regs.pc = ((hi << 8) | lo).wrapping_add(1);
            }
            Op::Rti => {
                self.regs.ps = self.pop(bus);
                let lo = u16::from(self.pop(bus));
                let hi = u16::from(self.pop(bus));
                self.regs.pc = (hi << 8) | lo;
            }
            Op::Brk => {
                // The byte after BRK is padding; the pushed PC skips it.
                self.regs.pc = self.regs.pc.wrapping_add(1);
                let pc = self.regs.pc;
                self.push(bus, (pc >> 8) as u8);
                self.push(bus, pc as u8);
                self.regs.ps |= flag::BREAK;
                let ps = self.regs.ps;
                self.push(bus, ps);
                self.regs.ps |= flag::IRQ_DISABLE;
                self.regs.pc = bus.peek_word(IRQ_VECTOR);
            }

            Op::Nop => {}
        }

        cycles
    }

    /// Deliver a pending IRQ between instructions; returns the cycle cost.
    ///
    /// The caller is responsible for checking the interrupt-disable flag.
    pub fn interrupt<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let pc = self.regs.pc;
        self.push(bus, (pc >> 8) as u8);
        self.push(bus, pc as u8);
        self.regs.ps &= !flag::BREAK;
        let ps = self.regs.ps;
        self.push(bus, ps);
        self.regs.pc = bus.peek_word(IRQ_VECTOR);
        self.regs.ps |= flag::IRQ_DISABLE;
        7
    }
}
