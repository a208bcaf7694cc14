//! The processor state: the eight 8-bit registers, the stack and program
//! counters, the flag nibble, and the arithmetic helpers the interpreter
//! shares between instruction families.
//!
//! The registers live in a single `[u8; 8]` so that the 16-bit pair views
//! (BC, DE, HL, AF) are plain two-byte reads of the same storage. F is not a
//! general-purpose register: it holds the flags in its high nibble and must
//! be reached through the flag API or the AF pair view. The plain byte
//! accessors treat a direct touch of F as a programming error, policed
//! according to the [`AccessGuard`] the CPU was built with.

use serde::{Deserialize, Serialize};

/// Storage index of each half register. B through L sit at the front so that
/// the pair views are contiguous; A and F share the final pair slot.
const B: usize = 0;
const C: usize = 1;
const D: usize = 2;
const E: usize = 3;
const H: usize = 4;
const L: usize = 5;
const A: usize = 6;
const F: usize = 7;

/// One of the 8-bit registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    B,
    C,
    D,
    E,
    H,
    L,
    A,
    F,
}

impl Register {
    const fn index(self) -> usize {
        match self {
            Register::B => B,
            Register::C => C,
            Register::D => D,
            Register::E => E,
            Register::H => H,
            Register::L => L,
            Register::A => A,
            Register::F => F,
        }
    }
}

/// One of the 16-bit register pair views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pair {
    BC,
    DE,
    HL,
    AF,
}

impl Pair {
    /// Index of the high byte. The low byte sits directly after it.
    const fn hi(self) -> usize {
        2 * self as usize
    }
}

/// One of the four condition flags, stored in the high nibble of F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Zero.
    Z,
    /// Subtraction.
    N,
    /// Half carry (out of bit 3, or bit 11 for wide adds).
    H,
    /// Carry.
    C,
}

impl Flag {
    const fn mask(self) -> u8 {
        match self {
            Flag::Z => 0x80,
            Flag::N => 0x40,
            Flag::H => 0x20,
            Flag::C => 0x10,
        }
    }
}

/// How the plain byte accessors respond to a direct touch of F.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessGuard {
    /// Panic. F is only valid through the flag API or the AF pair view.
    #[default]
    Checked,
    /// Hand back the raw byte and keep going.
    Fast,
}

/// The complete processor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[display(
    "CPU {{ A=0x{:0>2X} F=0x{:0>2X} B=0x{:0>2X} C=0x{:0>2X} D=0x{:0>2X} E=0x{:0>2X} H=0x{:0>2X} L=0x{:0>2X} SP=0x{:0>4X} PC=0x{:0>4X} }}",
    regs[A],
    regs[F],
    regs[B],
    regs[C],
    regs[D],
    regs[E],
    regs[H],
    regs[L],
    sp,
    pc
)]
pub struct Cpu {
    regs: [u8; 8],
    /// The stack pointer.
    pub sp: u16,
    /// The program counter.
    pub pc: u16,
    guard: AccessGuard,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(AccessGuard::Checked)
    }
}

impl Cpu {
    /// A freshly powered-on CPU: registers zeroed, PC at the top of memory,
    /// SP just below the interrupt-enable byte.
    pub fn new(guard: AccessGuard) -> Self {
        Self {
            regs: [0; 8],
            sp: 0xFFFE,
            pc: 0,
            guard,
        }
    }

    fn check_guard(&self, reg: Register) {
        if matches!((reg, self.guard), (Register::F, AccessGuard::Checked)) {
            panic!("F holds the flags; use the flag accessors or the AF pair view");
        }
    }

    /// Reads an 8-bit register.
    pub fn get(&self, reg: Register) -> u8 {
        self.check_guard(reg);
        self.regs[reg.index()]
    }

    /// Writes an 8-bit register.
    pub fn set(&mut self, reg: Register, value: u8) {
        self.check_guard(reg);
        self.regs[reg.index()] = value;
    }

    /// Reads a register pair as a 16-bit value, high byte first.
    pub fn pair(&self, pair: Pair) -> u16 {
        let hi = pair.hi();
        u16::from_be_bytes([self.regs[hi], self.regs[hi + 1]])
    }

    /// Writes a 16-bit value into a register pair.
    pub fn set_pair(&mut self, pair: Pair, value: u16) {
        let hi = pair.hi();
        [self.regs[hi], self.regs[hi + 1]] = value.to_be_bytes();
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.regs[F] & flag.mask() != 0
    }

    pub fn set_flag(&mut self, flag: Flag) {
        self.regs[F] |= flag.mask();
        self.regs[F] &= 0xF0;
    }

    pub fn clear_flag(&mut self, flag: Flag) {
        self.regs[F] &= !flag.mask() & 0xF0;
    }

    pub fn assign_flag(&mut self, flag: Flag, state: bool) {
        if state {
            self.set_flag(flag)
        } else {
            self.clear_flag(flag)
        }
    }

    pub fn toggle_flag(&mut self, flag: Flag) {
        self.regs[F] ^= flag.mask();
        self.regs[F] &= 0xF0;
    }

    pub fn clear_flags(&mut self) {
        self.regs[F] = 0;
    }

    /// Adds `b` and the current carry to `a`, deriving all four flags. Every
    /// 8-bit add and (via complement) subtract funnels through here: the
    /// carry-out is whether the sum overflows a byte, and the half carry is
    /// bit 4 of `a ^ b ^ result`.
    pub(crate) fn adc(&mut self, a: u8, b: u8) -> u8 {
        let out = if self.flag(Flag::C) {
            self.assign_flag(Flag::C, a >= 0xFF - b);
            a.wrapping_add(b).wrapping_add(1)
        } else {
            self.assign_flag(Flag::C, a > 0xFF - b);
            a.wrapping_add(b)
        };
        self.assign_flag(Flag::H, (a ^ b ^ out) & 0x10 != 0);
        self.clear_flag(Flag::N);
        self.assign_flag(Flag::Z, out == 0);
        out
    }

    /// Subtract-with-borrow as a complemented [`adc`](Self::adc): the carry
    /// flag is inverted around the add so it reads as a borrow on both sides.
    pub(crate) fn sbc(&mut self, a: u8, b: u8) -> u8 {
        self.toggle_flag(Flag::C);
        let out = self.adc(a, !b);
        self.toggle_flag(Flag::C);
        self.set_flag(Flag::N);
        out
    }

    /// The 16-bit add used by `ADD HL,rr` and the SP-relative loads. No
    /// incoming carry; H comes from bit 12.
    pub(crate) fn add16(&mut self, a: u16, b: u16) -> u16 {
        let out = a.wrapping_add(b);
        self.assign_flag(Flag::C, a > 0xFFFF - b);
        self.assign_flag(Flag::H, (a ^ b ^ out) & 0x1000 != 0);
        out
    }

    /// Decimal-adjusts A after a BCD add or subtract. The carry flag is only
    /// ever raised here, never dropped; the half carry always ends cleared.
    pub(crate) fn daa(&mut self) {
        let a = self.get(Register::A);
        let subtracted = self.flag(Flag::N);
        let mut offset = 0u8;
        if self.flag(Flag::H) || (!subtracted && (a & 0x0F) > 0x09) {
            offset = 0x06;
        }
        if self.flag(Flag::C) || (!subtracted && a > 0x99) {
            offset |= 0x60;
            self.set_flag(Flag::C);
        }
        let out = if subtracted {
            a.wrapping_sub(offset)
        } else {
            a.wrapping_add(offset)
        };
        self.set(Register::A, out);
        self.assign_flag(Flag::Z, out == 0);
        self.clear_flag(Flag::H);
    }

    /// The shared rotate used by RLCA/RLA/RRCA/RRA and their prefixed forms.
    /// The rotated-out bit lands in the carry flag; bit 0 of the result is
    /// raised whenever the rotate goes through the carry or the old carry was
    /// set, in either direction.
    pub(crate) fn rotate(&mut self, value: u8, right: bool, through_carry: bool) -> u8 {
        let had_carry = self.flag(Flag::C);
        self.clear_flags();
        let out_bit = if right { 0x01 } else { 0x80 };
        self.assign_flag(Flag::C, value & out_bit != 0);
        let mut out = if right { value >> 1 } else { value << 1 };
        if through_carry || had_carry {
            out |= 0x01;
        }
        self.assign_flag(Flag::Z, out == 0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_views_of_the_byte_registers() {
        let mut cpu = Cpu::default();
        cpu.set_pair(Pair::BC, 0x1234);
        assert_eq!(cpu.get(Register::B), 0x12);
        assert_eq!(cpu.get(Register::C), 0x34);
        cpu.set(Register::H, 0xAB);
        cpu.set(Register::L, 0xCD);
        assert_eq!(cpu.pair(Pair::HL), 0xABCD);
    }

    #[test]
    fn flag_writes_keep_the_low_nibble_zero() {
        let mut cpu = Cpu::default();
        cpu.set_pair(Pair::AF, 0x00FF);
        cpu.set_flag(Flag::Z);
        assert_eq!(cpu.pair(Pair::AF) & 0x000F, 0);
        assert!(cpu.flag(Flag::Z));
    }

    #[test]
    #[should_panic]
    fn checked_guard_rejects_direct_f_reads() {
        let cpu = Cpu::new(AccessGuard::Checked);
        let _ = cpu.get(Register::F);
    }

    #[test]
    fn fast_guard_hands_back_the_raw_byte() {
        let mut cpu = Cpu::new(AccessGuard::Fast);
        cpu.set_flag(Flag::Z);
        cpu.set_flag(Flag::C);
        assert_eq!(cpu.get(Register::F), 0x90);
    }

    #[test]
    fn adc_carries_between_nibbles_and_bytes() {
        let mut cpu = Cpu::default();
        let out = cpu.adc(0x0F, 0x01);
        assert_eq!(out, 0x10);
        assert!(cpu.flag(Flag::H));
        assert!(!cpu.flag(Flag::C));
        assert!(!cpu.flag(Flag::Z));

        let out = cpu.adc(0xFF, 0x01);
        assert_eq!(out, 0x00);
        assert!(cpu.flag(Flag::C));
        assert!(cpu.flag(Flag::Z));

        // The carry from the previous add participates in the next one.
        let out = cpu.adc(0x00, 0x00);
        assert_eq!(out, 0x01);
        assert!(!cpu.flag(Flag::C));
    }

    #[test]
    fn sbc_reads_the_carry_as_a_borrow() {
        let mut cpu = Cpu::default();
        let out = cpu.sbc(0x10, 0x01);
        assert_eq!(out, 0x0F);
        assert!(!cpu.flag(Flag::C));
        assert!(cpu.flag(Flag::N));

        let out = cpu.sbc(0x00, 0x01);
        assert_eq!(out, 0xFF);
        assert!(cpu.flag(Flag::C));

        // Borrow in: 0x10 - 0x01 - 1.
        let out = cpu.sbc(0x10, 0x01);
        assert_eq!(out, 0x0E);
        assert!(!cpu.flag(Flag::C));
    }

    #[test]
    fn daa_adjusts_a_bcd_sum() {
        let mut cpu = Cpu::default();
        // 0x19 + 0x28 = 0x41; decimal 19 + 28 = 47.
        let sum = cpu.adc(0x19, 0x28);
        cpu.set(Register::A, sum);
        cpu.daa();
        assert_eq!(cpu.get(Register::A), 0x47);
        assert!(!cpu.flag(Flag::C));
    }

    #[test]
    fn rotate_feeds_bit_zero_from_the_old_carry() {
        let mut cpu = Cpu::default();
        let out = cpu.rotate(0x80, false, false);
        assert_eq!(out, 0x00);
        assert!(cpu.flag(Flag::C));
        assert!(cpu.flag(Flag::Z));

        // Carry is set now, so bit 0 comes in even without through-carry.
        let out = cpu.rotate(0x00, false, false);
        assert_eq!(out, 0x01);
        assert!(!cpu.flag(Flag::C));
        assert!(!cpu.flag(Flag::Z));
    }

    #[test]
    fn add16_derives_half_carry_from_bit_twelve() {
        let mut cpu = Cpu::default();
        let out = cpu.add16(0x0FFF, 0x0001);
        assert_eq!(out, 0x1000);
        assert!(cpu.flag(Flag::H));
        assert!(!cpu.flag(Flag::C));

        let out = cpu.add16(0x8000, 0x8000);
        assert_eq!(out, 0x0000);
        assert!(cpu.flag(Flag::C));
    }
}
