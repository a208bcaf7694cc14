//! The opcode space pulled apart into its sub-byte fields.
//!
//! Decoding happens in layers. The top two bits split the space into four
//! groups; within the two miscellaneous groups the low nibble picks a slot
//! shared by a whole family of instructions, and whatever is left is matched
//! as an exact byte. Every decode here is total: an opcode byte always lands
//! somewhere, and bytes the hardware never assigned fall through as no-ops at
//! the execution layer.

use crate::cpu::Register;

/// The HALT encoding, which punches a hole in the load group.
pub const HALT: u8 = 0x76;

/// The prefix byte that opens the extended (bit/rotate/shift) opcode space.
pub const PREFIX: u8 = 0xCB;

/// The four top-level groups, selected by the top two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeGroup {
    /// 0x00..=0x3F: immediate loads, inc/dec, rotates, relative jumps.
    Misc1,
    /// 0x40..=0x7F: register-to-register loads (and HALT).
    Load,
    /// 0x80..=0xBF: accumulator arithmetic over the operand space.
    Arith,
    /// 0xC0..=0xFF: control flow, stack ops, I/O loads, the prefix.
    Misc2,
}

impl OpcodeGroup {
    pub const fn classify(byte: u8) -> Self {
        match byte >> 6 {
            0 => OpcodeGroup::Misc1,
            1 => OpcodeGroup::Load,
            2 => OpcodeGroup::Arith,
            3 => OpcodeGroup::Misc2,
            _ => unreachable!(),
        }
    }
}

/// A 3-bit operand field: one of the seven byte registers or the byte behind
/// HL. Both the load-group source/destination fields and the arithmetic and
/// prefixed operand fields use this mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Reg(Register),
    /// Memory at the address in HL.
    HlIndirect,
}

impl Operand {
    /// The destination field, bits 5-3.
    pub const fn dst(byte: u8) -> Self {
        Self::from_bits(byte >> 3)
    }

    /// The source field, bits 2-0.
    pub const fn src(byte: u8) -> Self {
        Self::from_bits(byte)
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Operand::Reg(Register::B),
            1 => Operand::Reg(Register::C),
            2 => Operand::Reg(Register::D),
            3 => Operand::Reg(Register::E),
            4 => Operand::Reg(Register::H),
            5 => Operand::Reg(Register::L),
            6 => Operand::HlIndirect,
            _ => Operand::Reg(Register::A),
        }
    }
}

/// The 2-bit wide-operand field (bits 5-4) as used by the 16-bit loads,
/// inc/dec, ADD HL, and the stack ops. Slot 3 is SP for all of them; the
/// push/pop family inherits that, so there is no encodable PUSH/POP AF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidePair {
    BC,
    DE,
    HL,
    Sp,
}

impl WidePair {
    pub const fn decode(byte: u8) -> Self {
        match (byte >> 4) & 0x03 {
            0 => WidePair::BC,
            1 => WidePair::DE,
            2 => WidePair::HL,
            _ => WidePair::Sp,
        }
    }
}

/// The 2-bit pair-address field used by the `LD (rr),A` / `LD A,(rr)` slots.
/// Slots 2 and 3 both address through HL, stepping it after the access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairAddress {
    BC,
    DE,
    HlInc,
    HlDec,
}

impl PairAddress {
    pub const fn decode(byte: u8) -> Self {
        match (byte >> 4) & 0x03 {
            0 => PairAddress::BC,
            1 => PairAddress::DE,
            2 => PairAddress::HlInc,
            _ => PairAddress::HlDec,
        }
    }
}

/// The eight accumulator operations, from bits 5-3. The same field decodes
/// the register-operand forms (0x80..=0xBF) and the immediate forms in the
/// final group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    pub const fn decode(byte: u8) -> Self {
        match (byte >> 3) & 0x07 {
            0 => AluOp::Add,
            1 => AluOp::Adc,
            2 => AluOp::Sub,
            3 => AluOp::Sbc,
            4 => AluOp::And,
            5 => AluOp::Xor,
            6 => AluOp::Or,
            _ => AluOp::Cp,
        }
    }
}

/// Low-nibble slotting of the first miscellaneous group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Misc1Slot {
    /// 0xN1: `LD rr,d16`.
    LdPairImm,
    /// 0xN2: `LD (rr),A` with the auto-stepping HL forms.
    StoreA,
    /// 0xN3: `INC rr`.
    IncPair,
    /// 0xN4 / 0xNC: `INC r`.
    IncReg,
    /// 0xN5 / 0xND: `DEC r`.
    DecReg,
    /// 0xN6 / 0xNE: `LD r,d8`.
    LdImm,
    /// 0xN9: `ADD HL,rr`.
    AddHlPair,
    /// 0xNA: `LD A,(rr)`.
    LoadA,
    /// 0xNB: `DEC rr`.
    DecPair,
    /// Nibbles 0, 7, 8, F: matched as exact bytes.
    Exact,
}

impl Misc1Slot {
    pub const fn decode(byte: u8) -> Self {
        match byte & 0x0F {
            0x1 => Misc1Slot::LdPairImm,
            0x2 => Misc1Slot::StoreA,
            0x3 => Misc1Slot::IncPair,
            0x4 | 0xC => Misc1Slot::IncReg,
            0x5 | 0xD => Misc1Slot::DecReg,
            0x6 | 0xE => Misc1Slot::LdImm,
            0x9 => Misc1Slot::AddHlPair,
            0xA => Misc1Slot::LoadA,
            0xB => Misc1Slot::DecPair,
            _ => Misc1Slot::Exact,
        }
    }
}

/// Low-nibble slotting of the final miscellaneous group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Misc2Slot {
    /// 0xN1: `POP rr`.
    Pop,
    /// 0xN5: `PUSH rr`.
    Push,
    /// 0xN6 / 0xNE: accumulator arithmetic with an immediate operand.
    ArithImm,
    /// 0xN7 / 0xNF: `RST`, vector in bits 5-3.
    Rst,
    /// Everything else: matched as exact bytes.
    Exact,
}

impl Misc2Slot {
    pub const fn decode(byte: u8) -> Self {
        match byte & 0x0F {
            0x1 => Misc2Slot::Pop,
            0x5 => Misc2Slot::Push,
            0x6 | 0xE => Misc2Slot::ArithImm,
            0x7 | 0xF => Misc2Slot::Rst,
            _ => Misc2Slot::Exact,
        }
    }
}

/// Top-level split of the prefixed (0xCB) space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixGroup {
    /// 0x00..=0x3F: rotates, shifts, and swaps.
    Misc,
    /// 0x40..=0x7F: `BIT b,r`.
    TestBit,
    /// 0x80..=0xBF: `RES b,r`.
    ClearBit,
    /// 0xC0..=0xFF: `SET b,r`.
    SetBit,
}

impl PrefixGroup {
    pub const fn classify(byte: u8) -> Self {
        match byte >> 6 {
            0 => PrefixGroup::Misc,
            1 => PrefixGroup::TestBit,
            2 => PrefixGroup::ClearBit,
            3 => PrefixGroup::SetBit,
            _ => unreachable!(),
        }
    }
}

/// The rotate/shift/swap family within the prefixed space, from bits 5-4.
/// Bit 3 selects the rightward form in every row (SRL in the swap row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixMiscOp {
    Rotate,
    RotateThruCarry,
    Shift,
    SwapShift,
}

impl PrefixMiscOp {
    pub const fn decode(byte: u8) -> Self {
        match (byte >> 4) & 0x03 {
            0 => PrefixMiscOp::Rotate,
            1 => PrefixMiscOp::RotateThruCarry,
            2 => PrefixMiscOp::Shift,
            _ => PrefixMiscOp::SwapShift,
        }
    }
}

/// The bit-index field of the prefixed bit operations.
pub const fn bit_index(byte: u8) -> u8 {
    (byte >> 3) & 0x07
}

/// The residual single-purpose opcodes, matched exactly after slotting.
pub mod exact {
    pub const NOP: u8 = 0x00;
    pub const STOP: u8 = 0x10;

    pub const JR: u8 = 0x18;
    pub const JR_NZ: u8 = 0x20;
    pub const JR_Z: u8 = 0x28;
    pub const JR_NC: u8 = 0x30;
    pub const JR_C: u8 = 0x38;

    pub const RLCA: u8 = 0x07;
    pub const RLA: u8 = 0x17;
    pub const RRCA: u8 = 0x0F;
    pub const RRA: u8 = 0x1F;

    pub const LD_MEM_SP: u8 = 0x08;
    pub const DAA: u8 = 0x27;
    pub const SCF: u8 = 0x37;
    pub const CPL: u8 = 0x2F;
    pub const CCF: u8 = 0x3F;

    pub const RET_NZ: u8 = 0xC0;
    pub const RET_Z: u8 = 0xC8;
    pub const RET_NC: u8 = 0xD0;
    pub const RET_C: u8 = 0xD8;
    pub const RET: u8 = 0xC9;
    pub const RETI: u8 = 0xD9;

    pub const JP_NZ: u8 = 0xC2;
    pub const JP_Z: u8 = 0xCA;
    pub const JP_NC: u8 = 0xD2;
    pub const JP_C: u8 = 0xDA;
    pub const JP: u8 = 0xC3;
    pub const JP_HL: u8 = 0xE9;

    pub const CALL_NZ: u8 = 0xC4;
    pub const CALL_Z: u8 = 0xCC;
    pub const CALL_NC: u8 = 0xD4;
    pub const CALL_C: u8 = 0xDC;
    pub const CALL: u8 = 0xCD;

    pub const LDH_MEM_A: u8 = 0xE0;
    pub const LDH_A_MEM: u8 = 0xF0;
    pub const LD_CPORT_A: u8 = 0xE2;
    pub const LD_A_CPORT: u8 = 0xF2;
    pub const LD_MEM_A: u8 = 0xEA;
    pub const LD_A_MEM: u8 = 0xFA;

    pub const ADD_SP: u8 = 0xE8;
    pub const LD_HL_SP_OFFSET: u8 = 0xF8;
    pub const LD_SP_HL: u8 = 0xF9;

    pub const DI: u8 = 0xF3;
    pub const EI: u8 = 0xFB;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_lands_in_a_group() {
        assert_eq!(OpcodeGroup::classify(0x00), OpcodeGroup::Misc1);
        assert_eq!(OpcodeGroup::classify(0x3F), OpcodeGroup::Misc1);
        assert_eq!(OpcodeGroup::classify(0x40), OpcodeGroup::Load);
        assert_eq!(OpcodeGroup::classify(HALT), OpcodeGroup::Load);
        assert_eq!(OpcodeGroup::classify(0x80), OpcodeGroup::Arith);
        assert_eq!(OpcodeGroup::classify(0xBF), OpcodeGroup::Arith);
        assert_eq!(OpcodeGroup::classify(0xC0), OpcodeGroup::Misc2);
        assert_eq!(OpcodeGroup::classify(0xFF), OpcodeGroup::Misc2);
    }

    #[test]
    fn operand_fields_cover_the_eight_way_space() {
        // LD D,(HL) = 0x56: dst bits 010, src bits 110.
        assert_eq!(Operand::dst(0x56), Operand::Reg(Register::D));
        assert_eq!(Operand::src(0x56), Operand::HlIndirect);
        // LD (HL),A = 0x77.
        assert_eq!(Operand::dst(0x77), Operand::HlIndirect);
        assert_eq!(Operand::src(0x77), Operand::Reg(Register::A));
    }

    #[test]
    fn stack_ops_share_the_wide_pair_table() {
        assert_eq!(WidePair::decode(0xC5), WidePair::BC);
        assert_eq!(WidePair::decode(0xD5), WidePair::DE);
        assert_eq!(WidePair::decode(0xE5), WidePair::HL);
        // Slot 3 is SP, even for PUSH/POP.
        assert_eq!(WidePair::decode(0xF5), WidePair::Sp);
    }

    #[test]
    fn misc_slots_pick_up_the_repeating_columns() {
        assert_eq!(Misc1Slot::decode(0x21), Misc1Slot::LdPairImm);
        assert_eq!(Misc1Slot::decode(0x32), Misc1Slot::StoreA);
        assert_eq!(Misc1Slot::decode(0x04), Misc1Slot::IncReg);
        assert_eq!(Misc1Slot::decode(0x3C), Misc1Slot::IncReg);
        assert_eq!(Misc1Slot::decode(0x35), Misc1Slot::DecReg);
        assert_eq!(Misc1Slot::decode(0x36), Misc1Slot::LdImm);
        assert_eq!(Misc1Slot::decode(0x18), Misc1Slot::Exact);

        assert_eq!(Misc2Slot::decode(0xF1), Misc2Slot::Pop);
        assert_eq!(Misc2Slot::decode(0xC5), Misc2Slot::Push);
        assert_eq!(Misc2Slot::decode(0xFE), Misc2Slot::ArithImm);
        assert_eq!(Misc2Slot::decode(0xEF), Misc2Slot::Rst);
        assert_eq!(Misc2Slot::decode(PREFIX), Misc2Slot::Exact);
    }

    #[test]
    fn arith_ops_decode_from_the_middle_bits() {
        assert_eq!(AluOp::decode(0x80), AluOp::Add);
        assert_eq!(AluOp::decode(0x96), AluOp::Sub);
        assert_eq!(AluOp::decode(0xAF), AluOp::Xor);
        assert_eq!(AluOp::decode(0xBF), AluOp::Cp);
        // The immediate forms reuse the same field.
        assert_eq!(AluOp::decode(0xCE), AluOp::Adc);
        assert_eq!(AluOp::decode(0xFE), AluOp::Cp);
    }

    #[test]
    fn prefixed_space_splits_on_the_top_bits() {
        assert_eq!(PrefixGroup::classify(0x11), PrefixGroup::Misc);
        assert_eq!(PrefixGroup::classify(0x47), PrefixGroup::TestBit);
        assert_eq!(PrefixGroup::classify(0x86), PrefixGroup::ClearBit);
        assert_eq!(PrefixGroup::classify(0xC7), PrefixGroup::SetBit);
        assert_eq!(PrefixMiscOp::decode(0x00), PrefixMiscOp::Rotate);
        assert_eq!(PrefixMiscOp::decode(0x11), PrefixMiscOp::RotateThruCarry);
        assert_eq!(PrefixMiscOp::decode(0x27), PrefixMiscOp::Shift);
        assert_eq!(PrefixMiscOp::decode(0x37), PrefixMiscOp::SwapShift);
        assert_eq!(bit_index(0x7E), 7);
    }
}
