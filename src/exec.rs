//! The fetch-decode-execute loop and the semantics of every instruction
//! family. Decode lives in [`crate::opcode`]; the arithmetic primitives live
//! on [`Cpu`](crate::cpu::Cpu); this module wires them to memory, the stack,
//! and the program counter.

use tracing::trace;

use crate::cpu::{Flag, Pair, Register};
use crate::opcode::{
    bit_index, exact, AluOp, Misc1Slot, Misc2Slot, OpcodeGroup, Operand, PairAddress, PrefixGroup,
    PrefixMiscOp, WidePair, HALT, PREFIX,
};
use crate::GameBoy;

impl GameBoy {
    /// Fetches, decodes, and executes exactly one instruction.
    pub fn step(&mut self) {
        let byte = self.fetch_byte();
        trace!("0x{:0>4X}: opcode 0x{byte:0>2X}", self.cpu.pc.wrapping_sub(1));
        match OpcodeGroup::classify(byte) {
            OpcodeGroup::Misc1 => self.execute_misc1(byte),
            OpcodeGroup::Load => self.execute_load(byte),
            OpcodeGroup::Arith => {
                let operand = self.read_operand(Operand::src(byte));
                self.execute_alu(AluOp::decode(byte), operand);
            }
            OpcodeGroup::Misc2 => self.execute_misc2(byte),
        }
    }

    fn fetch_byte(&mut self) -> u8 {
        let byte = self.mmu.get_byte(self.cpu.pc);
        self.cpu.pc = self.cpu.pc.wrapping_add(1);
        byte
    }

    fn fetch_double(&mut self) -> u16 {
        let value = self.mmu.get_double(self.cpu.pc);
        self.cpu.pc = self.cpu.pc.wrapping_add(2);
        value
    }

    fn read_operand(&self, op: Operand) -> u8 {
        match op {
            Operand::Reg(reg) => self.cpu.get(reg),
            Operand::HlIndirect => self.mmu.get_byte(self.cpu.pair(Pair::HL)),
        }
    }

    fn write_operand(&mut self, op: Operand, value: u8) {
        match op {
            Operand::Reg(reg) => self.cpu.set(reg, value),
            Operand::HlIndirect => self.mmu.set_byte(self.cpu.pair(Pair::HL), value),
        }
    }

    fn read_wide(&self, pair: WidePair) -> u16 {
        match pair {
            WidePair::BC => self.cpu.pair(Pair::BC),
            WidePair::DE => self.cpu.pair(Pair::DE),
            WidePair::HL => self.cpu.pair(Pair::HL),
            WidePair::Sp => self.cpu.sp,
        }
    }

    fn write_wide(&mut self, pair: WidePair, value: u16) {
        match pair {
            WidePair::BC => self.cpu.set_pair(Pair::BC, value),
            WidePair::DE => self.cpu.set_pair(Pair::DE, value),
            WidePair::HL => self.cpu.set_pair(Pair::HL, value),
            WidePair::Sp => self.cpu.sp = value,
        }
    }

    /// Resolves a `(BC)`/`(DE)`/`(HL+)`/`(HL-)` operand. The HL forms step
    /// the pair after the address is taken.
    fn pair_address(&mut self, target: PairAddress) -> u16 {
        match target {
            PairAddress::BC => self.cpu.pair(Pair::BC),
            PairAddress::DE => self.cpu.pair(Pair::DE),
            PairAddress::HlInc => {
                let addr = self.cpu.pair(Pair::HL);
                self.cpu.set_pair(Pair::HL, addr.wrapping_add(1));
                addr
            }
            PairAddress::HlDec => {
                let addr = self.cpu.pair(Pair::HL);
                self.cpu.set_pair(Pair::HL, addr.wrapping_sub(1));
                addr
            }
        }
    }

    fn execute_misc1(&mut self, byte: u8) {
        match Misc1Slot::decode(byte) {
            Misc1Slot::LdPairImm => {
                let value = self.fetch_double();
                self.write_wide(WidePair::decode(byte), value);
            }
            Misc1Slot::StoreA => {
                let value = self.cpu.get(Register::A);
                let addr = self.pair_address(PairAddress::decode(byte));
                self.mmu.set_byte(addr, value);
            }
            Misc1Slot::LoadA => {
                let addr = self.pair_address(PairAddress::decode(byte));
                let value = self.mmu.get_byte(addr);
                self.cpu.set(Register::A, value);
            }
            Misc1Slot::IncPair => {
                let pair = WidePair::decode(byte);
                let value = self.read_wide(pair).wrapping_add(1);
                self.write_wide(pair, value);
            }
            Misc1Slot::DecPair => {
                let pair = WidePair::decode(byte);
                let value = self.read_wide(pair).wrapping_sub(1);
                self.write_wide(pair, value);
            }
            // INC and DEC are add/sub-with-carry with the carry cleared
            // first, so they rewrite C along with the other flags.
            Misc1Slot::IncReg => {
                let op = Operand::dst(byte);
                self.cpu.clear_flag(Flag::C);
                let a = self.read_operand(op);
                let out = self.cpu.adc(a, 1);
                self.write_operand(op, out);
            }
            Misc1Slot::DecReg => {
                let op = Operand::dst(byte);
                self.cpu.clear_flag(Flag::C);
                let a = self.read_operand(op);
                let out = self.cpu.sbc(a, 1);
                self.write_operand(op, out);
            }
            Misc1Slot::LdImm => {
                let value = self.fetch_byte();
                self.write_operand(Operand::dst(byte), value);
            }
            Misc1Slot::AddHlPair => {
                let value = self.read_wide(WidePair::decode(byte));
                let hl = self.cpu.pair(Pair::HL);
                let out = self.cpu.add16(hl, value);
                self.cpu.set_pair(Pair::HL, out);
                self.cpu.clear_flag(Flag::N);
                self.cpu.assign_flag(Flag::Z, out == 0);
            }
            Misc1Slot::Exact => self.execute_misc1_exact(byte),
        }
    }

    fn execute_misc1_exact(&mut self, byte: u8) {
        match byte {
            exact::NOP => {}
            // STOP would power the clock down until a button press.
            exact::STOP => {}
            exact::JR => {
                let offset = self.fetch_byte();
                self.short_jump(offset);
            }
            exact::JR_NZ => {
                let offset = self.fetch_byte();
                if !self.cpu.flag(Flag::Z) {
                    self.short_jump(offset);
                }
            }
            exact::JR_Z => {
                let offset = self.fetch_byte();
                if self.cpu.flag(Flag::Z) {
                    self.short_jump(offset);
                }
            }
            exact::JR_NC => {
                let offset = self.fetch_byte();
                if !self.cpu.flag(Flag::C) {
                    self.short_jump(offset);
                }
            }
            exact::JR_C => {
                let offset = self.fetch_byte();
                if self.cpu.flag(Flag::C) {
                    self.short_jump(offset);
                }
            }
            exact::RLCA => self.rotate_operand(Operand::Reg(Register::A), false, false),
            exact::RLA => self.rotate_operand(Operand::Reg(Register::A), false, true),
            exact::RRCA => self.rotate_operand(Operand::Reg(Register::A), true, false),
            exact::RRA => self.rotate_operand(Operand::Reg(Register::A), true, true),
            exact::DAA => self.cpu.daa(),
            exact::SCF => self.cpu.set_flag(Flag::C),
            exact::CCF => self.cpu.toggle_flag(Flag::C),
            exact::CPL => {
                let a = self.cpu.get(Register::A);
                self.cpu.set(Register::A, !a);
            }
            exact::LD_MEM_SP => {
                let addr = self.fetch_double();
                self.mmu.set_double(addr, self.cpu.sp);
            }
            _ => {}
        }
    }

    fn execute_load(&mut self, byte: u8) {
        // HALT would idle until an interrupt; without an interrupt
        // controller the loop just keeps fetching.
        if byte == HALT {
            return;
        }
        let value = self.read_operand(Operand::src(byte));
        self.write_operand(Operand::dst(byte), value);
    }

    fn execute_alu(&mut self, op: AluOp, operand: u8) {
        let a = self.cpu.get(Register::A);
        match op {
            AluOp::Add => {
                self.cpu.clear_flag(Flag::C);
                let out = self.cpu.adc(a, operand);
                self.cpu.set(Register::A, out);
            }
            AluOp::Adc => {
                let out = self.cpu.adc(a, operand);
                self.cpu.set(Register::A, out);
            }
            AluOp::Sub => {
                self.cpu.clear_flag(Flag::C);
                let out = self.cpu.sbc(a, operand);
                self.cpu.set(Register::A, out);
            }
            AluOp::Sbc => {
                let out = self.cpu.sbc(a, operand);
                self.cpu.set(Register::A, out);
            }
            AluOp::And => {
                self.cpu.clear_flags();
                let out = a & operand;
                self.cpu.set(Register::A, out);
                self.cpu.set_flag(Flag::H);
                self.cpu.assign_flag(Flag::Z, out == 0);
            }
            AluOp::Xor => {
                self.cpu.clear_flags();
                let out = a ^ operand;
                self.cpu.set(Register::A, out);
                self.cpu.assign_flag(Flag::Z, out == 0);
            }
            AluOp::Or => {
                self.cpu.clear_flags();
                let out = a | operand;
                self.cpu.set(Register::A, out);
                self.cpu.assign_flag(Flag::Z, out == 0);
            }
            // Compare is a subtract with the result dropped.
            AluOp::Cp => {
                self.cpu.clear_flags();
                let _ = self.cpu.sbc(a, operand);
            }
        }
    }

    fn execute_misc2(&mut self, byte: u8) {
        match Misc2Slot::decode(byte) {
            Misc2Slot::Pop => {
                let value = self.pop_double();
                self.write_wide(WidePair::decode(byte), value);
            }
            Misc2Slot::Push => {
                let value = self.read_wide(WidePair::decode(byte));
                self.push_double(value);
            }
            Misc2Slot::ArithImm => {
                let operand = self.fetch_byte();
                self.execute_alu(AluOp::decode(byte), operand);
            }
            Misc2Slot::Rst => {
                let pc = self.cpu.pc;
                self.push_double(pc);
                self.cpu.pc = (byte & 0x38) as u16;
            }
            Misc2Slot::Exact => self.execute_misc2_exact(byte),
        }
    }

    fn execute_misc2_exact(&mut self, byte: u8) {
        match byte {
            exact::RET => self.ret(),
            // RETI would also re-enable interrupts; there is no interrupt
            // controller to enable.
            exact::RETI => self.ret(),
            exact::RET_NZ => {
                if !self.cpu.flag(Flag::Z) {
                    self.ret();
                }
            }
            exact::RET_Z => {
                if self.cpu.flag(Flag::Z) {
                    self.ret();
                }
            }
            exact::RET_NC => {
                if !self.cpu.flag(Flag::C) {
                    self.ret();
                }
            }
            exact::RET_C => {
                if self.cpu.flag(Flag::C) {
                    self.ret();
                }
            }
            exact::JP => {
                let addr = self.fetch_double();
                self.cpu.pc = addr;
            }
            exact::JP_HL => self.cpu.pc = self.cpu.pair(Pair::HL),
            exact::JP_NZ => {
                let addr = self.fetch_double();
                if !self.cpu.flag(Flag::Z) {
                    self.cpu.pc = addr;
                }
            }
            exact::JP_Z => {
                let addr = self.fetch_double();
                if self.cpu.flag(Flag::Z) {
                    self.cpu.pc = addr;
                }
            }
            exact::JP_NC => {
                let addr = self.fetch_double();
                if !self.cpu.flag(Flag::C) {
                    self.cpu.pc = addr;
                }
            }
            exact::JP_C => {
                let addr = self.fetch_double();
                if self.cpu.flag(Flag::C) {
                    self.cpu.pc = addr;
                }
            }
            exact::CALL => {
                let addr = self.fetch_double();
                self.call(addr);
            }
            exact::CALL_NZ => {
                let addr = self.fetch_double();
                if !self.cpu.flag(Flag::Z) {
                    self.call(addr);
                }
            }
            exact::CALL_Z => {
                let addr = self.fetch_double();
                if self.cpu.flag(Flag::Z) {
                    self.call(addr);
                }
            }
            exact::CALL_NC => {
                let addr = self.fetch_double();
                if !self.cpu.flag(Flag::C) {
                    self.call(addr);
                }
            }
            exact::CALL_C => {
                let addr = self.fetch_double();
                if self.cpu.flag(Flag::C) {
                    self.call(addr);
                }
            }
            exact::LDH_MEM_A => {
                let offset = self.fetch_byte();
                let value = self.cpu.get(Register::A);
                self.mmu.set_zero_page_byte(offset, value);
            }
            exact::LDH_A_MEM => {
                let offset = self.fetch_byte();
                let value = self.mmu.zero_page_byte(offset);
                self.cpu.set(Register::A, value);
            }
            exact::LD_CPORT_A => {
                let offset = self.cpu.get(Register::C);
                let value = self.cpu.get(Register::A);
                self.mmu.set_zero_page_byte(offset, value);
            }
            exact::LD_A_CPORT => {
                let offset = self.cpu.get(Register::C);
                let value = self.mmu.zero_page_byte(offset);
                self.cpu.set(Register::A, value);
            }
            exact::LD_MEM_A => {
                let addr = self.fetch_double();
                let value = self.cpu.get(Register::A);
                self.mmu.set_byte(addr, value);
            }
            exact::LD_A_MEM => {
                let addr = self.fetch_double();
                let value = self.mmu.get_byte(addr);
                self.cpu.set(Register::A, value);
            }
            exact::LD_SP_HL => self.cpu.sp = self.cpu.pair(Pair::HL),
            exact::LD_HL_SP_OFFSET => {
                self.cpu.clear_flags();
                let offset = self.fetch_byte();
                let sp = self.cpu.sp;
                let out = self.cpu.add16(sp, offset as u16);
                self.cpu.set_pair(Pair::HL, out);
            }
            exact::ADD_SP => {
                self.cpu.clear_flags();
                let offset = self.fetch_byte();
                let sp = self.cpu.sp;
                let out = self.cpu.add16(sp, offset as u16);
                self.cpu.sp = out;
            }
            // The interrupt master-enable has nothing to switch here.
            exact::DI | exact::EI => {}
            PREFIX => self.execute_prefixed(),
            // The remaining encodings in this group were never assigned by
            // the hardware; they fall through as no-ops.
            _ => {}
        }
    }

    fn execute_prefixed(&mut self) {
        let byte = self.fetch_byte();
        let op = Operand::src(byte);
        match PrefixGroup::classify(byte) {
            PrefixGroup::Misc => {
                let right = byte & 0x08 != 0;
                match PrefixMiscOp::decode(byte) {
                    PrefixMiscOp::Rotate => self.rotate_operand(op, right, false),
                    PrefixMiscOp::RotateThruCarry => self.rotate_operand(op, right, true),
                    PrefixMiscOp::Shift => {
                        self.cpu.clear_flags();
                        let mut value = self.read_operand(op);
                        if right {
                            // Arithmetic shift: the sign bit is propagated.
                            self.cpu.assign_flag(Flag::C, value & 0x01 != 0);
                            value >>= 1;
                            if value & 0x40 != 0 {
                                value |= 0x80;
                            }
                        } else {
                            self.cpu.assign_flag(Flag::C, value & 0x80 != 0);
                            value <<= 1;
                        }
                        self.write_operand(op, value);
                        self.cpu.assign_flag(Flag::Z, value != 0);
                    }
                    PrefixMiscOp::SwapShift => {
                        self.cpu.clear_flags();
                        let mut value = self.read_operand(op);
                        if right {
                            // Logical shift: the top bit comes in as zero.
                            self.cpu.assign_flag(Flag::C, value & 0x01 != 0);
                            value >>= 1;
                        } else {
                            value = (value >> 4) | (value << 4);
                        }
                        self.write_operand(op, value);
                        self.cpu.assign_flag(Flag::Z, value != 0);
                    }
                }
            }
            PrefixGroup::TestBit => {
                let value = self.read_operand(op);
                self.cpu
                    .assign_flag(Flag::Z, value & (1 << bit_index(byte)) != 0);
                self.cpu.clear_flag(Flag::N);
                self.cpu.set_flag(Flag::H);
            }
            PrefixGroup::ClearBit => {
                let value = self.read_operand(op);
                self.write_operand(op, value & !(1 << bit_index(byte)));
            }
            PrefixGroup::SetBit => {
                let value = self.read_operand(op);
                self.write_operand(op, value | (1 << bit_index(byte)));
            }
        }
    }

    fn rotate_operand(&mut self, op: Operand, right: bool, through_carry: bool) {
        let value = self.read_operand(op);
        let out = self.cpu.rotate(value, right, through_carry);
        self.write_operand(op, out);
    }

    /// Relative jumps add the offset byte without sign extension; a backward
    /// hop is only reachable through wrap-around.
    fn short_jump(&mut self, offset: u8) {
        self.cpu.pc = self.cpu.pc.wrapping_add(offset as u16);
    }

    /// Pushes the address of the byte after the 2-byte target, then jumps.
    fn call(&mut self, addr: u16) {
        let pc = self.cpu.pc;
        self.push_double(pc);
        self.cpu.pc = addr;
    }

    fn ret(&mut self) {
        self.cpu.pc = self.pop_double();
    }

    fn push(&mut self, value: u8) {
        self.cpu.sp = self.cpu.sp.wrapping_sub(1);
        self.mmu.set_byte(self.cpu.sp, value);
    }

    /// The low byte goes first, leaving the high byte on top of the stack.
    fn push_double(&mut self, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push(lo);
        self.push(hi);
    }

    fn pop(&mut self) -> u8 {
        let value = self.mmu.get_byte(self.cpu.sp);
        self.cpu.sp = self.cpu.sp.wrapping_add(1);
        value
    }

    fn pop_double(&mut self) -> u16 {
        let hi = self.pop();
        let lo = self.pop();
        u16::from_be_bytes([hi, lo])
    }
}
