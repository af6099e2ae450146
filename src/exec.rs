//! MIPS-I fixed-point execution semantics.
//! One call retires one instruction; the caller has already advanced
//! `pc` to the delay-slot address and set `npc = pc + 4`, so branches
//! and jumps only ever assign `npc`.

use crate::cpu::CPUState;
use crate::cpu::RA;
use crate::error::ExecutionError;
use crate::error::SimulatorResult;
use crate::instruction::Function;
use crate::instruction::Instruction;
use crate::memory::Storage;

/// Applies one instruction to the architectural state
pub fn execute(
    cpu: &mut CPUState,
    mem: &mut impl Storage,
    inst: &Instruction,
    function: Function,
) -> SimulatorResult<()> {
    use Function::*;

    let rs = cpu.read_gpr(inst.rs());
    let rt = cpu.read_gpr(inst.rt());
    let rd = inst.rd();
    let imm = inst.imm();

    match function {
        // Shifts by the immediate amount
        SLL | SRL | SRA => {
            let shamt = match *inst {
                Instruction::R { shamt, .. } => shamt,
                _ => 0,
            };
            cpu.write_gpr(rd, shift(function, rt, shamt));
        }
        // Shifts by the low 5 bits of rs
        SLLV => cpu.write_gpr(rd, shift(SLL, rt, rs & 0x1F)),
        SRLV => cpu.write_gpr(rd, shift(SRL, rt, rs & 0x1F)),
        SRAV => cpu.write_gpr(rd, shift(SRA, rt, rs & 0x1F)),

        JR => cpu.npc.write(rs),
        JALR => {
            cpu.npc.write(rs);
            let link = if rd == 0 { RA as u32 } else { rd };
            cpu.write_gpr(link, cpu.pc.read() + 4);
        }

        SYSCALL => cpu.stop(),
        BREAK => {
            return Err(ExecutionError::Breakpoint(
                cpu.pc.read().wrapping_sub(4),
            )
            .into());
        }

        MFHI => cpu.write_gpr(rd, cpu.hi.read()),
        MTHI => cpu.hi.write(rs),
        MFLO => cpu.write_gpr(rd, cpu.lo.read()),
        MTLO => cpu.lo.write(rs),

        MULT => {
            let product = i64::from(rs as i32) * i64::from(rt as i32);
            cpu.lo.write(product as u32);
            cpu.hi.write((product >> 32) as u32);
        }
        MULTU => {
            let product = u64::from(rs) * u64::from(rt);
            cpu.lo.write(product as u32);
            cpu.hi.write((product >> 32) as u32);
        }
        DIV => {
            // Division by zero is left undefined by the architecture;
            // deterministic zeros keep the run alive
            if rt == 0 {
                cpu.lo.write(0);
                cpu.hi.write(0);
            } else {
                cpu.lo.write((rs as i32).wrapping_div(rt as i32) as u32);
                cpu.hi.write((rs as i32).wrapping_rem(rt as i32) as u32);
            }
        }
        DIVU => {
            if rt == 0 {
                cpu.lo.write(0);
                cpu.hi.write(0);
            } else {
                cpu.lo.write(rs / rt);
                cpu.hi.write(rs % rt);
            }
        }

        ADD => {
            let sum = (rs as i32)
                .checked_add(rt as i32)
                .ok_or(ExecutionError::IntegerOverflow("add"))?;
            cpu.write_gpr(rd, sum as u32);
        }
        ADDU => cpu.write_gpr(rd, rs.wrapping_add(rt)),
        SUB | SUBU => cpu.write_gpr(rd, rs.wrapping_sub(rt)),
        AND => cpu.write_gpr(rd, rs & rt),
        OR => cpu.write_gpr(rd, rs | rt),
        XOR => cpu.write_gpr(rd, rs ^ rt),
        NOR => cpu.write_gpr(rd, !(rs | rt)),
        SLT => cpu.write_gpr(rd, ((rs as i32) < (rt as i32)) as u32),
        SLTU => cpu.write_gpr(rd, (rs < rt) as u32),

        BLTZ => branch(cpu, imm, (rs as i32) < 0),
        BGEZ => branch(cpu, imm, (rs as i32) >= 0),
        BLTZAL => {
            cpu.write_gpr(RA as u32, cpu.pc.read() + 4);
            branch(cpu, imm, (rs as i32) < 0);
        }
        BGEZAL => {
            cpu.write_gpr(RA as u32, cpu.pc.read() + 4);
            branch(cpu, imm, (rs as i32) >= 0);
        }
        BEQ => branch(cpu, imm, rs == rt),
        BNE => branch(cpu, imm, rs != rt),
        BLEZ => branch(cpu, imm, (rs as i32) <= 0),
        BGTZ => branch(cpu, imm, (rs as i32) > 0),

        J => cpu.npc.write(jump_target(cpu.pc.read(), inst)),
        JAL => {
            cpu.write_gpr(RA as u32, cpu.pc.read() + 4);
            cpu.npc.write(jump_target(cpu.pc.read(), inst));
        }

        ADDI => {
            let sum = (rs as i32)
                .checked_add(imm)
                .ok_or(ExecutionError::IntegerOverflow("addi"))?;
            cpu.write_gpr(inst.rt(), sum as u32);
        }
        ADDIU => cpu.write_gpr(inst.rt(), rs.wrapping_add(imm as u32)),
        SLTI => cpu.write_gpr(inst.rt(), ((rs as i32) < imm) as u32),
        SLTIU => cpu.write_gpr(inst.rt(), (rs < imm as u32) as u32),
        ANDI => cpu.write_gpr(inst.rt(), rs & zero_extend(imm)),
        ORI => cpu.write_gpr(inst.rt(), rs | zero_extend(imm)),
        XORI => cpu.write_gpr(inst.rt(), rs ^ zero_extend(imm)),
        LUI => cpu.write_gpr(inst.rt(), (imm as u32) << 16),

        LB | LBU | LH | LHU | LW | LWL | LWR => {
            let address = rs.wrapping_add(imm as u32);
            let word = mem.read_word(address & !3)?;
            let value = match function {
                LB => byte_lane(word, address) as i8 as i32 as u32,
                LBU => byte_lane(word, address) as u32,
                LH => half_lane(word, address) as i16 as i32 as u32,
                LHU => half_lane(word, address) as u32,
                LW => word,
                LWL => {
                    let offset = (address & 3) * 8;
                    (word << offset) | (rt & low_mask(offset))
                }
                LWR => {
                    let offset = (3 - (address & 3)) * 8;
                    (word >> offset) | (rt & high_mask(offset))
                }
                _ => unreachable!(),
            };
            cpu.write_gpr(inst.rt(), value);
        }

        SB | SH | SWL | SW | SWR => {
            let address = rs.wrapping_add(imm as u32);
            let old = mem.read_word(address & !3)?;
            let data = match function {
                SB => {
                    let offset = (3 - (address & 3)) * 8;
                    (old & !(0xFF << offset)) | ((rt & 0xFF) << offset)
                }
                SH => {
                    let offset = (1 - ((address & 3) >> 1)) * 16;
                    (old & !(0xFFFF << offset)) | ((rt & 0xFFFF) << offset)
                }
                SWL => {
                    let offset = (address & 3) * 8;
                    (rt >> offset) | (old & high_mask(offset))
                }
                SWR => {
                    let offset = (3 - (address & 3)) * 8;
                    (rt << offset) | (old & low_mask(offset))
                }
                SW => rt,
                _ => unreachable!(),
            };
            mem.write_word(address & !3, data)?;
        }
    }

    Ok(())
}

/// Actual outcome of a conditional branch, computed from the operand
/// values before the instruction executes. None for everything else
pub fn branch_outcome(
    cpu: &CPUState,
    inst: &Instruction,
    function: Function,
) -> Option<bool> {
    use Function::*;

    let rs = cpu.read_gpr(inst.rs()) as i32;
    let rt = cpu.read_gpr(inst.rt()) as i32;
    match function {
        BEQ => Some(rs == rt),
        BNE => Some(rs != rt),
        BLEZ => Some(rs <= 0),
        BGTZ => Some(rs > 0),
        BLTZ | BLTZAL => Some(rs < 0),
        BGEZ | BGEZAL => Some(rs >= 0),
        _ => None,
    }
}

/// Shift primitive shared by the immediate and variable forms
fn shift(function: Function, value: u32, amount: u32) -> u32 {
    match function {
        Function::SLL => value << amount,
        Function::SRL => value >> amount,
        Function::SRA => ((value as i32) >> amount) as u32,
        _ => unreachable!(),
    }
}

/// Assigns the branch target to NPC when the predicate holds.
/// `pc` already names the delay slot, so the target is relative to it
fn branch(cpu: &mut CPUState, imm: i32, taken: bool) {
    if taken {
        let target = cpu.pc.read().wrapping_add((imm << 2) as u32);
        cpu.npc.write(target);
    }
}

/// Pseudo-absolute jump target: the delay slot's 256 MiB region
/// with the 26-bit field shifted into place
fn jump_target(pc: u32, inst: &Instruction) -> u32 {
    let target = match *inst {
        Instruction::J { target, .. } => target,
        _ => 0,
    };
    (pc & 0xF000_0000) | (target << 2)
}

/// Selects the byte lane of `word` addressed by `address`;
/// lane 0 is the most significant
fn byte_lane(word: u32, address: u32) -> u8 {
    let offset = address & 3;
    ((word >> ((3 - offset) * 8)) & 0xFF) as u8
}

/// Selects the halfword lane of `word` addressed by `address`
fn half_lane(word: u32, address: u32) -> u16 {
    let offset = (address & 3) >> 1;
    ((word >> ((1 - offset) * 16)) & 0xFFFF) as u16
}

/// The low `bits` bits set; total for bits in [0, 32]
fn low_mask(bits: u32) -> u32 {
    ((1u64 << bits) - 1) as u32
}

/// The high `32 - bits` bits set; total for bits in [0, 32]
fn high_mask(bits: u32) -> u32 {
    ((u64::from(u32::MAX) << (32 - bits)) & u64::from(u32::MAX)) as u32
}

/// Zero-extends the 16-bit immediate for the logical I-type forms
fn zero_extend(imm: i32) -> u32 {
    (imm as u32) & 0xFFFF
}
