//! Dual-issue pairing estimate.
//! Each instruction is classified into a resource group with concrete
//! read and write register sets; adjacent pairs with no resource or
//! data conflict could have been issued together.

use crate::instruction::decode;
use crate::instruction::Function;
use crate::instruction::Instruction;

use super::hazard::HI;
use super::hazard::LO;

/// Register sets are bitmasks over the 34 tracked registers
type RegSet = u64;

const EMPTY: RegSet = 0;
const R0: RegSet = 1;
const RM: RegSet = (1 << HI) | (1 << LO);
const GPRS: RegSet = ((1 << 32) - 1) & !R0;

fn reg(index: u32) -> RegSet {
    1 << index
}

/// Functional-unit resource classes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    ArithLog,
    DivMult,
    Shift,
    ShiftV,
    JumpR,
    MoveFrom,
    MoveTo,
    ArithLogI,
    LoadI,
    Branch,
    BranchZ,
    LoadStore,
    Jump,
    Trap,
}

/// Group plus the concrete registers touched
struct Classified {
    group: Group,
    reads: RegSet,
    writes: RegSet,
}

/// Counts adjacent pairs that could co-issue
pub struct PairChecker {
    pub pairs: u64,
    /// Set when the newest window entry is already half of a pair
    loaded: bool,
}

impl PairChecker {
    pub fn make() -> Self {
        Self { pairs: 0, loaded: false }
    }

    /// Examines the two newest retired records, newest first
    pub fn observe(&mut self, newer: &Instruction, older: &Instruction) {
        // An instruction already claimed by the previous pair cannot
        // anchor another one
        if self.loaded {
            self.loaded = false;
            return;
        }

        let paired = can_pair(newer, older);
        if paired {
            self.pairs += 1;
        }
        self.loaded = paired;
    }
}

fn can_pair(newer: &Instruction, older: &Instruction) -> bool {
    let (Some(a), Some(b)) = (classify(newer), classify(older)) else {
        return false;
    };

    // One functional unit of each kind, except the duplicated ALU
    if a.group == b.group
        && !matches!(a.group, Group::ArithLog | Group::ArithLogI)
    {
        return false;
    }

    // HI/LO are not renamed; any shared touch serializes the pair
    if (a.reads | a.writes) & (b.reads | b.writes) & RM != 0 {
        return false;
    }

    let raw = a.reads & b.writes;
    let war = a.writes & b.reads;
    let waw = a.writes & b.writes;
    (raw | war | waw) & GPRS == 0
}

/// Maps an instruction to its group and register sets.
/// Unknown encodings are unclassifiable
fn classify(inst: &Instruction) -> Option<Classified> {
    use Function::*;
    use Group::*;

    let function = decode::function(inst)?;
    let rs = reg(inst.rs());
    let rt = reg(inst.rt());
    let rd = reg(inst.rd());

    let (group, reads, writes) = match function {
        ADD | ADDU | SUB | SUBU | AND | OR | XOR | NOR | SLT | SLTU => {
            (ArithLog, rs | rt, rd)
        }
        MULT | MULTU | DIV | DIVU => (DivMult, rs | rt, RM),
        SLL | SRL | SRA => (Shift, rt, rd),
        SLLV | SRLV | SRAV => (ShiftV, rs | rt, rd),
        JR => (JumpR, rs, EMPTY),
        JALR => {
            let link = if inst.rd() == 0 { reg(31) } else { rd };
            (JumpR, rs, link)
        }
        MFHI => (MoveFrom, 1 << HI, rd),
        MFLO => (MoveFrom, 1 << LO, rd),
        MTHI => (MoveTo, rs, 1 << HI),
        MTLO => (MoveTo, rs, 1 << LO),
        ADDI | ADDIU | SLTI | SLTIU | ANDI | ORI | XORI => {
            (ArithLogI, rs, rt)
        }
        LUI => (LoadI, EMPTY, rt),
        BEQ | BNE => (Branch, rs | rt, EMPTY),
        BLEZ | BGTZ | BLTZ | BGEZ => (BranchZ, rs, EMPTY),
        BLTZAL | BGEZAL => (BranchZ, rs, reg(31)),
        LB | LH | LWL | LW | LBU | LHU | LWR => (LoadStore, rs, rt),
        SB | SH | SWL | SW | SWR => (LoadStore, rs | rt, EMPTY),
        J => (Jump, EMPTY, EMPTY),
        JAL => (Jump, EMPTY, reg(31)),
        SYSCALL | BREAK => (Trap, EMPTY, EMPTY),
    };

    Some(Classified { group, reads, writes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addi(rs: u32, rt: u32) -> Instruction {
        Instruction::I { op: 0x08, rs, rt, imm: 0 }
    }

    fn add(rs: u32, rt: u32, rd: u32) -> Instruction {
        Instruction::R { op: 0, rs, rt, rd, shamt: 0, func: 0x20 }
    }

    #[test]
    fn test_independent_immediates_pair() {
        // Same ArithLogI group is explicitly allowed
        assert!(can_pair(&addi(0, 2), &addi(0, 1)));
    }

    #[test]
    fn test_raw_conflict_blocks() {
        // addi r1 then add r3, r1, r2
        assert!(!can_pair(&add(1, 2, 3), &addi(0, 1)));
    }

    #[test]
    fn test_war_conflict_blocks() {
        // add r3, r1, r2 then addi writing r1
        assert!(!can_pair(&addi(0, 1), &add(1, 2, 3)));
    }

    #[test]
    fn test_waw_conflict_blocks() {
        assert!(!can_pair(&addi(0, 1), &addi(2, 1)));
    }

    #[test]
    fn test_r0_conflicts_ignored() {
        // Both "write" r0; the zero register never conflicts
        assert!(can_pair(&addi(0, 0), &add(5, 6, 0)));
    }

    #[test]
    fn test_same_group_blocks_for_non_alu() {
        let lw1 = Instruction::I { op: 0x23, rs: 1, rt: 2, imm: 0 };
        let lw2 = Instruction::I { op: 0x23, rs: 3, rt: 4, imm: 0 };
        assert!(!can_pair(&lw2, &lw1));
    }

    #[test]
    fn test_hilo_overlap_blocks() {
        let mult = Instruction::R { op: 0, rs: 1, rt: 2, rd: 0, shamt: 0, func: 0x18 };
        let mfhi = Instruction::R { op: 0, rs: 0, rt: 0, rd: 3, shamt: 0, func: 0x10 };
        let mtlo = Instruction::R { op: 0, rs: 4, rt: 0, rd: 0, shamt: 0, func: 0x13 };
        assert!(!can_pair(&mfhi, &mult));
        assert!(!can_pair(&mtlo, &mult));
        // mfhi and mflo share no counter but both touch Rm with mult;
        // against an ALU op they are free
        assert!(can_pair(&mfhi, &add(1, 2, 4)));
    }

    #[test]
    fn test_unclassifiable_blocks() {
        let bogus = Instruction::R { op: 0, rs: 1, rt: 2, rd: 3, shamt: 0, func: 0x3F };
        assert!(!can_pair(&bogus, &addi(0, 1)));
    }

    #[test]
    fn test_latch_prevents_triple_claim() {
        let mut checker = PairChecker::make();
        // Three independent immediates arrive one at a time
        checker.observe(&addi(0, 2), &addi(0, 1));
        checker.observe(&addi(0, 3), &addi(0, 2));
        assert_eq!(checker.pairs, 1);

        // A fourth pairs with the third
        checker.observe(&addi(0, 4), &addi(0, 3));
        assert_eq!(checker.pairs, 2);
    }
}
