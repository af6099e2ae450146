//! Data and control hazard counting across pipeline depths

use crate::instruction::Function;
use crate::instruction::Instruction;

/// Pseudo-register indices for the multiply/divide results
pub const HI: usize = 32;
pub const LO: usize = 33;

/// GPRs plus HI and LO
const NUM_TRACKED: usize = 34;

/// Producer-to-consumer distances at or below these thresholds stall,
/// indexed `[forwarding][depth]` for depths {5, 7, 13}
const HAZARD_TABLE: [[u64; 3]; 2] = [[2, 1, 1], [1, 2, 3]];

/// How many window entries each depth inspects for the
/// forwarding load-use rule
const LOAD_LOOKBACK: [usize; 3] = [1, 2, 3];

/// Whether a register dependence delays fetch or an operand
#[derive(Clone, Copy, PartialEq, Eq)]
enum DependenceKind {
    Data,
    Control,
}

/// Tracks the most recent producer of every architectural register
/// and accumulates hazard counts per pipeline depth
pub struct HazardTracker {
    /// Retired index of the latest producer, per register
    last_write: [u64; NUM_TRACKED],
    pub data_hazards: [u64; 3],
    pub control_hazards: [u64; 3],
}

impl HazardTracker {
    pub fn make() -> Self {
        Self {
            last_write: [0; NUM_TRACKED],
            data_hazards: [0; 3],
            control_hazards: [0; 3],
        }
    }

    /// Counts the hazards the current instruction's reads incur.
    /// `retired` is the 1-based index of the instruction; `window` holds
    /// the previously retired non-NOP records, newest first
    pub fn observe_reads(
        &mut self,
        inst: &Instruction,
        function: Function,
        retired: u64,
        window: impl Iterator<Item = Instruction> + Clone,
        forwarding: bool,
    ) {
        let (kind, deps) = read_dependences(inst, function);

        for depth in 0..3 {
            // Forwarding covers every producer except a load still in
            // the memory stage, so only load-fed reads can stall
            if kind == DependenceKind::Data
                && forwarding
                && !load_within(window.clone(), LOAD_LOOKBACK[depth])
            {
                continue;
            }

            let threshold = HAZARD_TABLE[forwarding as usize][depth];
            let counter = match kind {
                DependenceKind::Data => &mut self.data_hazards[depth],
                DependenceKind::Control => &mut self.control_hazards[depth],
            };

            for reg in distinct(deps) {
                let distance = retired - self.last_write[reg];
                if threshold >= distance {
                    *counter += 1;
                }
            }
        }
    }

    /// Records the current instruction as the producer of whatever
    /// register it writes
    pub fn observe_write(
        &mut self,
        inst: &Instruction,
        function: Function,
        retired: u64,
    ) {
        use Function::*;
        match function {
            MULT | MULTU | DIV | DIVU => {
                self.last_write[HI] = retired;
                self.last_write[LO] = retired;
            }
            MTHI => self.last_write[HI] = retired,
            MTLO => self.last_write[LO] = retired,
            JALR => {
                let rd = inst.rd();
                let link = if rd == 0 { 31 } else { rd as usize };
                self.last_write[link] = retired;
            }
            JAL | BLTZAL | BGEZAL => self.last_write[31] = retired,
            // No architectural writer
            JR | SYSCALL | BREAK | J | BEQ | BNE | BLEZ | BGTZ | BLTZ
            | BGEZ | SB | SH | SWL | SW | SWR => {}
            _ => match *inst {
                Instruction::R { rd, .. } => {
                    self.last_write[rd as usize] = retired;
                }
                Instruction::I { rt, .. } => {
                    self.last_write[rt as usize] = retired;
                }
                Instruction::J { .. } => {}
            },
        }
    }

    /// An encoded NOP retires without existing for hazard purposes:
    /// bumping every producer index keeps later distances unchanged
    /// while `retired` advances past it
    pub fn skip_nop(&mut self) {
        for entry in self.last_write.iter_mut() {
            *entry += 1;
        }
    }

    #[cfg(test)]
    pub fn last_write_of(&self, reg: usize) -> u64 {
        self.last_write[reg]
    }
}

/// The registers an instruction reads, and whether the dependence
/// is consumed by the datapath or by fetch redirection
fn read_dependences(
    inst: &Instruction,
    function: Function,
) -> (DependenceKind, [Option<usize>; 2]) {
    use DependenceKind::*;
    use Function::*;

    let rs = Some(inst.rs() as usize);
    let rt = Some(inst.rt() as usize);

    match function {
        MFHI => (Data, [Some(HI), None]),
        MFLO => (Data, [Some(LO), None]),
        MTHI | MTLO => (Data, [rs, None]),
        JR | JALR => (Control, [rs, None]),
        SLL | SRL | SRA => (Data, [rt, None]),
        BEQ | BNE => (Control, [rs, rt]),
        BLEZ | BGTZ | BLTZ | BGEZ | BLTZAL | BGEZAL => (Control, [rs, None]),
        SB | SH | SWL | SW | SWR => (Data, [rs, rt]),
        LUI | SYSCALL | BREAK | J | JAL => (Data, [None, None]),
        _ => match inst {
            // Remaining R-types read both operands
            Instruction::R { .. } => (Data, [rs, rt]),
            // Remaining I-types (loads, immediate arithmetic) read rs
            Instruction::I { .. } => (Data, [rs, None]),
            Instruction::J { .. } => (Data, [None, None]),
        },
    }
}

/// Deduplicated read registers; register 0 never hazards
fn distinct(deps: [Option<usize>; 2]) -> impl Iterator<Item = usize> {
    let [a, b] = deps;
    let a = a.filter(|&reg| reg != 0);
    let b = b.filter(|&reg| reg != 0 && Some(reg) != a);
    a.into_iter().chain(b)
}

/// True if any of the `lookback` newest window entries is a load
fn load_within(
    window: impl Iterator<Item = Instruction>,
    lookback: usize,
) -> bool {
    window.take(lookback).any(|inst| {
        crate::instruction::decode::function(&inst)
            .is_some_and(|function| function.is_load())
    })
}
