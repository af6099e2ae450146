//! Streaming microarchitectural analysis over retired instructions

pub mod hazard;
pub mod predictor;
pub mod report;
pub mod superscalar;

use std::collections::VecDeque;

use crate::instruction::decode;
use crate::instruction::Instruction;

/// Retired non-NOP records kept for the lookback rules
const WINDOW_CAPACITY: usize = 10;

/// Observes the retired instruction stream and accumulates hazard,
/// prediction, and pairing statistics. Never feeds back into the
/// architectural state.
pub struct Analyzer {
    /// Retired instructions, NOPs included
    pub retired: u64,
    /// Encoded NOPs seen
    pub nops: u64,
    forwarding: bool,
    hazards: hazard::HazardTracker,
    predictors: predictor::PredictorBank,
    pairs: superscalar::PairChecker,
    /// Newest first
    window: VecDeque<Instruction>,
}

impl Analyzer {
    pub fn make(forwarding: bool) -> Self {
        Self {
            retired: 0,
            nops: 0,
            forwarding,
            hazards: hazard::HazardTracker::make(),
            predictors: predictor::PredictorBank::make(),
            pairs: superscalar::PairChecker::make(),
            window: VecDeque::with_capacity(WINDOW_CAPACITY + 1),
        }
    }

    /// Accepts one retired instruction. `branch_taken` carries the
    /// actual outcome when the instruction was a conditional branch
    pub fn push(&mut self, inst: &Instruction, branch_taken: Option<bool>) {
        self.retired += 1;

        if inst.is_nop() {
            self.nops += 1;
            self.hazards.skip_nop();
            return;
        }

        let Some(function) = decode::function(inst) else {
            // Unclassifiable encodings retire without statistics
            return;
        };

        self.hazards.observe_reads(
            inst,
            function,
            self.retired,
            self.window.iter().copied(),
            self.forwarding,
        );
        self.hazards.observe_write(inst, function, self.retired);

        if let Some(taken) = branch_taken {
            self.predictors.observe(inst.imm(), taken);
        }

        self.window.push_front(*inst);
        if self.window.len() > WINDOW_CAPACITY {
            self.window.pop_back();
        }

        if self.window.len() >= 2 {
            self.pairs.observe(&self.window[0], &self.window[1]);
        }
    }

    /// Snapshot of every counter for reporting
    pub fn summary(&self) -> report::Summary {
        report::Summary {
            retired: self.retired,
            nops: self.nops,
            forwarding: self.forwarding,
            data_hazards: self.hazards.data_hazards,
            control_hazards: self.hazards.control_hazards,
            total_branches: self.predictors.total_branches,
            static_mispreds: self.predictors.static_mispreds,
            sat_mispreds: self.predictors.sat_mispreds,
            two_lvl_mispreds: self.predictors.two_lvl_mispreds,
            super_pairs: self.pairs.pairs,
        }
    }
}
