//! End-of-run summary

/// Pipeline depths analyzed side by side
pub const PIPELINE_DEPTHS: [u32; 3] = [5, 7, 13];

/// Redirect penalty per misprediction at each depth
const STALL_FACTORS: [u64; 3] = [1, 5, 13];

/// Every counter the analyzer accumulated, frozen for reporting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub retired: u64,
    pub nops: u64,
    pub forwarding: bool,
    pub data_hazards: [u64; 3],
    pub control_hazards: [u64; 3],
    pub total_branches: u64,
    pub static_mispreds: u64,
    pub sat_mispreds: u64,
    pub two_lvl_mispreds: u64,
    pub super_pairs: u64,
}

impl Summary {
    /// Misprediction rate in percent; zero branches reads as zero
    pub fn rate(&self, mispredictions: u64) -> f64 {
        if self.total_branches == 0 {
            0.0
        } else {
            100.0 * mispredictions as f64 / self.total_branches as f64
        }
    }

    /// Redirect stall estimate per pipeline depth
    pub fn stall_cycles(mispredictions: u64) -> [u64; 3] {
        STALL_FACTORS.map(|factor| factor * mispredictions)
    }

    /// Prints the human-readable report to stdout
    pub fn print(&self) {
        println!();
        println!("******************************");
        println!("Number of instructions: {}", self.retired);
        println!("Number of NOPs: {}", self.nops);
        println!(
            "Forwarding: {}",
            if self.forwarding { "enabled" } else { "disabled" }
        );
        for (index, depth) in PIPELINE_DEPTHS.iter().enumerate() {
            println!(
                "Hazards ({}-stage): {} data, {} control",
                depth,
                self.data_hazards[index],
                self.control_hazards[index]
            );
        }
        println!("Total number of branches: {}", self.total_branches);
        self.print_predictor("static", self.static_mispreds);
        self.print_predictor("saturating", self.sat_mispreds);
        self.print_predictor("two level", self.two_lvl_mispreds);
        println!("Superscalar pairs: {}", self.super_pairs);
        println!("******************************");
    }

    fn print_predictor(&self, name: &str, mispredictions: u64) {
        println!(
            "Wrong branch predictions ({}): {} ({:.2}%)",
            name,
            mispredictions,
            self.rate(mispredictions)
        );
        let stalls = Self::stall_cycles(mispredictions);
        println!(
            "  Stall cycles (5/7/13-stage): {}/{}/{}",
            stalls[0], stalls[1], stalls[2]
        );
    }
}
