use std::path::PathBuf;

xflags::xflags! {
    /// MIPS32 instruction set simulator with pipeline analysis.
    cmd MipsSimArgs {
        /// Path to the ELF file to simulate.
        required elf_file: PathBuf

        /// Counts hazards as if operand forwarding were implemented.
        /// Only load-use dependencies stall a forwarding pipeline.
        optional -f, --forwarding

        /// Enables verbose mode, printing each retired instruction.
        /// Largely used for debugging purposes.
        optional -v, --verbose
    }
}

impl MipsSimArgs {
    pub fn to_policy(&self) -> crate::cpu::CPUPolicy {
        crate::cpu::CPUPolicy {
            verbose: self.verbose,
            forwarding: self.forwarding,
        }
    }
}
