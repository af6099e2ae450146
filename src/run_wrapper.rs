//! A simulator wrapper

use crate::analyzer::report::Summary;
use crate::analyzer::Analyzer;
use crate::cpu::CPUPolicy;
use crate::cpu::CPUState;
use crate::cpu::SP;
use crate::elf_helper;
use crate::error::ExecutionError;
use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::exec;
use crate::instruction::decode;
use crate::loader;
use crate::memory::Memory;
use crate::memory::Storage;

/// Runaway-loop backstop
const EXECUTION_LIMIT: u64 = 500_000_000;

/// Run simulation on the given ELF file
/// and return the analyzer's summary
pub fn run(elf_file: &str, policy: CPUPolicy) -> SimulatorResult<Summary> {
    // Load the ELF file
    let (elf_reader, elf_data_origin) = elf_helper::parse_elf_file(elf_file)?;
    let elf_data = &elf_data_origin;

    let mut cpu = CPUState::make(policy);
    let mut mem = Memory::make();

    loader::load_elf(&mut cpu, &mut mem, &elf_reader, elf_data)?;
    cpu.begin(0);
    loader::prepare_stack(&cpu, &mut mem);

    run_loaded(&mut cpu, &mut mem)
}

/// Retires instructions from the loaded image until syscall stops the
/// run. PC and NPC carry the branch-delay semantics: the instruction
/// after a branch executes before the transfer takes effect
pub fn run_loaded(
    cpu: &mut CPUState,
    mem: &mut impl Storage,
) -> SimulatorResult<Summary> {
    let mut analyzer = Analyzer::make(cpu.policy.forwarding);

    loop {
        if cpu.stack_overflow() {
            return Err(ExecutionError::StackOverflow(
                cpu.read_gpr(SP as u32),
                cpu.stack_floor,
            )
            .into());
        }
        if analyzer.retired >= EXECUTION_LIMIT {
            return Err(
                ExecutionError::ExecutionLimitReached(analyzer.retired).into()
            );
        }

        // Fetch and decode
        let pc = cpu.pc.read();
        let raw_inst = mem.read_word(pc & !3)?;
        let inst = decode::decode(raw_inst);
        let function = decode::function(&inst)
            .ok_or(SimulatorError::InvalidInstructionError(raw_inst, pc))?;

        if cpu.policy.verbose {
            eprintln!("[VERBOSE] PC: {:#010x}; {:?}", pc, function);
        }

        // Advance to the delay slot before executing, so branch
        // targets are relative to it
        cpu.pc.write(cpu.npc.read());
        cpu.npc.write(cpu.pc.read() + 4);

        // The outcome must be read off the operands before they
        // can be overwritten
        let branch_taken = exec::branch_outcome(cpu, &inst, function);

        exec::execute(cpu, mem, &inst, function)?;
        analyzer.push(&inst, branch_taken);

        if cpu.stopped {
            return Ok(analyzer.summary());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i_op(op: u32, rs: u32, rt: u32, imm: i32) -> u32 {
        (op << 26) | (rs << 21) | (rt << 16) | ((imm as u32) & 0xFFFF)
    }

    fn r_op(rs: u32, rt: u32, rd: u32, shamt: u32, func: u32) -> u32 {
        (rs << 21) | (rt << 16) | (rd << 11) | (shamt << 6) | func
    }

    fn syscall() -> u32 {
        r_op(0, 0, 0, 0, 0x0C)
    }

    fn nop() -> u32 {
        0
    }

    /// Writes `program` at address 0 and runs it to completion
    fn run_program(
        program: &[u32],
        policy: CPUPolicy,
    ) -> SimulatorResult<(CPUState, Summary)> {
        let mut cpu = CPUState::make(policy);
        let mut mem = Memory::make();
        for (index, word) in program.iter().enumerate() {
            mem.write_word(4 * index as u32, *word)?;
        }
        cpu.pc.write(0);
        cpu.begin(0);
        let summary = run_loaded(&mut cpu, &mut mem)?;
        Ok((cpu, summary))
    }

    fn forwarding() -> CPUPolicy {
        CPUPolicy { forwarding: true, ..Default::default() }
    }

    #[test]
    fn test_scenario_arith_chain() {
        let program = [
            i_op(0x08, 0, 1, 5),     // addi r1, r0, 5
            i_op(0x08, 0, 2, 7),     // addi r2, r0, 7
            r_op(1, 2, 3, 0, 0x20),  // add r3, r1, r2
            syscall(),
        ];

        let (cpu, summary) = run_program(&program, CPUPolicy::default()).unwrap();
        assert_eq!(cpu.read_gpr(1), 5);
        assert_eq!(cpu.read_gpr(2), 7);
        assert_eq!(cpu.read_gpr(3), 12);
        assert_eq!(summary.retired, 4);
        assert_eq!(summary.nops, 0);
        // Both of add's reads are close enough to stall a 5-stage pipe
        assert_eq!(summary.data_hazards[0], 2);
        assert_eq!(summary.total_branches, 0);
        // The two immediates are independent and can co-issue
        assert!(summary.super_pairs >= 1);

        // With forwarding and no loads, nothing stalls
        let (_, summary) = run_program(&program, forwarding()).unwrap();
        assert_eq!(summary.data_hazards, [0, 0, 0]);
    }

    #[test]
    fn test_scenario_untaken_branch_and_delay_slot() {
        let program = [
            i_op(0x08, 0, 1, 1), // addi r1, r0, 1
            i_op(0x04, 1, 0, 2), // beq r1, r0, +2 (not taken)
            i_op(0x08, 0, 2, 2), // addi r2, r0, 2 (delay slot)
            syscall(),
        ];

        let (cpu, summary) = run_program(&program, CPUPolicy::default()).unwrap();
        assert_eq!(cpu.read_gpr(2), 2);
        assert_eq!(summary.total_branches, 1);
        // Forward displacement predicts not-taken: correct
        assert_eq!(summary.static_mispreds, 0);
        // The initial weakly-taken counter is wrong once
        assert_eq!(summary.sat_mispreds, 1);
    }

    #[test]
    fn test_scenario_backward_loop() {
        let program = [
            i_op(0x08, 0, 1, 5),  // addi r1, r0, 5
            i_op(0x08, 1, 1, -1), // loop: addi r1, r1, -1
            i_op(0x05, 1, 0, -2), // bne r1, r0, loop
            nop(),                // delay slot
            syscall(),
        ];

        let (cpu, summary) = run_program(&program, CPUPolicy::default()).unwrap();
        assert_eq!(cpu.read_gpr(1), 0);
        // Four taken iterations plus the final fall-through
        assert_eq!(summary.total_branches, 5);
        // Backward-taken heuristic only misses the fall-through
        assert_eq!(summary.static_mispreds, 1);
        // Weakly-taken start is right until the fall-through too
        assert_eq!(summary.sat_mispreds, 1);
        assert_eq!(summary.nops, 5);
        assert_eq!(summary.retired, 1 + 3 * 5 + 1);
    }

    #[test]
    fn test_scenario_load_use_with_forwarding() {
        let program = [
            i_op(0x23, 0, 1, 0x100), // lw r1, 0x100(r0)
            r_op(1, 1, 2, 0, 0x20),  // add r2, r1, r1
            syscall(),
        ];

        let (cpu, summary) = run_program(&program, forwarding()).unwrap();
        assert_eq!(cpu.read_gpr(2), 0);
        // Load-use stalls even with forwarding, once per pipe
        assert_eq!(summary.data_hazards[0], 1);
    }

    #[test]
    fn test_scenario_lui_ori() {
        let program = [
            i_op(0x0F, 0, 1, 0x1234),         // lui r1, 0x1234
            i_op(0x0D, 1, 1, 0x5678_u32 as i32), // ori r1, r1, 0x5678
            syscall(),
        ];

        let (cpu, _) = run_program(&program, CPUPolicy::default()).unwrap();
        assert_eq!(cpu.read_gpr(1), 0x12345678);
    }

    #[test]
    fn test_scenario_overflow_terminates() {
        let program = [
            i_op(0x0F, 0, 1, 0x7FFF),            // lui r1, 0x7fff
            i_op(0x0D, 1, 1, 0xFFFF_u32 as i32), // ori r1, r1, 0xffff
            i_op(0x08, 1, 1, 1),                 // addi r1, r1, 1
            syscall(),
        ];

        let err = run_program(&program, CPUPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("integer overflow"));
    }

    #[test]
    fn test_call_and_return() {
        let program = [
            i_op(0x08, 0, 4, 3),      // addi r4, r0, 3
            (0x03 << 26) | 6,         // jal 6 (0x18)
            nop(),                    // delay slot
            syscall(),                // return lands here
            nop(),                    // padding
            nop(),                    // padding
            r_op(4, 4, 5, 0, 0x21),   // 0x18: addu r5, r4, r4
            r_op(31, 0, 0, 0, 0x08),  // jr r31
            nop(),                    // delay slot
        ];

        let (cpu, _) = run_program(&program, CPUPolicy::default()).unwrap();
        assert_eq!(cpu.read_gpr(5), 6);
        // jal linked past its delay slot
        assert_eq!(cpu.read_gpr(31), 0x0C);
    }

    #[test]
    fn test_invalid_instruction_is_reported() {
        let program = [0xFC00_0000, syscall()];
        let err = run_program(&program, CPUPolicy::default()).unwrap_err();
        assert!(matches!(err, SimulatorError::InvalidInstructionError(..)));
    }
}
