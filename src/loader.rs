//! Utility functions for preparing the CPU and memory for execution

use object::read::elf::*;

use crate::cpu::CPUState;
use crate::cpu::SP;
use crate::elf_helper::*;
use crate::error::ElfError;
use crate::error::SimulatorResult;
use crate::memory::Memory;

/// Pre-allocates the current hart's stack region.
/// `begin` has already placed the stack pointer
pub fn prepare_stack(cpu: &CPUState, mem: &mut Memory) {
    let sp = cpu.read_gpr(SP as u32);

    // Touch every page between the floor and the initial SP
    let mut address = cpu.stack_floor;
    while address <= sp {
        mem.allocate_page(address);
        address += 4096;
    }
    mem.allocate_page(sp);
}

/// Loads an ELF file for the CPU
pub fn load_elf(
    cpu: &mut CPUState,
    mem: &mut Memory,
    elf_reader: &ELFReaderType,
    elf_data: &[u8],
) -> SimulatorResult<()> {
    let endian = get_elf_endian(elf_reader)?;

    ensure_mips(elf_reader)?;

    // Set program entry
    let entry = get_elf_entry(elf_reader)?;
    cpu.pc.write(entry);

    if cpu.policy.verbose {
        eprintln!("[VERBOSE] Initial PC: {:#010x}", cpu.pc.read());
    }

    // Get all segments (program headers)
    let segments = get_elf_segments(elf_reader, elf_data)?;
    for segment in segments {
        // Load the segment into memory

        let memory_size = segment.p_memsz(endian);
        let virtual_address = segment.p_vaddr(endian);
        let file_size = segment.p_filesz(endian);

        // Can't handle with 32b memory
        if virtual_address.checked_add(memory_size).is_none() {
            return Err(ElfError::AddressOutOfBounds(virtual_address).into());
        }

        if cpu.policy.verbose {
            eprintln!("[VERBOSE] Loading segment:");
            eprintln!("[VERBOSE] Virtual address: {:#010x}", virtual_address);
            eprintln!("[VERBOSE] Memory size: {:#010x}", memory_size);
            eprintln!("[VERBOSE] File size: {:#010x}", file_size);
            eprintln!();
        }

        for address in virtual_address..virtual_address + memory_size {
            // Bytes past the file image are zero-filled
            let file_offset = address - virtual_address;
            let byte = if file_offset < file_size {
                elf_data
                    [segment.p_offset(endian) as usize + file_offset as usize]
            } else {
                0
            };
            mem.set8(address, byte);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CPUPolicy;

    #[test]
    fn test_prepare_stack_touches_whole_region() {
        let mut cpu = CPUState::make(CPUPolicy::default());
        cpu.begin(0);
        let mut mem = Memory::make();
        prepare_stack(&cpu, &mut mem);

        let sp = cpu.read_gpr(SP as u32);
        assert!(mem.page_exists(sp));
        assert!(mem.page_exists(cpu.stack_floor));
        assert!(mem.page_exists(cpu.stack_floor + crate::cpu::STACK_SIZE / 2));
    }
}
