//! Decoding helper functions

use super::Function;
use super::Instruction;

/// Splits a raw instruction word into its format's fields
pub fn decode(raw_inst: u32) -> Instruction {
    match get_op(raw_inst) {
        0x00 => Instruction::R {
            op: 0,
            rs: get_rs(raw_inst),
            rt: get_rt(raw_inst),
            rd: get_rd(raw_inst),
            shamt: get_shamt(raw_inst),
            func: get_func(raw_inst),
        },
        0x02 | 0x03 => Instruction::J {
            op: get_op(raw_inst),
            target: raw_inst & 0x03FF_FFFF,
        },
        op => Instruction::I {
            op,
            rs: get_rs(raw_inst),
            rt: get_rt(raw_inst),
            imm: sign_extend_16(raw_inst & 0xFFFF),
        },
    }
}

/// Determines an instruction's mnemonic.
/// Returns None for encodings outside the fixed-point MIPS-I set.
pub fn function(inst: &Instruction) -> Option<Function> {
    use Function::*;
    match *inst {
        Instruction::R { func, .. } => match func {
            0x00 => Some(SLL),
            0x02 => Some(SRL),
            0x03 => Some(SRA),
            0x04 => Some(SLLV),
            0x06 => Some(SRLV),
            0x07 => Some(SRAV),
            0x08 => Some(JR),
            0x09 => Some(JALR),
            0x0C => Some(SYSCALL),
            0x0D => Some(BREAK),
            0x10 => Some(MFHI),
            0x11 => Some(MTHI),
            0x12 => Some(MFLO),
            0x13 => Some(MTLO),
            0x18 => Some(MULT),
            0x19 => Some(MULTU),
            0x1A => Some(DIV),
            0x1B => Some(DIVU),
            0x20 => Some(ADD),
            0x21 => Some(ADDU),
            0x22 => Some(SUB),
            0x23 => Some(SUBU),
            0x24 => Some(AND),
            0x25 => Some(OR),
            0x26 => Some(XOR),
            0x27 => Some(NOR),
            0x2A => Some(SLT),
            0x2B => Some(SLTU),
            _ => None,
        },
        // REGIMM branches select the condition with rt
        Instruction::I { op: 0x01, rt, .. } => match rt {
            0x00 => Some(BLTZ),
            0x01 => Some(BGEZ),
            0x10 => Some(BLTZAL),
            0x11 => Some(BGEZAL),
            _ => None,
        },
        Instruction::I { op, .. } => match op {
            0x04 => Some(BEQ),
            0x05 => Some(BNE),
            0x06 => Some(BLEZ),
            0x07 => Some(BGTZ),
            0x08 => Some(ADDI),
            0x09 => Some(ADDIU),
            0x0A => Some(SLTI),
            0x0B => Some(SLTIU),
            0x0C => Some(ANDI),
            0x0D => Some(ORI),
            0x0E => Some(XORI),
            0x0F => Some(LUI),
            0x20 => Some(LB),
            0x21 => Some(LH),
            0x22 => Some(LWL),
            0x23 => Some(LW),
            0x24 => Some(LBU),
            0x25 => Some(LHU),
            0x26 => Some(LWR),
            0x28 => Some(SB),
            0x29 => Some(SH),
            0x2A => Some(SWL),
            0x2B => Some(SW),
            0x2E => Some(SWR),
            _ => None,
        },
        Instruction::J { op, .. } => match op {
            0x02 => Some(J),
            0x03 => Some(JAL),
            _ => None,
        },
    }
}

/// Extracts the opcode from a raw instruction
fn get_op(raw_inst: u32) -> u32 {
    raw_inst >> 26
}

/// Extracts the rs field from a raw instruction
fn get_rs(raw_inst: u32) -> u32 {
    (raw_inst >> 21) & 0x1F
}

/// Extracts the rt field from a raw instruction
fn get_rt(raw_inst: u32) -> u32 {
    (raw_inst >> 16) & 0x1F
}

/// Extracts the rd field from a raw instruction
fn get_rd(raw_inst: u32) -> u32 {
    (raw_inst >> 11) & 0x1F
}

/// Extracts the shift amount from a raw instruction
fn get_shamt(raw_inst: u32) -> u32 {
    (raw_inst >> 6) & 0x1F
}

/// Extracts the function code from a raw instruction
fn get_func(raw_inst: u32) -> u32 {
    raw_inst & 0x3F
}

/// Sign-extends the low 16 bits to 32
fn sign_extend_16(imm: u32) -> i32 {
    imm as u16 as i16 as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend_16() {
        assert_eq!(sign_extend_16(0x0000), 0);
        assert_eq!(sign_extend_16(0x7FFF), 32767);
        assert_eq!(sign_extend_16(0x8000), -32768);
        assert_eq!(sign_extend_16(0xFFFF), -1);
        // Interpreting the extended value as signed recovers
        // the signed 16-bit value
        for imm in [0u32, 1, 0x1234, 0x7FFF, 0x8000, 0xABCD, 0xFFFF] {
            assert_eq!(sign_extend_16(imm) as i16, imm as u16 as i16);
        }
    }

    #[test]
    fn test_decode_r_format() {
        // add r3, r1, r2
        let raw = (1 << 21) | (2 << 16) | (3 << 11) | 0x20;
        let inst = decode(raw);
        assert_eq!(
            inst,
            Instruction::R { op: 0, rs: 1, rt: 2, rd: 3, shamt: 0, func: 0x20 }
        );
        assert_eq!(function(&inst), Some(Function::ADD));
    }

    #[test]
    fn test_decode_i_format() {
        // addi r1, r0, -5
        let raw = (0x08 << 26) | (1 << 16) | 0xFFFB;
        let inst = decode(raw);
        assert_eq!(inst, Instruction::I { op: 0x08, rs: 0, rt: 1, imm: -5 });
        assert_eq!(function(&inst), Some(Function::ADDI));
    }

    #[test]
    fn test_decode_j_format() {
        // jal 0x100
        let raw = (0x03 << 26) | 0x100;
        let inst = decode(raw);
        assert_eq!(inst, Instruction::J { op: 0x03, target: 0x100 });
        assert_eq!(function(&inst), Some(Function::JAL));
    }

    #[test]
    fn test_decode_regimm() {
        // bgezal r4, +16
        let raw = (0x01 << 26) | (4 << 21) | (0x11 << 16) | 0x0010;
        let inst = decode(raw);
        assert_eq!(function(&inst), Some(Function::BGEZAL));
        // Unknown regimm condition
        let raw = (0x01 << 26) | (0x1F << 16);
        assert_eq!(function(&decode(raw)), None);
    }

    #[test]
    fn test_unknown_encodings() {
        assert_eq!(function(&decode(0x0000_003F)), None); // bad funct
        assert_eq!(function(&decode(0xFC00_0000)), None); // bad opcode
    }
}
