//! Branches, exception generation and system instructions.

use armscope_core::{
    BranchType, Condition, Instruction, InstructionClass, Operand, Operation, PcRelType, Register,
    SystemRegister, NZCV,
};

use super::fields::{bit, bits, offset_address, rd, rn, sign_extend};
use crate::DecodeError;

const CLASS: InstructionClass = InstructionClass::BranchSystem;

pub(super) fn decode(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    match bits(insn, 29, 3) {
        0b000 | 0b100 => decode_branch_imm(insn, address),
        0b001 | 0b101 if bit(insn, 25) => decode_test_branch(insn, address),
        0b001 | 0b101 => decode_compare_branch(insn, address),
        0b010 => decode_conditional(insn, address),
        0b110 if bit(insn, 25) => decode_branch_reg(insn, address),
        0b110 if bit(insn, 24) => decode_system(insn, address),
        0b110 => decode_exception(insn, address),
        _ => Err(DecodeError::malformed(address, insn, "unallocated branch encoding")),
    }
}

fn decode_branch_imm(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let offset = sign_extend(u64::from(bits(insn, 0, 26)) << 2, 28);
    let target = offset_address(address, offset);
    let is_link = bit(insn, 31);

    let result = Instruction::new(address, insn, CLASS, if is_link { "bl" } else { "b" })
        .with_operand(Operand::pc_rel(offset, target))
        .with_pc_rel(PcRelType::LongBranchDisplacement, target);

    Ok(if is_link {
        result
            .with_operation(Operation::Call)
            .with_write(Register::lr())
            .with_branch(BranchType::Call, target)
    } else {
        result
            .with_operation(Operation::Jump)
            .with_branch(BranchType::Unconditional, target)
    })
}

fn decode_compare_branch(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let offset = sign_extend(u64::from(bits(insn, 5, 19)) << 2, 21);
    let target = offset_address(address, offset);
    let reg = Register::gpr(rd(insn), is_64);

    Ok(
        Instruction::new(address, insn, CLASS, if bit(insn, 24) { "cbnz" } else { "cbz" })
            .with_operation(Operation::ConditionalJump)
            .with_operands(vec![Operand::reg(reg), Operand::pc_rel(offset, target)])
            .with_read(reg)
            .with_branch(BranchType::Conditional, target)
            .with_pc_rel(PcRelType::ShortBranchDisplacement, target),
    )
}

fn decode_test_branch(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let bit_pos = (bits(insn, 31, 1) << 5) | bits(insn, 19, 5);
    let offset = sign_extend(u64::from(bits(insn, 5, 14)) << 2, 16);
    let target = offset_address(address, offset);
    let reg = Register::gpr(rd(insn), bit_pos >= 32);

    Ok(
        Instruction::new(address, insn, CLASS, if bit(insn, 24) { "tbnz" } else { "tbz" })
            .with_operation(Operation::ConditionalJump)
            .with_operands(vec![
                Operand::reg(reg),
                Operand::Count(bit_pos),
                Operand::pc_rel(offset, target),
            ])
            .with_read(reg)
            .with_branch(BranchType::Conditional, target)
            .with_pc_rel(PcRelType::ShortBranchDisplacement, target),
    )
}

fn decode_conditional(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bit(insn, 25) || bit(insn, 24) {
        return Err(DecodeError::malformed(address, insn, "unallocated conditional branch"));
    }
    if bit(insn, 4) {
        // bc.cond
        return Err(DecodeError::unsupported(address, insn, CLASS));
    }

    let cond = Condition::from_bits(bits(insn, 0, 4));
    let offset = sign_extend(u64::from(bits(insn, 5, 19)) << 2, 21);
    let target = offset_address(address, offset);
    let mnemonic = format!("b.{}", cond);

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operand(Operand::pc_rel(offset, target))
        .with_pc_rel(PcRelType::ShortBranchDisplacement, target);

    Ok(if cond.is_always() {
        result
            .with_operation(Operation::Jump)
            .with_branch(BranchType::Unconditional, target)
    } else {
        result
            .with_operation(Operation::ConditionalJump)
            .with_flags_read()
            .with_branch(BranchType::Conditional, target)
    })
}

fn decode_exception(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let opc = bits(insn, 21, 3);
    let imm16 = u64::from(bits(insn, 5, 16));
    let op2 = bits(insn, 2, 3);
    let ll = bits(insn, 0, 2);

    if op2 != 0 {
        return Err(DecodeError::malformed(address, insn, "unallocated exception encoding"));
    }

    let (mnemonic, operation, traps) = match (opc, ll) {
        (0b000, 0b01) => ("svc", Operation::Syscall, true),
        (0b000, 0b10) => ("hvc", Operation::Syscall, true),
        (0b000, 0b11) => ("smc", Operation::Syscall, true),
        (0b001, 0b00) => ("brk", Operation::Interrupt, false),
        (0b010, 0b00) => ("hlt", Operation::Interrupt, false),
        // tstart/tcancel
        (0b011, 0b00) => return Err(DecodeError::unsupported(address, insn, CLASS)),
        (0b101, 0b01) => ("dcps1", Operation::Interrupt, true),
        (0b101, 0b10) => ("dcps2", Operation::Interrupt, true),
        (0b101, 0b11) => ("dcps3", Operation::Interrupt, true),
        _ => {
            return Err(DecodeError::malformed(address, insn, "unallocated exception encoding"));
        }
    };

    // dcpsN omits a zero immediate
    let operands = if mnemonic.starts_with("dcps") && imm16 == 0 {
        Vec::new()
    } else {
        vec![Operand::imm_unsigned(imm16)]
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_branch(BranchType::Exception, 0);
    Ok(if traps {
        result.with_all_registers()
    } else {
        result
    })
}

fn decode_branch_reg(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let opc = bits(insn, 21, 4);
    let op2 = bits(insn, 16, 5);
    let op3 = bits(insn, 10, 6);
    let n = rn(insn);
    let op4 = rd(insn);

    if op2 != 0b11111 {
        return Err(DecodeError::malformed(address, insn, "unallocated branch register encoding"));
    }

    let target = Register::x(n);
    let result = match (opc, op3, op4) {
        (0b0000, 0b000000, 0) => Instruction::new(address, insn, CLASS, "br")
            .with_operation(Operation::Jump)
            .with_operand(Operand::reg(target))
            .with_read(target)
            .with_branch(BranchType::Unconditional, 0),
        (0b0000, 0b000010 | 0b000011, 0b11111) => {
            let name = if op3 == 0b000010 { "braaz" } else { "brabz" };
            Instruction::new(address, insn, CLASS, name)
                .with_operation(Operation::Jump)
                .with_operand(Operand::reg(target))
                .with_read(target)
                .with_branch(BranchType::Unconditional, 0)
        }
        (0b0001, 0b000000, 0) => Instruction::new(address, insn, CLASS, "blr")
            .with_operation(Operation::Call)
            .with_operand(Operand::reg(target))
            .with_read(target)
            .with_write(Register::lr())
            .with_branch(BranchType::Call, 0),
        (0b0001, 0b000010 | 0b000011, 0b11111) => {
            let name = if op3 == 0b000010 { "blraaz" } else { "blrabz" };
            Instruction::new(address, insn, CLASS, name)
                .with_operation(Operation::Call)
                .with_operand(Operand::reg(target))
                .with_read(target)
                .with_write(Register::lr())
                .with_branch(BranchType::Call, 0)
        }
        (0b0010, 0b000000, 0) => {
            let result = Instruction::new(address, insn, CLASS, "ret")
                .with_operation(Operation::Return)
                .with_read(target)
                .with_branch(BranchType::Unconditional, 0);
            if n == 30 {
                result
            } else {
                result.with_operand(Operand::reg(target))
            }
        }
        (0b0010, 0b000010 | 0b000011, 0b11111) if n == 31 => {
            let name = if op3 == 0b000010 { "retaa" } else { "retab" };
            Instruction::new(address, insn, CLASS, name)
                .with_operation(Operation::Return)
                .with_reads(&[Register::lr(), Register::sp()])
                .with_branch(BranchType::Unconditional, 0)
        }
        (0b0100, 0b000000, 0) | (0b0100, 0b000010 | 0b000011, 0b11111) if n == 31 =>
        {
            let name = match op3 {
                0b000000 => "eret",
                0b000010 => "eretaa",
                _ => "eretab",
            };
            Instruction::new(address, insn, CLASS, name)
                .with_operation(Operation::Return)
                .with_all_registers()
                .with_branch(BranchType::Exception, 0)
        }
        (0b0101, 0b000000, 0) if n == 31 => Instruction::new(address, insn, CLASS, "drps")
            .with_operation(Operation::Return)
            .with_all_registers()
            .with_branch(BranchType::Exception, 0),
        (0b1000 | 0b1001, 0b000010 | 0b000011, _) => {
            let modifier = Register::x_sp(op4);
            let (name, is_call) = match (opc, op3) {
                (0b1000, 0b000010) => ("braa", false),
                (0b1000, _) => ("brab", false),
                (_, 0b000010) => ("blraa", true),
                _ => ("blrab", true),
            };
            let result = Instruction::new(address, insn, CLASS, name)
                .with_operands(vec![Operand::reg(target), Operand::reg(modifier)])
                .with_reads(&[target, modifier]);
            if is_call {
                result
                    .with_operation(Operation::Call)
                    .with_write(Register::lr())
                    .with_branch(BranchType::Call, 0)
            } else {
                result
                    .with_operation(Operation::Jump)
                    .with_branch(BranchType::Unconditional, 0)
            }
        }
        _ => {
            return Err(DecodeError::malformed(
                address,
                insn,
                "unallocated branch register encoding",
            ));
        }
    };
    Ok(result)
}

fn decode_system(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bits(insn, 22, 2) != 0 {
        return Err(DecodeError::malformed(address, insn, "unallocated system encoding"));
    }

    let is_read = bit(insn, 21);
    let op0 = bits(insn, 19, 2);
    let op1 = bits(insn, 16, 3);
    let crn = bits(insn, 12, 4);
    let crm = bits(insn, 8, 4);
    let op2 = bits(insn, 5, 3);
    let rt = rd(insn);

    match (is_read, op0) {
        (false, 0b00) => match crn {
            0b0010 if op1 == 0b011 && rt == 31 => decode_hint(insn, address, crm, op2),
            0b0011 if op1 == 0b011 && rt == 31 => decode_barrier(insn, address, crm, op2),
            0b0100 if rt == 31 => decode_pstate(insn, address, op1, crm, op2),
            _ => Err(DecodeError::unsupported(address, insn, CLASS)),
        },
        (true, 0b00) => Err(DecodeError::malformed(address, insn, "unallocated system encoding")),
        (_, 0b01) => {
            let reg = Register::x(rt);
            let mut operands = vec![
                Operand::Count(op1),
                Operand::ControlRegister(crn as u8),
                Operand::ControlRegister(crm as u8),
                Operand::Count(op2),
            ];
            if is_read {
                operands.insert(0, Operand::reg(reg));
                Ok(Instruction::new(address, insn, CLASS, "sysl")
                    .with_operation(Operation::System)
                    .with_operands(operands)
                    .with_write(reg))
            } else {
                if rt != 31 {
                    operands.push(Operand::reg(reg));
                }
                Ok(Instruction::new(address, insn, CLASS, "sys")
                    .with_operation(Operation::System)
                    .with_operands(operands)
                    .with_read(reg))
            }
        }
        _ => {
            let sysreg = SystemRegister::from_field(bits(insn, 5, 16));
            let reg = Register::x(rt);
            if is_read {
                let result = Instruction::new(address, insn, CLASS, "mrs")
                    .with_operation(Operation::Move)
                    .with_operands(vec![Operand::reg(reg), Operand::SystemRegister(sysreg)])
                    .with_write(reg);
                Ok(if sysreg == NZCV {
                    result.with_flags_read()
                } else {
                    result
                })
            } else {
                let result = Instruction::new(address, insn, CLASS, "msr")
                    .with_operation(Operation::Move)
                    .with_operands(vec![Operand::SystemRegister(sysreg), Operand::reg(reg)])
                    .with_read(reg);
                Ok(if sysreg == NZCV {
                    result.with_flags_written()
                } else {
                    result
                })
            }
        }
    }
}

fn decode_hint(insn: u32, address: u64, crm: u32, op2: u32) -> Result<Instruction, DecodeError> {
    let imm = (crm << 3) | op2;
    let named = |name: &str, operation| {
        Instruction::new(address, insn, CLASS, name).with_operation(operation)
    };

    let result = match imm {
        0 => named("nop", Operation::Nop),
        1 => named("yield", Operation::Hint),
        2 => named("wfe", Operation::Hint),
        3 => named("wfi", Operation::Hint),
        4 => named("sev", Operation::Hint),
        5 => named("sevl", Operation::Hint),
        0b0010_000 => named("esb", Operation::Barrier),
        0b0010_100 => named("csdb", Operation::Barrier),
        // pointer authentication on x30 with zero or sp as modifier
        0b0011_000..=0b0011_111 => {
            let name = match op2 {
                0 => "paciaz",
                1 => "paciasp",
                2 => "pacibz",
                3 => "pacibsp",
                4 => "autiaz",
                5 => "autiasp",
                6 => "autibz",
                _ => "autibsp",
            };
            let result = named(name, Operation::Hint)
                .with_read(Register::lr())
                .with_write(Register::lr());
            if op2 & 1 == 1 {
                result.with_read(Register::sp())
            } else {
                result
            }
        }
        0b0100_000 | 0b0100_010 | 0b0100_100 | 0b0100_110 => {
            let target = match op2 >> 1 {
                0 => None,
                1 => Some("c"),
                2 => Some("j"),
                _ => Some("jc"),
            };
            let result = named("bti", Operation::Hint);
            match target {
                Some(t) => result.with_operand(Operand::named(t)),
                None => result,
            }
        }
        _ => named("hint", Operation::Hint).with_operand(Operand::Count(imm)),
    };
    Ok(result)
}

fn barrier_option(crm: u32) -> Operand {
    let name = match crm {
        0b0001 => "oshld",
        0b0010 => "oshst",
        0b0011 => "osh",
        0b0101 => "nshld",
        0b0110 => "nshst",
        0b0111 => "nsh",
        0b1001 => "ishld",
        0b1010 => "ishst",
        0b1011 => "ish",
        0b1101 => "ld",
        0b1110 => "st",
        0b1111 => "sy",
        _ => return Operand::Count(crm),
    };
    Operand::named(name)
}

fn decode_barrier(insn: u32, address: u64, crm: u32, op2: u32) -> Result<Instruction, DecodeError> {
    let base = |name: &str| {
        Instruction::new(address, insn, CLASS, name).with_operation(Operation::Barrier)
    };
    let result = match op2 {
        0b010 if crm == 0b1111 => base("clrex"),
        0b010 => base("clrex").with_operand(Operand::Count(crm)),
        0b100 if crm == 0b0000 => base("ssbb"),
        0b100 if crm == 0b0100 => base("pssbb"),
        0b100 => base("dsb").with_operand(barrier_option(crm)),
        0b101 => base("dmb").with_operand(barrier_option(crm)),
        0b110 if crm == 0b1111 => base("isb"),
        0b110 => base("isb").with_operand(Operand::Count(crm)),
        0b111 if crm == 0 => base("sb"),
        // dsb nXS, tcommit
        0b001 | 0b011 => return Err(DecodeError::unsupported(address, insn, CLASS)),
        _ => return Err(DecodeError::malformed(address, insn, "unallocated barrier encoding")),
    };
    Ok(result)
}

fn decode_pstate(
    insn: u32,
    address: u64,
    op1: u32,
    crm: u32,
    op2: u32,
) -> Result<Instruction, DecodeError> {
    let flag_op = |name: &str| {
        Instruction::new(address, insn, CLASS, name)
            .with_operation(Operation::System)
            .with_flags_read()
            .with_flags_written()
    };

    let field = match (op1, op2) {
        (0b000, 0b000) if crm == 0 => return Ok(flag_op("cfinv")),
        (0b000, 0b001) if crm == 0 => return Ok(flag_op("xaflag")),
        (0b000, 0b010) if crm == 0 => return Ok(flag_op("axflag")),
        (0b000, 0b011) => "uao",
        (0b000, 0b100) => "pan",
        (0b000, 0b101) => "spsel",
        (0b011, 0b001) => "ssbs",
        (0b011, 0b010) => "dit",
        (0b011, 0b100) => "tco",
        (0b011, 0b110) => "daifset",
        (0b011, 0b111) => "daifclr",
        _ => return Err(DecodeError::unsupported(address, insn, CLASS)),
    };

    Ok(Instruction::new(address, insn, CLASS, "msr")
        .with_operation(Operation::System)
        .with_operands(vec![Operand::named(field), Operand::Count(crm)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mnemonic(insn: u32) -> String {
        decode(insn, 0x1000).unwrap().mnemonic.unwrap()
    }

    #[test]
    fn test_unconditional_branches() {
        // B #0x40: 0x14000010
        let b = decode(0x1400_0010, 0x1000).unwrap();
        assert_eq!(b.mnemonic.as_deref(), Some("b"));
        assert_eq!(b.branch, BranchType::Unconditional);
        assert_eq!(b.branch_target, 0x1040);
        assert_eq!(b.pc_rel, PcRelType::LongBranchDisplacement);
        assert_eq!(b.pc_rel_target, 0x1040);

        // BL #-4: 0x97FFFFFF
        let bl = decode(0x97FF_FFFF, 0x1000).unwrap();
        assert_eq!(bl.mnemonic.as_deref(), Some("bl"));
        assert!(bl.is_call());
        assert_eq!(bl.branch_target, 0xFFC);
        assert!(bl.writes.contains_index(30));
    }

    #[test]
    fn test_conditional_branch() {
        // B.EQ #8: 0x54000040
        let beq = decode(0x5400_0040, 0x1000).unwrap();
        assert_eq!(beq.mnemonic.as_deref(), Some("b.eq"));
        assert_eq!(beq.branch, BranchType::Conditional);
        assert_eq!(beq.branch_target, 0x1008);
        assert_eq!(beq.pc_rel, PcRelType::ShortBranchDisplacement);
        assert!(beq.reads.has_flags());

        // B.AL #8: 0x5400004E
        let bal = decode(0x5400_004E, 0x1000).unwrap();
        assert_eq!(bal.mnemonic.as_deref(), Some("b.al"));
        assert_eq!(bal.branch, BranchType::Unconditional);
        assert!(!bal.reads.has_flags());
    }

    #[test]
    fn test_conditional_branch_rejects() {
        // o1 set: 0x55000000
        assert!(matches!(
            decode(0x5500_0000, 0x1000),
            Err(DecodeError::MalformedEncoding { .. })
        ));
        // BC.EQ: 0x54000010
        assert!(matches!(
            decode(0x5400_0010, 0x1000),
            Err(DecodeError::UnsupportedClass { .. })
        ));
    }

    #[test]
    fn test_compare_and_test_branches() {
        // CBZ X0, #8: 0xB4000040
        let cbz = decode(0xB400_0040, 0x1000).unwrap();
        assert_eq!(cbz.mnemonic.as_deref(), Some("cbz"));
        assert!(cbz.reads.contains_index(0));
        assert_eq!(cbz.branch, BranchType::Conditional);
        assert_eq!(cbz.branch_target, 0x1008);

        // TBNZ W3, #5, #0x10: 0x37280083
        let tbnz = decode(0x3728_0083, 0x1000).unwrap();
        assert_eq!(tbnz.mnemonic.as_deref(), Some("tbnz"));
        assert!(matches!(tbnz.operands[1], Operand::Count(5)));
        assert!(tbnz.reads.contains_index(3));
        assert_eq!(tbnz.branch_target, 0x1010);
    }

    #[test]
    fn test_register_branches() {
        // RET: 0xD65F03C0
        let ret = decode(0xD65F_03C0, 0x1000).unwrap();
        assert_eq!(ret.mnemonic.as_deref(), Some("ret"));
        assert!(ret.is_return());
        assert!(ret.operands.is_empty());
        assert!(ret.reads.contains_index(30));
        assert_eq!(ret.branch, BranchType::Unconditional);
        assert_eq!(ret.branch_target, 0);

        // RET X1: 0xD65F0020
        assert_eq!(decode(0xD65F_0020, 0x1000).unwrap().operands.len(), 1);

        // BLR X8: 0xD63F0100
        let blr = decode(0xD63F_0100, 0x1000).unwrap();
        assert_eq!(blr.mnemonic.as_deref(), Some("blr"));
        assert_eq!(blr.branch, BranchType::Call);
        assert!(blr.reads.contains_index(8));
        assert!(blr.writes.contains_index(30));

        // BR X16: 0xD61F0200
        assert_eq!(mnemonic(0xD61F_0200), "br");
    }

    #[test]
    fn test_exceptions() {
        // SVC #0: 0xD4000001
        let svc = decode(0xD400_0001, 0x1000).unwrap();
        assert_eq!(svc.mnemonic.as_deref(), Some("svc"));
        assert!(svc.reads.is_all());
        assert!(svc.writes.is_all());
        assert_eq!(svc.branch, BranchType::Exception);

        // BRK #1: 0xD4200020
        let brk = decode(0xD420_0020, 0x1000).unwrap();
        assert_eq!(brk.mnemonic.as_deref(), Some("brk"));
        assert!(brk.reads.is_empty());
        assert_eq!(brk.branch, BranchType::Exception);

        // op2 != 0: 0xD4000004
        assert!(decode(0xD400_0004, 0x1000).is_err());
    }

    #[test]
    fn test_hints_and_barriers() {
        // NOP: 0xD503201F
        let nop = decode(0xD503_201F, 0x1000).unwrap();
        assert_eq!(nop.mnemonic.as_deref(), Some("nop"));
        assert!(nop.reads.is_empty() && nop.writes.is_empty());

        // PACIASP: 0xD503233F
        let pac = decode(0xD503_233F, 0x1000).unwrap();
        assert_eq!(pac.mnemonic.as_deref(), Some("paciasp"));
        assert!(pac.reads.contains_index(30));
        assert!(pac.reads.contains_index(31));
        assert!(pac.writes.contains_index(30));

        // DMB ISH: 0xD5033BBF
        assert_eq!(mnemonic(0xD503_3BBF), "dmb");
        // ISB: 0xD5033FDF
        let isb = decode(0xD503_3FDF, 0x1000).unwrap();
        assert_eq!(isb.mnemonic.as_deref(), Some("isb"));
        assert!(isb.operands.is_empty());
    }

    #[test]
    fn test_system_register_moves() {
        // MRS X0, NZCV: 0xD53B4200
        let mrs = decode(0xD53B_4200, 0x1000).unwrap();
        assert_eq!(mrs.mnemonic.as_deref(), Some("mrs"));
        assert!(mrs.writes.contains_index(0));
        assert!(mrs.reads.has_flags());

        // MSR NZCV, X1: 0xD51B4201
        let msr = decode(0xD51B_4201, 0x1000).unwrap();
        assert_eq!(msr.mnemonic.as_deref(), Some("msr"));
        assert!(msr.reads.contains_index(1));
        assert!(msr.writes.has_flags());
    }
}
