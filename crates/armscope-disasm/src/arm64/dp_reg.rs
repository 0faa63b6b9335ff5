//! Data processing (register): logical and arithmetic with shifted or
//! extended registers, carry, conditional compare and select, and the
//! 1-, 2- and 3-source groups.

use armscope_core::{
    Condition, Extend, Instruction, InstructionClass, Operand, Operation, Register, Shift,
};

use super::fields::{bit, bits, ra, rd, rm, rn};
use crate::DecodeError;

const CLASS: InstructionClass = InstructionClass::DataProcessingRegister;

pub(super) fn decode(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let op1 = bit(insn, 28);
    let op2 = bits(insn, 21, 4);

    match (op1, op2) {
        (false, 0b0000..=0b0111) => decode_logical(insn, address),
        (false, _) if op2 & 1 == 0 => decode_add_sub_shifted(insn, address),
        (false, _) => decode_add_sub_extended(insn, address),
        (true, 0b0000) => match bits(insn, 10, 6) {
            0 => decode_carry(insn, address),
            // rmif, setf8/setf16
            _ => Err(DecodeError::unsupported(address, insn, CLASS)),
        },
        (true, 0b0010) => decode_cond_compare(insn, address),
        (true, 0b0100) => decode_cond_select(insn, address),
        (true, 0b0110) if bit(insn, 30) => decode_1src(insn, address),
        (true, 0b0110) => decode_2src(insn, address),
        (true, 0b1000..=0b1111) => decode_3src(insn, address),
        _ => Err(DecodeError::malformed(address, insn, "unallocated data processing register")),
    }
}

fn decode_logical(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let opc = bits(insn, 29, 2);
    let shift = Shift::from_bits(bits(insn, 22, 2));
    let invert = bit(insn, 21);
    let amount = bits(insn, 10, 6);

    if !is_64 && amount >= 32 {
        return Err(DecodeError::malformed(address, insn, "shift amount exceeds register width"));
    }

    let (d, n, m) = (rd(insn), rn(insn), rm(insn));
    let dst = Register::gpr(d, is_64);
    let first = Register::gpr(n, is_64);
    let second = Register::gpr(m, is_64);
    let shifted = Operand::shifted(second, shift, amount as u8);

    let (mnemonic, operation, operands) = match (opc, invert) {
        (0b01, false) if n == 31 && amount == 0 && shift == Shift::Lsl => {
            ("mov", Operation::Move, vec![Operand::reg(dst), Operand::reg(second)])
        }
        (0b01, true) if n == 31 => ("mvn", Operation::Not, vec![Operand::reg(dst), shifted]),
        (0b11, false) if d == 31 => ("tst", Operation::Test, vec![Operand::reg(first), shifted]),
        _ => {
            let (name, op) = match (opc, invert) {
                (0b00, false) => ("and", Operation::And),
                (0b00, true) => ("bic", Operation::And),
                (0b01, false) => ("orr", Operation::Or),
                (0b01, true) => ("orn", Operation::Or),
                (0b10, false) => ("eor", Operation::Xor),
                (0b10, true) => ("eon", Operation::Xor),
                (_, false) => ("ands", Operation::And),
                (_, true) => ("bics", Operation::And),
            };
            (name, op, vec![Operand::reg(dst), Operand::reg(first), shifted])
        }
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_reads(&[first, second])
        .with_write(dst);
    Ok(if opc == 0b11 {
        result.with_flags_written()
    } else {
        result
    })
}

fn add_sub_name(is_sub: bool, set_flags: bool) -> (&'static str, Operation) {
    match (is_sub, set_flags) {
        (false, false) => ("add", Operation::Add),
        (false, true) => ("adds", Operation::Add),
        (true, false) => ("sub", Operation::Sub),
        (true, true) => ("subs", Operation::Sub),
    }
}

fn decode_add_sub_shifted(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let is_sub = bit(insn, 30);
    let set_flags = bit(insn, 29);
    let shift_bits = bits(insn, 22, 2);
    let amount = bits(insn, 10, 6);

    if shift_bits == 0b11 {
        return Err(DecodeError::malformed(address, insn, "reserved shift type"));
    }
    if !is_64 && amount >= 32 {
        return Err(DecodeError::malformed(address, insn, "shift amount exceeds register width"));
    }

    let (d, n) = (rd(insn), rn(insn));
    let dst = Register::gpr(d, is_64);
    let first = Register::gpr(n, is_64);
    let second = Register::gpr(rm(insn), is_64);
    let shifted = Operand::shifted(second, Shift::from_bits(shift_bits), amount as u8);

    let (mnemonic, operation, operands) = if set_flags && d == 31 {
        let name = if is_sub { "cmp" } else { "cmn" };
        (name, Operation::Compare, vec![Operand::reg(first), shifted])
    } else if is_sub && n == 31 {
        let name = if set_flags { "negs" } else { "neg" };
        (name, Operation::Neg, vec![Operand::reg(dst), shifted])
    } else {
        let (name, op) = add_sub_name(is_sub, set_flags);
        (name, op, vec![Operand::reg(dst), Operand::reg(first), shifted])
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_reads(&[first, second])
        .with_write(dst);
    Ok(if set_flags {
        result.with_flags_written()
    } else {
        result
    })
}

fn decode_add_sub_extended(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let is_sub = bit(insn, 30);
    let set_flags = bit(insn, 29);
    let option = bits(insn, 13, 3);
    let imm3 = bits(insn, 10, 3);

    if bits(insn, 22, 2) != 0 {
        return Err(DecodeError::malformed(address, insn, "unallocated extended register opt"));
    }
    if imm3 > 4 {
        return Err(DecodeError::malformed(address, insn, "extended register shift above 4"));
    }

    let (d, n) = (rd(insn), rn(insn));
    let dst = if set_flags {
        Register::gpr(d, is_64)
    } else {
        Register::gpr_sp(d, is_64)
    };
    let first = Register::gpr_sp(n, is_64);
    // uxtx/sxtx take an X source, everything else a W source
    let second = Register::gpr(rm(insn), is_64 && option & 0b011 == 0b011);

    // With sp involved, the no-op extend is spelled `lsl`.
    let uses_sp = d == 31 && !set_flags || n == 31;
    let noop = if is_64 { 0b011 } else { 0b010 };
    let extend = if uses_sp && option == noop {
        Extend::Lsl
    } else {
        Extend::from_bits(option)
    };
    let amount = (imm3 != 0).then_some(imm3 as u8);
    let extended = match (extend, amount) {
        (Extend::Lsl, None) => Operand::reg(second),
        _ => Operand::extended(second, extend, amount),
    };

    let (mnemonic, operation, operands) = if set_flags && d == 31 {
        let name = if is_sub { "cmp" } else { "cmn" };
        (name, Operation::Compare, vec![Operand::reg(first), extended])
    } else {
        let (name, op) = add_sub_name(is_sub, set_flags);
        (name, op, vec![Operand::reg(dst), Operand::reg(first), extended])
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_reads(&[first, second])
        .with_write(dst);
    Ok(if set_flags {
        result.with_flags_written()
    } else {
        result
    })
}

fn decode_carry(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let is_sub = bit(insn, 30);
    let set_flags = bit(insn, 29);
    let n = rn(insn);
    let dst = Register::gpr(rd(insn), is_64);
    let first = Register::gpr(n, is_64);
    let second = Register::gpr(rm(insn), is_64);

    let (mnemonic, operation, operands) = if is_sub && n == 31 {
        let name = if set_flags { "ngcs" } else { "ngc" };
        (name, Operation::Neg, vec![Operand::reg(dst), Operand::reg(second)])
    } else {
        let name = match (is_sub, set_flags) {
            (false, false) => "adc",
            (false, true) => "adcs",
            (true, false) => "sbc",
            (true, true) => "sbcs",
        };
        let op = if is_sub { Operation::Sub } else { Operation::Add };
        (
            name,
            op,
            vec![Operand::reg(dst), Operand::reg(first), Operand::reg(second)],
        )
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_reads(&[first, second])
        .with_flags_read()
        .with_write(dst);
    Ok(if set_flags {
        result.with_flags_written()
    } else {
        result
    })
}

fn decode_cond_compare(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if !bit(insn, 29) || bit(insn, 10) || bit(insn, 4) {
        return Err(DecodeError::malformed(address, insn, "unallocated conditional compare"));
    }

    let is_64 = bit(insn, 31);
    let first = Register::gpr(rn(insn), is_64);
    let cond = Condition::from_bits(bits(insn, 12, 4));
    let nzcv = bits(insn, 0, 4);
    let mnemonic = if bit(insn, 30) { "ccmp" } else { "ccmn" };

    let (second, reads) = if bit(insn, 11) {
        (Operand::Count(bits(insn, 16, 5)), vec![first])
    } else {
        let reg = Register::gpr(rm(insn), is_64);
        (Operand::reg(reg), vec![first, reg])
    };

    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::Compare)
        .with_operands(vec![
            Operand::reg(first),
            second,
            Operand::Count(nzcv),
            Operand::Condition(cond),
        ])
        .with_reads(&reads)
        .with_flags_read()
        .with_flags_written())
}

fn decode_cond_select(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bit(insn, 29) || bit(insn, 11) {
        return Err(DecodeError::malformed(address, insn, "unallocated conditional select"));
    }

    let is_64 = bit(insn, 31);
    let (d, n, m) = (rd(insn), rn(insn), rm(insn));
    let dst = Register::gpr(d, is_64);
    let first = Register::gpr(n, is_64);
    let second = Register::gpr(m, is_64);
    let cond = Condition::from_bits(bits(insn, 12, 4));
    let op = (bits(insn, 30, 1) << 1) | bits(insn, 10, 1);

    // Aliases with equal sources read the inverted condition.
    let same = n == m && !cond.is_always();
    let inverted = Operand::Condition(cond.inverse());

    let (mnemonic, operands) = match op {
        0b01 if same && n == 31 => ("cset", vec![Operand::reg(dst), inverted]),
        0b01 if same => ("cinc", vec![Operand::reg(dst), Operand::reg(first), inverted]),
        0b10 if same && n == 31 => ("csetm", vec![Operand::reg(dst), inverted]),
        0b10 if same => ("cinv", vec![Operand::reg(dst), Operand::reg(first), inverted]),
        0b11 if same => ("cneg", vec![Operand::reg(dst), Operand::reg(first), inverted]),
        _ => {
            let name = match op {
                0b00 => "csel",
                0b01 => "csinc",
                0b10 => "csinv",
                _ => "csneg",
            };
            (
                name,
                vec![
                    Operand::reg(dst),
                    Operand::reg(first),
                    Operand::reg(second),
                    Operand::Condition(cond),
                ],
            )
        }
    };

    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::ConditionalSelect)
        .with_operands(operands)
        .with_reads(&[first, second])
        .with_flags_read()
        .with_write(dst))
}

fn decode_2src(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bit(insn, 29) {
        // subps, irg, gmi and friends
        return Err(DecodeError::unsupported(address, insn, CLASS));
    }

    let is_64 = bit(insn, 31);
    let opcode = bits(insn, 10, 6);

    if opcode & 0b111000 == 0b010000 {
        return decode_crc32(insn, address);
    }

    let (mnemonic, operation) = match opcode {
        0b000010 => ("udiv", Operation::Div),
        0b000011 => ("sdiv", Operation::Div),
        0b001000 => ("lsl", Operation::Shl),
        0b001001 => ("lsr", Operation::Shr),
        0b001010 => ("asr", Operation::Sar),
        0b001011 => ("ror", Operation::Ror),
        _ => return Err(DecodeError::unsupported(address, insn, CLASS)),
    };

    let dst = Register::gpr(rd(insn), is_64);
    let first = Register::gpr(rn(insn), is_64);
    let second = Register::gpr(rm(insn), is_64);
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(vec![Operand::reg(dst), Operand::reg(first), Operand::reg(second)])
        .with_reads(&[first, second])
        .with_write(dst))
}

fn decode_crc32(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let sz = bits(insn, 10, 2);
    if is_64 != (sz == 0b11) {
        return Err(DecodeError::malformed(address, insn, "crc32 size does not match sf"));
    }

    let width = ["b", "h", "w", "x"][sz as usize];
    let variant = if bit(insn, 12) { "c" } else { "" };
    let dst = Register::w(rd(insn));
    let acc = Register::w(rn(insn));
    let data = Register::gpr(rm(insn), is_64);

    Ok(
        Instruction::new(address, insn, CLASS, format!("crc32{}{}", variant, width))
            .with_operation(Operation::Checksum)
            .with_operands(vec![Operand::reg(dst), Operand::reg(acc), Operand::reg(data)])
            .with_reads(&[acc, data])
            .with_write(dst),
    )
}

fn decode_1src(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bit(insn, 29) {
        return Err(DecodeError::malformed(address, insn, "unallocated 1-source encoding"));
    }
    if bits(insn, 16, 5) != 0 {
        // pointer authentication pac*/aut*/xpac*
        return Err(DecodeError::unsupported(address, insn, CLASS));
    }

    let is_64 = bit(insn, 31);
    let (mnemonic, operation) = match (bits(insn, 10, 6), is_64) {
        (0b000000, _) => ("rbit", Operation::BitField),
        (0b000001, _) => ("rev16", Operation::BitField),
        (0b000010, false) => ("rev", Operation::BitField),
        (0b000010, true) => ("rev32", Operation::BitField),
        (0b000011, true) => ("rev", Operation::BitField),
        (0b000100, _) => ("clz", Operation::BitField),
        (0b000101, _) => ("cls", Operation::BitField),
        (0b000011, false) => {
            return Err(DecodeError::malformed(address, insn, "rev with 64-bit size on w register"));
        }
        _ => return Err(DecodeError::unsupported(address, insn, CLASS)),
    };

    let dst = Register::gpr(rd(insn), is_64);
    let src = Register::gpr(rn(insn), is_64);
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(vec![Operand::reg(dst), Operand::reg(src)])
        .with_read(src)
        .with_write(dst))
}

fn decode_3src(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bits(insn, 29, 2) != 0 {
        return Err(DecodeError::malformed(address, insn, "unallocated 3-source encoding"));
    }

    let is_64 = bit(insn, 31);
    let op31 = bits(insn, 21, 3);
    let o0 = bit(insn, 15);
    let a = ra(insn);

    // (madd-form name, alias when Ra is the zero register, widening)
    let (name, alias, widening) = match (op31, o0, is_64) {
        (0b000, false, _) => ("madd", Some("mul"), false),
        (0b000, true, _) => ("msub", Some("mneg"), false),
        (0b001, false, true) => ("smaddl", Some("smull"), true),
        (0b001, true, true) => ("smsubl", Some("smnegl"), true),
        (0b101, false, true) => ("umaddl", Some("umull"), true),
        (0b101, true, true) => ("umsubl", Some("umnegl"), true),
        (0b010, false, true) => ("smulh", None, false),
        (0b110, false, true) => ("umulh", None, false),
        _ => return Err(DecodeError::malformed(address, insn, "unallocated 3-source encoding")),
    };

    let dst = Register::gpr(rd(insn), is_64);
    let first = Register::gpr(rn(insn), is_64 && !widening);
    let second = Register::gpr(rm(insn), is_64 && !widening);
    let acc = Register::gpr(a, is_64);

    let mut operands = vec![Operand::reg(dst), Operand::reg(first), Operand::reg(second)];
    let mnemonic = match alias {
        Some(short) if a == 31 => short,
        Some(_) => {
            operands.push(Operand::reg(acc));
            name
        }
        None => name,
    };

    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::Mul)
        .with_operands(operands)
        .with_reads(&[first, second, acc])
        .with_write(dst))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mnemonic(insn: u32) -> String {
        decode(insn, 0x1000).unwrap().mnemonic.unwrap()
    }

    #[test]
    fn test_add_shifted_register() {
        // ADD X0, X1, X2: 0x8B020020
        let insn = decode(0x8B02_0020, 0x1000).unwrap();
        assert_eq!(insn.mnemonic.as_deref(), Some("add"));
        assert_eq!(insn.operands.len(), 3);
        assert!(insn.reads.contains_index(1));
        assert!(insn.reads.contains_index(2));
        assert!(insn.writes.contains_index(0));
        assert!(!insn.writes.has_flags());
    }

    #[test]
    fn test_logical_aliases() {
        // MOV X0, X1 (ORR X0, XZR, X1): 0xAA0103E0
        assert_eq!(mnemonic(0xAA01_03E0), "mov");
        // MVN X0, X1: 0xAA2103E0
        assert_eq!(mnemonic(0xAA21_03E0), "mvn");
        // TST X1, X2: 0xEA02003F
        let tst = decode(0xEA02_003F, 0x1000).unwrap();
        assert_eq!(tst.mnemonic.as_deref(), Some("tst"));
        assert!(tst.writes.has_flags());
    }

    #[test]
    fn test_compare_and_negate() {
        // CMP X1, X2: 0xEB02003F
        let cmp = decode(0xEB02_003F, 0x1000).unwrap();
        assert_eq!(cmp.mnemonic.as_deref(), Some("cmp"));
        assert!(cmp.writes.has_flags());
        // NEG X0, X2: 0xCB0203E0
        assert_eq!(mnemonic(0xCB02_03E0), "neg");
    }

    #[test]
    fn test_reserved_shift_is_malformed() {
        // ADD with shift type 11
        assert!(matches!(
            decode(0x8BC2_0020, 0),
            Err(DecodeError::MalformedEncoding { .. })
        ));
        // 32-bit ORR with shift amount 32
        assert!(matches!(
            decode(0x2A02_8020, 0),
            Err(DecodeError::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn test_add_extended_with_sp() {
        // ADD X0, SP, X1 (UXTX as LSL #0): 0x8B2163E0
        let insn = decode(0x8B21_63E0, 0x1000).unwrap();
        assert_eq!(insn.mnemonic.as_deref(), Some("add"));
        assert_eq!(insn.operands[1], Operand::reg(Register::sp()));
        assert_eq!(insn.operands[2], Operand::reg(Register::x(1)));
        assert!(insn.reads.contains_index(31));
    }

    #[test]
    fn test_add_extended_uxtw() {
        // ADD X0, X1, W2, UXTW #2: 0x8B224820
        let insn = decode(0x8B22_4820, 0x1000).unwrap();
        assert_eq!(
            insn.operands[2],
            Operand::extended(Register::w(2), Extend::Uxtw, Some(2))
        );
    }

    #[test]
    fn test_conditional_select_aliases() {
        // CSEL X0, X1, X2, EQ: 0x9A820020
        let csel = decode(0x9A82_0020, 0x1000).unwrap();
        assert_eq!(csel.mnemonic.as_deref(), Some("csel"));
        assert!(csel.reads.has_flags());
        assert_eq!(csel.operands[3], Operand::Condition(Condition::Eq));
        // CSET X0, EQ (CSINC X0, XZR, XZR, NE): 0x9A9F17E0
        let cset = decode(0x9A9F_17E0, 0x1000).unwrap();
        assert_eq!(cset.mnemonic.as_deref(), Some("cset"));
        assert_eq!(cset.operands[1], Operand::Condition(Condition::Eq));
    }

    #[test]
    fn test_conditional_compare() {
        // CCMP X0, #5, #0, NE: 0xFA451800
        let insn = decode(0xFA45_1800, 0x1000).unwrap();
        assert_eq!(insn.mnemonic.as_deref(), Some("ccmp"));
        assert_eq!(insn.operands[1], Operand::Count(5));
        assert_eq!(insn.operands[2], Operand::Count(0));
        assert!(insn.reads.has_flags());
        assert!(insn.writes.has_flags());
    }

    #[test]
    fn test_multiply_and_divide() {
        // MUL X0, X1, X2: 0x9B027C20
        let mul = decode(0x9B02_7C20, 0x1000).unwrap();
        assert_eq!(mul.mnemonic.as_deref(), Some("mul"));
        assert_eq!(mul.operands.len(), 3);
        // MADD X0, X1, X2, X3: 0x9B020C20
        let madd = decode(0x9B02_0C20, 0x1000).unwrap();
        assert_eq!(madd.mnemonic.as_deref(), Some("madd"));
        assert_eq!(madd.operands.len(), 4);
        // SDIV X0, X1, X2: 0x9AC20C20
        assert_eq!(mnemonic(0x9AC2_0C20), "sdiv");
        // UMULL X0, W1, W2: 0x9BA27C20
        let umull = decode(0x9BA2_7C20, 0x1000).unwrap();
        assert_eq!(umull.mnemonic.as_deref(), Some("umull"));
        assert_eq!(umull.operands[1], Operand::reg(Register::w(1)));
    }

    #[test]
    fn test_one_source() {
        // CLZ X0, X1: 0xDAC01020
        assert_eq!(mnemonic(0xDAC0_1020), "clz");
        // REV X0, X1: 0xDAC00C20
        assert_eq!(mnemonic(0xDAC0_0C20), "rev");
        // REV W0, W1: 0x5AC00820
        assert_eq!(mnemonic(0x5AC0_0820), "rev");
    }

    #[test]
    fn test_crc32() {
        // CRC32X W0, W1, X2: 0x9AC24C20
        let insn = decode(0x9AC2_4C20, 0x1000).unwrap();
        assert_eq!(insn.mnemonic.as_deref(), Some("crc32x"));
        assert_eq!(insn.operands[0], Operand::reg(Register::w(0)));
        assert_eq!(insn.operands[2], Operand::reg(Register::x(2)));
        // CRC32CB W0, W1, W2: 0x1AC25020
        assert_eq!(mnemonic(0x1AC2_5020), "crc32cb");
    }

    #[test]
    fn test_carry() {
        // ADC X0, X1, X2: 0x9A020020
        let adc = decode(0x9A02_0020, 0x1000).unwrap();
        assert_eq!(adc.mnemonic.as_deref(), Some("adc"));
        assert!(adc.reads.has_flags());
        // NGC X0, X2 (SBC X0, XZR, X2): 0xDA0203E0
        assert_eq!(mnemonic(0xDA02_03E0), "ngc");
    }
}
