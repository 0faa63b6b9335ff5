//! SIMD and floating point: scalar FP arithmetic, compares and
//! conversions, AES/SHA, and the common Advanced SIMD vector groups.
//!
//! SIMD&FP registers are not tracked in register sets; only general
//! registers and NZCV show up in `reads`/`writes`.

use armscope_core::{
    Arrangement, Condition, ElementSize, Instruction, InstructionClass, Operand, Operation,
    Register,
};

use super::fields::{bit, bits, element_from_imm5, expand_fp_imm, ra, rd, rm, rn};
use crate::DecodeError;

const CLASS: InstructionClass = InstructionClass::SimdFp;

pub(super) fn decode(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if insn & 0xFF3E_0C00 == 0x4E28_0800 {
        return decode_aes(insn, address);
    }
    if insn & 0xFF20_8C00 == 0x5E00_0000 {
        return decode_sha_three(insn, address);
    }
    if insn & 0xFF3E_0C00 == 0x5E28_0800 {
        return decode_sha_two(insn, address);
    }
    if insn & 0x5F20_0000 == 0x1E20_0000 {
        return decode_scalar_fp(insn, address);
    }
    if insn & 0x5F20_0000 == 0x1E00_0000 {
        return decode_fixed_point(insn, address);
    }
    if insn & 0x5F00_0000 == 0x1F00_0000 {
        return decode_fp_3src(insn, address);
    }
    if insn & 0x9FE0_8400 == 0x0E00_0400 {
        return decode_copy(insn, address);
    }
    if insn & 0x9F20_0400 == 0x0E20_0400 {
        return decode_three_same(insn, address);
    }
    if insn & 0x9F3E_0C00 == 0x0E20_0800 {
        return decode_two_reg_misc(insn, address);
    }
    if insn & 0x9F3E_0C00 == 0x0E30_0800 {
        return decode_across_lanes(insn, address);
    }
    Err(DecodeError::unsupported(address, insn, CLASS))
}

fn fp_width(ftype: u32) -> Option<u16> {
    match ftype {
        0b00 => Some(32),
        0b01 => Some(64),
        0b11 => Some(16),
        _ => None,
    }
}

fn fp(index: u8, width: u16) -> Operand {
    Operand::reg(Register::fp(index, width))
}

fn vreg(index: u8, arrangement: Arrangement) -> Operand {
    Operand::VectorRegister {
        reg: index,
        arrangement,
    }
}

fn element_size(size_log2: u32) -> ElementSize {
    match size_log2 {
        0 => ElementSize::B,
        1 => ElementSize::H,
        2 => ElementSize::S,
        _ => ElementSize::D,
    }
}

fn lane(index: u8, size_log2: u32, lane: u8) -> Operand {
    Operand::VectorElement {
        reg: index,
        element: element_size(size_log2),
        index: lane,
    }
}

fn unnamed(insn: u32, address: u64, operation: Operation) -> Instruction {
    Instruction::unnamed(address, insn, CLASS).with_operation(operation)
}

// ============================================================================
// Cryptographic extension
// ============================================================================

fn decode_aes(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bits(insn, 22, 2) != 0 {
        return Err(DecodeError::malformed(address, insn, "reserved aes size"));
    }
    let mnemonic = match bits(insn, 12, 5) {
        0b00100 => "aese",
        0b00101 => "aesd",
        0b00110 => "aesmc",
        0b00111 => "aesimc",
        _ => return Err(DecodeError::malformed(address, insn, "unallocated aes opcode")),
    };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::Crypto)
        .with_operands(vec![
            vreg(rd(insn), Arrangement::B16),
            vreg(rn(insn), Arrangement::B16),
        ]))
}

fn decode_sha_three(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bits(insn, 22, 2) != 0 {
        return Err(DecodeError::malformed(address, insn, "reserved sha size"));
    }
    let (d, n, m) = (rd(insn), rn(insn), rm(insn));
    let words = |index| vreg(index, Arrangement::S4);

    let (mnemonic, operands) = match bits(insn, 12, 3) {
        0b000 => ("sha1c", vec![fp(d, 128), fp(n, 32), words(m)]),
        0b001 => ("sha1p", vec![fp(d, 128), fp(n, 32), words(m)]),
        0b010 => ("sha1m", vec![fp(d, 128), fp(n, 32), words(m)]),
        0b011 => ("sha1su0", vec![words(d), words(n), words(m)]),
        0b100 => ("sha256h", vec![fp(d, 128), fp(n, 128), words(m)]),
        0b101 => ("sha256h2", vec![fp(d, 128), fp(n, 128), words(m)]),
        0b110 => ("sha256su1", vec![words(d), words(n), words(m)]),
        _ => return Err(DecodeError::malformed(address, insn, "unallocated sha opcode")),
    };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::Crypto)
        .with_operands(operands))
}

fn decode_sha_two(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bits(insn, 22, 2) != 0 {
        return Err(DecodeError::malformed(address, insn, "reserved sha size"));
    }
    let (d, n) = (rd(insn), rn(insn));
    let (mnemonic, operands) = match bits(insn, 12, 5) {
        0b00000 => ("sha1h", vec![fp(d, 32), fp(n, 32)]),
        0b00001 => ("sha1su1", vec![vreg(d, Arrangement::S4), vreg(n, Arrangement::S4)]),
        0b00010 => ("sha256su0", vec![vreg(d, Arrangement::S4), vreg(n, Arrangement::S4)]),
        _ => return Err(DecodeError::malformed(address, insn, "unallocated sha opcode")),
    };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::Crypto)
        .with_operands(operands))
}

// ============================================================================
// Scalar floating point
// ============================================================================

fn decode_scalar_fp(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bit(insn, 29) {
        return Err(DecodeError::malformed(address, insn, "S bit set in scalar floating point"));
    }
    if bits(insn, 10, 6) == 0 {
        return decode_fp_int(insn, address);
    }
    if bit(insn, 31) {
        return Err(DecodeError::malformed(address, insn, "M bit set in scalar floating point"));
    }
    let Some(width) = fp_width(bits(insn, 22, 2)) else {
        return Err(DecodeError::malformed(address, insn, "reserved floating-point type"));
    };

    match bits(insn, 10, 2) {
        0b01 => Ok(decode_fp_cond_compare(insn, address, width)),
        0b10 => decode_fp_2src(insn, address, width),
        0b11 => Ok(decode_fp_cond_select(insn, address, width)),
        _ if bits(insn, 10, 5) == 0b10000 => decode_fp_1src(insn, address, width),
        _ if bits(insn, 10, 4) == 0b1000 => decode_fp_compare(insn, address, width),
        _ if bits(insn, 10, 3) == 0b100 => decode_fp_imm(insn, address, width),
        _ => Err(DecodeError::malformed(address, insn, "unallocated scalar floating point")),
    }
}

/// Builds a conversion or move between a general register and an FP
/// register, with an optional fixed-point fraction operand.
fn int_transfer(
    insn: u32,
    address: u64,
    mnemonic: &'static str,
    to_gpr: bool,
    width: u16,
    fbits: Option<u32>,
) -> Instruction {
    let is_64 = bit(insn, 31);
    let operation = if mnemonic == "fmov" {
        Operation::Move
    } else {
        Operation::Convert
    };
    let result = Instruction::new(address, insn, CLASS, mnemonic).with_operation(operation);

    let mut result = if to_gpr {
        let dst = Register::gpr(rd(insn), is_64);
        result
            .with_operands(vec![Operand::reg(dst), fp(rn(insn), width)])
            .with_write(dst)
    } else {
        let src = Register::gpr(rn(insn), is_64);
        result
            .with_operands(vec![fp(rd(insn), width), Operand::reg(src)])
            .with_read(src)
    };
    if let Some(fbits) = fbits {
        result = result.with_operand(Operand::Count(fbits));
    }
    result
}

fn decode_fp_int(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let ftype = bits(insn, 22, 2);
    let rmode = bits(insn, 19, 2);
    let opcode = bits(insn, 16, 3);

    // fmov between a general register and the upper half of a vector
    if ftype == 0b10 && rmode == 0b01 && is_64 && opcode & 0b110 == 0b110 {
        let result = Instruction::new(address, insn, CLASS, "fmov").with_operation(Operation::Move);
        return Ok(if opcode == 0b110 {
            let dst = Register::x(rd(insn));
            result
                .with_operands(vec![Operand::reg(dst), lane(rn(insn), 3, 1)])
                .with_write(dst)
        } else {
            let src = Register::x(rn(insn));
            result
                .with_operands(vec![lane(rd(insn), 3, 1), Operand::reg(src)])
                .with_read(src)
        });
    }

    let Some(width) = fp_width(ftype) else {
        return Err(DecodeError::malformed(address, insn, "reserved floating-point type"));
    };

    let (mnemonic, to_gpr) = match (rmode, opcode) {
        (0b00, 0b000) => ("fcvtns", true),
        (0b00, 0b001) => ("fcvtnu", true),
        (0b01, 0b000) => ("fcvtps", true),
        (0b01, 0b001) => ("fcvtpu", true),
        (0b10, 0b000) => ("fcvtms", true),
        (0b10, 0b001) => ("fcvtmu", true),
        (0b11, 0b000) => ("fcvtzs", true),
        (0b11, 0b001) => ("fcvtzu", true),
        (0b00, 0b010) => ("scvtf", false),
        (0b00, 0b011) => ("ucvtf", false),
        (0b00, 0b100) => ("fcvtas", true),
        (0b00, 0b101) => ("fcvtau", true),
        (0b00, 0b110 | 0b111) => {
            if width != 16 && (width == 64) != is_64 {
                return Err(DecodeError::malformed(address, insn, "fmov register sizes differ"));
            }
            ("fmov", opcode == 0b110)
        }
        (0b11, 0b110) if !is_64 && width == 64 => ("fjcvtzs", true),
        _ => return Err(DecodeError::unsupported(address, insn, CLASS)),
    };
    Ok(int_transfer(insn, address, mnemonic, to_gpr, width, None))
}

fn decode_fixed_point(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let scale = bits(insn, 10, 6);
    if bit(insn, 29) {
        return Err(DecodeError::malformed(address, insn, "S bit set in fixed-point conversion"));
    }
    if !bit(insn, 31) && scale < 32 {
        return Err(DecodeError::malformed(address, insn, "fixed-point scale exceeds register width"));
    }
    let Some(width) = fp_width(bits(insn, 22, 2)) else {
        return Err(DecodeError::malformed(address, insn, "reserved floating-point type"));
    };

    let (mnemonic, to_gpr) = match (bits(insn, 19, 2), bits(insn, 16, 3)) {
        (0b11, 0b000) => ("fcvtzs", true),
        (0b11, 0b001) => ("fcvtzu", true),
        (0b00, 0b010) => ("scvtf", false),
        (0b00, 0b011) => ("ucvtf", false),
        _ => {
            return Err(DecodeError::malformed(address, insn, "unallocated fixed-point conversion"));
        }
    };
    Ok(int_transfer(insn, address, mnemonic, to_gpr, width, Some(64 - scale)))
}

fn decode_fp_1src(insn: u32, address: u64, width: u16) -> Result<Instruction, DecodeError> {
    let opcode = bits(insn, 15, 6);
    let (mnemonic, operation, dst_width) = match opcode {
        0b000000 => ("fmov", Operation::Move, width),
        0b000001 => ("fabs", Operation::FloatArith, width),
        0b000010 => ("fneg", Operation::FloatArith, width),
        0b000011 => ("fsqrt", Operation::FloatArith, width),
        0b000100 | 0b000101 | 0b000111 => {
            let target = match opcode {
                0b000100 => 32,
                0b000101 => 64,
                _ => 16,
            };
            if target == width {
                return Err(DecodeError::malformed(address, insn, "fcvt to the same precision"));
            }
            ("fcvt", Operation::Convert, target)
        }
        0b001000 => ("frintn", Operation::FloatArith, width),
        0b001001 => ("frintp", Operation::FloatArith, width),
        0b001010 => ("frintm", Operation::FloatArith, width),
        0b001011 => ("frintz", Operation::FloatArith, width),
        0b001100 => ("frinta", Operation::FloatArith, width),
        0b001110 => ("frintx", Operation::FloatArith, width),
        0b001111 => ("frinti", Operation::FloatArith, width),
        _ => return Ok(unnamed(insn, address, Operation::FloatArith)),
    };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(vec![fp(rd(insn), dst_width), fp(rn(insn), width)]))
}

fn decode_fp_compare(insn: u32, address: u64, width: u16) -> Result<Instruction, DecodeError> {
    if bits(insn, 14, 2) != 0 || bits(insn, 0, 3) != 0 {
        return Err(DecodeError::malformed(address, insn, "unallocated floating-point compare"));
    }
    let mnemonic = if bit(insn, 4) { "fcmpe" } else { "fcmp" };
    let second = if bit(insn, 3) {
        Operand::FloatImmediate(0.0)
    } else {
        fp(rm(insn), width)
    };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::FloatCompare)
        .with_operands(vec![fp(rn(insn), width), second])
        .with_flags_written())
}

fn decode_fp_imm(insn: u32, address: u64, width: u16) -> Result<Instruction, DecodeError> {
    if bits(insn, 5, 5) != 0 {
        return Err(DecodeError::malformed(address, insn, "unallocated floating-point immediate"));
    }
    let value = expand_fp_imm(bits(insn, 13, 8));
    Ok(Instruction::new(address, insn, CLASS, "fmov")
        .with_operation(Operation::Move)
        .with_operands(vec![fp(rd(insn), width), Operand::FloatImmediate(value)]))
}

fn decode_fp_cond_compare(insn: u32, address: u64, width: u16) -> Instruction {
    let mnemonic = if bit(insn, 4) { "fccmpe" } else { "fccmp" };
    Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::FloatCompare)
        .with_operands(vec![
            fp(rn(insn), width),
            fp(rm(insn), width),
            Operand::Count(bits(insn, 0, 4)),
            Operand::Condition(Condition::from_bits(bits(insn, 12, 4))),
        ])
        .with_flags_read()
        .with_flags_written()
}

fn decode_fp_2src(insn: u32, address: u64, width: u16) -> Result<Instruction, DecodeError> {
    let mnemonic = match bits(insn, 12, 4) {
        0b0000 => "fmul",
        0b0001 => "fdiv",
        0b0010 => "fadd",
        0b0011 => "fsub",
        0b0100 => "fmax",
        0b0101 => "fmin",
        0b0110 => "fmaxnm",
        0b0111 => "fminnm",
        0b1000 => "fnmul",
        _ => {
            return Err(DecodeError::malformed(address, insn, "unallocated floating-point 2-source"));
        }
    };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::FloatArith)
        .with_operands(vec![
            fp(rd(insn), width),
            fp(rn(insn), width),
            fp(rm(insn), width),
        ]))
}

fn decode_fp_cond_select(insn: u32, address: u64, width: u16) -> Instruction {
    Instruction::new(address, insn, CLASS, "fcsel")
        .with_operation(Operation::ConditionalSelect)
        .with_operands(vec![
            fp(rd(insn), width),
            fp(rn(insn), width),
            fp(rm(insn), width),
            Operand::Condition(Condition::from_bits(bits(insn, 12, 4))),
        ])
        .with_flags_read()
}

fn decode_fp_3src(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    if bit(insn, 31) || bit(insn, 29) {
        return Err(DecodeError::malformed(address, insn, "unallocated floating-point 3-source"));
    }
    let Some(width) = fp_width(bits(insn, 22, 2)) else {
        return Err(DecodeError::malformed(address, insn, "reserved floating-point type"));
    };
    let mnemonic = match (bit(insn, 21), bit(insn, 15)) {
        (false, false) => "fmadd",
        (false, true) => "fmsub",
        (true, false) => "fnmadd",
        (true, true) => "fnmsub",
    };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::FloatArith)
        .with_operands(vec![
            fp(rd(insn), width),
            fp(rn(insn), width),
            fp(rm(insn), width),
            fp(ra(insn), width),
        ]))
}

// ============================================================================
// Advanced SIMD vector groups
// ============================================================================

/// Integer three-same names indexed by opcode, as `[U=0, U=1]`.
/// Opcode 3 is the logical group.
const INT_THREE_SAME: [[&str; 2]; 24] = [
    ["shadd", "uhadd"],
    ["sqadd", "uqadd"],
    ["srhadd", "urhadd"],
    ["", ""],
    ["shsub", "uhsub"],
    ["sqsub", "uqsub"],
    ["cmgt", "cmhi"],
    ["cmge", "cmhs"],
    ["sshl", "ushl"],
    ["sqshl", "uqshl"],
    ["srshl", "urshl"],
    ["sqrshl", "uqrshl"],
    ["smax", "umax"],
    ["smin", "umin"],
    ["sabd", "uabd"],
    ["saba", "uaba"],
    ["add", "sub"],
    ["cmtst", "cmeq"],
    ["mla", "mls"],
    ["mul", "pmul"],
    ["smaxp", "umaxp"],
    ["sminp", "uminp"],
    ["sqdmulh", "sqrdmulh"],
    ["addp", ""],
];

fn vector3(insn: u32, address: u64, mnemonic: &str, arrangement: Arrangement) -> Instruction {
    Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::Vector)
        .with_operands(vec![
            vreg(rd(insn), arrangement),
            vreg(rn(insn), arrangement),
            vreg(rm(insn), arrangement),
        ])
}

fn decode_three_same(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let q = bit(insn, 30);
    let u = bit(insn, 29);
    let size = bits(insn, 22, 2);
    let opcode = bits(insn, 11, 5);

    if opcode == 0b00011 {
        return Ok(decode_vector_logical(insn, address));
    }
    if opcode >= 0b11000 {
        return decode_vector_fp_three_same(insn, address);
    }

    let name = INT_THREE_SAME
        .get(opcode as usize)
        .map_or("", |names| names[usize::from(u)]);
    if name.is_empty() {
        return Ok(unnamed(insn, address, Operation::Vector));
    }

    let reserved = match (opcode, u) {
        (0b10011, true) => size != 0,
        (0b10110, _) => size == 0 || size == 3,
        (0b00000 | 0b00010 | 0b00100 | 0b01100..=0b01111 | 0b10010..=0b10101, _) => size == 3,
        _ => size == 3 && !q,
    };
    if reserved {
        return Err(DecodeError::malformed(address, insn, "reserved vector arrangement"));
    }
    Ok(vector3(insn, address, name, Arrangement::from_size_q(size, q)))
}

fn decode_vector_logical(insn: u32, address: u64) -> Instruction {
    let arrangement = if bit(insn, 30) {
        Arrangement::B16
    } else {
        Arrangement::B8
    };
    let (n, m) = (rn(insn), rm(insn));
    let mnemonic = match (bit(insn, 29), bits(insn, 22, 2)) {
        (false, 0b00) => "and",
        (false, 0b01) => "bic",
        (false, 0b10) if n == m => {
            return Instruction::new(address, insn, CLASS, "mov")
                .with_operation(Operation::Move)
                .with_operands(vec![vreg(rd(insn), arrangement), vreg(n, arrangement)]);
        }
        (false, 0b10) => "orr",
        (false, _) => "orn",
        (true, 0b00) => "eor",
        (true, 0b01) => "bsl",
        (true, 0b10) => "bit",
        (true, _) => "bif",
    };
    vector3(insn, address, mnemonic, arrangement)
}

fn decode_vector_fp_three_same(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let name = match (bit(insn, 29), bit(insn, 23), bits(insn, 11, 5)) {
        (false, false, 0b11000) => "fmaxnm",
        (false, false, 0b11001) => "fmla",
        (false, false, 0b11010) => "fadd",
        (false, false, 0b11011) => "fmulx",
        (false, false, 0b11100) => "fcmeq",
        (false, false, 0b11110) => "fmax",
        (false, false, 0b11111) => "frecps",
        (false, true, 0b11000) => "fminnm",
        (false, true, 0b11001) => "fmls",
        (false, true, 0b11010) => "fsub",
        (false, true, 0b11110) => "fmin",
        (false, true, 0b11111) => "frsqrts",
        (true, false, 0b11000) => "fmaxnmp",
        (true, false, 0b11010) => "faddp",
        (true, false, 0b11011) => "fmul",
        (true, false, 0b11100) => "fcmge",
        (true, false, 0b11101) => "facge",
        (true, false, 0b11110) => "fmaxp",
        (true, false, 0b11111) => "fdiv",
        (true, true, 0b11000) => "fminnmp",
        (true, true, 0b11010) => "fabd",
        (true, true, 0b11100) => "fcmgt",
        (true, true, 0b11101) => "facgt",
        (true, true, 0b11110) => "fminp",
        _ => return Ok(unnamed(insn, address, Operation::Vector)),
    };
    let Some(arrangement) = Arrangement::from_fp_sz_q(bit(insn, 22), bit(insn, 30)) else {
        return Err(DecodeError::malformed(address, insn, "reserved vector arrangement"));
    };
    Ok(vector3(insn, address, name, arrangement))
}

/// How a two-register misc instruction lays out its lanes.
enum Lanes {
    Int,
    Bytes,
    Float,
}

fn decode_two_reg_misc(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let q = bit(insn, 30);
    let size = bits(insn, 22, 2);

    let (mnemonic, lanes, compare_zero) = match (bit(insn, 29), bits(insn, 12, 5)) {
        (false, 0b00000) if size < 3 => ("rev64", Lanes::Int, false),
        (false, 0b00001) if size == 0 => ("rev16", Lanes::Int, false),
        (true, 0b00000) if size < 2 => ("rev32", Lanes::Int, false),
        (false, 0b00100) if size < 3 => ("cls", Lanes::Int, false),
        (true, 0b00100) if size < 3 => ("clz", Lanes::Int, false),
        (false, 0b00101) if size == 0 => ("cnt", Lanes::Bytes, false),
        (true, 0b00101) if size == 0 => ("mvn", Lanes::Bytes, false),
        (true, 0b00101) if size == 1 => ("rbit", Lanes::Bytes, false),
        (false, 0b01000) => ("cmgt", Lanes::Int, true),
        (true, 0b01000) => ("cmge", Lanes::Int, true),
        (false, 0b01001) => ("cmeq", Lanes::Int, true),
        (true, 0b01001) => ("cmle", Lanes::Int, true),
        (false, 0b01010) => ("cmlt", Lanes::Int, true),
        (false, 0b01011) => ("abs", Lanes::Int, false),
        (true, 0b01011) => ("neg", Lanes::Int, false),
        (false, 0b01111) if size >= 2 => ("fabs", Lanes::Float, false),
        (true, 0b01111) if size >= 2 => ("fneg", Lanes::Float, false),
        (true, 0b11111) if size >= 2 => ("fsqrt", Lanes::Float, false),
        (false, 0b11101) if size < 2 => ("scvtf", Lanes::Float, false),
        (true, 0b11101) if size < 2 => ("ucvtf", Lanes::Float, false),
        (false, 0b11011) if size >= 2 => ("fcvtzs", Lanes::Float, false),
        (true, 0b11011) if size >= 2 => ("fcvtzu", Lanes::Float, false),
        _ => return Ok(unnamed(insn, address, Operation::Vector)),
    };

    let arrangement = match lanes {
        Lanes::Int if size == 3 && !q => None,
        Lanes::Int => Some(Arrangement::from_size_q(size, q)),
        Lanes::Bytes => Some(Arrangement::from_size_q(0, q)),
        Lanes::Float => Arrangement::from_fp_sz_q(bit(insn, 22), q),
    };
    let Some(arrangement) = arrangement else {
        return Err(DecodeError::malformed(address, insn, "reserved vector arrangement"));
    };

    let mut operands = vec![vreg(rd(insn), arrangement), vreg(rn(insn), arrangement)];
    if compare_zero {
        operands.push(Operand::Count(0));
    }
    let operation = if mnemonic == "mvn" {
        Operation::Not
    } else {
        Operation::Vector
    };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands))
}

fn decode_across_lanes(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let q = bit(insn, 30);
    let u = bit(insn, 29);
    let size = bits(insn, 22, 2);
    let opcode = bits(insn, 12, 5);

    if u && matches!(opcode, 0b01100 | 0b01111) {
        let mnemonic = match (bit(insn, 23), opcode) {
            (false, 0b01100) => "fmaxnmv",
            (true, 0b01100) => "fminnmv",
            (false, _) => "fmaxv",
            (true, _) => "fminv",
        };
        if !q || bit(insn, 22) {
            return Err(DecodeError::malformed(address, insn, "reserved across-lanes arrangement"));
        }
        return Ok(Instruction::new(address, insn, CLASS, mnemonic)
            .with_operation(Operation::FloatArith)
            .with_operands(vec![fp(rd(insn), 32), vreg(rn(insn), Arrangement::S4)]));
    }

    let (mnemonic, widening) = match (u, opcode) {
        (false, 0b00011) => ("saddlv", true),
        (true, 0b00011) => ("uaddlv", true),
        (false, 0b01010) => ("smaxv", false),
        (true, 0b01010) => ("umaxv", false),
        (false, 0b11010) => ("sminv", false),
        (true, 0b11010) => ("uminv", false),
        (false, 0b11011) => ("addv", false),
        _ => return Ok(unnamed(insn, address, Operation::Vector)),
    };
    if size == 3 || (size == 2 && !q) {
        return Err(DecodeError::malformed(address, insn, "reserved across-lanes arrangement"));
    }

    let width = if widening { 16 << size } else { 8 << size };
    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::Vector)
        .with_operands(vec![
            fp(rd(insn), width),
            vreg(rn(insn), Arrangement::from_size_q(size, q)),
        ]))
}

fn decode_copy(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let q = bit(insn, 30);
    let imm4 = bits(insn, 11, 4);
    let Some((size, index)) = element_from_imm5(bits(insn, 16, 5)) else {
        return Err(DecodeError::malformed(address, insn, "reserved element size"));
    };
    let (d, n) = (rd(insn), rn(insn));

    if bit(insn, 29) {
        if !q {
            return Err(DecodeError::malformed(address, insn, "element insert requires Q"));
        }
        let from = (imm4 >> size) as u8;
        return Ok(Instruction::new(address, insn, CLASS, "mov")
            .with_operation(Operation::Move)
            .with_operands(vec![lane(d, size, index), lane(n, size, from)]));
    }

    match imm4 {
        0b0000 | 0b0001 if size == 3 && !q => {
            Err(DecodeError::malformed(address, insn, "reserved vector arrangement"))
        }
        0b0000 => Ok(Instruction::new(address, insn, CLASS, "dup")
            .with_operation(Operation::Vector)
            .with_operands(vec![
                vreg(d, Arrangement::from_size_q(size, q)),
                lane(n, size, index),
            ])),
        0b0001 => {
            let src = Register::gpr(n, size == 3);
            Ok(Instruction::new(address, insn, CLASS, "dup")
                .with_operation(Operation::Vector)
                .with_operands(vec![
                    vreg(d, Arrangement::from_size_q(size, q)),
                    Operand::reg(src),
                ])
                .with_read(src))
        }
        0b0011 if q => {
            let src = Register::gpr(n, size == 3);
            Ok(Instruction::new(address, insn, CLASS, "mov")
                .with_operation(Operation::Move)
                .with_operands(vec![lane(d, size, index), Operand::reg(src)])
                .with_read(src))
        }
        0b0101 | 0b0111 => {
            let mnemonic = match (imm4, q, size) {
                (0b0101, false, 0 | 1) | (0b0101, true, 0..=2) => "smov",
                (0b0111, false, 0 | 1) => "umov",
                (0b0111, false, 2) | (0b0111, true, 3) => "mov",
                _ => {
                    return Err(DecodeError::malformed(address, insn, "element move size mismatch"));
                }
            };
            let dst = Register::gpr(d, q);
            Ok(Instruction::new(address, insn, CLASS, mnemonic)
                .with_operation(Operation::Move)
                .with_operands(vec![Operand::reg(dst), lane(n, size, index)])
                .with_write(dst))
        }
        _ => Err(DecodeError::malformed(address, insn, "unallocated simd copy")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mnemonic(insn: u32) -> String {
        decode(insn, 0x1000).unwrap().mnemonic.unwrap()
    }

    fn is_malformed(insn: u32) -> bool {
        matches!(decode(insn, 0), Err(DecodeError::MalformedEncoding { .. }))
    }

    #[test]
    fn test_fadd_scalar() {
        // FADD S0, S1, S2: 0x1E222820
        let insn = decode(0x1E22_2820, 0x1000).unwrap();
        assert_eq!(insn.mnemonic.as_deref(), Some("fadd"));
        assert_eq!(insn.operands[0], Operand::reg(Register::fp(0, 32)));
        // FADD D0, D1, D2: 0x1E622820
        let insn = decode(0x1E62_2820, 0x1000).unwrap();
        assert_eq!(insn.operands[2], Operand::reg(Register::fp(2, 64)));
        assert!(insn.reads.is_empty());
        assert!(insn.writes.is_empty());
    }

    #[test]
    fn test_reserved_fp_type() {
        // FADD with ftype 10
        assert!(is_malformed(0x1EA2_2820));
    }

    #[test]
    fn test_fmov_immediate() {
        // FMOV S0, #1.0: 0x1E2E1000
        let insn = decode(0x1E2E_1000, 0x1000).unwrap();
        assert_eq!(insn.mnemonic.as_deref(), Some("fmov"));
        assert_eq!(insn.operands[1], Operand::FloatImmediate(1.0));
    }

    #[test]
    fn test_fcmp() {
        // FCMP S0, S1: 0x1E212000
        let insn = decode(0x1E21_2000, 0x1000).unwrap();
        assert_eq!(insn.mnemonic.as_deref(), Some("fcmp"));
        assert!(insn.writes.has_flags());
        assert!(!insn.reads.has_flags());
        // FCMP S0, #0.0: 0x1E202008
        let insn = decode(0x1E20_2008, 0x1000).unwrap();
        assert_eq!(insn.operands[1], Operand::FloatImmediate(0.0));
    }

    #[test]
    fn test_int_conversions() {
        // SCVTF D0, X1: 0x9E620020
        let scvtf = decode(0x9E62_0020, 0x1000).unwrap();
        assert_eq!(scvtf.mnemonic.as_deref(), Some("scvtf"));
        assert!(scvtf.reads.contains_index(1));
        // FMOV X0, D1: 0x9E660020
        let fmov = decode(0x9E66_0020, 0x1000).unwrap();
        assert_eq!(fmov.mnemonic.as_deref(), Some("fmov"));
        assert!(fmov.writes.contains_index(0));
        // FCVTZS W0, S1: 0x1E380020
        let fcvtzs = decode(0x1E38_0020, 0x1000).unwrap();
        assert_eq!(fcvtzs.mnemonic.as_deref(), Some("fcvtzs"));
        assert_eq!(fcvtzs.operands[0], Operand::reg(Register::w(0)));
    }

    #[test]
    fn test_fp_1src_and_3src() {
        // FCVT D0, S1: 0x1E22C020
        let fcvt = decode(0x1E22_C020, 0x1000).unwrap();
        assert_eq!(fcvt.mnemonic.as_deref(), Some("fcvt"));
        assert_eq!(fcvt.operands[0], Operand::reg(Register::fp(0, 64)));
        assert_eq!(fcvt.operands[1], Operand::reg(Register::fp(1, 32)));
        // FMADD D0, D1, D2, D3: 0x1F420C20
        assert_eq!(mnemonic(0x1F42_0C20), "fmadd");
        // FCSEL S0, S1, S2, EQ: 0x1E220C20
        let fcsel = decode(0x1E22_0C20, 0x1000).unwrap();
        assert_eq!(fcsel.mnemonic.as_deref(), Some("fcsel"));
        assert!(fcsel.reads.has_flags());
    }

    #[test]
    fn test_vector_three_same() {
        // ADD V0.4S, V1.4S, V2.4S: 0x4EA28420
        let add = decode(0x4EA2_8420, 0x1000).unwrap();
        assert_eq!(add.mnemonic.as_deref(), Some("add"));
        assert_eq!(
            add.operands[0],
            Operand::VectorRegister {
                reg: 0,
                arrangement: Arrangement::S4
            }
        );
        // MOV V0.16B, V1.16B: 0x4EA11C20
        let mov = decode(0x4EA1_1C20, 0x1000).unwrap();
        assert_eq!(mov.mnemonic.as_deref(), Some("mov"));
        assert_eq!(mov.operands.len(), 2);
        // FADD V0.4S, V1.4S, V2.4S: 0x4E22D420
        assert_eq!(mnemonic(0x4E22_D420), "fadd");
        // FADD with the single-lane double arrangement
        assert!(is_malformed(0x0E62_D420));
    }

    #[test]
    fn test_unnamed_in_known_group() {
        // three-same opcode 10111 with U=1 has no name
        let insn = decode(0x2E20_BC20, 0x1000).unwrap();
        assert!(insn.mnemonic.is_none());
        assert_eq!(insn.class, InstructionClass::SimdFp);
    }

    #[test]
    fn test_two_reg_misc_and_across_lanes() {
        // CNT V0.8B, V1.8B: 0x0E205820
        assert_eq!(mnemonic(0x0E20_5820), "cnt");
        // MVN V0.16B, V1.16B: 0x6E205820
        assert_eq!(mnemonic(0x6E20_5820), "mvn");
        // ADDV S0, V1.4S: 0x4EB1B820
        let addv = decode(0x4EB1_B820, 0x1000).unwrap();
        assert_eq!(addv.mnemonic.as_deref(), Some("addv"));
        assert_eq!(addv.operands[0], Operand::reg(Register::fp(0, 32)));
    }

    #[test]
    fn test_copy() {
        // DUP V0.4S, W1: 0x4E040C20
        let dup = decode(0x4E04_0C20, 0x1000).unwrap();
        assert_eq!(dup.mnemonic.as_deref(), Some("dup"));
        assert!(dup.reads.contains_index(1));
        // UMOV W0, V1.B[1]: 0x0E033C20
        let umov = decode(0x0E03_3C20, 0x1000).unwrap();
        assert_eq!(umov.mnemonic.as_deref(), Some("umov"));
        assert_eq!(
            umov.operands[1],
            Operand::VectorElement {
                reg: 1,
                element: ElementSize::B,
                index: 1
            }
        );
        assert!(umov.writes.contains_index(0));
        // MOV W0, V1.S[1]: 0x0E0C3C20
        assert_eq!(mnemonic(0x0E0C_3C20), "mov");
    }

    #[test]
    fn test_crypto() {
        // AESE V0.16B, V1.16B: 0x4E284820
        assert_eq!(mnemonic(0x4E28_4820), "aese");
        // SHA256H Q0, Q1, V2.4S: 0x5E024020
        let sha = decode(0x5E02_4020, 0x1000).unwrap();
        assert_eq!(sha.mnemonic.as_deref(), Some("sha256h"));
        assert_eq!(sha.operands[0], Operand::reg(Register::fp(0, 128)));
        // SHA1H S0, S1: 0x5E280820
        assert_eq!(mnemonic(0x5E28_0820), "sha1h");
    }
}
