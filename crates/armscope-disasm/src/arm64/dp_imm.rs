//! Data processing (immediate): PC-relative addressing, add/sub, logical,
//! move wide, bitfield and extract.

use armscope_core::{Instruction, InstructionClass, Operand, Operation, PcRelType, Register};

use super::fields::{bit, bits, decode_bit_masks, offset_address, rd, rm, rn, sign_extend};
use crate::DecodeError;

const CLASS: InstructionClass = InstructionClass::DataProcessingImmediate;

pub(super) fn decode(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    match bits(insn, 23, 3) {
        0b000 | 0b001 => decode_pc_rel(insn, address),
        0b010 => decode_add_sub(insn, address),
        // add/sub with tags, min/max immediate
        0b011 => Err(DecodeError::unsupported(address, insn, CLASS)),
        0b100 => decode_logical(insn, address),
        0b101 => decode_move_wide(insn, address),
        0b110 => decode_bitfield(insn, address),
        _ => decode_extract(insn, address),
    }
}

fn decode_pc_rel(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let imm = u64::from((bits(insn, 5, 19) << 2) | bits(insn, 29, 2));
    let dst = Register::x(rd(insn));

    let (mnemonic, kind, target) = if bit(insn, 31) {
        let offset = sign_extend(imm, 21) << 12;
        ("adrp", PcRelType::AddressPage, offset_address(address & !0xFFF, offset))
    } else {
        let offset = sign_extend(imm, 21);
        ("adr", PcRelType::AddressIndex, offset_address(address, offset))
    };

    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::LoadEffectiveAddress)
        .with_operands(vec![
            Operand::reg(dst),
            Operand::pc_rel(target.wrapping_sub(address) as i64, target),
        ])
        .with_write(dst)
        .with_pc_rel(kind, target))
}

fn decode_add_sub(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let is_sub = bit(insn, 30);
    let set_flags = bit(insn, 29);
    let imm12 = u64::from(bits(insn, 10, 12));
    let shifted = bit(insn, 22);
    let (d, n) = (rd(insn), rn(insn));

    let src = Register::gpr_sp(n, is_64);
    let dst = if set_flags {
        Register::gpr(d, is_64)
    } else {
        Register::gpr_sp(d, is_64)
    };
    let imm = if shifted {
        Operand::ShiftedImmediate {
            value: imm12,
            shift: 12,
        }
    } else {
        Operand::imm_unsigned(imm12)
    };

    let (mnemonic, operation, operands) = if set_flags && d == 31 {
        let name = if is_sub { "cmp" } else { "cmn" };
        (name, Operation::Compare, vec![Operand::reg(src), imm])
    } else if !set_flags && !is_sub && !shifted && imm12 == 0 && (d == 31 || n == 31) {
        ("mov", Operation::Move, vec![Operand::reg(dst), Operand::reg(src)])
    } else {
        let name = match (is_sub, set_flags) {
            (false, false) => "add",
            (false, true) => "adds",
            (true, false) => "sub",
            (true, true) => "subs",
        };
        let op = if is_sub { Operation::Sub } else { Operation::Add };
        (name, op, vec![Operand::reg(dst), Operand::reg(src), imm])
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_read(src)
        .with_write(dst);
    Ok(if set_flags {
        result.with_flags_written()
    } else {
        result
    })
}

fn decode_logical(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let opc = bits(insn, 29, 2);
    let n = bits(insn, 22, 1);
    let immr = bits(insn, 16, 6);
    let imms = bits(insn, 10, 6);

    let Some(imm) = decode_bit_masks(n, imms, immr, is_64) else {
        return Err(DecodeError::malformed(address, insn, "reserved bitmask immediate"));
    };

    let (d, rn) = (rd(insn), rn(insn));
    let set_flags = opc == 0b11;
    let dst = if set_flags {
        Register::gpr(d, is_64)
    } else {
        Register::gpr_sp(d, is_64)
    };
    let src = Register::gpr(rn, is_64);
    let imm_op = Operand::imm_unsigned(imm);

    let (mnemonic, operation, operands) = match opc {
        0b11 if d == 31 => ("tst", Operation::Test, vec![Operand::reg(src), imm_op]),
        0b01 if rn == 31 => ("mov", Operation::Move, vec![Operand::reg(dst), imm_op]),
        _ => {
            let (name, op) = match opc {
                0b00 => ("and", Operation::And),
                0b01 => ("orr", Operation::Or),
                0b10 => ("eor", Operation::Xor),
                _ => ("ands", Operation::And),
            };
            (name, op, vec![Operand::reg(dst), Operand::reg(src), imm_op])
        }
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_read(src)
        .with_write(dst);
    Ok(if set_flags {
        result.with_flags_written()
    } else {
        result
    })
}

fn decode_move_wide(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let opc = bits(insn, 29, 2);
    let hw = bits(insn, 21, 2);
    let imm16 = u64::from(bits(insn, 5, 16));

    if opc == 0b01 {
        return Err(DecodeError::malformed(address, insn, "unallocated move wide opcode"));
    }
    if !is_64 && hw >= 2 {
        return Err(DecodeError::malformed(
            address,
            insn,
            "move wide shift exceeds register width",
        ));
    }

    let dst = Register::gpr(rd(insn), is_64);
    let shift = (hw * 16) as u8;
    let explicit = Operand::ShiftedImmediate {
        value: imm16,
        shift,
    };
    // `mov` is preferred unless a zero immediate is shifted.
    let prefer_mov = !(imm16 == 0 && hw != 0);

    let (mnemonic, operand) = match opc {
        0b10 if prefer_mov => ("mov", Operand::imm_unsigned(imm16 << shift)),
        0b10 => ("movz", explicit),
        0b00 => {
            let inverted = !(imm16 << shift);
            if is_64 && prefer_mov {
                ("mov", Operand::imm(inverted as i64))
            } else if !is_64 && prefer_mov && imm16 != 0xFFFF {
                ("mov", Operand::imm(i64::from(inverted as u32 as i32)))
            } else {
                ("movn", explicit)
            }
        }
        _ => ("movk", explicit),
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(Operation::Move)
        .with_operands(vec![Operand::reg(dst), operand])
        .with_write(dst);
    // movk keeps the other bits of the destination
    Ok(if opc == 0b11 {
        result.with_read(dst)
    } else {
        result
    })
}

fn decode_bitfield(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let opc = bits(insn, 29, 2);
    let n = bit(insn, 22);
    let immr = bits(insn, 16, 6);
    let imms = bits(insn, 10, 6);

    if opc == 0b11 {
        return Err(DecodeError::malformed(address, insn, "unallocated bitfield opcode"));
    }
    if n != is_64 {
        return Err(DecodeError::malformed(address, insn, "bitfield N must match sf"));
    }
    if !is_64 && (immr >= 32 || imms >= 32) {
        return Err(DecodeError::malformed(
            address,
            insn,
            "bitfield position exceeds register width",
        ));
    }

    let width = if is_64 { 64 } else { 32 };
    let rn = rn(insn);
    let dst = Register::gpr(rd(insn), is_64);
    let src = Register::gpr(rn, is_64);

    let with_src = |extra: &[u32]| {
        let mut ops = vec![Operand::reg(dst), Operand::reg(src)];
        ops.extend(extra.iter().map(|&v| Operand::Count(v)));
        ops
    };
    // `*bfiz` / `bfi` take lsb and width of the inserted field,
    // `*bfx` / `bfxil` the lsb and width of the extracted one.
    let insert = || [width - immr, imms + 1];
    let extract = || [immr, imms - immr + 1];

    let (mnemonic, operation, operands) = match opc {
        0b00 if imms == width - 1 => ("asr", Operation::Sar, with_src(&[immr])),
        0b00 if imms < immr => ("sbfiz", Operation::BitField, with_src(&insert())),
        0b00 if immr == 0 && matches!(imms, 7 | 15 | 31) => {
            let name = match imms {
                7 => "sxtb",
                15 => "sxth",
                _ => "sxtw",
            };
            let narrow = Register::w(rn);
            (name, Operation::BitField, vec![Operand::reg(dst), Operand::reg(narrow)])
        }
        0b00 => ("sbfx", Operation::BitField, with_src(&extract())),
        0b01 if imms < immr && rn == 31 => {
            let mut ops = vec![Operand::reg(dst)];
            ops.extend(insert().iter().map(|&v| Operand::Count(v)));
            ("bfc", Operation::BitField, ops)
        }
        0b01 if imms < immr => ("bfi", Operation::BitField, with_src(&insert())),
        0b01 => ("bfxil", Operation::BitField, with_src(&extract())),
        _ if imms != width - 1 && imms + 1 == immr => {
            ("lsl", Operation::Shl, with_src(&[width - 1 - imms]))
        }
        _ if imms == width - 1 => ("lsr", Operation::Shr, with_src(&[immr])),
        _ if imms < immr => ("ubfiz", Operation::BitField, with_src(&insert())),
        _ if !is_64 && immr == 0 && matches!(imms, 7 | 15) => {
            let name = if imms == 7 { "uxtb" } else { "uxth" };
            (name, Operation::BitField, with_src(&[]))
        }
        _ => ("ubfx", Operation::BitField, with_src(&extract())),
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_read(src)
        .with_write(dst);
    // bfm variants merge into the destination
    Ok(if opc == 0b01 {
        result.with_read(dst)
    } else {
        result
    })
}

fn decode_extract(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let is_64 = bit(insn, 31);
    let imms = bits(insn, 10, 6);

    if bits(insn, 29, 2) != 0 || bit(insn, 21) {
        return Err(DecodeError::malformed(address, insn, "unallocated extract opcode"));
    }
    if bit(insn, 22) != is_64 || (!is_64 && imms >= 32) {
        return Err(DecodeError::malformed(address, insn, "extract N or lsb mismatch"));
    }

    let dst = Register::gpr(rd(insn), is_64);
    let first = Register::gpr(rn(insn), is_64);
    let second = Register::gpr(rm(insn), is_64);

    let (mnemonic, operation, operands) = if rn(insn) == rm(insn) {
        ("ror", Operation::Ror, vec![Operand::reg(dst), Operand::reg(first), Operand::Count(imms)])
    } else {
        (
            "extr",
            Operation::BitField,
            vec![
                Operand::reg(dst),
                Operand::reg(first),
                Operand::reg(second),
                Operand::Count(imms),
            ],
        )
    };

    Ok(Instruction::new(address, insn, CLASS, mnemonic)
        .with_operation(operation)
        .with_operands(operands)
        .with_reads(&[first, second])
        .with_write(dst))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mnemonic(insn: u32) -> String {
        decode(insn, 0x1000).unwrap().mnemonic.unwrap()
    }

    fn is_malformed(insn: u32) -> bool {
        matches!(
            decode(insn, 0x1000),
            Err(DecodeError::MalformedEncoding { .. })
        )
    }

    #[test]
    fn test_pc_relative() {
        // ADR X1, #8: 0x10000041
        let adr = decode(0x1000_0041, 0x1000).unwrap();
        assert_eq!(adr.mnemonic.as_deref(), Some("adr"));
        assert_eq!(adr.pc_rel, PcRelType::AddressIndex);
        assert_eq!(adr.pc_rel_target, 0x1008);
        assert!(adr.writes.contains_index(1));

        // ADRP X0, #0x1000: 0xB0000000
        let adrp = decode(0xB000_0000, 0x1234).unwrap();
        assert_eq!(adrp.mnemonic.as_deref(), Some("adrp"));
        assert_eq!(adrp.pc_rel, PcRelType::AddressPage);
        assert_eq!(adrp.pc_rel_target, 0x2000);
    }

    #[test]
    fn test_add_sub() {
        // ADD X0, X1, #1: 0x91000420
        let add = decode(0x9100_0420, 0x1000).unwrap();
        assert_eq!(add.mnemonic.as_deref(), Some("add"));
        assert!(add.reads.contains_index(1));
        assert!(add.writes.contains_index(0));
        assert!(!add.writes.has_flags());

        // MOV X29, SP: 0x910003FD
        let mov = decode(0x9100_03FD, 0x1000).unwrap();
        assert_eq!(mov.mnemonic.as_deref(), Some("mov"));
        assert!(mov.reads.contains_index(31));
        assert!(mov.writes.contains_index(29));

        // CMP X0, #5: 0xF100141F
        let cmp = decode(0xF100_141F, 0x1000).unwrap();
        assert_eq!(cmp.mnemonic.as_deref(), Some("cmp"));
        assert!(cmp.writes.has_flags());
        assert!(!cmp.writes.contains_index(31));

        // ADDS X0, X1, #1, LSL #12: 0xB1400420
        let adds = decode(0xB140_0420, 0x1000).unwrap();
        assert_eq!(adds.mnemonic.as_deref(), Some("adds"));
        assert!(matches!(
            adds.operands[2],
            Operand::ShiftedImmediate { value: 1, shift: 12 }
        ));
    }

    #[test]
    fn test_logical() {
        // AND X0, X1, #0xff: 0x92401C20
        assert_eq!(mnemonic(0x9240_1C20), "and");
        // TST X1, #0xff: 0xF2401C3F
        let tst = decode(0xF240_1C3F, 0x1000).unwrap();
        assert_eq!(tst.mnemonic.as_deref(), Some("tst"));
        assert!(tst.writes.has_flags());
        // N=0, imms=111111: 0x1200FC00
        assert!(is_malformed(0x1200_FC00));
    }

    #[test]
    fn test_move_wide() {
        // MOVN W0, #0xffff: 0x129FFFE0
        assert_eq!(mnemonic(0x129F_FFE0), "movn");

        // MOVK X0, #0x5678, LSL #16: 0xF2AACF00
        let movk = decode(0xF2AA_CF00, 0x1000).unwrap();
        assert_eq!(movk.mnemonic.as_deref(), Some("movk"));
        assert!(movk.reads.contains_index(0));
        assert!(movk.writes.contains_index(0));

        // opc 01: 0x32800000
        assert!(is_malformed(0x3280_0000));
        // MOVZ W0 with hw=2: 0x52C00000
        assert!(is_malformed(0x52C0_0000));
    }

    #[test]
    fn test_bitfield() {
        // ASR X0, X1, #3: 0x9343FC20
        let asr = decode(0x9343_FC20, 0x1000).unwrap();
        assert_eq!(asr.mnemonic.as_deref(), Some("asr"));
        assert!(matches!(asr.operands[2], Operand::Count(3)));

        // BFI X0, X1, #8, #4: 0xB3780C20
        let bfi = decode(0xB378_0C20, 0x1000).unwrap();
        assert_eq!(bfi.mnemonic.as_deref(), Some("bfi"));
        assert!(matches!(bfi.operands[2], Operand::Count(8)));
        assert!(matches!(bfi.operands[3], Operand::Count(4)));
        assert!(bfi.reads.contains_index(0));
        assert!(bfi.reads.contains_index(1));

        // SBFM with N != sf: 0x93000000
        assert!(is_malformed(0x9300_0000));
    }

    #[test]
    fn test_extract() {
        // EXTR X0, X1, X2, #16: 0x93C24020
        let extr = decode(0x93C2_4020, 0x1000).unwrap();
        assert_eq!(extr.mnemonic.as_deref(), Some("extr"));
        assert!(extr.reads.contains_index(1));
        assert!(extr.reads.contains_index(2));
        assert!(matches!(extr.operands[3], Operand::Count(16)));
    }
}
