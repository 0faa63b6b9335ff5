//! Loads and stores.

use armscope_core::{
    Extend, ExtendedRegister, IndexMode, Instruction, InstructionClass, MemoryRef, Operand,
    Operation, PcRelType, Register,
};

use super::fields::{bit, bits, offset_address, ra, rd, rm, rn, sign_extend};
use crate::DecodeError;

const CLASS: InstructionClass = InstructionClass::LoadStore;

pub(super) fn decode(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let simd = bit(insn, 26);
    match bits(insn, 28, 2) {
        // SIMD load/store multiple and single structures
        0b00 if simd && !bit(insn, 31) => Err(DecodeError::unsupported(address, insn, CLASS)),
        0b00 if simd => Err(DecodeError::malformed(address, insn, "unallocated structure load/store")),
        0b00 if bit(insn, 24) => Err(DecodeError::unsupported(address, insn, CLASS)),
        0b00 => decode_exclusive(insn, address),
        // RCpc unscaled, memory tagging and memory copy live here
        0b01 if bit(insn, 24) => Err(DecodeError::unsupported(address, insn, CLASS)),
        0b01 => decode_literal(insn, address),
        0b10 => decode_pair(insn, address),
        _ if bit(insn, 24) => decode_unsigned_imm(insn, address),
        _ if !bit(insn, 21) => match bits(insn, 10, 2) {
            0b00 => decode_imm9(insn, address, Form::Unscaled, IndexMode::Offset),
            0b01 => decode_imm9(insn, address, Form::Scaled, IndexMode::PostIndex),
            0b10 => decode_imm9(insn, address, Form::Unprivileged, IndexMode::Offset),
            _ => decode_imm9(insn, address, Form::Scaled, IndexMode::PreIndex),
        },
        _ => match bits(insn, 10, 2) {
            0b00 if !simd => decode_atomic(insn, address),
            0b10 => decode_reg_offset(insn, address),
            // ldraa / ldrab and friends
            _ => Err(DecodeError::unsupported(address, insn, CLASS)),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Load,
    Store,
    Prefetch,
}

/// Mnemonic family for single-register transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    /// `ldr` / `str` / `prfm`
    Scaled,
    /// `ldur` / `stur` / `prfum`
    Unscaled,
    /// `ldtr` / `sttr`
    Unprivileged,
}

#[derive(Debug, Clone, Copy)]
enum Width {
    Gpr { is_64: bool },
    Fp { bits: u16 },
}

impl Width {
    fn register(self, index: u8) -> Register {
        match self {
            Self::Gpr { is_64 } => Register::gpr(index, is_64),
            Self::Fp { bits } => Register::fp(index, bits),
        }
    }
}

/// Shape of a single-register load or store: what moves and how big.
#[derive(Debug, Clone, Copy)]
struct Transfer {
    access: Access,
    width: Width,
    suffix: &'static str,
    /// log2 of the access size in bytes.
    scale: u32,
}

impl Transfer {
    /// Decodes the `size:opc` fields (and `V`) of a single-register transfer.
    fn from_fields(size: u32, opc: u32, simd: bool) -> Option<Self> {
        if simd {
            let access = if opc & 1 == 1 {
                Access::Load
            } else {
                Access::Store
            };
            let (bits, scale) = match (size, opc >> 1) {
                (0, 0) => (8u16, 0),
                (0, _) => (128, 4),
                (_, 0) => (8u16 << size, size),
                _ => return None,
            };
            return Some(Self {
                access,
                width: Width::Fp { bits },
                suffix: "",
                scale,
            });
        }

        let w = Width::Gpr { is_64: false };
        let x = Width::Gpr { is_64: true };
        let (access, width, suffix) = match (size, opc) {
            (0, 0) => (Access::Store, w, "b"),
            (0, 1) => (Access::Load, w, "b"),
            (0, 2) => (Access::Load, x, "sb"),
            (0, 3) => (Access::Load, w, "sb"),
            (1, 0) => (Access::Store, w, "h"),
            (1, 1) => (Access::Load, w, "h"),
            (1, 2) => (Access::Load, x, "sh"),
            (1, 3) => (Access::Load, w, "sh"),
            (2, 0) => (Access::Store, w, ""),
            (2, 1) => (Access::Load, w, ""),
            (2, 2) => (Access::Load, x, "sw"),
            (3, 0) => (Access::Store, x, ""),
            (3, 1) => (Access::Load, x, ""),
            (3, 2) => (Access::Prefetch, x, ""),
            _ => return None,
        };
        Some(Self {
            access,
            width,
            suffix,
            scale: size,
        })
    }

    fn mnemonic(&self, form: Form) -> String {
        let stem = match (self.access, form) {
            (Access::Load, Form::Scaled) => "ldr",
            (Access::Load, Form::Unscaled) => "ldur",
            (Access::Load, Form::Unprivileged) => "ldtr",
            (Access::Store, Form::Scaled) => "str",
            (Access::Store, Form::Unscaled) => "stur",
            (Access::Store, Form::Unprivileged) => "sttr",
            (Access::Prefetch, Form::Unscaled) => "prfum",
            (Access::Prefetch, _) => "prfm",
        };
        format!("{}{}", stem, self.suffix)
    }
}

/// Prefetch operation named by the Rt field of `prfm`.
fn prefetch_op(rt: u8) -> Operand {
    let kind = match rt >> 3 {
        0b00 => "pld",
        0b01 => "pli",
        0b10 => "pst",
        _ => return Operand::Count(u32::from(rt)),
    };
    let level = match (rt >> 1) & 3 {
        0b00 => "l1",
        0b01 => "l2",
        0b10 => "l3",
        _ => return Operand::Count(u32::from(rt)),
    };
    let policy = if rt & 1 == 0 { "keep" } else { "strm" };
    Operand::named(format!("{}{}{}", kind, level, policy))
}

/// Builds a single-register transfer with its register effects.
fn single(
    insn: u32,
    address: u64,
    transfer: &Transfer,
    form: Form,
    mem: MemoryRef,
) -> Instruction {
    let rt = rd(insn);
    let data = transfer.width.register(rt);
    let base = Register::x_sp(rn(insn));

    let data_operand = if transfer.access == Access::Prefetch {
        prefetch_op(rt)
    } else {
        Operand::reg(data)
    };

    let mut result = Instruction::new(address, insn, CLASS, transfer.mnemonic(form))
        .with_operands(vec![data_operand, Operand::mem(mem)])
        .with_read(base);
    result = match transfer.access {
        Access::Load => result.with_operation(Operation::Load).with_write(data),
        Access::Store => result.with_operation(Operation::Store).with_read(data),
        Access::Prefetch => result.with_operation(Operation::Prefetch),
    };
    if let Some(index) = mem.index {
        result = result.with_read(index.reg);
    }
    if mem.mode.writes_back() {
        result = result.with_write(base);
    }
    result
}

fn transfer_or_malformed(insn: u32, address: u64) -> Result<Transfer, DecodeError> {
    Transfer::from_fields(bits(insn, 30, 2), bits(insn, 22, 2), bit(insn, 26))
        .ok_or_else(|| DecodeError::malformed(address, insn, "unallocated load/store size"))
}

fn decode_unsigned_imm(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let transfer = transfer_or_malformed(insn, address)?;
    let offset = i64::from(bits(insn, 10, 12)) << transfer.scale;
    let mem = MemoryRef::base_disp(Register::x_sp(rn(insn)), offset);
    Ok(single(insn, address, &transfer, Form::Scaled, mem))
}

fn decode_imm9(
    insn: u32,
    address: u64,
    form: Form,
    mode: IndexMode,
) -> Result<Instruction, DecodeError> {
    let transfer = transfer_or_malformed(insn, address)?;
    if transfer.access == Access::Prefetch && mode.writes_back() {
        return Err(DecodeError::malformed(address, insn, "prefetch has no writeback form"));
    }
    if form == Form::Unprivileged
        && (bit(insn, 26) || transfer.access == Access::Prefetch)
    {
        return Err(DecodeError::malformed(address, insn, "unallocated unprivileged load/store"));
    }

    let offset = sign_extend(u64::from(bits(insn, 12, 9)), 9);
    let mem = MemoryRef::with_mode(Register::x_sp(rn(insn)), offset, mode);
    Ok(single(insn, address, &transfer, form, mem))
}

fn decode_reg_offset(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let transfer = transfer_or_malformed(insn, address)?;
    let option = bits(insn, 13, 3);
    if option & 0b010 == 0 {
        return Err(DecodeError::malformed(address, insn, "reserved register offset extend"));
    }

    let index = Register::gpr(rm(insn), option & 1 == 1);
    let extend = if option == 0b011 {
        Extend::Lsl
    } else {
        Extend::from_bits(option)
    };
    let amount = bit(insn, 12).then_some(transfer.scale as u8);
    let mem = MemoryRef::indexed(
        Register::x_sp(rn(insn)),
        ExtendedRegister {
            reg: index,
            extend,
            amount,
        },
    );
    Ok(single(insn, address, &transfer, Form::Scaled, mem))
}

fn decode_literal(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let opc = bits(insn, 30, 2);
    let rt = rd(insn);
    let offset = sign_extend(u64::from(bits(insn, 5, 19)) << 2, 21);
    let target = offset_address(address, offset);
    let literal = Operand::pc_rel(offset, target);

    let (mnemonic, access, data) = if bit(insn, 26) {
        let bits = match opc {
            0b00 => 32,
            0b01 => 64,
            0b10 => 128,
            _ => return Err(DecodeError::malformed(address, insn, "unallocated literal load size")),
        };
        ("ldr", Access::Load, Register::fp(rt, bits))
    } else {
        match opc {
            0b00 => ("ldr", Access::Load, Register::w(rt)),
            0b01 => ("ldr", Access::Load, Register::x(rt)),
            0b10 => ("ldrsw", Access::Load, Register::x(rt)),
            _ => ("prfm", Access::Prefetch, Register::x(rt)),
        }
    };

    let result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_pc_rel(PcRelType::AddressIndex, target);
    Ok(if access == Access::Prefetch {
        result
            .with_operation(Operation::Prefetch)
            .with_operands(vec![prefetch_op(rt), literal])
    } else {
        result
            .with_operation(Operation::Load)
            .with_operands(vec![Operand::reg(data), literal])
            .with_write(data)
    })
}

fn decode_pair(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let opc = bits(insn, 30, 2);
    let mode_bits = bits(insn, 23, 2);
    let load = bit(insn, 22);
    let non_temporal = mode_bits == 0b00;
    let mode = match mode_bits {
        0b01 => IndexMode::PostIndex,
        0b11 => IndexMode::PreIndex,
        _ => IndexMode::Offset,
    };

    let (width, scale, signed) = if bit(insn, 26) {
        match opc {
            0b00 => (Width::Fp { bits: 32 }, 2, false),
            0b01 => (Width::Fp { bits: 64 }, 3, false),
            0b10 => (Width::Fp { bits: 128 }, 4, false),
            _ => return Err(DecodeError::malformed(address, insn, "unallocated pair size")),
        }
    } else {
        match opc {
            0b00 => (Width::Gpr { is_64: false }, 2, false),
            0b01 if load && !non_temporal => (Width::Gpr { is_64: true }, 2, true),
            // stgp
            0b01 if !non_temporal => return Err(DecodeError::unsupported(address, insn, CLASS)),
            0b10 => (Width::Gpr { is_64: true }, 3, false),
            _ => return Err(DecodeError::malformed(address, insn, "unallocated pair size")),
        }
    };

    let mnemonic = match (load, non_temporal, signed) {
        (true, true, _) => "ldnp",
        (true, false, true) => "ldpsw",
        (true, false, false) => "ldp",
        (false, true, _) => "stnp",
        (false, false, _) => "stp",
    };

    let first = width.register(rd(insn));
    let second = width.register(ra(insn));
    let base = Register::x_sp(rn(insn));
    let offset = sign_extend(u64::from(bits(insn, 15, 7)), 7) << scale;
    let mem = MemoryRef::with_mode(base, offset, mode);

    let mut result = Instruction::new(address, insn, CLASS, mnemonic)
        .with_operands(vec![Operand::reg(first), Operand::reg(second), Operand::mem(mem)])
        .with_read(base);
    result = if load {
        result
            .with_operation(Operation::Load)
            .with_writes(&[first, second])
    } else {
        result
            .with_operation(Operation::Store)
            .with_reads(&[first, second])
    };
    if mode.writes_back() {
        result = result.with_write(base);
    }
    Ok(result)
}

fn size_suffix(size: u32) -> &'static str {
    match size {
        0 => "b",
        1 => "h",
        _ => "",
    }
}

fn ordering_suffix(acquire: bool, release: bool) -> &'static str {
    match (acquire, release) {
        (false, false) => "",
        (true, false) => "a",
        (false, true) => "l",
        (true, true) => "al",
    }
}

fn decode_exclusive(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let size = bits(insn, 30, 2);
    let o2 = bit(insn, 23);
    let load = bit(insn, 22);
    let o1 = bit(insn, 21);
    let o0 = bit(insn, 15);
    let (rs, rt, rt2) = (rm(insn), rd(insn), ra(insn));
    let is_64 = size == 3;
    let sfx = size_suffix(size);

    let base = Register::x_sp(rn(insn));
    let mem = Operand::mem(MemoryRef::base(base));

    let result = match (o2, o1) {
        (false, false) => {
            let data = Register::gpr(rt, is_64);
            if load {
                let stem = if o0 { "ldaxr" } else { "ldxr" };
                Instruction::new(address, insn, CLASS, format!("{}{}", stem, sfx))
                    .with_operation(Operation::Load)
                    .with_operands(vec![Operand::reg(data), mem])
                    .with_write(data)
            } else {
                let status = Register::w(rs);
                let stem = if o0 { "stlxr" } else { "stxr" };
                Instruction::new(address, insn, CLASS, format!("{}{}", stem, sfx))
                    .with_operation(Operation::Store)
                    .with_operands(vec![Operand::reg(status), Operand::reg(data), mem])
                    .with_read(data)
                    .with_write(status)
            }
        }
        (false, true) if size >= 2 => {
            let first = Register::gpr(rt, is_64);
            let second = Register::gpr(rt2, is_64);
            if load {
                let name = if o0 { "ldaxp" } else { "ldxp" };
                Instruction::new(address, insn, CLASS, name)
                    .with_operation(Operation::Load)
                    .with_operands(vec![Operand::reg(first), Operand::reg(second), mem])
                    .with_writes(&[first, second])
            } else {
                let status = Register::w(rs);
                let name = if o0 { "stlxp" } else { "stxp" };
                Instruction::new(address, insn, CLASS, name)
                    .with_operation(Operation::Store)
                    .with_operands(vec![
                        Operand::reg(status),
                        Operand::reg(first),
                        Operand::reg(second),
                        mem,
                    ])
                    .with_reads(&[first, second])
                    .with_write(status)
            }
        }
        (false, true) => {
            if rs % 2 != 0 || rt % 2 != 0 {
                return Err(DecodeError::malformed(
                    address,
                    insn,
                    "compare and swap pair needs even registers",
                ));
            }
            let pair_64 = size == 1;
            let compare = [Register::gpr(rs, pair_64), Register::gpr(rs + 1, pair_64)];
            let new = [Register::gpr(rt, pair_64), Register::gpr(rt + 1, pair_64)];
            let name = format!("casp{}", ordering_suffix(load, o0));
            Instruction::new(address, insn, CLASS, name)
                .with_operation(Operation::CompareExchange)
                .with_operands(vec![
                    Operand::reg(compare[0]),
                    Operand::reg(compare[1]),
                    Operand::reg(new[0]),
                    Operand::reg(new[1]),
                    mem,
                ])
                .with_reads(&compare)
                .with_reads(&new)
                .with_writes(&compare)
        }
        (true, false) => {
            let data = Register::gpr(rt, is_64);
            let stem = match (load, o0) {
                (true, true) => "ldar",
                (true, false) => "ldlar",
                (false, true) => "stlr",
                (false, false) => "stllr",
            };
            let result = Instruction::new(address, insn, CLASS, format!("{}{}", stem, sfx))
                .with_operands(vec![Operand::reg(data), mem]);
            if load {
                result.with_operation(Operation::Load).with_write(data)
            } else {
                result.with_operation(Operation::Store).with_read(data)
            }
        }
        (true, true) => {
            let compare = Register::gpr(rs, is_64);
            let new = Register::gpr(rt, is_64);
            let name = format!("cas{}{}", ordering_suffix(load, o0), sfx);
            Instruction::new(address, insn, CLASS, name)
                .with_operation(Operation::CompareExchange)
                .with_operands(vec![Operand::reg(compare), Operand::reg(new), mem])
                .with_reads(&[compare, new])
                .with_write(compare)
        }
    };
    Ok(result.with_read(base))
}

fn decode_atomic(insn: u32, address: u64) -> Result<Instruction, DecodeError> {
    let size = bits(insn, 30, 2);
    let acquire = bit(insn, 23);
    let release = bit(insn, 22);
    let (rs, rt) = (rm(insn), rd(insn));
    let opc = bits(insn, 12, 3);
    let is_64 = size == 3;
    let sfx = size_suffix(size);

    let base = Register::x_sp(rn(insn));
    let mem = Operand::mem(MemoryRef::base(base));
    let source = Register::gpr(rs, is_64);
    let data = Register::gpr(rt, is_64);

    if bit(insn, 15) {
        return match opc {
            0b000 => {
                let name = format!("swp{}{}", ordering_suffix(acquire, release), sfx);
                Ok(Instruction::new(address, insn, CLASS, name)
                    .with_operation(Operation::Exchange)
                    .with_operands(vec![Operand::reg(source), Operand::reg(data), mem])
                    .with_reads(&[source, base])
                    .with_write(data))
            }
            0b100 if acquire && !release && rs == 31 => {
                Ok(Instruction::new(address, insn, CLASS, format!("ldapr{}", sfx))
                    .with_operation(Operation::Load)
                    .with_operands(vec![Operand::reg(data), mem])
                    .with_read(base)
                    .with_write(data))
            }
            _ => Err(DecodeError::unsupported(address, insn, CLASS)),
        };
    }

    let (op, operation) = match opc {
        0b000 => ("add", Operation::AtomicAdd),
        0b001 => ("clr", Operation::AtomicLogic),
        0b010 => ("eor", Operation::AtomicLogic),
        0b011 => ("set", Operation::AtomicLogic),
        0b100 => ("smax", Operation::AtomicMinMax),
        0b101 => ("smin", Operation::AtomicMinMax),
        0b110 => ("umax", Operation::AtomicMinMax),
        _ => ("umin", Operation::AtomicMinMax),
    };

    // With the result discarded and no acquire, the store alias is preferred.
    if rt == 31 && !acquire {
        let name = format!("st{}{}{}", op, ordering_suffix(false, release), sfx);
        return Ok(Instruction::new(address, insn, CLASS, name)
            .with_operation(operation)
            .with_operands(vec![Operand::reg(source), mem])
            .with_reads(&[source, base]));
    }

    let name = format!("ld{}{}{}", op, ordering_suffix(acquire, release), sfx);
    Ok(Instruction::new(address, insn, CLASS, name)
        .with_operation(operation)
        .with_operands(vec![Operand::reg(source), Operand::reg(data), mem])
        .with_reads(&[source, base])
        .with_write(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mnemonic(insn: u32) -> String {
        decode(insn, 0x1000).unwrap().mnemonic.unwrap()
    }

    #[test]
    fn test_unsigned_offset() {
        // LDR X0, [X1, #8]: 0xF9400420
        let ldr = decode(0xF940_0420, 0x1000).unwrap();
        assert_eq!(ldr.mnemonic.as_deref(), Some("ldr"));
        assert!(ldr.reads.contains_index(1));
        assert!(ldr.writes.contains_index(0));
        assert!(!ldr.writes.contains_index(1));

        // STR W2, [SP, #4]: 0xB90007E2
        let store = decode(0xB900_07E2, 0x1000).unwrap();
        assert_eq!(store.mnemonic.as_deref(), Some("str"));
        assert!(store.reads.contains_index(2));
        assert!(store.reads.contains_index(31));
        assert!(store.writes.is_empty());

        // LDRSW X0, [X1]: 0xB9800020
        assert_eq!(mnemonic(0xB980_0020), "ldrsw");
        // size 11, opc 11: 0xF9C00020
        assert!(matches!(
            decode(0xF9C0_0020, 0x1000),
            Err(DecodeError::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn test_writeback_marks_base_written() {
        // LDRB W0, [X1, #1]!: 0x38401C20
        let ldrb = decode(0x3840_1C20, 0x1000).unwrap();
        assert_eq!(ldrb.mnemonic.as_deref(), Some("ldrb"));
        assert!(ldrb.writes.contains_index(0));
        assert!(ldrb.writes.contains_index(1));

        // STP X29, X30, [SP, #-16]!: 0xA9BF7BFD
        let stp = decode(0xA9BF_7BFD, 0x1000).unwrap();
        assert_eq!(stp.mnemonic.as_deref(), Some("stp"));
        assert!(stp.reads.contains_index(29));
        assert!(stp.reads.contains_index(30));
        assert!(stp.writes.contains_index(31));

        // LDP X29, X30, [SP], #16: 0xA8C17BFD
        let ldp = decode(0xA8C1_7BFD, 0x1000).unwrap();
        assert_eq!(ldp.mnemonic.as_deref(), Some("ldp"));
        assert!(ldp.writes.contains_index(29));
        assert!(ldp.writes.contains_index(30));
        assert!(ldp.writes.contains_index(31));

        // LDP X29, X30, [SP, #16]: 0xA9417BFD
        assert!(!decode(0xA941_7BFD, 0x1000).unwrap().writes.contains_index(31));
    }

    #[test]
    fn test_unscaled_and_prefetch() {
        // LDUR X0, [X1, #-8]: 0xF85F8020
        assert_eq!(mnemonic(0xF85F_8020), "ldur");

        // PRFM PLDL1KEEP, [X0]: 0xF9800000
        let prfm = decode(0xF980_0000, 0x1000).unwrap();
        assert_eq!(prfm.mnemonic.as_deref(), Some("prfm"));
        assert!(prfm.writes.is_empty());
        assert!(matches!(&prfm.operands[0], Operand::Named(name) if name == "pldl1keep"));

        // PRFM pre-index is unallocated: 0xF8800C00
        assert!(decode(0xF880_0C00, 0x1000).is_err());
    }

    #[test]
    fn test_literal() {
        // LDR X0, #8: 0x58000040
        let ldr = decode(0x5800_0040, 0x1000).unwrap();
        assert_eq!(ldr.mnemonic.as_deref(), Some("ldr"));
        assert_eq!(ldr.pc_rel, PcRelType::AddressIndex);
        assert_eq!(ldr.pc_rel_target, 0x1008);
        assert!(ldr.writes.contains_index(0));
    }

    #[test]
    fn test_simd_registers_untracked() {
        // LDR Q0, [X0]: 0x3DC00000
        let ldr = decode(0x3DC0_0000, 0x1000).unwrap();
        assert_eq!(ldr.mnemonic.as_deref(), Some("ldr"));
        assert!(ldr.reads.contains_index(0));
        assert!(ldr.writes.is_empty());
    }

    #[test]
    fn test_exclusive() {
        // LDAXR X0, [X1]: 0xC85FFC20
        let ldaxr = decode(0xC85F_FC20, 0x1000).unwrap();
        assert_eq!(ldaxr.mnemonic.as_deref(), Some("ldaxr"));
        assert!(ldaxr.writes.contains_index(0));

        // STXR W2, X0, [X1]: 0xC8027C20
        let stxr = decode(0xC802_7C20, 0x1000).unwrap();
        assert_eq!(stxr.mnemonic.as_deref(), Some("stxr"));
        assert!(stxr.reads.contains_index(0));
        assert!(stxr.reads.contains_index(1));
        assert!(stxr.writes.contains_index(2));
    }

    #[test]
    fn test_atomics() {
        // LDADD X1, X2, [X0]: 0xF8210002
        let ldadd = decode(0xF821_0002, 0x1000).unwrap();
        assert_eq!(ldadd.mnemonic.as_deref(), Some("ldadd"));
        assert!(ldadd.reads.contains_index(0));
        assert!(ldadd.reads.contains_index(1));
        assert!(ldadd.writes.contains_index(2));

        // STADD X1, [X0]: 0xF821001F
        let stadd = decode(0xF821_001F, 0x1000).unwrap();
        assert_eq!(stadd.mnemonic.as_deref(), Some("stadd"));
        assert!(stadd.writes.is_empty());
    }
}
