//! Decoded AArch64 instruction representation.

use std::fmt;

use crate::{Operand, Register, RegisterSet};

/// Top-level A64 encoding group, selected by bits 28:25 of the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstructionClass {
    /// op0 = 0000 with bit 31 clear (includes `udf`).
    Reserved,
    /// op0 = 0000 with bit 31 set.
    Sme,
    /// op0 = 0001 or 0011.
    Unallocated,
    /// op0 = 0010.
    Sve,
    /// op0 = 100x.
    DataProcessingImmediate,
    /// op0 = 101x.
    BranchSystem,
    /// op0 = x1x0.
    LoadStore,
    /// op0 = x101.
    DataProcessingRegister,
    /// op0 = x111.
    SimdFp,
}

impl InstructionClass {
    /// Returns a short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Sme => "sme",
            Self::Unallocated => "unallocated",
            Self::Sve => "sve",
            Self::DataProcessingImmediate => "data-processing (immediate)",
            Self::BranchSystem => "branch/system",
            Self::LoadStore => "load/store",
            Self::DataProcessingRegister => "data-processing (register)",
            Self::SimdFp => "simd&fp",
        }
    }
}

impl fmt::Display for InstructionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Control-flow effect of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BranchType {
    /// Falls through to the next instruction.
    #[default]
    None,
    /// Branch with link.
    Call,
    /// Taken depending on flags or a register test.
    Conditional,
    /// Always taken.
    Unconditional,
    /// Exception generation or exception return.
    Exception,
}

impl BranchType {
    /// Name used in annotations, `None` when there is no branch.
    pub fn annotation_kind(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Call => Some("call"),
            Self::Conditional => Some("cond"),
            Self::Unconditional => Some("uncond"),
            Self::Exception => Some("exception"),
        }
    }
}

/// Kind of PC-relative computation performed by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PcRelType {
    /// No PC-relative computation.
    #[default]
    None,
    /// imm14/imm19 branch displacement.
    ShortBranchDisplacement,
    /// imm26 branch displacement.
    LongBranchDisplacement,
    /// 4 KiB page address (`adrp`).
    AddressPage,
    /// Byte address (`adr`, literal loads).
    AddressIndex,
}

impl PcRelType {
    /// Name used in annotations, `None` when there is no PC-relative use.
    pub fn annotation_kind(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::ShortBranchDisplacement => Some("br-short"),
            Self::LongBranchDisplacement => Some("br-long"),
            Self::AddressPage => Some("addr-page"),
            Self::AddressIndex => Some("addr-index"),
        }
    }
}

/// A decoded AArch64 instruction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    /// The 32-bit encoding.
    pub raw: u32,
    /// Load address of this instruction (0 when unknown).
    pub address: u64,
    /// Encoding group that produced this instruction.
    pub class: InstructionClass,
    /// High-level operation category.
    pub operation: Operation,
    /// Mnemonic (e.g. "mov", "ldp", "b.ne"), `None` when the encoding was
    /// decoded structurally without an assembly name.
    pub mnemonic: Option<String>,
    /// Operands (destination first, then sources).
    pub operands: Vec<Operand>,
    /// Registers read.
    pub reads: RegisterSet,
    /// Registers written.
    pub writes: RegisterSet,
    /// Control-flow effect.
    pub branch: BranchType,
    /// Branch destination, 0 for indirect branches and non-branches.
    pub branch_target: u64,
    /// PC-relative computation kind.
    pub pc_rel: PcRelType,
    /// Address computed relative to the PC, 0 when there is none.
    pub pc_rel_target: u64,
}

impl Instruction {
    /// Instruction width in bytes.
    pub const SIZE: u64 = 4;

    /// Creates a new instruction with minimal fields.
    pub fn new(
        address: u64,
        raw: u32,
        class: InstructionClass,
        mnemonic: impl Into<String>,
    ) -> Self {
        Self {
            mnemonic: Some(mnemonic.into()),
            ..Self::unnamed(address, raw, class)
        }
    }

    /// Creates an instruction that has no assembly name.
    pub fn unnamed(address: u64, raw: u32, class: InstructionClass) -> Self {
        Self {
            raw,
            address,
            class,
            operation: Operation::Other,
            mnemonic: None,
            operands: Vec::new(),
            reads: RegisterSet::empty(),
            writes: RegisterSet::empty(),
            branch: BranchType::None,
            branch_target: 0,
            pc_rel: PcRelType::None,
            pc_rel_target: 0,
        }
    }

    /// Sets the operation.
    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operation = op;
        self
    }

    /// Adds an operand.
    pub fn with_operand(mut self, op: Operand) -> Self {
        self.operands.push(op);
        self
    }

    /// Sets operands.
    pub fn with_operands(mut self, ops: Vec<Operand>) -> Self {
        self.operands = ops;
        self
    }

    /// Records a register read.
    pub fn with_read(mut self, reg: Register) -> Self {
        self.reads.insert(&reg);
        self
    }

    /// Records a register write.
    pub fn with_write(mut self, reg: Register) -> Self {
        self.writes.insert(&reg);
        self
    }

    /// Records reads of several registers.
    pub fn with_reads(mut self, regs: &[Register]) -> Self {
        for reg in regs {
            self.reads.insert(reg);
        }
        self
    }

    /// Records writes of several registers.
    pub fn with_writes(mut self, regs: &[Register]) -> Self {
        for reg in regs {
            self.writes.insert(reg);
        }
        self
    }

    /// Records that NZCV is read.
    pub fn with_flags_read(mut self) -> Self {
        self.reads.insert_flags();
        self
    }

    /// Records that NZCV is written.
    pub fn with_flags_written(mut self) -> Self {
        self.writes.insert_flags();
        self
    }

    /// Marks every register as both read and written.
    pub fn with_all_registers(mut self) -> Self {
        self.reads = RegisterSet::All;
        self.writes = RegisterSet::All;
        self
    }

    /// Sets the control-flow effect. The target is forced to 0 for
    /// [`BranchType::None`].
    pub fn with_branch(mut self, branch: BranchType, target: u64) -> Self {
        self.branch = branch;
        self.branch_target = if branch == BranchType::None { 0 } else { target };
        self
    }

    /// Sets the PC-relative kind. The target is forced to 0 for
    /// [`PcRelType::None`].
    pub fn with_pc_rel(mut self, pc_rel: PcRelType, target: u64) -> Self {
        self.pc_rel = pc_rel;
        self.pc_rel_target = if pc_rel == PcRelType::None { 0 } else { target };
        self
    }

    /// Returns the encoding in memory order.
    pub fn bytes(&self) -> [u8; 4] {
        self.raw.to_le_bytes()
    }

    /// Returns the address of the next instruction.
    pub fn end_address(&self) -> u64 {
        self.address.wrapping_add(Self::SIZE)
    }

    /// Returns true if this instruction changes control flow.
    pub fn is_branch(&self) -> bool {
        self.branch != BranchType::None
    }

    /// Returns true if this instruction is a call.
    pub fn is_call(&self) -> bool {
        self.branch == BranchType::Call
    }

    /// Returns true if this instruction is a return.
    pub fn is_return(&self) -> bool {
        self.operation == Operation::Return
    }

    /// Returns the register-usage annotation for this instruction.
    pub fn annotation(&self) -> String {
        crate::annotate(self)
    }
}

/// High-level operation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    // Data movement
    Move,
    Load,
    Store,
    Exchange,
    LoadEffectiveAddress,
    Prefetch,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Neg,

    // Logical
    And,
    Or,
    Xor,
    Not,
    Shl,
    Shr,
    Sar,
    Ror,
    BitField,

    // Comparison
    Compare,
    Test,
    ConditionalSelect,

    // Control flow
    Jump,
    ConditionalJump,
    Call,
    Return,

    // System
    Syscall,
    Interrupt,
    Nop,
    Hint,
    Barrier,
    System,

    // Atomic
    AtomicAdd,
    AtomicLogic,
    AtomicMinMax,
    CompareExchange,

    // Floating point and SIMD
    FloatArith,
    FloatCompare,
    Convert,
    Vector,
    Crypto,
    Checksum,

    Other,
}

impl Operation {
    /// Returns a short name for this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Load => "load",
            Self::Store => "store",
            Self::Exchange => "exchange",
            Self::LoadEffectiveAddress => "lea",
            Self::Prefetch => "prefetch",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Neg => "neg",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Not => "not",
            Self::Shl => "shl",
            Self::Shr => "shr",
            Self::Sar => "sar",
            Self::Ror => "ror",
            Self::BitField => "bitfield",
            Self::Compare => "cmp",
            Self::Test => "test",
            Self::ConditionalSelect => "csel",
            Self::Jump => "jmp",
            Self::ConditionalJump => "jcc",
            Self::Call => "call",
            Self::Return => "ret",
            Self::Syscall => "syscall",
            Self::Interrupt => "int",
            Self::Nop => "nop",
            Self::Hint => "hint",
            Self::Barrier => "barrier",
            Self::System => "system",
            Self::AtomicAdd => "atomic-add",
            Self::AtomicLogic => "atomic-logic",
            Self::AtomicMinMax => "atomic-minmax",
            Self::CompareExchange => "cmpxchg",
            Self::FloatArith => "fp",
            Self::FloatCompare => "fcmp",
            Self::Convert => "cvt",
            Self::Vector => "vector",
            Self::Crypto => "crypto",
            Self::Checksum => "crc",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A64 condition codes, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    /// Equal (Z=1)
    Eq,
    /// Not equal (Z=0)
    Ne,
    /// Carry set / unsigned higher or same
    Cs,
    /// Carry clear / unsigned lower
    Cc,
    /// Negative
    Mi,
    /// Positive or zero
    Pl,
    /// Overflow
    Vs,
    /// No overflow
    Vc,
    /// Unsigned higher
    Hi,
    /// Unsigned lower or same
    Ls,
    /// Signed greater or equal
    Ge,
    /// Signed less than
    Lt,
    /// Signed greater than
    Gt,
    /// Signed less or equal
    Le,
    /// Always
    Al,
    /// Always (encoded as 1111)
    Nv,
}

impl Condition {
    const ALL: [Condition; 16] = [
        Self::Eq,
        Self::Ne,
        Self::Cs,
        Self::Cc,
        Self::Mi,
        Self::Pl,
        Self::Vs,
        Self::Vc,
        Self::Hi,
        Self::Ls,
        Self::Ge,
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Al,
        Self::Nv,
    ];

    /// Decodes a 4-bit condition field. Higher bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }

    /// Returns the 4-bit encoding.
    pub fn bits(&self) -> u8 {
        *self as u8
    }

    /// Returns the inverse condition (lowest encoding bit flipped).
    pub fn inverse(&self) -> Self {
        Self::from_bits(u32::from(self.bits() ^ 1))
    }

    /// Returns true for `al` and `nv`, which do not consult the flags.
    pub fn is_always(&self) -> bool {
        matches!(self, Self::Al | Self::Nv)
    }

    /// Returns the assembly suffix ("eq", "ne", ...).
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Cs => "cs",
            Self::Cc => "cc",
            Self::Mi => "mi",
            Self::Pl => "pl",
            Self::Vs => "vs",
            Self::Vc => "vc",
            Self::Hi => "hi",
            Self::Ls => "ls",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Gt => "gt",
            Self::Le => "le",
            Self::Al => "al",
            Self::Nv => "nv",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_roundtrip() {
        for bits in 0..16 {
            assert_eq!(Condition::from_bits(bits).bits() as u32, bits);
        }
        assert_eq!(Condition::from_bits(0x1B), Condition::Lt);
    }

    #[test]
    fn test_condition_inverse() {
        assert_eq!(Condition::Eq.inverse(), Condition::Ne);
        assert_eq!(Condition::Cc.inverse(), Condition::Cs);
        assert_eq!(Condition::Gt.inverse(), Condition::Le);
        assert_eq!(Condition::Al.inverse(), Condition::Nv);
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::LoadEffectiveAddress.to_string(), "lea");
        assert_eq!(Operation::CompareExchange.to_string(), "cmpxchg");
        assert_eq!(format!("{}", Operation::Other), "other");
    }

    #[test]
    fn test_branch_none_clears_target() {
        let insn = Instruction::new(0x1000, 0, InstructionClass::BranchSystem, "nop")
            .with_branch(BranchType::None, 0x2000)
            .with_pc_rel(PcRelType::None, 0x3000);
        assert_eq!(insn.branch_target, 0);
        assert_eq!(insn.pc_rel_target, 0);
        assert!(!insn.is_branch());
    }

    #[test]
    fn test_builder_effects() {
        let insn = Instruction::new(0, 0, InstructionClass::DataProcessingRegister, "adds")
            .with_reads(&[Register::x(1), Register::x(31)])
            .with_write(Register::x(0))
            .with_flags_written();
        assert_eq!(insn.reads, RegisterSet::from_bits(1 << 1));
        assert!(insn.writes.contains_index(0));
        assert!(insn.writes.has_flags());
        assert_eq!(insn.bytes(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_unnamed_has_no_mnemonic() {
        let insn = Instruction::unnamed(4, 0x0E20_8400, InstructionClass::SimdFp);
        assert!(insn.mnemonic.is_none());
        assert_eq!(insn.end_address(), 8);
    }
}
