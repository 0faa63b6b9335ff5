//! Instruction operand types.

use std::fmt;

use crate::{Condition, Register};

/// An instruction operand.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    /// Register operand.
    Register(Register),
    /// Register with a constant shift (`x2, lsl #3`).
    ShiftedRegister {
        reg: Register,
        shift: Shift,
        amount: u8,
    },
    /// Register with an extend (`w2, sxtw #2`).
    Extended(ExtendedRegister),
    /// Immediate value.
    Immediate(Immediate),
    /// Immediate shifted left (`#0x12, lsl #16`).
    ShiftedImmediate {
        value: u64,
        shift: u8,
    },
    /// Small unsigned field such as a bit position, width or flag mask.
    /// Always rendered in decimal.
    Count(u32),
    /// Floating-point immediate.
    FloatImmediate(f64),
    /// Memory reference.
    Memory(MemoryRef),
    /// PC-relative address (used in branches and address generation).
    PcRelative {
        /// Offset from PC.
        offset: i64,
        /// Resolved target address.
        target: u64,
    },
    /// Condition code operand (`csel`, `ccmp`).
    Condition(Condition),
    /// Whole vector register with arrangement (`v0.16b`).
    VectorRegister { reg: u8, arrangement: Arrangement },
    /// Single vector element (`v1.s[2]`).
    VectorElement {
        reg: u8,
        element: ElementSize,
        index: u8,
    },
    /// System register (`mrs`, `msr`).
    SystemRegister(SystemRegister),
    /// Control register operand of `sys`/`sysl` (`c7`).
    ControlRegister(u8),
    /// Symbolic operand: barrier option, prefetch operation, PSTATE field.
    Named(String),
}

impl Operand {
    /// Creates a register operand.
    pub fn reg(reg: Register) -> Self {
        Self::Register(reg)
    }

    /// Creates a signed immediate operand.
    pub fn imm(value: i64) -> Self {
        Self::Immediate(Immediate {
            value: value as i128,
            signed: true,
        })
    }

    /// Creates an unsigned immediate operand.
    pub fn imm_unsigned(value: u64) -> Self {
        Self::Immediate(Immediate {
            value: value as i128,
            signed: false,
        })
    }

    /// Creates a shifted register operand, or a plain register for `lsl #0`.
    pub fn shifted(reg: Register, shift: Shift, amount: u8) -> Self {
        if shift == Shift::Lsl && amount == 0 {
            Self::Register(reg)
        } else {
            Self::ShiftedRegister { reg, shift, amount }
        }
    }

    /// Creates an extended register operand.
    pub fn extended(reg: Register, extend: Extend, amount: Option<u8>) -> Self {
        Self::Extended(ExtendedRegister {
            reg,
            extend,
            amount,
        })
    }

    /// Creates a PC-relative operand.
    pub fn pc_rel(offset: i64, target: u64) -> Self {
        Self::PcRelative { offset, target }
    }

    /// Creates a memory operand.
    pub fn mem(mem: MemoryRef) -> Self {
        Self::Memory(mem)
    }

    /// Creates a named operand.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Returns true if this is a register operand.
    pub fn is_register(&self) -> bool {
        matches!(self, Self::Register(_))
    }

    /// Returns true if this is an immediate operand.
    pub fn is_immediate(&self) -> bool {
        matches!(
            self,
            Self::Immediate(_) | Self::ShiftedImmediate { .. } | Self::FloatImmediate(_)
        )
    }

    /// Returns true if this is a memory operand.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory(_))
    }
}

/// An immediate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Immediate {
    /// The value, wide enough for any 64-bit pattern in either signedness.
    pub value: i128,
    /// Whether the field was sign-extended.
    pub signed: bool,
}

impl Immediate {
    /// Returns the value as u64 (for addresses).
    pub fn as_u64(&self) -> u64 {
        self.value as u64
    }

    /// Returns the value as i64.
    pub fn as_i64(&self) -> i64 {
        self.value as i64
    }
}

/// Constant shift applied to a register operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shift {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl Shift {
    /// Decodes the 2-bit shift field.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            _ => Self::Ror,
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lsl => "lsl",
            Self::Lsr => "lsr",
            Self::Asr => "asr",
            Self::Ror => "ror",
        })
    }
}

/// Register extend operation.
///
/// `Lsl` is the preferred spelling of `uxtx`/`uxtw` in contexts where the
/// extend is a no-op, and is omitted entirely when it has no amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Extend {
    Uxtb,
    Uxth,
    Uxtw,
    Uxtx,
    Sxtb,
    Sxth,
    Sxtw,
    Sxtx,
    Lsl,
}

impl Extend {
    /// Decodes the 3-bit option field.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 7 {
            0 => Self::Uxtb,
            1 => Self::Uxth,
            2 => Self::Uxtw,
            3 => Self::Uxtx,
            4 => Self::Sxtb,
            5 => Self::Sxth,
            6 => Self::Sxtw,
            _ => Self::Sxtx,
        }
    }
}

impl fmt::Display for Extend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uxtb => "uxtb",
            Self::Uxth => "uxth",
            Self::Uxtw => "uxtw",
            Self::Uxtx => "uxtx",
            Self::Sxtb => "sxtb",
            Self::Sxth => "sxth",
            Self::Sxtw => "sxtw",
            Self::Sxtx => "sxtx",
            Self::Lsl => "lsl",
        })
    }
}

/// A register with an extend and optional left shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtendedRegister {
    pub reg: Register,
    pub extend: Extend,
    /// Shift amount; `None` when the encoding carries no explicit amount.
    pub amount: Option<u8>,
}

/// Addressing mode of a memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexMode {
    /// `[base, #disp]` or `[base, index]`.
    #[default]
    Offset,
    /// `[base, #disp]!`, base updated before the access.
    PreIndex,
    /// `[base], #disp`, base updated after the access.
    PostIndex,
}

impl IndexMode {
    /// Returns true if the base register is written back.
    pub fn writes_back(&self) -> bool {
        !matches!(self, Self::Offset)
    }
}

/// Memory reference operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryRef {
    /// Base register.
    pub base: Option<Register>,
    /// Index register with extend.
    pub index: Option<ExtendedRegister>,
    /// Byte displacement.
    pub displacement: i64,
    /// Addressing mode.
    pub mode: IndexMode,
}

impl MemoryRef {
    /// `[base]`
    pub fn base(base: Register) -> Self {
        Self::base_disp(base, 0)
    }

    /// `[base, #disp]`
    pub fn base_disp(base: Register, displacement: i64) -> Self {
        Self {
            base: Some(base),
            index: None,
            displacement,
            mode: IndexMode::Offset,
        }
    }

    /// `[base, #disp]!`
    pub fn pre_index(base: Register, displacement: i64) -> Self {
        Self {
            mode: IndexMode::PreIndex,
            ..Self::base_disp(base, displacement)
        }
    }

    /// `[base], #disp`
    pub fn post_index(base: Register, displacement: i64) -> Self {
        Self {
            mode: IndexMode::PostIndex,
            ..Self::base_disp(base, displacement)
        }
    }

    /// `[base, index{, extend {#amount}}]`
    pub fn indexed(base: Register, index: ExtendedRegister) -> Self {
        Self {
            index: Some(index),
            ..Self::base(base)
        }
    }

    /// Creates a memory reference with the given mode.
    pub fn with_mode(base: Register, displacement: i64, mode: IndexMode) -> Self {
        Self {
            mode,
            ..Self::base_disp(base, displacement)
        }
    }
}

/// Vector register arrangement specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arrangement {
    B8,
    B16,
    H4,
    H8,
    S2,
    S4,
    D1,
    D2,
    Q1,
}

impl Arrangement {
    /// Arrangement for an integer element `size` (0-3) and the Q bit.
    pub fn from_size_q(size: u32, q: bool) -> Self {
        match (size & 3, q) {
            (0, false) => Self::B8,
            (0, true) => Self::B16,
            (1, false) => Self::H4,
            (1, true) => Self::H8,
            (2, false) => Self::S2,
            (2, true) => Self::S4,
            (_, false) => Self::D1,
            (_, true) => Self::D2,
        }
    }

    /// Arrangement for a floating-point element (`sz` bit) and the Q bit.
    /// Returns `None` for the reserved single-lane double arrangement.
    pub fn from_fp_sz_q(sz: bool, q: bool) -> Option<Self> {
        match (sz, q) {
            (false, false) => Some(Self::S2),
            (false, true) => Some(Self::S4),
            (true, true) => Some(Self::D2),
            (true, false) => None,
        }
    }

    /// Element size of this arrangement.
    pub fn element(&self) -> ElementSize {
        match self {
            Self::B8 | Self::B16 => ElementSize::B,
            Self::H4 | Self::H8 => ElementSize::H,
            Self::S2 | Self::S4 => ElementSize::S,
            Self::D1 | Self::D2 => ElementSize::D,
            Self::Q1 => ElementSize::Q,
        }
    }
}

impl fmt::Display for Arrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::B8 => "8b",
            Self::B16 => "16b",
            Self::H4 => "4h",
            Self::H8 => "8h",
            Self::S2 => "2s",
            Self::S4 => "4s",
            Self::D1 => "1d",
            Self::D2 => "2d",
            Self::Q1 => "1q",
        })
    }
}

/// Vector element size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementSize {
    B,
    H,
    S,
    D,
    Q,
}

impl ElementSize {
    /// Element width in bits.
    pub fn bits(&self) -> u16 {
        match self {
            Self::B => 8,
            Self::H => 16,
            Self::S => 32,
            Self::D => 64,
            Self::Q => 128,
        }
    }
}

impl fmt::Display for ElementSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::B => "b",
            Self::H => "h",
            Self::S => "s",
            Self::D => "d",
            Self::Q => "q",
        })
    }
}

/// System register identified by its `op0:op1:CRn:CRm:op2` encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SystemRegister {
    pub op0: u8,
    pub op1: u8,
    pub crn: u8,
    pub crm: u8,
    pub op2: u8,
}

/// NZCV as a system register.
pub const NZCV: SystemRegister = SystemRegister::new(3, 3, 4, 2, 0);

impl SystemRegister {
    /// Creates a system register from its encoding fields.
    pub const fn new(op0: u8, op1: u8, crn: u8, crm: u8, op2: u8) -> Self {
        Self {
            op0,
            op1,
            crn,
            crm,
            op2,
        }
    }

    /// Decodes the 16-bit `o0:op1:CRn:CRm:op2` field of `mrs`/`msr`
    /// (bits 20:5 of the instruction, `o0` selecting op0 = 2 or 3).
    pub fn from_field(field: u32) -> Self {
        Self::new(
            2 + ((field >> 14) & 1) as u8,
            ((field >> 11) & 7) as u8,
            ((field >> 7) & 0xF) as u8,
            ((field >> 3) & 0xF) as u8,
            (field & 7) as u8,
        )
    }

    /// Returns the architectural name if this register is a well-known one.
    pub fn name(&self) -> Option<&'static str> {
        let name = match (self.op0, self.op1, self.crn, self.crm, self.op2) {
            (3, 3, 4, 2, 0) => "nzcv",
            (3, 3, 4, 2, 1) => "daif",
            (3, 3, 4, 4, 0) => "fpcr",
            (3, 3, 4, 4, 1) => "fpsr",
            (3, 3, 13, 0, 2) => "tpidr_el0",
            (3, 3, 13, 0, 3) => "tpidrro_el0",
            (3, 0, 13, 0, 4) => "tpidr_el1",
            (3, 3, 0, 0, 1) => "ctr_el0",
            (3, 3, 0, 0, 7) => "dczid_el0",
            (3, 3, 14, 0, 0) => "cntfrq_el0",
            (3, 3, 14, 0, 1) => "cntpct_el0",
            (3, 3, 14, 0, 2) => "cntvct_el0",
            (3, 3, 9, 12, 0) => "pmcr_el0",
            (3, 3, 9, 13, 0) => "pmccntr_el0",
            (3, 0, 0, 0, 0) => "midr_el1",
            (3, 0, 0, 0, 5) => "mpidr_el1",
            (3, 0, 1, 0, 0) => "sctlr_el1",
            (3, 0, 2, 0, 0) => "ttbr0_el1",
            (3, 0, 2, 0, 1) => "ttbr1_el1",
            (3, 0, 2, 0, 2) => "tcr_el1",
            (3, 0, 4, 0, 0) => "spsr_el1",
            (3, 0, 4, 0, 1) => "elr_el1",
            (3, 0, 4, 1, 0) => "sp_el0",
            (3, 0, 4, 2, 2) => "currentel",
            (3, 0, 5, 2, 0) => "esr_el1",
            (3, 0, 6, 0, 0) => "far_el1",
            (3, 0, 10, 2, 0) => "mair_el1",
            (3, 0, 12, 0, 0) => "vbar_el1",
            (3, 4, 1, 1, 0) => "hcr_el2",
            (3, 4, 12, 0, 0) => "vbar_el2",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for SystemRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(
                f,
                "s{}_{}_c{}_c{}_{}",
                self.op0, self.op1, self.crn, self.crm, self.op2
            ),
        }
    }
}
