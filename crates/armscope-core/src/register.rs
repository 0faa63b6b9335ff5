//! AArch64 register representation and register-usage sets.

use std::fmt;

/// Register class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterClass {
    /// General purpose register (x0-x30, w0-w30).
    General,
    /// Stack pointer (sp, wsp). Shares encoding 31 with the zero register.
    StackPointer,
    /// Zero register (xzr, wzr).
    Zero,
    /// Scalar view of a SIMD&FP register (b0, h0, s0, d0, q0).
    FloatingPoint,
    /// Whole SIMD vector register (v0-v31).
    Vector,
}

/// An AArch64 register.
///
/// `index` is the 5-bit encoding from the instruction. For the stack pointer
/// and the zero register it is always 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Register {
    /// The class of register.
    pub class: RegisterClass,
    /// Encoded register number (0-31).
    pub index: u8,
    /// Size of the register view in bits.
    pub size: u16,
}

/// Register number of the stack pointer / zero register.
pub const SP_INDEX: u8 = 31;
/// Register number of the link register.
pub const LR_INDEX: u8 = 30;

impl Register {
    /// Creates a new register.
    pub const fn new(class: RegisterClass, index: u8, size: u16) -> Self {
        Self { class, index, size }
    }

    /// 64-bit general register where encoding 31 means `xzr`.
    pub const fn x(index: u8) -> Self {
        Self::gpr(index, true)
    }

    /// 32-bit general register where encoding 31 means `wzr`.
    pub const fn w(index: u8) -> Self {
        Self::gpr(index, false)
    }

    /// General register where encoding 31 is the zero register.
    pub const fn gpr(index: u8, is_64bit: bool) -> Self {
        let size = if is_64bit { 64 } else { 32 };
        let index = index & 0x1F;
        if index == SP_INDEX {
            Self::new(RegisterClass::Zero, index, size)
        } else {
            Self::new(RegisterClass::General, index, size)
        }
    }

    /// General register where encoding 31 is the stack pointer.
    pub const fn gpr_sp(index: u8, is_64bit: bool) -> Self {
        let size = if is_64bit { 64 } else { 32 };
        let index = index & 0x1F;
        if index == SP_INDEX {
            Self::new(RegisterClass::StackPointer, index, size)
        } else {
            Self::new(RegisterClass::General, index, size)
        }
    }

    /// 64-bit general register where encoding 31 is `sp`.
    pub const fn x_sp(index: u8) -> Self {
        Self::gpr_sp(index, true)
    }

    /// The stack pointer.
    pub const fn sp() -> Self {
        Self::new(RegisterClass::StackPointer, SP_INDEX, 64)
    }

    /// The link register `x30`.
    pub const fn lr() -> Self {
        Self::new(RegisterClass::General, LR_INDEX, 64)
    }

    /// Scalar SIMD&FP register of the given width (8, 16, 32, 64 or 128).
    pub const fn fp(index: u8, size: u16) -> Self {
        Self::new(RegisterClass::FloatingPoint, index & 0x1F, size)
    }

    /// Whole vector register.
    pub const fn vector(index: u8) -> Self {
        Self::new(RegisterClass::Vector, index & 0x1F, 128)
    }

    /// Returns the bit this register occupies in a [`RegisterSet`], if any.
    ///
    /// The zero register and SIMD&FP registers are not tracked.
    pub fn set_index(&self) -> Option<u8> {
        match self.class {
            RegisterClass::General | RegisterClass::StackPointer if self.index <= SP_INDEX => {
                Some(self.index)
            }
            _ => None,
        }
    }

    /// Returns true if the register has a width that A64 syntax can name.
    pub fn is_valid(&self) -> bool {
        if self.index > SP_INDEX {
            return false;
        }
        match self.class {
            RegisterClass::General => self.index != SP_INDEX && matches!(self.size, 32 | 64),
            RegisterClass::StackPointer | RegisterClass::Zero => {
                self.index == SP_INDEX && matches!(self.size, 32 | 64)
            }
            RegisterClass::FloatingPoint => matches!(self.size, 8 | 16 | 32 | 64 | 128),
            RegisterClass::Vector => true,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wide = self.size != 32;
        match self.class {
            RegisterClass::General if wide => write!(f, "x{}", self.index),
            RegisterClass::General => write!(f, "w{}", self.index),
            RegisterClass::StackPointer => f.write_str(if wide { "sp" } else { "wsp" }),
            RegisterClass::Zero => f.write_str(if wide { "xzr" } else { "wzr" }),
            RegisterClass::FloatingPoint => {
                let prefix = match self.size {
                    8 => 'b',
                    16 => 'h',
                    32 => 's',
                    64 => 'd',
                    _ => 'q',
                };
                write!(f, "{}{}", prefix, self.index)
            }
            RegisterClass::Vector => write!(f, "v{}", self.index),
        }
    }
}

/// Bit of a [`RegisterSet`] mask that stands for the NZCV condition flags.
pub const FLAGS_BIT: u8 = 32;

const FLAGS_MASK: u64 = 1 << FLAGS_BIT;
const GPR_MASK: u64 = (1 << 32) - 1;
const USABLE_MASK: u64 = GPR_MASK | FLAGS_MASK;

/// Set of registers read or written by an instruction.
///
/// Bits 0-31 are the general registers (31 being `sp` when used as the stack
/// pointer) and bit 32 is NZCV. `All` marks instructions whose effects cannot
/// be expressed as a finite set, such as exception generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegisterSet {
    /// Every register may be affected.
    All,
    /// Exactly the registers in the mask.
    Subset(u64),
}

impl Default for RegisterSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl RegisterSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self::Subset(0)
    }

    /// Creates a subset from a raw mask, dropping bits outside the usable space.
    pub const fn from_bits(bits: u64) -> Self {
        Self::Subset(bits & USABLE_MASK)
    }

    /// Returns the raw mask, or `None` for [`RegisterSet::All`].
    pub fn bits(&self) -> Option<u64> {
        match self {
            Self::All => None,
            Self::Subset(bits) => Some(bits & USABLE_MASK),
        }
    }

    /// Returns true for [`RegisterSet::All`].
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns true if no register is in the set. `All` is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::All => false,
            Self::Subset(bits) => bits & USABLE_MASK == 0,
        }
    }

    /// Adds a register. Zero and SIMD&FP registers are ignored.
    pub fn insert(&mut self, reg: &Register) {
        if let Some(index) = reg.set_index() {
            self.insert_index(index);
        }
    }

    /// Adds a general register by number. Numbers above 31 are ignored.
    pub fn insert_index(&mut self, index: u8) {
        if let Self::Subset(bits) = self {
            if index <= SP_INDEX {
                *bits |= 1 << index;
            }
        }
    }

    /// Adds the NZCV flags.
    pub fn insert_flags(&mut self) {
        if let Self::Subset(bits) = self {
            *bits |= FLAGS_MASK;
        }
    }

    /// Returns true if general register `index` is in the set.
    pub fn contains_index(&self, index: u8) -> bool {
        match self {
            Self::All => index <= SP_INDEX,
            Self::Subset(bits) => index <= SP_INDEX && bits & (1 << index) != 0,
        }
    }

    /// Returns true if the NZCV flags are in the set.
    pub fn has_flags(&self) -> bool {
        match self {
            Self::All => true,
            Self::Subset(bits) => bits & FLAGS_MASK != 0,
        }
    }

    /// Union of two sets. `All` absorbs everything.
    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (Self::Subset(a), Self::Subset(b)) => Self::from_bits(a | b),
            _ => Self::All,
        }
    }

    /// Iterates the general registers in the set in ascending order.
    ///
    /// For `All` this yields every general register number.
    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        let bits = match self {
            Self::All => GPR_MASK,
            Self::Subset(bits) => bits & GPR_MASK,
        };
        (0..=SP_INDEX).filter(move |&i| bits & (1u64 << i) != 0)
    }
}

impl fmt::Display for RegisterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str("all");
        }
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for index in self.indices() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}", index)?;
            first = false;
        }
        if self.has_flags() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str("nzcv")?;
        }
        Ok(())
    }
}

/// Formats a register set as `all`, `none`, or a comma-separated index list.
pub fn format_regs(set: &RegisterSet) -> String {
    set.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_names() {
        assert_eq!(Register::x(0).to_string(), "x0");
        assert_eq!(Register::w(7).to_string(), "w7");
        assert_eq!(Register::x(31).to_string(), "xzr");
        assert_eq!(Register::w(31).to_string(), "wzr");
        assert_eq!(Register::x_sp(31).to_string(), "sp");
        assert_eq!(Register::gpr_sp(31, false).to_string(), "wsp");
        assert_eq!(Register::fp(2, 64).to_string(), "d2");
        assert_eq!(Register::fp(5, 128).to_string(), "q5");
        assert_eq!(Register::vector(30).to_string(), "v30");
    }

    #[test]
    fn test_zero_register_not_tracked() {
        let mut set = RegisterSet::empty();
        set.insert(&Register::x(31));
        set.insert(&Register::fp(1, 32));
        assert!(set.is_empty());

        set.insert(&Register::x_sp(31));
        assert!(set.contains_index(31));
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_regs(&RegisterSet::empty()), "none");
        assert_eq!(format_regs(&RegisterSet::from_bits(1 << 40)), "none");
    }

    #[test]
    fn test_format_all_wins() {
        assert_eq!(format_regs(&RegisterSet::All), "all");
        assert_eq!(RegisterSet::All.union(RegisterSet::from_bits(0b11)), RegisterSet::All);
    }

    #[test]
    fn test_format_indices_and_flags() {
        let mut set = RegisterSet::empty();
        set.insert_index(9);
        set.insert_index(0);
        set.insert_index(3);
        set.insert_flags();
        assert_eq!(set.to_string(), "0,3,9,nzcv");

        let mut flags_only = RegisterSet::empty();
        flags_only.insert_flags();
        assert_eq!(flags_only.to_string(), "nzcv");
    }

    #[test]
    fn test_from_bits_masks_unusable_space() {
        let set = RegisterSet::from_bits(u64::MAX);
        assert_eq!(set.bits(), Some((1 << 33) - 1));
        assert_eq!(set.indices().count(), 32);
    }

    #[test]
    fn test_insert_ignored_on_all() {
        let mut set = RegisterSet::All;
        set.insert_index(4);
        set.insert_flags();
        assert_eq!(set, RegisterSet::All);
        assert!(set.contains_index(4));
        assert!(set.has_flags());
    }

    #[test]
    fn test_validity() {
        assert!(Register::x(3).is_valid());
        assert!(!Register::new(RegisterClass::General, 3, 16).is_valid());
        assert!(!Register::new(RegisterClass::General, 31, 64).is_valid());
        assert!(!Register::new(RegisterClass::Zero, 4, 64).is_valid());
        assert!(!Register::new(RegisterClass::FloatingPoint, 4, 24).is_valid());
    }
}
