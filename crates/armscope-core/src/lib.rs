//! # armscope-core
//!
//! Core types for the armscope AArch64 disassembler: decoded instructions,
//! operands, registers and register-usage sets, plus the annotation format
//! derived from them.

pub mod annotate;
pub mod instruction;
pub mod operand;
pub mod register;

pub use annotate::annotate;
pub use instruction::{BranchType, Condition, Instruction, InstructionClass, Operation, PcRelType};
pub use operand::{
    Arrangement, ElementSize, Extend, ExtendedRegister, Immediate, IndexMode, MemoryRef, Operand,
    Shift, SystemRegister, NZCV,
};
pub use register::{format_regs, Register, RegisterClass, RegisterSet, FLAGS_BIT, LR_INDEX, SP_INDEX};
