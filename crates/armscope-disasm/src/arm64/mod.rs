//! AArch64 (A64) instruction decoder.
//!
//! Decoding is a two-step process. The top-level encoding group is chosen by
//! `op0` (bits 28:25) through [`DISPATCH`], and each group has a decoder that
//! walks the remaining fields. Every decoder is a pure function of the word
//! and its address.

mod branch;
mod dp_imm;
mod dp_reg;
pub(crate) mod fields;
mod load_store;
mod simd_fp;

use armscope_core::{Instruction, InstructionClass};

use crate::DecodeError;

type DecodeFn = fn(u32, u64) -> Result<Instruction, DecodeError>;

struct ClassEntry {
    class: InstructionClass,
    decode: DecodeFn,
}

const fn entry(class: InstructionClass, decode: DecodeFn) -> ClassEntry {
    ClassEntry { class, decode }
}

use InstructionClass::{
    BranchSystem, DataProcessingImmediate, DataProcessingRegister, LoadStore, Reserved, SimdFp,
    Sve, Unallocated,
};

/// Encoding groups indexed by op0.
static DISPATCH: [ClassEntry; 16] = [
    entry(Reserved, decode_reserved),
    entry(Unallocated, decode_unallocated),
    entry(Sve, decode_sve),
    entry(Unallocated, decode_unallocated),
    entry(LoadStore, load_store::decode),
    entry(DataProcessingRegister, dp_reg::decode),
    entry(LoadStore, load_store::decode),
    entry(SimdFp, simd_fp::decode),
    entry(DataProcessingImmediate, dp_imm::decode),
    entry(DataProcessingImmediate, dp_imm::decode),
    entry(BranchSystem, branch::decode),
    entry(BranchSystem, branch::decode),
    entry(LoadStore, load_store::decode),
    entry(DataProcessingRegister, dp_reg::decode),
    entry(LoadStore, load_store::decode),
    entry(SimdFp, simd_fp::decode),
];

fn op0(word: u32) -> usize {
    ((word >> 25) & 0xF) as usize
}

/// Returns the top-level encoding group of a word.
pub fn classify(word: u32) -> InstructionClass {
    match DISPATCH[op0(word)].class {
        Reserved if word >> 31 == 1 => InstructionClass::Sme,
        class => class,
    }
}

/// Decodes one instruction word located at `address`.
///
/// Never panics: every `u32` yields an instruction, a
/// [`DecodeError::MalformedEncoding`] or a [`DecodeError::UnsupportedClass`].
pub fn decode(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    let result = (DISPATCH[op0(word)].decode)(word, address);
    if let Err(DecodeError::UnsupportedClass { class, .. }) = &result {
        log::trace!("{:#010x} at {:#x}: unsupported {} encoding", word, address, class);
    }
    result
}

fn decode_reserved(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    if word >> 31 == 1 {
        return Err(DecodeError::unsupported(address, word, InstructionClass::Sme));
    }
    Err(DecodeError::malformed(address, word, "reserved encoding space"))
}

fn decode_unallocated(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    Err(DecodeError::malformed(address, word, "unallocated encoding space"))
}

fn decode_sve(word: u32, address: u64) -> Result<Instruction, DecodeError> {
    Err(DecodeError::unsupported(address, word, Sve))
}
