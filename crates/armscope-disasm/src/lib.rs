//! # armscope-disasm
//!
//! AArch64 (A64) decoding, rendering and streaming for armscope.
//!
//! - [`decode`] turns one 32-bit word into an [`Instruction`]
//! - [`render`] writes it as assembly text
//! - [`disassemble`] drives both over any `Read + Seek` source, one
//!   [`Record`] per word

pub mod arm64;
pub mod error;
pub mod options;
pub mod render;
pub mod stream;

pub use arm64::{classify, decode};
pub use error::{DecodeError, DisasmError, RenderError, UNDEFINED_THRESHOLD};
pub use options::{ImmediateFormat, Options};
pub use render::render;
pub use stream::{
    byte_string, disassemble, disassemble_at, instructions, Decoded, Disassembly, Instructions,
    Record,
};

pub use armscope_core::Instruction;
