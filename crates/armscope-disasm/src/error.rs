//! Disassembly error types.

use std::io;

use armscope_core::InstructionClass;
use thiserror::Error;

/// Words below this value are reported as [`DisasmError::Undefined`] when
/// they fail to decode or render. Every such word lies in the reserved
/// encoding space and in practice marks data or padding rather than code.
pub const UNDEFINED_THRESHOLD: u32 = 0x1_0000;

/// Error type for instruction decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The bit pattern is architecturally reserved or unallocated.
    #[error("malformed encoding {word:#010x} at {address:#x}: {reason}")]
    MalformedEncoding {
        address: u64,
        word: u32,
        reason: &'static str,
    },

    /// The encoding group is known but this field combination is not handled.
    #[error("unsupported {class} encoding {word:#010x} at {address:#x}")]
    UnsupportedClass {
        address: u64,
        word: u32,
        class: InstructionClass,
    },
}

impl DecodeError {
    /// Creates a new MalformedEncoding error.
    pub fn malformed(address: u64, word: u32, reason: &'static str) -> Self {
        Self::MalformedEncoding {
            address,
            word,
            reason,
        }
    }

    /// Creates a new UnsupportedClass error.
    pub fn unsupported(address: u64, word: u32, class: InstructionClass) -> Self {
        Self::UnsupportedClass {
            address,
            word,
            class,
        }
    }

    /// Returns the word that failed to decode.
    pub fn word(&self) -> u32 {
        match self {
            Self::MalformedEncoding { word, .. } | Self::UnsupportedClass { word, .. } => *word,
        }
    }

    /// Returns the address of the word that failed to decode.
    pub fn address(&self) -> u64 {
        match self {
            Self::MalformedEncoding { address, .. } | Self::UnsupportedClass { address, .. } => {
                *address
            }
        }
    }
}

/// Error type for rendering a decoded instruction as assembly text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The instruction was decoded without an assembly name.
    #[error("no mnemonic for {class} encoding {word:#010x} at {address:#x}")]
    Unnamed {
        address: u64,
        word: u32,
        class: InstructionClass,
    },

    /// An operand cannot be expressed in A64 assembly syntax.
    #[error("operand {index} of {word:#010x} at {address:#x}: {reason}")]
    InvalidOperand {
        address: u64,
        word: u32,
        index: usize,
        reason: &'static str,
    },
}

/// Error attached to a disassembly result.
#[derive(Error, Debug)]
pub enum DisasmError {
    /// A low word that is almost certainly not code.
    #[error("undefined instruction: {address:#010x}: {word:#010x}")]
    Undefined { address: u64, word: u32 },

    /// The word could not be decoded.
    #[error("failed to decode instruction: {address:#010x}: {word:#010x}: {source}")]
    Decode {
        address: u64,
        word: u32,
        source: DecodeError,
    },

    /// The word decoded but could not be rendered.
    #[error("failed to disassemble instruction: {address:#010x}: {word:#010x}: {source}")]
    Render {
        address: u64,
        word: u32,
        source: RenderError,
    },

    /// The byte source failed or ended inside a word.
    #[error("failed to read instruction at {address:#010x}: {source}")]
    Read { address: u64, source: io::Error },

    /// The byte source could not be positioned.
    #[error("failed to seek to offset {offset:#x}: {source}")]
    Seek { offset: u64, source: io::Error },
}

impl DisasmError {
    /// Wraps a decode failure, applying the undefined-word threshold.
    pub fn from_decode(address: u64, source: DecodeError) -> Self {
        let word = source.word();
        if word < UNDEFINED_THRESHOLD {
            Self::Undefined { address, word }
        } else {
            Self::Decode {
                address,
                word,
                source,
            }
        }
    }

    /// Wraps a render failure, applying the undefined-word threshold.
    pub fn from_render(address: u64, word: u32, source: RenderError) -> Self {
        if word < UNDEFINED_THRESHOLD {
            Self::Undefined { address, word }
        } else {
            Self::Render {
                address,
                word,
                source,
            }
        }
    }

    /// Returns true if the error ends the stream it occurred in.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Seek { .. })
    }

    /// Returns the offending word, when one was read.
    pub fn word(&self) -> Option<u32> {
        match self {
            Self::Undefined { word, .. } | Self::Decode { word, .. } | Self::Render { word, .. } => {
                Some(*word)
            }
            Self::Read { .. } | Self::Seek { .. } => None,
        }
    }
}
