//! Assembly text rendering.

use armscope_core::{Extend, ExtendedRegister, IndexMode, Instruction, MemoryRef, Operand, Register};

use crate::options::ImmediateFormat;
use crate::RenderError;

/// Renders a decoded instruction as `mnemonic op, op, ...`.
///
/// Fails when the instruction has no mnemonic or when an operand cannot be
/// written in A64 syntax.
pub fn render(insn: &Instruction, format: ImmediateFormat) -> Result<String, RenderError> {
    let Some(mnemonic) = insn.mnemonic.as_deref() else {
        return Err(RenderError::Unnamed {
            address: insn.address,
            word: insn.raw,
            class: insn.class,
        });
    };

    let mut text = String::from(mnemonic);
    for (index, operand) in insn.operands.iter().enumerate() {
        let rendered =
            render_operand(operand, format).map_err(|reason| RenderError::InvalidOperand {
                address: insn.address,
                word: insn.raw,
                index,
                reason,
            })?;
        text.push_str(if index == 0 { " " } else { ", " });
        text.push_str(&rendered);
    }
    Ok(text)
}

type OperandResult = Result<String, &'static str>;

fn render_operand(operand: &Operand, format: ImmediateFormat) -> OperandResult {
    match operand {
        Operand::Register(reg) => register(reg),
        Operand::ShiftedRegister { reg, shift, amount } => {
            Ok(format!("{}, {} #{}", register(reg)?, shift, amount))
        }
        Operand::Extended(ext) => extended(ext),
        Operand::Immediate(imm) => Ok(immediate(imm.value, format)),
        Operand::ShiftedImmediate { value, shift } => {
            let mut text = immediate(i128::from(*value), format);
            if *shift != 0 {
                text.push_str(&format!(", lsl #{}", shift));
            }
            Ok(text)
        }
        Operand::Count(n) => Ok(format!("#{}", n)),
        Operand::FloatImmediate(value) if value.is_finite() => Ok(format!("#{:?}", value)),
        Operand::FloatImmediate(_) => Err("floating-point immediate is not finite"),
        Operand::Memory(mem) => memory(mem, format),
        Operand::PcRelative { target, .. } => Ok(format!("{:#x}", target)),
        Operand::Condition(cond) => Ok(cond.to_string()),
        Operand::VectorRegister { reg, arrangement } if *reg < 32 => {
            Ok(format!("v{}.{}", reg, arrangement))
        }
        Operand::VectorElement {
            reg,
            element,
            index,
        } if *reg < 32 => Ok(format!("v{}.{}[{}]", reg, element, index)),
        Operand::VectorRegister { .. } | Operand::VectorElement { .. } => {
            Err("vector register out of range")
        }
        Operand::SystemRegister(sysreg) => Ok(sysreg.to_string()),
        Operand::ControlRegister(n) if *n < 16 => Ok(format!("c{}", n)),
        Operand::ControlRegister(_) => Err("control register out of range"),
        Operand::Named(name) if !name.is_empty() => Ok(name.clone()),
        Operand::Named(_) => Err("empty operand name"),
    }
}

fn register(reg: &Register) -> OperandResult {
    if reg.is_valid() {
        Ok(reg.to_string())
    } else {
        Err("register has no A64 name")
    }
}

fn extended(ext: &ExtendedRegister) -> OperandResult {
    let reg = register(&ext.reg)?;
    Ok(match (ext.extend, ext.amount) {
        (Extend::Lsl, None) => reg,
        (extend, None) => format!("{}, {}", reg, extend),
        (extend, Some(amount)) => format!("{}, {} #{}", reg, extend, amount),
    })
}

fn immediate(value: i128, format: ImmediateFormat) -> String {
    match format {
        ImmediateFormat::Decimal => format!("#{}", value),
        ImmediateFormat::Hex if value < 0 => format!("#-{:#x}", value.unsigned_abs()),
        ImmediateFormat::Hex => format!("#{:#x}", value),
    }
}

fn memory(mem: &MemoryRef, format: ImmediateFormat) -> OperandResult {
    let Some(base) = &mem.base else {
        return Err("memory operand without a base register");
    };
    let base = register(base)?;
    let disp = immediate(i128::from(mem.displacement), format);

    match (&mem.index, mem.mode) {
        (Some(_), _) if mem.displacement != 0 => Err("memory operand with index and displacement"),
        (Some(_), mode) if mode.writes_back() => Err("register index with writeback"),
        (Some(index), _) => Ok(format!("[{}, {}]", base, extended(index)?)),
        (None, IndexMode::Offset) if mem.displacement == 0 => Ok(format!("[{}]", base)),
        (None, IndexMode::Offset) => Ok(format!("[{}, {}]", base, disp)),
        (None, IndexMode::PreIndex) => Ok(format!("[{}, {}]!", base, disp)),
        (None, IndexMode::PostIndex) => Ok(format!("[{}], {}", base, disp)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode;
    use armscope_core::{InstructionClass, Shift};

    fn text(word: u32, address: u64) -> String {
        let insn = decode(word, address).unwrap();
        render(&insn, ImmediateFormat::Hex).unwrap()
    }

    #[test]
    fn test_data_processing_immediate() {
        assert_eq!(text(0x9100_0420, 0), "add x0, x1, #0x1");
        assert_eq!(text(0x9100_03FD, 0), "mov x29, sp");
        assert_eq!(text(0xF100_141F, 0), "cmp x0, #0x5");
        assert_eq!(text(0xD282_4680, 0), "mov x0, #0x1234");
        assert_eq!(text(0xF2AA_CF00, 0), "movk x0, #0x5678, lsl #16");
        assert_eq!(text(0x9280_0000, 0), "mov x0, #-0x1");
        assert_eq!(text(0x9240_1C20, 0), "and x0, x1, #0xff");
        assert_eq!(text(0xD37C_EC20, 0), "lsl x0, x1, #4");
        assert_eq!(text(0x5303_7C20, 0), "lsr w0, w1, #3");
        assert_eq!(text(0x9340_7C20, 0), "sxtw x0, w1");
        assert_eq!(text(0xD344_2C20, 0), "ubfx x0, x1, #4, #8");
        assert_eq!(text(0x93C1_2020, 0), "ror x0, x1, #8");
    }

    #[test]
    fn test_pc_relative_targets() {
        assert_eq!(text(0x9000_0000, 0x1234), "adrp x0, 0x1000");
        assert_eq!(text(0x1000_0041, 0x1000), "adr x1, 0x1008");
        // BL +0x100
        assert_eq!(text(0x9400_0040, 0x1000), "bl 0x1100");
    }

    #[test]
    fn test_branch_and_system() {
        assert_eq!(text(0xD503_201F, 0), "nop");
        assert_eq!(text(0xD65F_03C0, 0), "ret");
        assert_eq!(text(0xD53B_4200, 0), "mrs x0, nzcv");
    }

    #[test]
    fn test_load_store_addressing() {
        assert_eq!(text(0xF940_0020, 0), "ldr x0, [x1]");
        assert_eq!(text(0xA9BF_7BFD, 0), "stp x29, x30, [sp, #-0x10]!");
        assert_eq!(text(0xA8C1_7BFD, 0), "ldp x29, x30, [sp], #0x10");
        assert_eq!(text(0xF862_7820, 0), "ldr x0, [x1, x2, lsl #3]");
    }

    #[test]
    fn test_register_and_simd() {
        assert_eq!(text(0x8B02_0020, 0), "add x0, x1, x2");
        assert_eq!(text(0x1E22_2820, 0), "fadd s0, s1, s2");
        assert_eq!(text(0x4EA2_8420, 0), "add v0.4s, v1.4s, v2.4s");
        assert_eq!(text(0x0E03_3C20, 0), "umov w0, v1.b[1]");
        assert_eq!(text(0x1E2E_1000, 0), "fmov s0, #1.0");
    }

    #[test]
    fn test_decimal_immediates() {
        let insn = decode(0x9280_0000, 0).unwrap();
        assert_eq!(render(&insn, ImmediateFormat::Decimal).unwrap(), "mov x0, #-1");
        let insn = decode(0xF2AA_CF00, 0).unwrap();
        assert_eq!(
            render(&insn, ImmediateFormat::Decimal).unwrap(),
            "movk x0, #22136, lsl #16"
        );
        // bit positions stay decimal in both formats
        let insn = decode(0xD344_2C20, 0).unwrap();
        assert_eq!(render(&insn, ImmediateFormat::Hex).unwrap(), "ubfx x0, x1, #4, #8");
    }

    #[test]
    fn test_operand_syntax() {
        let insn = Instruction::new(0, 0x1234_5678, InstructionClass::LoadStore, "ldr")
            .with_operands(vec![
                Operand::reg(Register::w(3)),
                Operand::shifted(Register::x(2), Shift::Lsl, 3),
                Operand::extended(Register::w(2), Extend::Sxtw, Some(2)),
                Operand::extended(Register::w(4), Extend::Uxtw, None),
                Operand::ShiftedImmediate {
                    value: 0x12,
                    shift: 16,
                },
                Operand::ControlRegister(7),
            ]);
        assert_eq!(
            render(&insn, ImmediateFormat::Hex).unwrap(),
            "ldr w3, x2, lsl #3, w2, sxtw #2, w4, uxtw, #0x12, lsl #16, c7"
        );
    }

    #[test]
    fn test_unnamed_is_rejected() {
        let insn = Instruction::unnamed(0x40, 0x2E20_BC20, InstructionClass::SimdFp);
        assert_eq!(
            render(&insn, ImmediateFormat::Hex),
            Err(RenderError::Unnamed {
                address: 0x40,
                word: 0x2E20_BC20,
                class: InstructionClass::SimdFp,
            })
        );
    }

    #[test]
    fn test_inexpressible_memory() {
        let index = ExtendedRegister {
            reg: Register::x(2),
            extend: Extend::Lsl,
            amount: None,
        };
        let cases = [
            (
                MemoryRef {
                    base: None,
                    index: None,
                    displacement: 8,
                    mode: IndexMode::Offset,
                },
                "memory operand without a base register",
            ),
            (
                MemoryRef {
                    displacement: 8,
                    ..MemoryRef::indexed(Register::x(1), index)
                },
                "memory operand with index and displacement",
            ),
            (
                MemoryRef {
                    mode: IndexMode::PreIndex,
                    ..MemoryRef::indexed(Register::x(1), index)
                },
                "register index with writeback",
            ),
        ];

        for (mem, expected) in cases {
            let insn = Instruction::new(0, 0x1_0000, InstructionClass::LoadStore, "ldr")
                .with_operands(vec![Operand::reg(Register::x(0)), Operand::mem(mem)]);
            match render(&insn, ImmediateFormat::Hex) {
                Err(RenderError::InvalidOperand { index, reason, .. }) => {
                    assert_eq!(index, 1);
                    assert_eq!(reason, expected);
                }
                other => panic!("expected invalid operand, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_invalid_register() {
        let bogus = Register::new(armscope_core::RegisterClass::General, 31, 64);
        let insn = Instruction::new(0, 0x1_0000, InstructionClass::DataProcessingRegister, "mov")
            .with_operands(vec![Operand::reg(bogus)]);
        assert!(matches!(
            render(&insn, ImmediateFormat::Hex),
            Err(RenderError::InvalidOperand { index: 0, .. })
        ));
    }
}
