//! Register-usage and control-flow annotations.
//!
//! An annotation is a comma-separated list of segments, in this order:
//! `r:<regs>`, `w:<regs>`, `pcrel:<kind>`, `t:<target>`, `br:<kind>`.
//! Segments with nothing to report are left out, so an instruction with no
//! effects annotates as the empty string.

use crate::Instruction;

/// Builds the annotation string for a decoded instruction.
pub fn annotate(insn: &Instruction) -> String {
    let mut segments = Vec::with_capacity(5);

    if !insn.reads.is_empty() {
        segments.push(format!("r:{}", insn.reads));
    }
    if !insn.writes.is_empty() {
        segments.push(format!("w:{}", insn.writes));
    }
    if let Some(kind) = insn.pc_rel.annotation_kind() {
        segments.push(format!("pcrel:{}", kind));
    }
    if insn.pc_rel_target != 0 {
        segments.push(format!("t:{:#x}", insn.pc_rel_target));
    }
    if let Some(kind) = insn.branch.annotation_kind() {
        segments.push(format!("br:{}", kind));
    }

    segments.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BranchType, InstructionClass, PcRelType, Register, RegisterSet};

    fn insn(mnemonic: &str) -> Instruction {
        Instruction::new(0x1000, 0, InstructionClass::BranchSystem, mnemonic)
    }

    #[test]
    fn test_empty_annotation() {
        assert_eq!(annotate(&insn("nop")), "");
    }

    #[test]
    fn test_segment_order() {
        let bl = insn("bl")
            .with_write(Register::lr())
            .with_pc_rel(PcRelType::LongBranchDisplacement, 0x2000)
            .with_branch(BranchType::Call, 0x2000);
        assert_eq!(annotate(&bl), "w:30, pcrel:br-long, t:0x2000, br:call");
    }

    #[test]
    fn test_all_segments_in_order() {
        let call = insn("blraa")
            .with_read(Register::x(1))
            .with_write(Register::lr())
            .with_pc_rel(PcRelType::LongBranchDisplacement, 0x2000)
            .with_branch(BranchType::Call, 0x2000);
        assert_eq!(
            annotate(&call),
            "r:1, w:30, pcrel:br-long, t:0x2000, br:call"
        );
    }

    #[test]
    fn test_reads_and_writes() {
        let add = insn("adds")
            .with_reads(&[Register::x(1), Register::x(2)])
            .with_write(Register::x(0))
            .with_flags_written();
        assert_eq!(add.annotation(), "r:1,2, w:0,nzcv");
    }

    #[test]
    fn test_all_registers() {
        let svc = insn("svc")
            .with_all_registers()
            .with_branch(BranchType::Exception, 0);
        assert_eq!(annotate(&svc), "r:all, w:all, br:exception");
    }

    #[test]
    fn test_zero_target_omitted() {
        let adrp = insn("adrp")
            .with_write(Register::x(0))
            .with_pc_rel(PcRelType::AddressPage, 0);
        assert_eq!(annotate(&adrp), "w:0, pcrel:addr-page");
    }

    #[test]
    fn test_indirect_branch() {
        let br = insn("br")
            .with_read(Register::x(16))
            .with_branch(BranchType::Unconditional, 0);
        assert_eq!(annotate(&br), "r:16, br:uncond");
        assert_eq!(br.writes, RegisterSet::empty());
    }
}
