//! Bitfield helpers shared by the class decoders.

/// Extracts `width` bits starting at bit `lo`.
#[inline]
pub(crate) fn bits(insn: u32, lo: u32, width: u32) -> u32 {
    (insn >> lo) & ((1u32 << width) - 1)
}

/// Returns bit `n`.
#[inline]
pub(crate) fn bit(insn: u32, n: u32) -> bool {
    (insn >> n) & 1 != 0
}

/// Rd / Rt, bits 4:0.
#[inline]
pub(crate) fn rd(insn: u32) -> u8 {
    (insn & 0x1F) as u8
}

/// Rn, bits 9:5.
#[inline]
pub(crate) fn rn(insn: u32) -> u8 {
    bits(insn, 5, 5) as u8
}

/// Rm / Rs, bits 20:16.
#[inline]
pub(crate) fn rm(insn: u32) -> u8 {
    bits(insn, 16, 5) as u8
}

/// Rt2 / Ra, bits 14:10.
#[inline]
pub(crate) fn ra(insn: u32) -> u8 {
    bits(insn, 10, 5) as u8
}

/// Sign-extends the low `bits` bits of `value`.
#[inline]
pub(crate) fn sign_extend(value: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Adds a signed offset to an address, wrapping at the top of the space.
#[inline]
pub(crate) fn offset_address(address: u64, offset: i64) -> u64 {
    address.wrapping_add(offset as u64)
}

/// Decodes a logical-immediate bitmask (`DecodeBitMasks` with
/// `immediate = TRUE`). Returns `None` for reserved encodings.
pub(crate) fn decode_bit_masks(n: u32, imms: u32, immr: u32, is_64bit: bool) -> Option<u64> {
    let combined = ((n & 1) << 6) | (!imms & 0x3F);
    if combined == 0 {
        return None;
    }
    let len = 31 - combined.leading_zeros();
    if len < 1 || (!is_64bit && len > 5) {
        return None;
    }

    let levels = (1u32 << len) - 1;
    let s = imms & levels;
    let r = immr & levels;
    if s == levels {
        return None;
    }

    let esize = 1u32 << len;
    let welem = (1u64 << (s + 1)) - 1;
    let emask = if esize == 64 {
        u64::MAX
    } else {
        (1u64 << esize) - 1
    };
    let elem = if r == 0 {
        welem
    } else {
        ((welem >> r) | (welem << (esize - r))) & emask
    };

    let reg_size = if is_64bit { 64 } else { 32 };
    let mut result = 0u64;
    let mut pos = 0;
    while pos < reg_size {
        result |= elem << pos;
        pos += esize;
    }
    Some(result)
}

/// Expands the 8-bit floating-point immediate of `fmov` (`VFPExpandImm`).
pub(crate) fn expand_fp_imm(imm8: u32) -> f64 {
    let sign = (imm8 >> 7) & 1;
    let exp = (imm8 >> 4) & 7;
    let mantissa = imm8 & 0xF;

    let mut single = sign << 31;
    if exp & 4 == 0 {
        single |= 1 << 30;
    } else {
        single |= 0x1F << 25;
    }
    single |= (exp & 3) << 23;
    single |= mantissa << 19;
    f64::from(f32::from_bits(single))
}

/// Element size and index encoded in the `imm5` field of SIMD copy
/// instructions: the lowest set bit selects the size, the bits above it
/// the index. Returns `(size_log2, index)`.
pub(crate) fn element_from_imm5(imm5: u32) -> Option<(u32, u8)> {
    let low = imm5 & 0xF;
    if low == 0 {
        return None;
    }
    let size = low.trailing_zeros();
    Some((size, (imm5 >> (size + 1)) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x3FF_FFFF, 26), -1);
        assert_eq!(sign_extend(0x1FF_FFFF, 26), 0x1FF_FFFF);
        assert_eq!(sign_extend(0x40, 7), -64);
    }

    #[test]
    fn test_bitmask_immediates() {
        // and x0, x1, #0xff
        assert_eq!(decode_bit_masks(1, 0b000111, 0, true), Some(0xFF));
        // orr w0, wzr, #0x55555555
        assert_eq!(decode_bit_masks(0, 0b111100, 0, false), Some(0x5555_5555));
        // rotated: #0xffff0000ffff0000 (esize 32, 16 ones, rotate 16)
        assert_eq!(
            decode_bit_masks(0, 0b001111, 16, true),
            Some(0xFFFF_0000_FFFF_0000)
        );
        // 0x8000000000000001: esize 64, two ones rotated by 1
        assert_eq!(decode_bit_masks(1, 0b000001, 1, true), Some(0x8000_0000_0000_0001));
    }

    #[test]
    fn test_bitmask_reserved() {
        // all-ones element
        assert_eq!(decode_bit_masks(1, 0b111111, 0, true), None);
        assert_eq!(decode_bit_masks(0, 0b011111, 0, false), None);
        // N=1 is 64-bit only
        assert_eq!(decode_bit_masks(1, 0, 0, false), None);
        // len = 0
        assert_eq!(decode_bit_masks(0, 0b111110, 0, true), None);
    }

    #[test]
    fn test_fp_imm() {
        assert_eq!(expand_fp_imm(0x70), 1.0);
        assert_eq!(expand_fp_imm(0x78), 1.5);
        assert_eq!(expand_fp_imm(0x00), 2.0);
        assert_eq!(expand_fp_imm(0xF0), -1.0);
        assert_eq!(expand_fp_imm(0x60), 0.5);
    }

    #[test]
    fn test_element_from_imm5() {
        assert_eq!(element_from_imm5(0b00001), Some((0, 0)));
        assert_eq!(element_from_imm5(0b10110), Some((1, 5)));
        assert_eq!(element_from_imm5(0b01100), Some((2, 1)));
        assert_eq!(element_from_imm5(0b11000), Some((3, 1)));
        assert_eq!(element_from_imm5(0b10000), None);
    }
}
