// Operand helpers: immediates are stored least significant nibble first.

use crate::fetch::OpcodeWindow;

/// Assemble `width` nibbles starting at `offset`, low nibble first.
#[inline]
pub fn immediate(window: &OpcodeWindow, offset: usize, width: usize) -> u64 {
    let mut val: u64 = 0;
    for i in (0..width).rev() {
        val <<= 4;
        val |= window.nibble(offset + i) as u64;
    }
    val
}

/// Sign-extend a `nibbles`-wide two's complement value (1..=8 nibbles).
pub fn sign_extend(value: u64, nibbles: usize) -> i32 {
    let shift = 64 - 4 * nibbles as u32;
    ((value << shift) as i64 >> shift) as i32
}

/// Uppercase hex, zero-padded to `width` digits.
pub fn hex(value: u64, width: usize) -> String {
    format!("{:0width$X}", value, width = width)
}

/// `+X` / `-X` relative offset.
pub fn signed(offset: i32) -> String {
    if offset < 0 {
        format!("-{:X}", offset.unsigned_abs())
    } else {
        format!("+{:X}", offset)
    }
}

/// Target of a test's 2-nibble branch field. A zero field means "return".
/// `offset` is where the field sits relative to the instruction start.
pub fn goyes(raw: u8, offset: i32) -> String {
    if raw == 0 {
        return "RTNYES".to_string();
    }
    let target = sign_extend(raw as u64, 2) + offset;
    format!("GOYES {}", signed(target))
}
