// Opcode fetch: captures the nibbles at the program counter before decoding.

use crate::error::Result;
use crate::memory::NibbleSource;
use crate::types::*;

/// The nibbles at `pc .. pc + MAX_INSTRUCTION_NIBBLES`.
///
/// Always holds the longest possible instruction, so the decoder can look
/// ahead at immediates and displacements without going back to memory.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OpcodeWindow {
    pc: Word20,
    nibbles: [Word4; MAX_INSTRUCTION_NIBBLES],
}

impl OpcodeWindow {
    /// Read `MAX_INSTRUCTION_NIBBLES` nibbles starting at `pc`. The address
    /// wraps at the top of the 20-bit space. The first failed read is returned
    /// as-is.
    pub fn fetch<M: NibbleSource + ?Sized>(mem: &M, pc: Word20) -> Result<Self> {
        let mut nibbles = [0; MAX_INSTRUCTION_NIBBLES];
        for (i, nib) in nibbles.iter_mut().enumerate() {
            let addr = pc.wrapping_add(i as Word20) & ADDRESS_MASK;
            *nib = mem.read_nibble(addr)? & 0x0f;
        }
        Ok(Self { pc, nibbles })
    }

    /// Build a window from raw opcode nibbles; missing positions read as 0.
    pub fn from_nibbles(pc: Word20, opcode: &[Word4]) -> Self {
        let mut nibbles = [0; MAX_INSTRUCTION_NIBBLES];
        for (dst, &src) in nibbles.iter_mut().zip(opcode) {
            *dst = src & 0x0f;
        }
        Self { pc, nibbles }
    }

    pub fn pc(&self) -> Word20 {
        self.pc
    }

    #[inline]
    pub fn nibble(&self, offset: usize) -> Word4 {
        self.nibbles[offset]
    }

    pub fn as_slice(&self) -> &[Word4] {
        &self.nibbles
    }
}
