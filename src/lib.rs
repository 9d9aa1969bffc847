//! Disassembler for the HP Saturn CPU (HP 48 SX/GX).
//!
//! Saturn instructions are 2 to 21 nibbles long. The decoder reads a fixed
//! window of nibbles at the program counter and walks a table of 16-way
//! dispatches to a mnemonic and a length.
//!
//! ```
//! use saturn_disasm::{decode_at, Listing};
//!
//! // GOTO with a 12-bit displacement, then RTN
//! let mut rom = vec![0x6, 0xa, 0x2, 0x1, 0x0, 0x1];
//! rom.resize(64, 0);
//!
//! let insn = decode_at(&rom, 0).unwrap();
//! assert_eq!((insn.text.as_str(), insn.length), ("GOTO +12B", 4));
//!
//! let texts: Vec<String> = Listing::new(&rom, 0, 6)
//!     .map(|line| line.unwrap().instruction.text)
//!     .collect();
//! assert_eq!(texts, ["GOTO +12B", "RTN"]);
//! ```

pub mod decode;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod memory;
pub mod operand;
pub mod types;

#[cfg(target_arch = "wasm32")]
pub mod platform {
    pub mod wasm;
}

pub use decode::{decode, decode_at, DecodedInstruction};
pub use error::{Error, Result};
pub use fetch::OpcodeWindow;
pub use listing::{render_listing, Line, Listing};
pub use memory::{NibbleSource, Rom, RomLayout};
pub use types::{Field, Model, Word20, Word4, ADDRESS_MASK, MAX_INSTRUCTION_NIBBLES};
