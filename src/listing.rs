// Sequential disassembly of an address range.

use std::fmt;

use tracing::trace;

use crate::decode::{decode, DecodedInstruction};
use crate::error::Result;
use crate::fetch::OpcodeWindow;
use crate::memory::NibbleSource;
use crate::types::*;

/// One listing line: where the instruction sits, its raw nibbles, and text.
/// The raw column is padded to the longest encoding so the text lines up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub address: Word20,
    pub nibbles: Vec<Word4>,
    pub instruction: DecodedInstruction,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw: String = self
            .nibbles
            .iter()
            .map(|&n| char::from_digit(n as u32, 16).unwrap_or('?').to_ascii_uppercase())
            .collect();
        write!(
            f,
            "{:05X}  {:<width$} {}",
            self.address,
            raw,
            self.instruction,
            width = MAX_INSTRUCTION_NIBBLES
        )
    }
}

/// Walks `start..end`, decoding one instruction per step. Every step advances
/// by at least one nibble, so Illegal stretches are stepped over. A memory
/// error is yielded once and ends the walk.
pub struct Listing<'a, M: ?Sized> {
    mem: &'a M,
    pc: Word20,
    end: Word20,
    done: bool,
}

impl<'a, M: NibbleSource + ?Sized> Listing<'a, M> {
    pub fn new(mem: &'a M, start: Word20, end: Word20) -> Self {
        Self {
            mem,
            pc: start,
            end: end.min(ADDRESS_MASK + 1),
            done: false,
        }
    }
}

impl<'a, M: NibbleSource + ?Sized> Iterator for Listing<'a, M> {
    type Item = Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pc >= self.end {
            return None;
        }
        let window = match OpcodeWindow::fetch(self.mem, self.pc) {
            Ok(w) => w,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        let instruction = decode(&window);
        if instruction.is_illegal() {
            trace!(address = self.pc, nibble = window.nibble(0), "illegal opcode");
        }
        let line = Line {
            address: self.pc,
            nibbles: window.as_slice()[..instruction.length].to_vec(),
            instruction,
        };
        self.pc += line.instruction.length as Word20;
        Some(Ok(line))
    }
}

/// Render `start..end` as listing text, one instruction per line.
pub fn render_listing<M: NibbleSource + ?Sized>(mem: &M, start: Word20, end: Word20) -> Result<String> {
    let mut out = String::new();
    for line in Listing::new(mem, start, end) {
        out.push_str(&line?.to_string());
        out.push('\n');
    }
    Ok(out)
}
