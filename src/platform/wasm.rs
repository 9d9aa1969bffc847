// WASM interface via wasm-bindgen
// Exposes ROM decoding and listings to a JavaScript host.

use wasm_bindgen::prelude::*;

use crate::decode::decode_at;
use crate::listing::render_listing;
use crate::memory::{Rom, RomLayout};
use crate::types::{Model, Word20, ROM_SIZE_SX};

#[wasm_bindgen]
pub struct SaturnDisassembler {
    rom: Rom,
}

#[wasm_bindgen]
impl SaturnDisassembler {
    /// Load a ROM dump.
    /// `rom` - ROM data, one nibble per byte unless `packed` is set.
    /// `packed` - two nibbles per byte, low nibble first.
    /// The model is picked from the image size, as the emulator front end does.
    #[wasm_bindgen(constructor)]
    pub fn new(rom: &[u8], packed: bool) -> Result<SaturnDisassembler, JsValue> {
        let (layout, nibbles) = if packed {
            (RomLayout::Packed, rom.len() * 2)
        } else {
            (RomLayout::Nibble, rom.len())
        };
        let model = if nibbles > ROM_SIZE_SX {
            Model::Gx
        } else {
            Model::Sx
        };
        let rom = Rom::load(rom, layout, model).map_err(to_js)?;
        Ok(Self { rom })
    }

    /// Mnemonic text of the instruction at `pc`.
    pub fn decode(&self, pc: Word20) -> Result<String, JsValue> {
        decode_at(&self.rom, pc).map(|d| d.text).map_err(to_js)
    }

    /// Length in nibbles of the instruction at `pc`.
    pub fn length(&self, pc: Word20) -> Result<u32, JsValue> {
        decode_at(&self.rom, pc).map(|d| d.length as u32).map_err(to_js)
    }

    /// Listing of `start..end`, one line per instruction.
    pub fn listing(&self, start: Word20, end: Word20) -> Result<String, JsValue> {
        render_listing(&self.rom, start, end).map_err(to_js)
    }

    pub fn rom_size(&self) -> u32 {
        self.rom.len() as u32
    }
}

fn to_js(err: crate::error::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}
