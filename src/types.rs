// Types shared by the fetch, decode and listing stages.

pub type Word4 = u8;
pub type Word20 = u32;

/// The Saturn address bus is 20 bits wide; the program counter wraps.
pub const ADDRESS_MASK: Word20 = 0xfffff;

/// Longest encoding: LAHEX with a 16-nibble constant (8082 n + 16 nibbles).
pub const MAX_INSTRUCTION_NIBBLES: usize = 21;

pub const ROM_SIZE_SX: usize = 0x080000;
pub const ROM_SIZE_GX: usize = 0x100000;

// Encoded field code for the A field in 0E / 15x operands
pub const A_FIELD: Word4 = 15;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Model {
    Sx,
    Gx,
}

impl Model {
    pub fn rom_size(self) -> usize {
        match self {
            Model::Sx => ROM_SIZE_SX,
            Model::Gx => ROM_SIZE_GX,
        }
    }
}

/// Register field selector, as printed after a mnemonic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    P,
    Wp,
    Xs,
    X,
    S,
    M,
    B,
    W,
    A,
}

const FIELD_NAMES: [&str; 9] = ["P", "WP", "XS", "X", "S", "M", "B", "W", "A"];

const FIELDS: [Field; 9] = [
    Field::P,
    Field::Wp,
    Field::Xs,
    Field::X,
    Field::S,
    Field::M,
    Field::B,
    Field::W,
    Field::A,
];

impl Field {
    /// Field named by an encoded field nibble. Codes 9..=14 name nothing.
    pub fn from_code(code: Word4) -> Option<Field> {
        match code {
            0..=8 => Some(FIELDS[code as usize]),
            A_FIELD => Some(Field::A),
            _ => None,
        }
    }

    /// Field named by the low three bits of a nibble (register test and
    /// arithmetic forms, where bit 3 selects the operation table).
    pub fn from_low_bits(nibble: Word4) -> Field {
        FIELDS[(nibble & 0x7) as usize]
    }

    pub fn name(self) -> &'static str {
        FIELD_NAMES[self as usize]
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
