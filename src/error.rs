use thiserror::Error;

use crate::types::Word20;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("nibble address {address:#07x} is outside the {size:#x}-nibble image")]
    OutOfRange { address: Word20, size: usize },
    #[error("byte {value:#04x} at offset {offset:#x} is not a nibble")]
    InvalidNibble { offset: usize, value: u8 },
    #[error("image of {len:#x} nibbles exceeds the {capacity:#x}-nibble ROM")]
    ImageTooLarge { len: usize, capacity: usize },
}
