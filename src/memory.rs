// Memory interface consumed by the fetch stage, and a flat ROM image.
// One nibble per address; the image is read-only.

use tracing::debug;

use crate::error::{Error, Result};
use crate::types::*;

/// Anything the decoder can fetch opcode nibbles from.
pub trait NibbleSource {
    fn read_nibble(&self, addr: Word20) -> Result<Word4>;
}

impl NibbleSource for [u8] {
    fn read_nibble(&self, addr: Word20) -> Result<Word4> {
        self.get(addr as usize)
            .map(|&nib| nib & 0x0f)
            .ok_or(Error::OutOfRange {
                address: addr,
                size: self.len(),
            })
    }
}

impl NibbleSource for Vec<u8> {
    fn read_nibble(&self, addr: Word20) -> Result<Word4> {
        self.as_slice().read_nibble(addr)
    }
}

impl<T: NibbleSource + ?Sized> NibbleSource for &T {
    fn read_nibble(&self, addr: Word20) -> Result<Word4> {
        (**self).read_nibble(addr)
    }
}

/// On-disk layout of a ROM dump.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum RomLayout {
    /// One nibble per byte, as the emulators store it.
    #[default]
    Nibble,
    /// Two nibbles per byte, low nibble first.
    Packed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rom {
    nibbles: Vec<Word4>,
}

impl Rom {
    pub fn from_nibbles(nibbles: Vec<u8>) -> Result<Self> {
        if let Some((offset, &value)) = nibbles.iter().enumerate().find(|&(_, &b)| b > 0x0f) {
            return Err(Error::InvalidNibble { offset, value });
        }
        Ok(Self { nibbles })
    }

    /// Load a ROM dump for the given model, zero-padding it to the model's
    /// ROM size.
    pub fn load(data: &[u8], layout: RomLayout, model: Model) -> Result<Self> {
        let capacity = model.rom_size();
        let mut nibbles = match layout {
            RomLayout::Nibble => data.to_vec(),
            RomLayout::Packed => unpack_nibbles(data),
        };
        if nibbles.len() > capacity {
            return Err(Error::ImageTooLarge {
                len: nibbles.len(),
                capacity,
            });
        }
        let loaded = nibbles.len();
        nibbles.resize(capacity, 0);
        let rom = Self::from_nibbles(nibbles)?;
        debug!(?layout, ?model, loaded, size = capacity, "loaded ROM image");
        Ok(rom)
    }

    pub fn len(&self) -> usize {
        self.nibbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nibbles.is_empty()
    }

    pub fn as_nibbles(&self) -> &[Word4] {
        &self.nibbles
    }
}

// The image is mirrored across the 20-bit address space, so a fetch that
// runs off the end of a smaller ROM wraps to its start.
impl NibbleSource for Rom {
    #[inline]
    fn read_nibble(&self, addr: Word20) -> Result<Word4> {
        if addr > ADDRESS_MASK || self.nibbles.is_empty() {
            return Err(Error::OutOfRange {
                address: addr,
                size: self.nibbles.len(),
            });
        }
        Ok(self.nibbles[addr as usize % self.nibbles.len()])
    }
}

/// Expand packed bytes to nibbles (low nibble first).
pub fn unpack_nibbles(data: &[u8]) -> Vec<Word4> {
    let mut nibbles = Vec::with_capacity(data.len() * 2);
    for &byte in data {
        nibbles.push(byte & 0x0f);
        nibbles.push((byte >> 4) & 0x0f);
    }
    nibbles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_read_in_range() {
        let mem: &[u8] = &[0x1, 0x2, 0xf];
        assert_eq!(mem.read_nibble(2), Ok(0xf));
    }

    #[test]
    fn test_slice_read_out_of_range() {
        let mem: &[u8] = &[0x1, 0x2];
        assert_eq!(
            mem.read_nibble(2),
            Err(Error::OutOfRange { address: 2, size: 2 })
        );
    }

    #[test]
    fn test_unpack_low_nibble_first() {
        assert_eq!(unpack_nibbles(&[0x21, 0xa9]), vec![0x1, 0x2, 0x9, 0xa]);
    }

    #[test]
    fn test_load_nibble_layout_pads_to_model_size() {
        let rom = Rom::load(&[0x6, 0x3, 0x0, 0x0], RomLayout::Nibble, Model::Sx).unwrap();
        assert_eq!(rom.len(), ROM_SIZE_SX);
        assert_eq!(&rom.as_nibbles()[..5], &[0x6, 0x3, 0x0, 0x0, 0x0]);
    }

    #[test]
    fn test_load_packed_layout() {
        let rom = Rom::load(&[0x36, 0x00], RomLayout::Packed, Model::Gx).unwrap();
        assert_eq!(rom.len(), ROM_SIZE_GX);
        assert_eq!(rom.read_nibble(0), Ok(0x6));
        assert_eq!(rom.read_nibble(1), Ok(0x3));
    }

    #[test]
    fn test_load_rejects_non_nibble_bytes() {
        let err = Rom::load(&[0x1, 0x10], RomLayout::Nibble, Model::Sx).unwrap_err();
        assert_eq!(err, Error::InvalidNibble { offset: 1, value: 0x10 });
    }

    #[test]
    fn test_load_rejects_oversized_image() {
        let data = vec![0u8; ROM_SIZE_SX + 1];
        let err = Rom::load(&data, RomLayout::Nibble, Model::Sx).unwrap_err();
        assert_eq!(
            err,
            Error::ImageTooLarge {
                len: ROM_SIZE_SX + 1,
                capacity: ROM_SIZE_SX
            }
        );
    }

    #[test]
    fn test_rom_mirrors_across_address_space() {
        let rom = Rom::from_nibbles(vec![0x1, 0x2, 0x3]).unwrap();
        assert_eq!(rom.read_nibble(3), Ok(0x1));
        assert_eq!(rom.read_nibble(5), Ok(0x3));
        assert_eq!(rom.read_nibble(ADDRESS_MASK), Ok(0x1));
    }

    #[test]
    fn test_rom_read_outside_address_space() {
        let rom = Rom::from_nibbles(vec![0x1]).unwrap();
        assert!(matches!(
            rom.read_nibble(ADDRESS_MASK + 1),
            Err(Error::OutOfRange { size: 1, .. })
        ));
        let empty = Rom::from_nibbles(Vec::new()).unwrap();
        assert!(matches!(empty.read_nibble(0), Err(Error::OutOfRange { address: 0, size: 0 })));
    }

    #[test]
    fn test_sx_rom_decodes_to_its_end() {
        let mut image = vec![0u8; ROM_SIZE_SX];
        image[ROM_SIZE_SX - 2] = 0x0;
        image[ROM_SIZE_SX - 1] = 0x1;
        let rom = Rom::load(&image, RomLayout::Nibble, Model::Sx).unwrap();
        let end = rom.len() as Word20;

        let rtn = crate::decode::decode_at(&rom, end - 2).unwrap();
        assert_eq!((rtn.text.as_str(), rtn.length), ("RTN", 2));

        let lines: Vec<_> = crate::listing::Listing::new(&rom, end - 0x10, end)
            .collect::<Result<_>>()
            .unwrap();
        let last = lines.last().unwrap();
        assert_eq!(last.address, end - 2);
        assert_eq!(last.instruction.text, "RTN");
    }
}
