use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;

use crate::errors::CartridgeError;
use crate::hardware::{CHR_BANK_SIZE, PRG_BANK_SIZE};
use crate::mappers::{mapper_map, Mapper};
use crate::utils::bv;

/// Nametable mirroring arrangement selected by the cartridge wiring.
///
/// See https://www.nesdev.org/wiki/Mirroring for further reference
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    OneScreenLo,
    OneScreenHi,
}

/// A game cartridge: iNES header, PRG/CHR memory and the mapper circuit
/// translating bus addresses into memory offsets.
///
/// The cartridge gets the first chance to claim every CPU and PPU access.
/// Each `cpu_read`/`ppu_read` returns `Some(data)` when the mapper claims
/// the address and `None` otherwise; writes return whether they were
/// consumed. Mapper 0 refuses CPU writes to PRG ROM, and CHR writes unless
/// the header advertises CHR RAM.
pub struct Cartridge {
    name: String,
    header: CartridgeHeader,
    mapper: Box<dyn Mapper>,
    program_memory: Vec<u8>,
    character_memory: Vec<u8>,
}

impl Cartridge {
    /// Create a new cartridge loading the contents from a iNES file.
    ///
    /// Read more about iNES ROM file format in:
    /// https://www.nesdev.org/wiki/INES
    ///
    /// NES2.0 file format is not implemented.
    ///
    /// Header flags 8 to 15 are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        if !path.as_ref().exists() {
            return Err(CartridgeError::FileNotFound(
                path.as_ref().to_string_lossy().into_owned(),
            ));
        }

        let game_name = path
            .as_ref()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file = File::open(path)?;
        Self::from_reader(file, game_name)
    }

    /// Create a new cartridge from an in-memory iNES image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CartridgeError> {
        Self::from_reader(bytes, String::from("<memory>"))
    }

    fn from_reader<R: Read>(mut reader: R, name: String) -> Result<Self, CartridgeError> {
        let mut header = [0; 16]; // 16 byte header
        reader.read_exact(&mut header)?;

        let header = CartridgeHeader::parse(&header)?;
        debug!("Cartridge header: {header:?}");

        let mapper = mapper_map(header.mapper, &header)?;

        // Trainer content is ignored
        if header.trainer {
            let mut buf = [0; 512]; // 512-byte trainer stored before PRG data
            reader.read_exact(&mut buf)?;
        }

        let mut program_memory = vec![0; header.prg_banks as usize * PRG_BANK_SIZE];
        reader.read_exact(&mut program_memory)?;

        let character_memory = if header.chr_ram {
            vec![0; CHR_BANK_SIZE]
        } else {
            let mut buf = vec![0; header.chr_banks as usize * CHR_BANK_SIZE];
            reader.read_exact(&mut buf)?;
            buf
        };

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest)?;
        if !rest.is_empty() {
            return Err(CartridgeError::TrailingData);
        }

        Ok(Self {
            name,
            header,
            mapper,
            program_memory,
            character_memory,
        })
    }

    pub fn mirroring_mode(&self) -> Mirroring {
        self.header.mirroring
    }

    /// Attempt a CPU read. `Some` iff the mapper claims the address.
    pub fn cpu_read(&self, address: u16) -> Option<u8> {
        self.mapper
            .cpu_map_read(address)
            .map(|offset| self.program_memory[offset])
    }

    /// Attempt a CPU write. Returns whether the cartridge consumed it.
    pub fn cpu_write(&mut self, address: u16, data: u8) -> bool {
        match self.mapper.cpu_map_write(address) {
            Some(offset) => {
                self.program_memory[offset] = data;
                true
            }
            None => false,
        }
    }

    /// Attempt a PPU read. `Some` iff the mapper claims the address.
    pub fn ppu_read(&self, address: u16) -> Option<u8> {
        self.mapper
            .ppu_map_read(address)
            .map(|offset| self.character_memory[offset])
    }

    /// Attempt a PPU write. Returns whether the cartridge consumed it.
    pub fn ppu_write(&mut self, address: u16, data: u8) -> bool {
        match self.mapper.ppu_map_write(address) {
            Some(offset) => {
                self.character_memory[offset] = data;
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Display for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug)]
pub struct CartridgeHeader {
    pub prg_banks: u8,
    pub chr_banks: u8,
    pub mirroring: Mirroring,

    pub chr_ram: bool,

    // 512-byte trainer stored before PRG data
    pub trainer: bool,

    pub mapper: u8,
}

impl CartridgeHeader {
    fn parse(header: &[u8; 16]) -> Result<Self, CartridgeError> {
        // (bytes 0-3) - NES cartridges start with ASCII "NES" and MS-DOS
        // end-of-file (0x1A)
        if header[0..4] != [0x4E, 0x45, 0x53, 0x1A] {
            return Err(CartridgeError::InvalidHeader {
                details: format!("bad magic number {:02X?}", &header[0..4]),
            });
        }

        // (byte 4) - Size of PRG ROM in 16 kB units
        let prg_banks = header[4];
        if prg_banks == 0 {
            return Err(CartridgeError::InvalidHeader {
                details: "cartridge declares no PRG ROM".to_string(),
            });
        }

        // (byte 5) - Size of CHR ROM in 8 kB units (0 means CHR RAM)
        let chr_banks = header[5];
        let chr_ram = chr_banks == 0;

        // (byte 6) - Mapper low nibble, mirroring, battery, trainer
        let mirroring = if bv(header[6], 0) == 0 {
            Mirroring::Horizontal
        } else {
            Mirroring::Vertical
        };
        let trainer = bv(header[6], 2) != 0;

        // (byte 7) - Mapper high nibble
        let mapper = (header[7] & 0xF0) | ((header[6] & 0xF0) >> 4);

        Ok(Self {
            prg_banks,
            chr_banks,
            mirroring,
            chr_ram,
            trainer,
            mapper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(flags6: u8, flags7: u8) -> [u8; 16] {
        let mut header = [0; 16];
        header[0..4].copy_from_slice(&[0x4E, 0x45, 0x53, 0x1A]);
        header[4] = 1; // one PRG bank
        header[5] = 1; // one CHR bank
        header[6] = flags6;
        header[7] = flags7;
        header
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut header = header_bytes(0, 0);
        header[3] = 0x00;

        assert!(matches!(
            CartridgeHeader::parse(&header),
            Err(CartridgeError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_header_mirroring_bit() {
        let header = CartridgeHeader::parse(&header_bytes(0b0000_0000, 0)).unwrap();
        assert_eq!(header.mirroring, Mirroring::Horizontal);

        let header = CartridgeHeader::parse(&header_bytes(0b0000_0001, 0)).unwrap();
        assert_eq!(header.mirroring, Mirroring::Vertical);
    }

    #[test]
    fn test_header_trainer_bit() {
        let header = CartridgeHeader::parse(&header_bytes(0b0000_0100, 0)).unwrap();
        assert!(header.trainer);
    }

    #[test]
    fn test_header_mapper_nibbles() {
        let header = CartridgeHeader::parse(&header_bytes(0x40, 0x20)).unwrap();
        assert_eq!(header.mapper, 0x24);
    }

    #[test]
    fn test_chr_ram_inferred_from_zero_banks() {
        let mut bytes = header_bytes(0, 0);
        bytes[5] = 0;
        let header = CartridgeHeader::parse(&bytes).unwrap();
        assert!(header.chr_ram);
    }
}
