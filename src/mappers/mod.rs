//! Mappers
//!
//! NES mappers are circuits found in cartridges that extend the console's
//! capabilities, most commonly by bank-switching memory beyond the
//! directly addressable space.
//!
//! A mapper never stores data itself: it translates bus addresses into
//! offsets within the cartridge's PRG or CHR memory, or refuses the access
//! altogether.

mod mapper_000;

use crate::cartridge::CartridgeHeader;
use crate::errors::CartridgeError;
use mapper_000::Mapper0;

pub trait Mapper {
    /// Translate a CPU read. `Some(offset)` into PRG memory iff the
    /// address belongs to the mapper's domain.
    fn cpu_map_read(&self, address: u16) -> Option<usize>;

    /// Translate a CPU write. `None` refuses the write.
    fn cpu_map_write(&self, address: u16) -> Option<usize>;

    /// Translate a PPU read into CHR memory.
    fn ppu_map_read(&self, address: u16) -> Option<usize>;

    /// Translate a PPU write. `None` refuses the write.
    fn ppu_map_write(&self, address: u16) -> Option<usize>;
}

pub fn mapper_map(mapper: u8, header: &CartridgeHeader) -> Result<Box<dyn Mapper>, CartridgeError> {
    match mapper {
        0 => Ok(Box::new(Mapper0::new(header.prg_banks, header.chr_banks))),
        _ => Err(CartridgeError::MapperNotSupported(mapper)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Mirroring;

    fn header(mapper: u8) -> CartridgeHeader {
        CartridgeHeader {
            prg_banks: 1,
            chr_banks: 1,
            mirroring: Mirroring::Horizontal,
            chr_ram: false,
            trainer: false,
            mapper,
        }
    }

    #[test]
    fn test_factory_builds_nrom() {
        assert!(mapper_map(0, &header(0)).is_ok());
    }

    #[test]
    fn test_factory_rejects_unknown_mappers() {
        assert!(matches!(
            mapper_map(4, &header(4)),
            Err(CartridgeError::MapperNotSupported(4))
        ));
    }
}
