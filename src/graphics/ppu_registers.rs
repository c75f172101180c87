//! PPU registers
//!
//! This module provides a better way to manage PPU register bits and bit
//! groups

use bitflags::bitflags;

pub struct PpuRegisters {
    pub ctrl: PpuCtrl,
    pub mask: PpuMask,
    pub status: PpuStatus,
    pub oam_addr: u8,
    pub data_buffer: u8,
}

impl Default for PpuRegisters {
    fn default() -> Self {
        Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            data_buffer: 0,
        }
    }
}

impl PpuRegisters {
    // PPUCTRL

    #[inline]
    pub fn nmi_enabled(&self) -> bool {
        self.ctrl.contains(PpuCtrl::NMI_ENABLE)
    }

    #[inline]
    pub fn sprite_size(&self) -> i16 {
        match self.ctrl.contains(PpuCtrl::SPRITE_SIZE) {
            false => 8,
            true => 16,
        }
    }

    #[inline]
    pub fn background_pattern_table(&self) -> u16 {
        self.ctrl.contains(PpuCtrl::BACKGROUND_PATTERN_TABLE) as u16
    }

    #[inline]
    pub fn sprite_pattern_table(&self) -> u16 {
        self.ctrl.contains(PpuCtrl::SPRITE_PATTERN_TABLE) as u16
    }

    #[inline]
    pub fn vram_address_increment(&self) -> u16 {
        match self.ctrl.contains(PpuCtrl::VRAM_ADDRESS_INCREMENT) {
            false => 1, // going across
            true => 32, // going down
        }
    }

    // PPUMASK

    #[inline]
    pub fn rendering_enabled(&self) -> bool {
        self.background_rendering_enabled() || self.sprite_rendering_enabled()
    }

    #[inline]
    pub fn background_rendering_enabled(&self) -> bool {
        self.mask.contains(PpuMask::RENDER_BACKGROUND)
    }

    #[inline]
    pub fn sprite_rendering_enabled(&self) -> bool {
        self.mask.contains(PpuMask::RENDER_SPRITES)
    }

    #[inline]
    pub fn left_column_rendering_enabled(&self) -> bool {
        self.mask.contains(PpuMask::RENDER_BACKGROUND_LEFT)
            || self.mask.contains(PpuMask::RENDER_SPRITES_LEFT)
    }

    // PPUSTATUS

    #[inline]
    pub fn set_vertical_blank(&mut self, value: bool) {
        self.status.set(PpuStatus::VERTICAL_BLANK, value);
    }

    #[inline]
    pub fn set_sprite_overflow(&mut self, value: bool) {
        self.status.set(PpuStatus::SPRITE_OVERFLOW, value);
    }

    #[inline]
    pub fn set_sprite_zero_hit(&mut self, value: bool) {
        self.status.set(PpuStatus::SPRITE_ZERO_HIT, value);
    }
}

bitflags! {
    pub struct PpuCtrl: u8 {
        /// Generate an NMI at the start of the vertical blanking interval
        const NMI_ENABLE = 0b1000_0000;

        /// PPU master/slave select (unused)
        const SLAVE_MODE = 0b0100_0000;

        /// 0: 8x8 pixel sprites; 1: 8x16
        const SPRITE_SIZE = 0b0010_0000;

        /// Background pattern table address (0 = $0000; 1 = $1000)
        const BACKGROUND_PATTERN_TABLE = 0b0001_0000;

        /// Sprite pattern table address for 8x8 sprites (0: $0000; 1: $1000;
        /// ignored in 8x16 mode)
        const SPRITE_PATTERN_TABLE = 0b0000_1000;

        /// VRAM address increment per CPU read/write of PPUDATA (0: add 1,
        /// going across; 1: add 32, going down)
        const VRAM_ADDRESS_INCREMENT = 0b0000_0100;

        /// Base nametable address Y bit, mirrored into the temporary
        /// render address
        const NAMETABLE_Y = 0b0000_0010;

        /// Base nametable address X bit, mirrored into the temporary
        /// render address
        const NAMETABLE_X = 0b0000_0001;
    }
}

bitflags! {
    pub struct PpuMask: u8 {
        const ENHANCE_BLUE = 0b1000_0000;
        const ENHANCE_GREEN = 0b0100_0000;
        const ENHANCE_RED = 0b0010_0000;

        const RENDER_SPRITES = 0b0001_0000;
        const RENDER_BACKGROUND = 0b0000_1000;

        /// Show sprites in the leftmost 8 pixel columns
        const RENDER_SPRITES_LEFT = 0b0000_0100;

        /// Show background in the leftmost 8 pixel columns
        const RENDER_BACKGROUND_LEFT = 0b0000_0010;

        const GRAYSCALE = 0b0000_0001;
    }
}

bitflags! {
    pub struct PpuStatus: u8 {
        /// PPU is in the vertical blanking interval
        const VERTICAL_BLANK = 0b1000_0000;

        /// A non-zero sprite 0 pixel overlapped a non-zero background pixel
        const SPRITE_ZERO_HIT = 0b0100_0000;

        /// More than eight sprites intersected a scanline
        const SPRITE_OVERFLOW = 0b0010_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vram_address_increment() {
        let mut registers = PpuRegisters::default();
        assert_eq!(registers.vram_address_increment(), 1);

        registers.ctrl.insert(PpuCtrl::VRAM_ADDRESS_INCREMENT);
        assert_eq!(registers.vram_address_increment(), 32);
    }

    #[test]
    fn test_sprite_size() {
        let mut registers = PpuRegisters::default();
        assert_eq!(registers.sprite_size(), 8);

        registers.ctrl.insert(PpuCtrl::SPRITE_SIZE);
        assert_eq!(registers.sprite_size(), 16);
    }

    #[test]
    fn test_rendering_enabled_needs_either_mask_bit() {
        let mut registers = PpuRegisters::default();
        assert!(!registers.rendering_enabled());

        registers.mask.insert(PpuMask::RENDER_BACKGROUND);
        assert!(registers.rendering_enabled());

        registers.mask = PpuMask::RENDER_SPRITES;
        assert!(registers.rendering_enabled());
    }
}
