//! PPU module
//!
//! This module emulates the NES Picture Processing Unit (PPU) as a
//! per-cycle state machine over (scanline, cycle), with scanlines in
//! [-1, 260] and cycles in [0, 340].
//!
//! NES PPU registers ($2000-$2007) are mirrored from $2008 to $3FFF.
//! That's because the address is not completely decoded, that is, the
//! chip ignores one or more address lines. This allows cheaper hardware
//! (less address lines) and faster decoding at the expense of unused
//! address space. The bus hands this module the already-decoded 3-bit
//! register index.

use log::debug;

use crate::cartridge::Mirroring;
use crate::graphics::oam::{Oam, OamSprite};
use crate::graphics::palette::Palette;
use crate::graphics::ppu_registers::{PpuCtrl, PpuRegisters};
use crate::graphics::render_address::RenderAddress;
use crate::graphics::{Frame, FramePixel};
use crate::hardware::{
    NAMETABLES_MIRRORS_END, NAMETABLES_START, NAMETABLE_SIZE, OAMADDR, OAMDATA,
    PALETTE_MEMORY_MIRRORS_END, PALETTE_MEMORY_SIZE, PALETTE_MEMORY_START, PATTERN_TABLES_END,
    PATTERN_TABLES_START, PATTERN_TABLE_SIZE, PPUADDR, PPUCTRL, PPUDATA, PPUMASK, PPUSCROLL,
    PPUSTATUS, PPU_ADDRESS_MASK, SCREEN_HEIGHT, SCREEN_WIDTH,
};
use crate::types::SharedCartridge;
use crate::utils;

/// Work the PPU may have to do on a given (scanline, cycle). Up to three
/// actions apply on the same tick; they run in declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PpuAction {
    PrerenderClear,
    PrerenderTransferY,
    RenderSkipOdd,
    RenderProcessNextTile,
    RenderIncrementScrollY,
    RenderLoadShiftersAndTransferX,
    RenderLoadNextBackgroundTile,
    RenderOamTransfer,
    RenderUpdateSprites,
    RenderEndFrame,
}

/// Latches holding the bytes of the tile that will enter the background
/// shifters next
#[derive(Default)]
struct NextBackgroundTile {
    id: u8,
    attribute: u8,
    lsb: u8,
    msb: u8,
}

/// Background shift registers. The high 8 bits feed the pixels currently
/// being drawn, the low 8 bits hold the next tile
#[derive(Default)]
struct BackgroundShifters {
    pattern_lo: u16,
    pattern_hi: u16,
    attribute_lo: u16,
    attribute_hi: u16,
}

pub struct Ppu {
    registers: PpuRegisters,

    // Scrolling state, named after the user who explained it in detail:
    // https://www.nesdev.org/wiki/PPU_scrolling
    vram_addr: RenderAddress,
    tram_addr: RenderAddress,
    fine_x: u8,
    address_latch: bool,

    // PPU address space. The cartridge may claim pattern-table accesses
    // before these are reached.
    nametables: [[u8; NAMETABLE_SIZE]; 2],
    palette_table: [u8; PALETTE_MEMORY_SIZE],
    pattern_tables: [[u8; PATTERN_TABLE_SIZE]; 2],

    oam: Oam,

    // Background pipeline
    next_tile: NextBackgroundTile,
    shifters: BackgroundShifters,

    // Sprite pipeline: the sprites intersecting the scanline being
    // evaluated, with one 8-bit shifter pair per slot
    sprite_scanline: [OamSprite; 8],
    sprite_count: u8,
    sprite_shifter_lo: [u8; 8],
    sprite_shifter_hi: [u8; 8],
    sprite_zero_hit_possible: bool,
    sprite_zero_being_rendered: bool,

    scanline: i16,
    cycle: i16,
    frame_completed: bool,
    do_nmi: bool,

    frame: Frame,

    cartridge: Option<SharedCartridge>,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            registers: PpuRegisters::default(),
            vram_addr: RenderAddress::default(),
            tram_addr: RenderAddress::default(),
            fine_x: 0,
            address_latch: false,
            nametables: [[0; NAMETABLE_SIZE]; 2],
            palette_table: [0; PALETTE_MEMORY_SIZE],
            pattern_tables: [[0; PATTERN_TABLE_SIZE]; 2],
            oam: Oam::new(),
            next_tile: NextBackgroundTile::default(),
            shifters: BackgroundShifters::default(),
            sprite_scanline: [OamSprite::EMPTY; 8],
            sprite_count: 0,
            sprite_shifter_lo: [0; 8],
            sprite_shifter_hi: [0; 8],
            sprite_zero_hit_possible: false,
            sprite_zero_being_rendered: false,
            scanline: 0,
            cycle: 0,
            frame_completed: false,
            do_nmi: false,
            frame: Frame::black(),
            cartridge: None,
        }
    }

    pub fn connect_cartridge(&mut self, cartridge: SharedCartridge) {
        debug!("PPU: connecting cartridge");
        self.cartridge = Some(cartridge);
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn is_frame_completed(&self) -> bool {
        self.frame_completed
    }

    pub fn current_scanline(&self) -> i16 {
        self.scanline
    }

    pub fn current_cycle(&self) -> i16 {
        self.cycle
    }

    pub fn start_new_frame(&mut self) {
        self.frame_completed = false;
    }

    /// True iff the PPU raised an NMI since the last call. Reading
    /// consumes the request.
    pub fn needs_to_do_nmi(&mut self) -> bool {
        if self.do_nmi {
            self.do_nmi = false;
            return true;
        }
        false
    }

    /// OAM write entry point for the DMA engine
    pub fn oam_dma_write(&mut self, address: u8, data: u8) {
        self.oam.write(address, data);
    }

    /// Raw OAM read, for debug inspection
    pub fn oam_read(&self, address: u8) -> u8 {
        self.oam.read(address)
    }

    // CPU-visible register window
    // ---------------------------

    /// Handle a read request from the CPU for the decoded register
    /// `address` (0..=7). When `read_only` is set, reads with side
    /// effects (PPUSTATUS, PPUDATA) leave the PPU state untouched.
    pub fn cpu_read(&mut self, address: u16, read_only: bool) -> u8 {
        match address {
            PPUSTATUS => {
                // The low 5 status bits are leftovers from the last data
                // bus value
                let data = (self.registers.status.bits() & 0xE0)
                    | (self.registers.data_buffer & 0x1F);
                if !read_only {
                    self.registers.set_vertical_blank(false);
                    self.address_latch = false;
                }
                data
            }
            OAMDATA => self.oam.read(self.registers.oam_addr),
            PPUDATA => {
                if read_only {
                    return self.registers.data_buffer;
                }

                // Reads are delayed by one access, except for the palette
                // region which responds immediately
                let mut data = self.registers.data_buffer;
                self.registers.data_buffer = self.ppu_read(self.vram_addr.value());
                if self.vram_addr.value() >= PALETTE_MEMORY_START {
                    data = self.registers.data_buffer;
                }

                self.vram_addr
                    .advance(self.registers.vram_address_increment());
                data
            }
            _ => 0, // write-only registers
        }
    }

    /// Handle a write request from the CPU for the decoded register
    /// `address` (0..=7)
    pub fn cpu_write(&mut self, address: u16, data: u8) {
        match address {
            PPUCTRL => {
                self.registers.ctrl = PpuCtrl::from_bits_truncate(data);
                self.tram_addr.set(
                    RenderAddress::HORIZONTAL_NAMETABLE,
                    self.registers.ctrl.contains(PpuCtrl::NAMETABLE_X) as u16,
                );
                self.tram_addr.set(
                    RenderAddress::VERTICAL_NAMETABLE,
                    self.registers.ctrl.contains(PpuCtrl::NAMETABLE_Y) as u16,
                );
            }
            PPUMASK => {
                self.registers.mask =
                    crate::graphics::ppu_registers::PpuMask::from_bits_truncate(data);
            }
            OAMADDR => self.registers.oam_addr = data,
            OAMDATA => {
                self.oam.write(self.registers.oam_addr, data);
            }
            PPUSCROLL => {
                if !self.address_latch {
                    self.fine_x = data & 0x07;
                    self.tram_addr
                        .set(RenderAddress::COARSE_X_SCROLL, (data >> 3).into());
                    self.address_latch = true;
                } else {
                    self.tram_addr
                        .set(RenderAddress::FINE_Y_SCROLL, (data & 0x07).into());
                    self.tram_addr
                        .set(RenderAddress::COARSE_Y_SCROLL, (data >> 3).into());
                    self.address_latch = false;
                }
            }
            PPUADDR => {
                if !self.address_latch {
                    let value =
                        (((data & 0x3F) as u16) << 8) | (self.tram_addr.value() & 0x00FF);
                    self.tram_addr.set_value(value);
                    self.address_latch = true;
                } else {
                    let value = (self.tram_addr.value() & 0xFF00) | data as u16;
                    self.tram_addr.set_value(value);
                    self.vram_addr = self.tram_addr;
                    self.address_latch = false;
                }
            }
            PPUDATA => {
                self.ppu_write(self.vram_addr.value(), data);
                self.vram_addr
                    .advance(self.registers.vram_address_increment());
            }
            _ => {} // read-only registers
        }
    }

    // PPU address space
    // -----------------

    /// Handle a read request from the PPU memory map. The cartridge gets
    /// priority over the internal pattern/nametable/palette memories.
    pub fn ppu_read(&self, address: u16) -> u8 {
        let address = address & PPU_ADDRESS_MASK;

        if let Some(cartridge) = &self.cartridge {
            if let Some(data) = cartridge.borrow().ppu_read(address) {
                return data;
            }
        }

        match address {
            PATTERN_TABLES_START..=PATTERN_TABLES_END => {
                self.pattern_tables[((address & 0x1000) >> 12) as usize]
                    [(address & 0x0FFF) as usize]
            }
            NAMETABLES_START..=NAMETABLES_MIRRORS_END => {
                let table = self.nametable_index(address);
                self.nametables[table][(address & 0x03FF) as usize]
            }
            PALETTE_MEMORY_START..=PALETTE_MEMORY_MIRRORS_END => {
                self.palette_table[Self::palette_index(address)]
            }
            _ => 0,
        }
    }

    /// Handle a write request to the PPU memory map, with the same
    /// priority rules as `ppu_read`
    pub fn ppu_write(&mut self, address: u16, data: u8) {
        let address = address & PPU_ADDRESS_MASK;

        if let Some(cartridge) = &self.cartridge {
            if cartridge.borrow_mut().ppu_write(address, data) {
                return;
            }
        }

        match address {
            PATTERN_TABLES_START..=PATTERN_TABLES_END => {
                self.pattern_tables[((address & 0x1000) >> 12) as usize]
                    [(address & 0x0FFF) as usize] = data;
            }
            NAMETABLES_START..=NAMETABLES_MIRRORS_END => {
                let table = self.nametable_index(address);
                self.nametables[table][(address & 0x03FF) as usize] = data;
            }
            PALETTE_MEMORY_START..=PALETTE_MEMORY_MIRRORS_END => {
                self.palette_table[Self::palette_index(address)] = data;
            }
            _ => {}
        }
    }

    // The four 1 kB nametable quadrants alias onto two physical tables;
    // the cartridge wiring decides how
    fn nametable_index(&self, address: u16) -> usize {
        let mirroring = self
            .cartridge
            .as_ref()
            .map(|cartridge| cartridge.borrow().mirroring_mode())
            .unwrap_or(Mirroring::Horizontal);

        let quadrant = ((address & 0x0FFF) >> 10) as usize;
        let map = match mirroring {
            Mirroring::Vertical => [0, 1, 0, 1],
            Mirroring::Horizontal => [0, 0, 1, 1],
            Mirroring::OneScreenLo => [0, 0, 0, 0],
            Mirroring::OneScreenHi => [1, 1, 1, 1],
        };
        map[quadrant]
    }

    // Palette offsets $10/$14/$18/$1C alias their background entries
    fn palette_index(address: u16) -> usize {
        let address = address & 0x001F;
        match address {
            0x0010 | 0x0014 | 0x0018 | 0x001C => (address & !0x0010) as usize,
            _ => address as usize,
        }
    }

    /// Retrieve a color from the palette. For more info refer to:
    /// https://www.nesdev.org/wiki/PPU_palettes
    fn color_from_palette(&self, palette: u8, pixel: u8) -> u32 {
        let data =
            self.ppu_read(PALETTE_MEMORY_START + ((palette as u16) << 2) + pixel as u16);
        Palette::decode_pixel(data)
    }

    // Per-cycle state machine
    // -----------------------

    /// Perform one PPU tick
    pub fn clock(&mut self) {
        let mut actions = [None; 3];
        self.next_actions(&mut actions);

        for action in actions.into_iter().flatten() {
            match action {
                PpuAction::PrerenderClear => self.do_prerender_clear(),
                PpuAction::PrerenderTransferY => self.do_prerender_transfer_y(),
                PpuAction::RenderSkipOdd => self.do_render_skip_odd(),
                PpuAction::RenderProcessNextTile => self.do_render_process_next_tile(),
                PpuAction::RenderIncrementScrollY => self.do_render_increment_scroll_y(),
                PpuAction::RenderLoadShiftersAndTransferX => {
                    self.do_render_load_shifters_and_transfer_x()
                }
                PpuAction::RenderLoadNextBackgroundTile => {
                    self.do_render_load_next_background_tile()
                }
                PpuAction::RenderOamTransfer => self.do_render_oam_transfer(),
                PpuAction::RenderUpdateSprites => self.do_render_update_sprites(),
                PpuAction::RenderEndFrame => self.do_render_end_frame(),
            }
        }

        let (pixel, palette) = self.current_pixel_to_render();

        let x = self.cycle - 1;
        let y = self.scanline;
        if x >= 0 && x < SCREEN_WIDTH as i16 && y >= 0 && y < SCREEN_HEIGHT as i16 {
            let color = self.color_from_palette(palette, pixel);
            self.frame.set_pixel(
                color,
                FramePixel {
                    row: y as usize,
                    col: x as usize,
                },
            );
        }

        self.cycle += 1;
        if self.cycle >= 341 {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline >= 261 {
                self.scanline = -1;
                self.frame_completed = true;
            }
        }
    }

    fn next_actions(&self, actions: &mut [Option<PpuAction>; 3]) {
        let mut index = 0;
        let mut push = |action| {
            actions[index] = Some(action);
            index += 1;
        };

        let is_prerender_scanline = self.scanline == -1;
        if is_prerender_scanline {
            if self.cycle == 1 {
                push(PpuAction::PrerenderClear);
            } else if (280..305).contains(&self.cycle) {
                push(PpuAction::PrerenderTransferY);
            }
        }

        if self.scanline == 0 && self.cycle == 0 {
            push(PpuAction::RenderSkipOdd);
        }

        let is_render_scanline = self.scanline >= -1 && self.scanline < 240;
        if is_render_scanline {
            if (2..258).contains(&self.cycle) || (321..338).contains(&self.cycle) {
                push(PpuAction::RenderProcessNextTile);
            }
            if self.cycle == 256 {
                push(PpuAction::RenderIncrementScrollY);
            }
            if self.cycle == 257 {
                push(PpuAction::RenderLoadShiftersAndTransferX);
            }
            if self.cycle == 338 || self.cycle == 340 {
                push(PpuAction::RenderLoadNextBackgroundTile);
            }
            if self.cycle == 257 && self.scanline >= 0 {
                push(PpuAction::RenderOamTransfer);
            }
            if self.cycle == 340 {
                push(PpuAction::RenderUpdateSprites);
            }
        }

        if self.scanline == 241 && self.cycle == 1 {
            push(PpuAction::RenderEndFrame);
        }
    }

    fn do_prerender_clear(&mut self) {
        self.registers.set_vertical_blank(false);
        self.registers.set_sprite_overflow(false);
        self.registers.set_sprite_zero_hit(false);

        self.sprite_shifter_lo = [0; 8];
        self.sprite_shifter_hi = [0; 8];
    }

    fn do_prerender_transfer_y(&mut self) {
        if self.registers.rendering_enabled() {
            self.vram_addr.transfer_y(&self.tram_addr);
        }
    }

    // Hook for the odd-frame cycle skip. Left empty: skipping scanline 0
    // cycle 0 on odd frames only matters to a handful of timing demos.
    fn do_render_skip_odd(&mut self) {}

    fn do_render_process_next_tile(&mut self) {
        self.update_shifters();

        match (self.cycle - 1) % 8 {
            0 => {
                self.load_background_shifters();
                self.next_tile.id = self.ppu_read(self.vram_addr.tile_address());
            }
            2 => {
                // Collapse the attribute byte down to the 2-bit group
                // covering the current tile quadrant
                let mut attribute = self.ppu_read(self.vram_addr.attribute_address());
                if self.vram_addr.get(RenderAddress::COARSE_Y_SCROLL) & 0x02 != 0 {
                    attribute >>= 4;
                }
                if self.vram_addr.get(RenderAddress::COARSE_X_SCROLL) & 0x02 != 0 {
                    attribute >>= 2;
                }
                self.next_tile.attribute = attribute & 0x03;
            }
            4 => {
                self.next_tile.lsb = self.ppu_read(self.background_pattern_address());
            }
            6 => {
                self.next_tile.msb = self.ppu_read(self.background_pattern_address() + 8);
            }
            7 => {
                if self.registers.rendering_enabled() {
                    self.vram_addr.increment_x();
                }
            }
            _ => {}
        }
    }

    fn background_pattern_address(&self) -> u16 {
        (self.registers.background_pattern_table() << 12)
            + ((self.next_tile.id as u16) << 4)
            + self.vram_addr.get(RenderAddress::FINE_Y_SCROLL)
    }

    fn do_render_increment_scroll_y(&mut self) {
        if self.registers.rendering_enabled() {
            self.vram_addr.increment_y();
        }
    }

    fn do_render_load_shifters_and_transfer_x(&mut self) {
        self.load_background_shifters();
        if self.registers.rendering_enabled() {
            self.vram_addr.transfer_x(&self.tram_addr);
        }
    }

    // Superfluous nametable fetch at the end of the scanline
    fn do_render_load_next_background_tile(&mut self) {
        self.next_tile.id = self.ppu_read(self.vram_addr.tile_address());
    }

    fn do_render_oam_transfer(&mut self) {
        self.sprite_scanline = [OamSprite::EMPTY; 8];
        self.sprite_count = 0;
        self.sprite_zero_hit_possible = false;

        let sprite_size = self.registers.sprite_size();
        let mut overflow = false;
        for entry in 0..64 {
            let sprite = self.oam.read_sprite(entry);
            let row = self.scanline - sprite.y as i16;
            if (0..sprite_size).contains(&row) {
                if self.sprite_count < 8 {
                    if entry == 0 {
                        self.sprite_zero_hit_possible = true;
                    }
                    self.sprite_scanline[self.sprite_count as usize] = sprite;
                    self.sprite_count += 1;
                } else {
                    // a ninth in-range sprite sets the overflow flag
                    overflow = true;
                    break;
                }
            }
        }
        self.registers.set_sprite_overflow(overflow);
    }

    fn do_render_update_sprites(&mut self) {
        for i in 0..self.sprite_count as usize {
            let sprite = self.sprite_scanline[i];
            let row = self.scanline - sprite.y as i16;

            // Only the low bit-plane address is needed, the high plane is
            // always offset by 8
            let pattern_addr_lo = if self.registers.sprite_size() == 8 {
                let fine_y = if sprite.flipped_vertically() {
                    7 - row
                } else {
                    row
                };
                (self.registers.sprite_pattern_table() << 12)
                    | ((sprite.id as u16) << 4)
                    | fine_y as u16
            } else {
                // 8x16 mode: the pattern table comes from bit 0 of the id
                // and the two tiles alternate by row half
                let fine_y = if sprite.flipped_vertically() {
                    7 - (row & 0x07)
                } else {
                    row & 0x07
                };
                let top_half = row < 8;
                let tile = if top_half != sprite.flipped_vertically() {
                    sprite.id & 0xFE
                } else {
                    (sprite.id & 0xFE) + 1
                };
                (((sprite.id & 0x01) as u16) << 12) | ((tile as u16) << 4) | fine_y as u16
            };

            let mut pattern_lo = self.ppu_read(pattern_addr_lo);
            let mut pattern_hi = self.ppu_read(pattern_addr_lo + 8);

            if sprite.flipped_horizontally() {
                pattern_lo = utils::reverse_byte(pattern_lo);
                pattern_hi = utils::reverse_byte(pattern_hi);
            }

            self.sprite_shifter_lo[i] = pattern_lo;
            self.sprite_shifter_hi[i] = pattern_hi;
        }
    }

    fn do_render_end_frame(&mut self) {
        self.registers.set_vertical_blank(true);
        if self.registers.nmi_enabled() {
            self.do_nmi = true;
        }
    }

    // Shifters
    // --------

    fn load_background_shifters(&mut self) {
        self.shifters.pattern_lo =
            (self.shifters.pattern_lo & 0xFF00) | self.next_tile.lsb as u16;
        self.shifters.pattern_hi =
            (self.shifters.pattern_hi & 0xFF00) | self.next_tile.msb as u16;

        // Attribute bits inflate to a full byte so they shift in lockstep
        // with the pattern bits
        let attribute_lo = if self.next_tile.attribute & 0b01 != 0 {
            0xFF
        } else {
            0x00
        };
        self.shifters.attribute_lo = (self.shifters.attribute_lo & 0xFF00) | attribute_lo;

        let attribute_hi = if self.next_tile.attribute & 0b10 != 0 {
            0xFF
        } else {
            0x00
        };
        self.shifters.attribute_hi = (self.shifters.attribute_hi & 0xFF00) | attribute_hi;
    }

    fn update_shifters(&mut self) {
        if self.registers.background_rendering_enabled() {
            self.shifters.pattern_lo <<= 1;
            self.shifters.pattern_hi <<= 1;
            self.shifters.attribute_lo <<= 1;
            self.shifters.attribute_hi <<= 1;
        }

        if self.registers.sprite_rendering_enabled() && self.cycle >= 0 && self.cycle < 258 {
            for i in 0..self.sprite_count as usize {
                if self.sprite_scanline[i].x > 0 {
                    self.sprite_scanline[i].x -= 1;
                } else {
                    self.sprite_shifter_lo[i] <<= 1;
                    self.sprite_shifter_hi[i] <<= 1;
                }
            }
        }
    }

    // Pixel composition
    // -----------------

    fn current_pixel_to_render(&mut self) -> (u8, u8) {
        let mut bg_pixel = 0x00;
        let mut bg_palette = 0x00;
        if self.registers.background_rendering_enabled() {
            let mux: u16 = 0x8000 >> self.fine_x;

            let pixel_lo = (self.shifters.pattern_lo & mux > 0) as u8;
            let pixel_hi = (self.shifters.pattern_hi & mux > 0) as u8;
            bg_pixel = (pixel_hi << 1) | pixel_lo;

            let palette_lo = (self.shifters.attribute_lo & mux > 0) as u8;
            let palette_hi = (self.shifters.attribute_hi & mux > 0) as u8;
            bg_palette = (palette_hi << 1) | palette_lo;
        }

        let mut fg_pixel = 0x00;
        let mut fg_palette = 0x00;
        let mut fg_priority = false;
        if self.registers.sprite_rendering_enabled() {
            self.sprite_zero_being_rendered = false;
            for i in 0..self.sprite_count as usize {
                let sprite = &self.sprite_scanline[i];
                if sprite.x != 0 {
                    continue;
                }

                let pixel_lo = (self.sprite_shifter_lo[i] & 0x80 > 0) as u8;
                let pixel_hi = (self.sprite_shifter_hi[i] & 0x80 > 0) as u8;
                fg_pixel = (pixel_hi << 1) | pixel_lo;

                fg_palette = sprite.palette();
                fg_priority = sprite.in_front_of_background();

                // first opaque sprite pixel wins
                if fg_pixel != 0 {
                    if i == 0 {
                        self.sprite_zero_being_rendered = true;
                    }
                    break;
                }
            }
        }

        if bg_pixel == 0 && fg_pixel == 0 {
            // universal background color
            (0, 0)
        } else if bg_pixel == 0 {
            (fg_pixel, fg_palette)
        } else if fg_pixel == 0 {
            (bg_pixel, bg_palette)
        } else {
            self.detect_sprite_zero_hit();
            if fg_priority {
                (fg_pixel, fg_palette)
            } else {
                (bg_pixel, bg_palette)
            }
        }
    }

    // Both pixels are opaque here; flag a sprite 0 collision if sprite 0
    // is the rendered candidate and both pipelines are on
    fn detect_sprite_zero_hit(&mut self) {
        if !(self.sprite_zero_hit_possible && self.sprite_zero_being_rendered) {
            return;
        }
        if !(self.registers.background_rendering_enabled()
            && self.registers.sprite_rendering_enabled())
        {
            return;
        }

        // The left edge of the screen has specific switches to control
        // its appearance. This is used to smooth inconsistencies when
        // scrolling (since sprites x coord must be >= 0)
        let first_cycle = if self.registers.left_column_rendering_enabled() {
            1
        } else {
            9
        };
        if self.cycle >= first_cycle && self.cycle < 258 {
            self.registers.set_sprite_zero_hit(true);
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::cartridge::Cartridge;

    fn test_cartridge(flags6: u8) -> SharedCartridge {
        let mut image = Vec::new();
        image.extend_from_slice(&[0x4E, 0x45, 0x53, 0x1A]);
        image.push(1); // PRG banks
        image.push(1); // CHR banks
        image.push(flags6);
        image.extend_from_slice(&[0; 9]);
        image.extend_from_slice(&vec![0; 16 * 1024]);
        image.extend_from_slice(&vec![0; 8 * 1024]);

        Rc::new(RefCell::new(Cartridge::from_bytes(&image).unwrap()))
    }

    fn clock_until(ppu: &mut Ppu, scanline: i16, cycle: i16) {
        while !(ppu.scanline == scanline && ppu.cycle == cycle) {
            ppu.clock();
        }
    }

    #[test]
    fn test_status_read_clears_vertical_blank_and_latch() {
        let mut ppu = Ppu::new();
        ppu.registers.set_vertical_blank(true);
        ppu.address_latch = true;

        let status = ppu.cpu_read(PPUSTATUS, false);
        assert_eq!(status & 0x80, 0x80);
        assert!(!ppu.address_latch);

        // vblank was consumed by the first read
        let status = ppu.cpu_read(PPUSTATUS, false);
        assert_eq!(status & 0x80, 0x00);
    }

    #[test]
    fn test_status_read_only_preserves_state() {
        let mut ppu = Ppu::new();
        ppu.registers.set_vertical_blank(true);
        ppu.address_latch = true;

        let status = ppu.cpu_read(PPUSTATUS, true);
        assert_eq!(status & 0x80, 0x80);
        assert!(ppu.address_latch);
        assert_eq!(ppu.cpu_read(PPUSTATUS, true) & 0x80, 0x80);
    }

    #[test]
    fn test_ctrl_write_mirrors_nametable_bits() {
        let mut ppu = Ppu::new();

        ppu.cpu_write(PPUCTRL, 0b0000_0011);
        assert_eq!(ppu.tram_addr.get(RenderAddress::HORIZONTAL_NAMETABLE), 1);
        assert_eq!(ppu.tram_addr.get(RenderAddress::VERTICAL_NAMETABLE), 1);

        ppu.cpu_write(PPUCTRL, 0b0000_0000);
        assert_eq!(ppu.tram_addr.get(RenderAddress::HORIZONTAL_NAMETABLE), 0);
        assert_eq!(ppu.tram_addr.get(RenderAddress::VERTICAL_NAMETABLE), 0);
    }

    #[test]
    fn test_scroll_double_write() {
        let mut ppu = Ppu::new();

        ppu.cpu_write(PPUSCROLL, 0b0101_1110); // X = coarse 11, fine 6
        assert_eq!(ppu.fine_x, 6);
        assert_eq!(ppu.tram_addr.get(RenderAddress::COARSE_X_SCROLL), 11);

        ppu.cpu_write(PPUSCROLL, 0b1001_0011); // Y = coarse 18, fine 3
        assert_eq!(ppu.tram_addr.get(RenderAddress::FINE_Y_SCROLL), 3);
        assert_eq!(ppu.tram_addr.get(RenderAddress::COARSE_Y_SCROLL), 18);
        assert!(!ppu.address_latch);
    }

    #[test]
    fn test_ppuaddr_double_write_transfers_to_vram_address() {
        let mut ppu = Ppu::new();

        ppu.cpu_write(PPUADDR, 0x23);
        assert_eq!(ppu.vram_addr.value(), 0x0000);

        ppu.cpu_write(PPUADDR, 0xC5);
        assert_eq!(ppu.vram_addr.value(), 0x23C5);
        assert_eq!(ppu.tram_addr.value(), 0x23C5);
    }

    #[test]
    fn test_ppuaddr_high_write_masks_to_six_bits() {
        let mut ppu = Ppu::new();

        ppu.cpu_write(PPUADDR, 0xFF);
        ppu.cpu_write(PPUADDR, 0xFF);
        assert_eq!(ppu.vram_addr.value(), 0x3FFF);
    }

    #[test]
    fn test_ppudata_read_is_buffered() {
        let mut ppu = Ppu::new();
        ppu.pattern_tables[0][0x123] = 0xAB;

        ppu.cpu_write(PPUADDR, 0x01);
        ppu.cpu_write(PPUADDR, 0x23);

        // first read returns the stale buffer, second the actual byte
        ppu.cpu_read(PPUDATA, false);
        ppu.cpu_write(PPUADDR, 0x01);
        ppu.cpu_write(PPUADDR, 0x23);
        assert_eq!(ppu.cpu_read(PPUDATA, false), 0xAB);
    }

    #[test]
    fn test_ppudata_palette_read_is_immediate() {
        let mut ppu = Ppu::new();
        ppu.palette_table[0] = 0x2A;

        ppu.cpu_write(PPUADDR, 0x3F);
        ppu.cpu_write(PPUADDR, 0x00);
        assert_eq!(ppu.cpu_read(PPUDATA, false), 0x2A);
    }

    #[test]
    fn test_ppudata_increment_mode() {
        let mut ppu = Ppu::new();

        ppu.cpu_write(PPUADDR, 0x20);
        ppu.cpu_write(PPUADDR, 0x00);
        ppu.cpu_read(PPUDATA, false);
        assert_eq!(ppu.vram_addr.value(), 0x2001);

        ppu.cpu_write(PPUCTRL, 0b0000_0100); // increment by 32
        ppu.cpu_write(PPUADDR, 0x20);
        ppu.cpu_write(PPUADDR, 0x00);
        ppu.cpu_read(PPUDATA, false);
        assert_eq!(ppu.vram_addr.value(), 0x2020);
    }

    #[test]
    fn test_oam_address_and_data() {
        let mut ppu = Ppu::new();

        ppu.cpu_write(OAMADDR, 0x10);
        ppu.cpu_write(OAMDATA, 0x42);
        assert_eq!(ppu.cpu_read(OAMDATA, false), 0x42);
        assert_eq!(ppu.oam.read(0x10), 0x42);
    }

    #[test]
    fn test_palette_mirror_aliases() {
        let mut ppu = Ppu::new();

        ppu.ppu_write(0x3F10, 0x15);
        assert_eq!(ppu.ppu_read(0x3F00), 0x15);
        assert_eq!(ppu.ppu_read(0x3F10), 0x15);

        ppu.ppu_write(0x3F04, 0x16);
        assert_eq!(ppu.ppu_read(0x3F14), 0x16);
    }

    #[test]
    fn test_nametable_mirroring_vertical() {
        let mut ppu = Ppu::new();
        ppu.connect_cartridge(test_cartridge(0b0000_0001)); // vertical

        ppu.ppu_write(0x2000, 0x11);
        assert_eq!(ppu.ppu_read(0x2800), 0x11);
        assert_ne!(ppu.ppu_read(0x2400), 0x11);

        ppu.ppu_write(0x2400, 0x22);
        assert_eq!(ppu.ppu_read(0x2C00), 0x22);
    }

    #[test]
    fn test_nametable_mirroring_horizontal() {
        let mut ppu = Ppu::new();
        ppu.connect_cartridge(test_cartridge(0b0000_0000)); // horizontal

        ppu.ppu_write(0x2000, 0x11);
        assert_eq!(ppu.ppu_read(0x2400), 0x11);
        assert_ne!(ppu.ppu_read(0x2800), 0x11);

        ppu.ppu_write(0x2800, 0x22);
        assert_eq!(ppu.ppu_read(0x2C00), 0x22);
    }

    #[test]
    fn test_vertical_blank_raises_nmi_when_enabled() {
        let mut ppu = Ppu::new();
        ppu.cpu_write(PPUCTRL, 0x80);

        clock_until(&mut ppu, 241, 1);
        assert!(!ppu.needs_to_do_nmi());
        ppu.clock();

        assert_ne!(ppu.registers.status.bits() & 0x80, 0);
        assert!(ppu.needs_to_do_nmi());
        // the request is consumed
        assert!(!ppu.needs_to_do_nmi());
    }

    #[test]
    fn test_vertical_blank_without_nmi_enable() {
        let mut ppu = Ppu::new();

        clock_until(&mut ppu, 241, 1);
        ppu.clock();

        assert_ne!(ppu.registers.status.bits() & 0x80, 0);
        assert!(!ppu.needs_to_do_nmi());
    }

    #[test]
    fn test_prerender_clears_status_flags() {
        let mut ppu = Ppu::new();
        clock_until(&mut ppu, 241, 1);
        ppu.clock();
        assert_ne!(ppu.registers.status.bits() & 0x80, 0);

        clock_until(&mut ppu, -1, 1);
        ppu.clock();
        assert_eq!(ppu.registers.status.bits() & 0xE0, 0);
    }

    #[test]
    fn test_frame_completes_after_all_scanlines() {
        let mut ppu = Ppu::new();

        // scanlines 0..=260 of 341 cycles each close out the first frame
        for _ in 0..341 * 261 {
            assert!(!ppu.is_frame_completed());
            ppu.clock();
        }
        assert!(ppu.is_frame_completed());

        ppu.start_new_frame();
        assert!(!ppu.is_frame_completed());
        assert_eq!(ppu.scanline, -1);
        assert_eq!(ppu.cycle, 0);
    }

    #[test]
    fn test_scanline_and_cycle_stay_in_range() {
        let mut ppu = Ppu::new();

        for _ in 0..341 * 262 + 17 {
            ppu.clock();
            assert!((-1..=260).contains(&ppu.scanline));
            assert!((0..=340).contains(&ppu.cycle));
        }
    }

    #[test]
    fn test_oam_evaluation_collects_sprites_in_range() {
        let mut ppu = Ppu::new();
        // sprite 0 on scanline 10, sprite 1 far away
        ppu.oam.write(0, 10);
        ppu.oam.write(4, 200);

        ppu.scanline = 10;
        ppu.do_render_oam_transfer();

        assert_eq!(ppu.sprite_count, 1);
        assert!(ppu.sprite_zero_hit_possible);
    }

    #[test]
    fn test_oam_evaluation_sets_overflow_on_ninth_sprite() {
        let mut ppu = Ppu::new();
        for sprite in 0..9 {
            ppu.oam.write(sprite * 4, 10);
        }

        ppu.scanline = 10;
        ppu.do_render_oam_transfer();

        assert_eq!(ppu.sprite_count, 8);
        assert_ne!(ppu.registers.status.bits() & 0x20, 0);
    }

    #[test]
    fn test_oam_evaluation_respects_sprite_size() {
        let mut ppu = Ppu::new();
        ppu.oam.write(0, 10);

        // row 10 is outside an 8-pixel tall sprite
        ppu.scanline = 20;
        ppu.do_render_oam_transfer();
        assert_eq!(ppu.sprite_count, 0);

        // but inside a 16-pixel one
        ppu.cpu_write(PPUCTRL, 0b0010_0000);
        ppu.do_render_oam_transfer();
        assert_eq!(ppu.sprite_count, 1);
    }
}
