use famicore::{Cartridge, CartridgeError, Mirroring, Nes};

fn ines_image(prg_banks: u8, chr_banks: u8, flags6: u8) -> Vec<u8> {
    let mut image = Vec::new();
    image.extend_from_slice(&[0x4E, 0x45, 0x53, 0x1A]);
    image.push(prg_banks);
    image.push(chr_banks);
    image.push(flags6);
    image.extend_from_slice(&[0; 9]);
    image.extend_from_slice(&vec![0; prg_banks as usize * 16 * 1024]);
    image.extend_from_slice(&vec![0; chr_banks as usize * 8 * 1024]);
    image
}

#[test]
fn test_load_cartridge_from_bytes() {
    let cartridge = Cartridge::from_bytes(&ines_image(1, 1, 0x01)).unwrap();
    assert_eq!(cartridge.mirroring_mode(), Mirroring::Vertical);
}

#[test]
fn test_load_rejects_bad_magic() {
    let mut image = ines_image(1, 1, 0);
    image[0] = b'X';

    assert!(matches!(
        Cartridge::from_bytes(&image),
        Err(CartridgeError::InvalidHeader { .. })
    ));
}

#[test]
fn test_load_rejects_unsupported_mapper() {
    // mapper 4 in the low nibble of flags 6
    let image = ines_image(1, 1, 0x40);

    assert!(matches!(
        Cartridge::from_bytes(&image),
        Err(CartridgeError::MapperNotSupported(4))
    ));
}

#[test]
fn test_load_rejects_trailing_data() {
    let mut image = ines_image(1, 1, 0);
    image.push(0xFF);

    assert!(matches!(
        Cartridge::from_bytes(&image),
        Err(CartridgeError::TrailingData)
    ));
}

#[test]
fn test_load_skips_trainer() {
    let mut image = ines_image(1, 1, 0);
    // splice a 512-byte trainer between header and PRG, with the flag set
    image[6] |= 0x04;
    let trainer = vec![0xAB; 512];
    image.splice(16..16, trainer);

    assert!(Cartridge::from_bytes(&image).is_ok());
}

#[test]
fn test_missing_file_is_reported() {
    assert!(matches!(
        Cartridge::from_file("/definitely/not/a/game.nes"),
        Err(CartridgeError::FileNotFound(_))
    ));
}

#[test]
fn test_console_runs_a_frame_from_a_loaded_cartridge() {
    let mut image = ines_image(1, 1, 0);
    // infinite JMP $8000 loop plus a reset vector pointing at it
    let prg_start = 16;
    image[prg_start] = 0x4C;
    image[prg_start + 1] = 0x00;
    image[prg_start + 2] = 0x80;
    image[prg_start + 0x3FFC] = 0x00;
    image[prg_start + 0x3FFD] = 0x80;

    let cartridge = Cartridge::from_bytes(&image).unwrap();
    let mut nes = Nes::new();
    assert!(!nes.is_cartridge_loaded());
    nes.insert_cartridge(cartridge);
    assert!(nes.is_cartridge_loaded());

    nes.do_frame();
    assert_eq!(nes.frame().as_slice().len(), 256 * 240);
    assert!(nes.system_clock_counter() > 0);
}
