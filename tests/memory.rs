use std::path::PathBuf;

use wisp::mem::{CartridgeError, Mmu, MAX_CARTRIDGE_SIZE, ROM_BANK_SIZE};

fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("wisp-{}-{name}", std::process::id()));
    path
}

/// A four-bank cartridge with the given header type byte. Every byte of bank
/// `n` holds `n`, except the header byte.
fn banked_cart(cartridge_type: u8) -> Vec<u8> {
    let mut cart = Vec::with_capacity(4 * ROM_BANK_SIZE);
    for bank in 0u8..4 {
        cart.extend(std::iter::repeat(bank).take(ROM_BANK_SIZE));
    }
    cart[0x147] = cartridge_type;
    cart
}

#[test]
fn echo_ram_mirrors_writes_both_ways() {
    let mut mmu = Mmu::new();
    mmu.set_byte(0xC010, 0x42);
    assert_eq!(mmu.get_byte(0xC010), 0x42);
    assert_eq!(mmu.get_byte(0xE010), 0x42);

    mmu.set_byte(0xE020, 0x77);
    assert_eq!(mmu.get_byte(0xC020), 0x77);

    // Neighbors are untouched.
    assert_eq!(mmu.get_byte(0xE00F), 0x00);
    assert_eq!(mmu.get_byte(0xE011), 0x00);
}

#[test]
fn working_ram_above_the_echo_window_does_not_mirror() {
    let mut mmu = Mmu::new();
    // 0xDE00 + 0x2000 would be object-attribute memory.
    mmu.set_byte(0xDE00, 0x99);
    assert_eq!(mmu.get_byte(0xDE00), 0x99);
    assert_eq!(mmu.get_byte(0xFE00), 0x00);
}

#[test]
fn mirroring_is_write_only() {
    let mut mmu = Mmu::new();
    // A direct double-width store skips the mirror path.
    mmu.set_double(0xC030, 0x1234);
    assert_eq!(mmu.get_byte(0xC030), 0x34);
    assert_eq!(mmu.get_byte(0xE030), 0x00);
}

#[test_log::test]
fn bank_switch_fills_the_switchable_window() {
    let mut mmu = Mmu::new();
    mmu.load_image(banked_cart(0x01)).unwrap();
    assert_eq!(mmu.get_byte(0x0000), 0x00);
    assert_eq!(mmu.get_byte(0x4000), 0x01);

    mmu.set_byte(0x2000, 0x02);
    assert_eq!(mmu.get_byte(0x4000), 0x02);
    assert_eq!(mmu.get_byte(0x7FFF), 0x02);
    // The fixed window is untouched.
    assert_eq!(mmu.get_byte(0x0000), 0x00);
    assert_eq!(mmu.get_byte(0x3FFF), 0x00);
}

#[test]
fn bank_switch_is_consistent_across_switches() {
    let mut mmu = Mmu::new();
    mmu.load_image(banked_cart(0x03)).unwrap();
    mmu.set_byte(0x2000, 0x02);
    assert_eq!(mmu.get_byte(0x4000), 0x02);
    mmu.set_byte(0x3FFF, 0x03);
    assert_eq!(mmu.get_byte(0x4000), 0x03);
    mmu.set_byte(0x2000, 0x02);
    assert_eq!(mmu.get_byte(0x4000), 0x02);
}

#[test]
fn bank_zero_select_lands_on_bank_one() {
    let mut mmu = Mmu::new();
    mmu.load_image(banked_cart(0x01)).unwrap();
    mmu.set_byte(0x2000, 0x03);
    assert_eq!(mmu.get_byte(0x4000), 0x03);
    mmu.set_byte(0x2000, 0x00);
    assert_eq!(mmu.get_byte(0x4000), 0x01);
}

#[test]
fn bank_select_uses_the_low_five_bits() {
    let mut mmu = Mmu::new();
    mmu.load_image(banked_cart(0x01)).unwrap();
    // 0x62 & 0x1F == 0x02
    mmu.set_byte(0x2000, 0x62);
    assert_eq!(mmu.get_byte(0x4000), 0x02);
}

#[test_log::test]
fn out_of_range_bank_select_is_tolerated() {
    let mut mmu = Mmu::new();
    mmu.load_image(banked_cart(0x01)).unwrap();
    mmu.set_byte(0x2000, 0x1F);
    // Nothing to copy; the window keeps its previous bank.
    assert_eq!(mmu.get_byte(0x4000), 0x01);
}

#[test]
fn unbanked_cartridges_ignore_rom_writes() {
    let mut mmu = Mmu::new();
    mmu.load_image(banked_cart(0x00)).unwrap();
    mmu.set_byte(0x2000, 0x02);
    assert_eq!(mmu.get_byte(0x4000), 0x01);
    // ROM never takes a write as data.
    mmu.set_byte(0x1000, 0xAA);
    assert_eq!(mmu.get_byte(0x1000), 0x00);
}

#[test]
fn rom_writes_before_any_load_are_defined() {
    let mut mmu = Mmu::new();
    mmu.set_byte(0x0000, 0xAA);
    mmu.set_byte(0x2000, 0x02);
    mmu.set_byte(0x7FFF, 0xAA);
    assert_eq!(mmu.get_byte(0x0000), 0x00);
    assert_eq!(mmu.get_byte(0x4000), 0x00);
}

#[test_log::test]
fn missing_cartridge_leaves_memory_zeroed() {
    let mut mmu = Mmu::new();
    let path = temp_path("missing.gb");
    let err = mmu.load_from_file(&path).unwrap_err();
    assert!(matches!(err, CartridgeError::Missing { .. }));
    for addr in [0x0000, 0x0147, 0x4000, 0x7FFF] {
        assert_eq!(mmu.get_byte(addr), 0x00);
    }
}

#[test]
fn oversized_cartridge_is_rejected_before_reading() {
    let path = temp_path("oversized.gb");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(MAX_CARTRIDGE_SIZE + 1).unwrap();
    drop(file);

    let mut mmu = Mmu::new();
    let err = mmu.load_from_file(&path).unwrap_err();
    assert!(matches!(err, CartridgeError::Oversized { .. }));
    assert_eq!(mmu.get_byte(0x0000), 0x00);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn loading_from_a_file_round_trips() {
    let path = temp_path("round-trip.gb");
    std::fs::write(&path, banked_cart(0x01)).unwrap();

    let mut mmu = Mmu::new();
    mmu.load_from_file(&path).unwrap();
    assert_eq!(mmu.get_byte(0x0147), 0x01);
    assert_eq!(mmu.get_byte(0x4000), 0x01);
    mmu.set_byte(0x2000, 0x03);
    assert_eq!(mmu.get_byte(0x4000), 0x03);

    let _ = std::fs::remove_file(&path);
}
