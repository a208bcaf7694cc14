//! Memory bank controllers: the cartridge hardware that watches writes aimed
//! at the ROM address range and swaps cartridge banks into the switchable
//! window in response.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mem::{MEM_SIZE, ROM_BANK_SIZE, SWITCHABLE_ROM_START};

/// Writes in this range select a ROM bank.
const BANK_SELECT_START: u16 = 0x2000;
const BANK_SELECT_END: u16 = 0x3FFF;

/// The set of supported controllers is closed: the cartridge header names
/// one, and every unrecognized type byte gets the no-op controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryBankController {
    /// Ignores all writes. Installed before any cartridge is loaded and for
    /// cartridges without a supported banking chip.
    None,
    /// The first-generation banking chip: 16 KiB ROM banks selected by the
    /// low five bits of a write into 0x2000-0x3FFF.
    Mbc1,
}

impl MemoryBankController {
    /// Selects the controller for the cartridge-type byte at 0x147.
    pub fn from_header(cartridge_type: u8) -> Self {
        match cartridge_type {
            // The +RAM and +RAM+BATTERY variants bank ROM the same way.
            0x01..=0x03 => MemoryBankController::Mbc1,
            _ => MemoryBankController::None,
        }
    }

    /// Handles a write aimed at the ROM address range. The write never lands
    /// in `memory` as data; at most it swaps a bank into the switchable
    /// window.
    pub(crate) fn capture_write(
        &mut self,
        addr: u16,
        value: u8,
        cart: &[u8],
        memory: &mut [u8; MEM_SIZE],
    ) {
        match self {
            MemoryBankController::None => {}
            MemoryBankController::Mbc1 => mbc1_write(addr, value, cart, memory),
        }
    }
}

fn mbc1_write(addr: u16, value: u8, cart: &[u8], memory: &mut [u8; MEM_SIZE]) {
    if !(BANK_SELECT_START..=BANK_SELECT_END).contains(&addr) {
        return;
    }
    let mut bank = (value & 0x1F) as usize;
    // Bank 0 is permanently resident in the fixed window; selecting it
    // yields bank 1.
    if bank == 0 {
        bank = 1;
    }
    let src = bank * ROM_BANK_SIZE;
    if src >= cart.len() {
        warn!("bank 0x{bank:0>2X} lies beyond the {} byte cartridge image", cart.len());
        return;
    }
    let len = ROM_BANK_SIZE.min(cart.len() - src);
    let dest = SWITCHABLE_ROM_START as usize;
    memory[dest..dest + len].copy_from_slice(&cart[src..src + len]);
    debug!("switched bank 0x{bank:0>2X} into the 0x4000 window");
}
