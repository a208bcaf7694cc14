//! The memory subsystem: one flat 64 KiB address space, the cartridge image
//! behind it, and the bank controller that intercepts ROM-range writes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use tracing::{error, trace};

use crate::mbc::MemoryBankController;

/// The full addressable space.
pub const MEM_SIZE: usize = 0x10000;

/// Cap on the cartridge image, 8 MiB.
pub const MAX_CARTRIDGE_SIZE: u64 = 0x0080_0000;

/// The size of one ROM bank, 16 KiB.
pub const ROM_BANK_SIZE: usize = 0x4000;

pub const FIXED_ROM_START: u16 = 0x0000;
pub const FIXED_ROM_END: u16 = 0x3FFF;
pub const SWITCHABLE_ROM_START: u16 = 0x4000;
pub const SWITCHABLE_ROM_END: u16 = 0x7FFF;
pub const VRAM_START: u16 = 0x8000;
pub const VRAM_END: u16 = 0x9FFF;
pub const EXTERNAL_RAM_START: u16 = 0xA000;
pub const EXTERNAL_RAM_END: u16 = 0xBFFF;
pub const WRAM_START: u16 = 0xC000;
pub const WRAM_END: u16 = 0xDFFF;
pub const ECHO_START: u16 = 0xE000;
pub const ECHO_END: u16 = 0xFDFF;
pub const OAM_START: u16 = 0xFE00;
pub const OAM_END: u16 = 0xFE9F;
pub const IO_START: u16 = 0xFF00;
pub const IO_END: u16 = 0xFF7F;
pub const HRAM_START: u16 = 0xFF80;
pub const HRAM_END: u16 = 0xFFFE;
pub const INTERRUPT_ENABLE: u16 = 0xFFFF;

/// Distance between working RAM and its echo.
pub const ECHO_OFFSET: u16 = 0x2000;

/// The highest working-RAM address with an echo counterpart; the echo region
/// is 0x200 bytes shorter than working RAM.
pub const WRAM_ECHO_END: u16 = 0xDDFF;

/// Base of the zero-page window the I/O-addressing instructions use.
pub const ZERO_PAGE_BASE: u16 = 0xFF00;

/// Header byte naming the cartridge's banking hardware.
pub const CARTRIDGE_TYPE_ADDR: u16 = 0x0147;

/// A recoverable cartridge-load fault. The memory array is untouched when
/// one of these comes back.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CartridgeError {
    #[display("no such cartridge file: {}", path.display())]
    Missing { path: PathBuf },
    #[display("cartridge image is {size} bytes, over the 8 MiB cap")]
    Oversized { size: u64 },
    #[display("failed to read cartridge file: {_0}")]
    #[from]
    Io(std::io::Error),
}

/// The 64 KiB address space plus the cartridge state behind it.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mmu {
    #[serde_as(as = "serde_with::Bytes")]
    memory: Box<[u8; MEM_SIZE]>,
    cart: Vec<u8>,
    mbc: MemoryBankController,
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Mmu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mmu {{ cart_size: {}, mbc: {:?} }}",
            self.cart.len(),
            self.mbc
        )
    }
}

impl Mmu {
    /// A zeroed address space with no cartridge. The no-op bank controller
    /// is installed from the start, so a ROM-range write is always defined.
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; MEM_SIZE]),
            cart: Vec::new(),
            mbc: MemoryBankController::None,
        }
    }

    /// Loads a cartridge from a file. Any fault is logged, returned, and
    /// leaves the memory array as it was.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), CartridgeError> {
        let path = path.as_ref();
        if !path.exists() {
            let err = CartridgeError::Missing {
                path: path.to_owned(),
            };
            error!("{err}");
            return Err(err);
        }
        let meta = std::fs::metadata(path)
            .map_err(CartridgeError::from)
            .inspect_err(|err| error!("{err}"))?;
        if meta.len() > MAX_CARTRIDGE_SIZE {
            let err = CartridgeError::Oversized { size: meta.len() };
            error!("{err}");
            return Err(err);
        }
        let bytes = std::fs::read(path)
            .map_err(CartridgeError::from)
            .inspect_err(|err| error!("{err}"))?;
        self.load_image(bytes)
    }

    /// Loads a cartridge from an in-memory image. The whole image is kept
    /// for bank switching; its first two 16 KiB blocks land in the fixed and
    /// switchable windows (a short image copies what exists), and the header
    /// byte at 0x147 picks the bank controller.
    pub fn load_image(&mut self, cart: Vec<u8>) -> Result<(), CartridgeError> {
        self.mbc = MemoryBankController::None;
        if cart.len() as u64 > MAX_CARTRIDGE_SIZE {
            let err = CartridgeError::Oversized {
                size: cart.len() as u64,
            };
            error!("{err}");
            return Err(err);
        }
        self.cart = cart;
        let len = self.cart.len().min(2 * ROM_BANK_SIZE);
        self.memory[..len].copy_from_slice(&self.cart[..len]);
        self.mbc = MemoryBankController::from_header(self.memory[CARTRIDGE_TYPE_ADDR as usize]);
        Ok(())
    }

    /// Reads one byte. Reads are never intercepted or mirrored.
    pub fn get_byte(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    /// Writes one byte. Writes into the ROM range belong to the bank
    /// controller; writes into working RAM or its echo also land at the
    /// mirrored address.
    pub fn set_byte(&mut self, addr: u16, value: u8) {
        trace!("write 0x{value:0>2X} -> 0x{addr:0>4X}");
        if addr <= SWITCHABLE_ROM_END {
            let Mmu { memory, cart, mbc } = self;
            mbc.capture_write(addr, value, cart, memory);
            return;
        }
        if (WRAM_START..=WRAM_ECHO_END).contains(&addr) {
            self.memory[(addr + ECHO_OFFSET) as usize] = value;
        }
        if (ECHO_START..=ECHO_END).contains(&addr) {
            self.memory[(addr - ECHO_OFFSET) as usize] = value;
        }
        self.memory[addr as usize] = value;
    }

    /// Reads from the zero-page window at 0xFF00.
    pub fn zero_page_byte(&self, offset: u8) -> u8 {
        self.memory[ZERO_PAGE_BASE as usize + offset as usize]
    }

    /// Writes into the zero-page window. The window sits above every
    /// mirrored or intercepted region, so the store is direct.
    pub fn set_zero_page_byte(&mut self, offset: u8, value: u8) {
        self.memory[ZERO_PAGE_BASE as usize + offset as usize] = value;
    }

    /// Reads a 16-bit value, low byte first.
    pub fn get_double(&self, addr: u16) -> u16 {
        u16::from_le_bytes([
            self.memory[addr as usize],
            self.memory[addr.wrapping_add(1) as usize],
        ])
    }

    /// Writes a 16-bit value, low byte first. The store is direct: no bank
    /// interception, no mirroring.
    pub fn set_double(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.memory[addr as usize] = lo;
        self.memory[addr.wrapping_add(1) as usize] = hi;
    }
}
