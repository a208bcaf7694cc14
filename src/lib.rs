//! An emulator core for the original Game Boy: the 8-bit CPU, the 64 KiB
//! memory map, and the cartridge bank-switching that map depends on.
//!
//! The crate is a library by design. Rendering, audio, input, and pacing
//! belong to a hosting process; the only display-facing surface is the
//! two-signal seam in [`screen`]. Instruction timings are likewise not
//! modeled, so a host that wants real-time speed must bring its own clock.
//!
//! ```no_run
//! use wisp::GameBoy;
//!
//! # fn main() -> Result<(), wisp::CartridgeError> {
//! let mut gb = GameBoy::new();
//! gb.load_cartridge("tetris.gb")?;
//! gb.run();
//! # }
//! ```

pub mod cpu;
pub mod mbc;
pub mod mem;
pub mod opcode;
pub mod screen;

mod exec;

pub use cpu::{AccessGuard, Cpu};
pub use mem::{CartridgeError, Mmu};

use std::path::Path;

use serde::{Deserialize, Serialize};

/// The full machine state: processor plus memory subsystem. Everything an
/// instruction can observe or mutate lives in here, so a snapshot of this
/// struct is a save state.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    /// A powered-on machine with no cartridge, policing register access.
    pub fn new() -> Self {
        Self::with_guard(AccessGuard::Checked)
    }

    /// A powered-on machine with the given register-access mode.
    pub fn with_guard(guard: AccessGuard) -> Self {
        Self {
            cpu: Cpu::new(guard),
            mmu: Mmu::new(),
        }
    }

    /// Loads a cartridge from disk. On error the machine is unchanged aside
    /// from dropping any previously installed bank controller.
    pub fn load_cartridge(&mut self, path: impl AsRef<Path>) -> Result<(), CartridgeError> {
        self.mmu.load_from_file(path)
    }

    /// Loads a cartridge from an in-memory image.
    pub fn insert_image(&mut self, cart: Vec<u8>) -> Result<(), CartridgeError> {
        self.mmu.load_image(cart)
    }

    /// Runs the fetch-decode-execute loop until the process is torn down.
    /// There is no halt instruction that stops it from the inside.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }
}
