/// Cycle-accurate NES emulator core

mod cartridge;
mod controller;
mod dma;
mod errors;
mod graphics;
mod hardware;
mod interfaces;
mod mappers;
mod metrics;
mod nes;
mod processor;
mod types;
mod utils;

pub use cartridge::{Cartridge, Mirroring};
pub use controller::ControllerButtons;
pub use errors::{CartridgeError, NesError};
pub use graphics::Frame;
pub use hardware::{SCREEN_HEIGHT, SCREEN_WIDTH};
pub use metrics::{Collector, Metrics};
pub use nes::Nes;
