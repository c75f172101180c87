//! Traits decoupling the processor from the concrete bus wiring

/// Main-bus interface as seen by the CPU and the DMA engine.
///
/// Reads can carry a `read_only` hint so debug readers may inspect
/// registers with read side effects (PPUSTATUS, PPUDATA) without
/// disturbing them. Production code paths always pass `false`.
pub trait CpuBus {
    /// Read a byte from the specified `address`
    fn read(&mut self, address: u16) -> u8;

    /// Read a byte without triggering read side effects
    fn read_only(&mut self, address: u16) -> u8;

    /// Write a byte of `data` to the specified `address`
    fn write(&mut self, address: u16, data: u8);
}
