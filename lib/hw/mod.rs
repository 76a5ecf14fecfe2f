#[cfg(not(test))]
mod adc;
#[cfg(not(test))]
mod helper;
#[cfg(test)]
pub(crate) mod mock;
#[cfg(not(test))]
mod spi;

#[cfg(not(test))]
pub use adc::{AdcConfig, AnalogInputs, GroupRegisters};
#[cfg(not(test))]
pub use helper::*;
#[cfg(not(test))]
pub use spi::{SpiConfig, SpiError, SpiPins};

/// Result registers of one converter group, valid once the group signalled
/// completion.
pub trait ConverterGroup {
    fn result(&self, index: usize) -> u16;
    fn clear_status(&mut self);
    fn overflowed(&self) -> bool;
    fn clear_overflow(&mut self);
}

/// Slave side of the serial bus. Both transfer calls block until the master
/// clocks the word.
pub trait SlaveBus {
    type Error;
    fn read_word(&mut self) -> Result<u16, Self::Error>;
    fn write_word(&mut self, word: u16) -> Result<(), Self::Error>;
    fn acknowledge(&mut self);
}
