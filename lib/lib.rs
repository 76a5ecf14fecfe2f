#![cfg_attr(not(test), no_std)]

#[cfg(not(test))]
use core::sync::atomic::{AtomicUsize, Ordering};

#[cfg(not(test))]
use defmt_rtt as _; // global logger
#[cfg(not(test))]
use panic_probe as _;

/// Forwards to the `defmt` macro of the same level. Host unit tests have no
/// global logger, so the call is compiled out there.
macro_rules! log {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(not(test))]
        defmt::$level!($($arg)+);
    };
}

pub mod acquisition;
pub mod error;
pub mod frame;
pub mod hw;
pub mod receiver;
pub mod responder;
pub mod sampler;

/// Words in one frame served per bus transaction.
pub const FRAME_LEN: usize = 8;
/// Converter results per scan (group A and group B halves of the DMA buffer).
pub const RESULT_REGISTERS: usize = 8;
/// Converter trigger rate, well above the rate the bus master polls at.
pub const SAMPLE_FREQUENCY_HZ: u32 = 10_000;

pub type Buffer = [u16; RESULT_REGISTERS];

#[cfg(not(test))]
static COUNT: AtomicUsize = AtomicUsize::new(0);
#[cfg(not(test))]
defmt::timestamp!("{=usize}", {
    let n = COUNT.load(Ordering::Relaxed);
    COUNT.store(n + 1, Ordering::Relaxed);
    n
});
