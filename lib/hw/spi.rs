use stm32g0xx_hal::hal::spi::{Mode, Phase, Polarity, MODE_0};
use stm32g0xx_hal::rcc::Rcc;
use stm32g0xx_hal::spi::{PinMiso, PinMosi, PinSck};
use stm32g0xx_hal::stm32g0::stm32g070::spi1::sr;
use stm32g0xx_hal::stm32g0::stm32g070::{RCC, SPI1};

use crate::hw::SlaveBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SpiError {
    // Received word not read before the next one arrived
    Overrun,
    // Slave select asserted in master mode
    ModeFault,
    // TI frame format error
    FrameFormat,
}

pub struct SpiPins<SCK, MISO, MOSI> {
    pub sck: SCK,
    pub miso: MISO,
    pub mosi: MOSI,
}

pub struct SpiConfig {
    mode: Mode,
}

impl SpiConfig {
    pub fn new(mode: Mode) -> Self {
        SpiConfig { mode }
    }
}

impl Default for SpiConfig {
    fn default() -> Self {
        SpiConfig::new(MODE_0)
    }
}

/// SPI1 as a 16-bit slave; RXNE raises the transfer-start interrupt.
pub struct SlaveSpi<SCK, MISO, MOSI> {
    spi: SPI1,
    _pins: SpiPins<SCK, MISO, MOSI>,
}

impl<SCK, MISO, MOSI> SlaveSpi<SCK, MISO, MOSI>
where
    SCK: PinSck<SPI1>,
    MISO: PinMiso<SPI1>,
    MOSI: PinMosi<SPI1>,
{
    pub fn new(
        pac_spi: SPI1,
        pins: SpiPins<SCK, MISO, MOSI>,
        config: SpiConfig,
        rcc: &mut Rcc,
    ) -> Self {
        SlaveSpi::<SCK, MISO, MOSI>::enable_clock_and_reset(rcc);
        pins.sck.setup();
        pins.miso.setup();
        pins.mosi.setup();

        let mut spi = SlaveSpi {
            spi: pac_spi,
            _pins: pins,
        };
        spi.configure(config.mode);
        spi
    }

    pub fn start(&mut self) {
        self.drain();
        self.spi.cr2.modify(|_, w| {
            w.rxneie().set_bit();
            w.errie().set_bit()
        });
        self.spi.cr1.modify(|_, w| w.spe().set_bit());
    }

    /// The master has clocked in the first word of a transaction.
    pub fn transfer_started(&self) -> bool {
        self.spi.sr.read().rxne().bit_is_set()
    }

    fn configure(&mut self, mode: Mode) {
        self.spi.cr1.write(|w| {
            // Slave, MSB first
            w.mstr().clear_bit();
            w.lsbfirst().clear_bit();
            // Software slave select, always selected
            w.ssm().set_bit();
            w.ssi().clear_bit();
            w.cpol().bit(mode.polarity == Polarity::IdleHigh);
            w.cpha().bit(mode.phase == Phase::CaptureOnSecondTransition)
        });
        // 16-bit words
        self.spi.cr2.write(|w| unsafe { w.ds().bits(0b1111) });
    }

    /// Reports a latched error flag and clears it, so only the word in flight
    /// is lost and the rest of the transaction keeps going.
    fn status(&mut self) -> Result<sr::R, SpiError> {
        let sr = self.spi.sr.read();
        if sr.ovr().bit_is_set() {
            // DR read followed by SR read clears OVR
            let _ = self.spi.dr.read().dr().bits();
            let _ = self.spi.sr.read();
            Err(SpiError::Overrun)
        } else if sr.modf().bit_is_set() {
            // SR read followed by CR1 write clears MODF
            self.spi.cr1.modify(|_, w| w.spe().set_bit());
            Err(SpiError::ModeFault)
        } else if sr.fre().bit_is_set() {
            // Cleared by the SR read above
            Err(SpiError::FrameFormat)
        } else {
            Ok(sr)
        }
    }

    /// Empties the receive FIFO and clears the sticky error flags.
    fn drain(&mut self) {
        while self.spi.sr.read().rxne().bit_is_set() {
            let _ = self.spi.dr.read().dr().bits();
        }
        let sr = self.spi.sr.read();
        if sr.modf().bit_is_set() {
            self.spi.cr1.modify(|_, w| w.spe().set_bit());
        }
    }

    fn enable_clock_and_reset(_: &mut Rcc) {
        let rcc = unsafe { &(*RCC::ptr()) };
        rcc.apbenr2.modify(|_, w| w.spi1en().set_bit());
        rcc.apbrstr2.modify(|_, w| w.spi1rst().set_bit());
        rcc.apbrstr2.modify(|_, w| w.spi1rst().clear_bit());
    }
}

impl<SCK, MISO, MOSI> SlaveBus for SlaveSpi<SCK, MISO, MOSI>
where
    SCK: PinSck<SPI1>,
    MISO: PinMiso<SPI1>,
    MOSI: PinMosi<SPI1>,
{
    type Error = SpiError;

    fn read_word(&mut self) -> Result<u16, Self::Error> {
        while self.status()?.rxne().bit_is_clear() {}
        Ok(self.spi.dr.read().dr().bits())
    }

    /// Loads the word even when an error was latched while waiting, then
    /// reports that error.
    fn write_word(&mut self, word: u16) -> Result<(), Self::Error> {
        let mut result = Ok(());
        loop {
            let sr = match self.status() {
                Ok(sr) => sr,
                Err(error) => {
                    result = result.and(Err(error));
                    continue;
                }
            };
            // Filler clocked in by the master while the frame goes out
            if sr.rxne().bit_is_set() {
                let _ = self.spi.dr.read().dr().bits();
            }
            if sr.txe().bit_is_set() {
                break;
            }
        }
        self.spi.dr.write(|w| unsafe { w.dr().bits(word) });
        result
    }

    /// Drops the filler words the master clocked in during the frame so the
    /// next RXNE is the next transaction's first word.
    fn acknowledge(&mut self) {
        self.drain();
    }
}
