use stm32g0xx_hal::dma::C1;
use stm32g0xx_hal::gpio::gpioa::{PA0, PA1, PA2, PA3, PA4, PA5, PA6};
use stm32g0xx_hal::gpio::gpiob::{PB3, PB4, PB5};
use stm32g0xx_hal::gpio::{Analog, DefaultMode};
use stm32g0xx_hal::rcc::{Config, PllConfig, Rcc, RccExt};
use stm32g0xx_hal::stm32g0::stm32g070::RCC;

use crate::hw::adc::Converter as HwConverter;
use crate::hw::spi::SlaveSpi as HwSlaveSpi;

pub fn init_clock(pac_rcc: RCC) -> Rcc {
    // ((16 MHz / 4) * 32) / 2 = 64 MHz
    let pll_config = PllConfig::with_hsi(4, 32, 2);
    pac_rcc.freeze(Config::pll().pll_cfg(pll_config))
}

// PA0 - ADC_IN0 phase U voltage
pub type VoltageUInput = PA0<Analog>;
// PA1 - ADC_IN1 phase V voltage
pub type VoltageVInput = PA1<Analog>;
// PA2 - ADC_IN2 phase W voltage
pub type VoltageWInput = PA2<Analog>;
// PA3 - ADC_IN3 reference (speed setpoint)
pub type ReferenceInput = PA3<Analog>;
// PA4 - ADC_IN4 phase U current
pub type CurrentUInput = PA4<Analog>;
// PA5 - ADC_IN5 phase V current
pub type CurrentVInput = PA5<Analog>;
// PA6 - ADC_IN6 phase W current
pub type CurrentWInput = PA6<Analog>;
// ADC DMA channel
type DmaChannel = C1;

// PB3 - SPI1_SCK
pub type SpiSck = PB3<DefaultMode>;
// PB4 - SPI1_MISO
pub type SpiMiso = PB4<DefaultMode>;
// PB5 - SPI1_MOSI
pub type SpiMosi = PB5<DefaultMode>;

// RESERVED for future use
// PA15 - SPI1_NSS, slave select is managed in software for now

pub type Converter = HwConverter<DmaChannel>;
pub type SlaveSpi = HwSlaveSpi<SpiSck, SpiMiso, SpiMosi>;
