#![no_main]
#![no_std]

use lib as _;

use cortex_m::singleton;
use lib::acquisition::Acquisition;
use lib::hw::{init_clock, AdcConfig, AnalogInputs, Converter, SlaveSpi, SpiConfig, SpiPins};
use lib::responder::Responder;
use lib::{Buffer, RESULT_REGISTERS, SAMPLE_FREQUENCY_HZ};
use rtic::app;
use stm32g0xx_hal::delay::DelayExt;
use stm32g0xx_hal::dma::DmaExt;
use stm32g0xx_hal::dmamux::DmaMuxIndex;
use stm32g0xx_hal::gpio::GpioExt;
use stm32g0xx_hal::time::U32Ext;

#[app(device = stm32g0xx_hal::stm32, peripherals = true)]
const APP: () = {
    struct Resources {
        #[init(Acquisition::new())]
        acquisition: Acquisition,
        #[init(Responder::new())]
        responder: Responder,
        converter: Converter,
        bus: SlaveSpi,
    }

    #[init]
    fn init(cx: init::Context) -> init::LateResources {
        let core: rtic::export::Peripherals = cx.core;
        let device: stm32g0xx_hal::stm32::Peripherals = cx.device;

        // Buffers
        let dma_buffer: &'static mut Buffer =
            singleton!(: Buffer = [0; RESULT_REGISTERS]).unwrap();

        // Clock
        let mut rcc = init_clock(device.RCC);
        let mut delay = core.SYST.delay(&mut rcc);

        // GPIO
        let gpioa = device.GPIOA.split(&mut rcc);
        let gpiob = device.GPIOB.split(&mut rcc);

        // ADC
        let dma = device.DMA.split(&mut rcc, device.DMAMUX);
        let mut ch1 = dma.ch1;
        ch1.mux().select_peripheral(DmaMuxIndex::ADC);
        let inputs = AnalogInputs {
            voltage_u: gpioa.pa0.into_analog(),
            voltage_v: gpioa.pa1.into_analog(),
            voltage_w: gpioa.pa2.into_analog(),
            reference: gpioa.pa3.into_analog(),
            current_u: gpioa.pa4.into_analog(),
            current_v: gpioa.pa5.into_analog(),
            current_w: gpioa.pa6.into_analog(),
        };
        let converter = Converter::new(
            device.ADC,
            device.TIM1,
            dma_buffer,
            AdcConfig::new(inputs, ch1, SAMPLE_FREQUENCY_HZ.hz()),
            &mut rcc,
            &mut delay,
        );

        // SPI slave
        let pins = SpiPins {
            sck: gpiob.pb3,
            miso: gpiob.pb4,
            mosi: gpiob.pb5,
        };
        let bus = SlaveSpi::new(device.SPI1, pins, SpiConfig::default(), &mut rcc);

        defmt::info!("init done, sampling at {=u32} Hz", SAMPLE_FREQUENCY_HZ);
        init::LateResources { converter, bus }
    }

    #[idle(resources = [converter, bus])]
    fn idle(mut cx: idle::Context) -> ! {
        // The gate stays closed until the first transfer opens it
        cx.resources.bus.lock(|bus: &mut SlaveSpi| {
            bus.start();
        });
        cx.resources.converter.lock(|converter: &mut Converter| {
            converter.start();
        });
        loop {
            cortex_m::asm::wfi();
        }
    }

    #[task(binds = DMA_CHANNEL1, priority = 2, resources = [converter, acquisition])]
    fn dma(cx: dma::Context) {
        let converter: &mut Converter = cx.resources.converter;
        let acquisition: &mut Acquisition = cx.resources.acquisition;

        while let Some(group) = converter.pending() {
            acquisition.on_conversion(group, &mut converter.group(group));
        }
    }

    #[task(binds = SPI1, priority = 1, resources = [bus, responder, acquisition])]
    fn spi1(cx: spi1::Context) {
        let bus: &mut SlaveSpi = cx.resources.bus;
        let responder: &mut Responder = cx.resources.responder;
        let mut acquisition = cx.resources.acquisition;

        if !bus.transfer_started() {
            responder.on_transmitted(bus);
            return;
        }
        if let Err(error) = responder.serve(bus, &mut acquisition) {
            defmt::warn!("transfer {=u32} failed: {}", responder.transfers(), error);
        }
    }
};
