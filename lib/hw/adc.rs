use core::ops::Deref;
use stm32g0xx_hal::analog::adc::{Adc as HalAdc, VRef};
use stm32g0xx_hal::dma::{Channel as DmaChannel, Direction, Event, Priority, WordSize};
use stm32g0xx_hal::hal::adc::Channel as AdcChannel;
use stm32g0xx_hal::hal::blocking::delay::DelayUs;
use stm32g0xx_hal::hal::PwmPin as _;
use stm32g0xx_hal::rcc::Rcc;
use stm32g0xx_hal::stm32g0::stm32g070::{ADC, RCC, SYST, TIM1};
use stm32g0xx_hal::time::Hertz;
use stm32g0xx_hal::timer::delay::Delay;
use stm32g0xx_hal::timer::pins::TimerPin;
use stm32g0xx_hal::timer::pwm::{PwmExt, PwmPin};
use stm32g0xx_hal::timer::Channel4;
use volatile_register::RO;

use crate::acquisition::Group;
use crate::hw::helper::{
    CurrentUInput, CurrentVInput, CurrentWInput, ReferenceInput, VoltageUInput, VoltageVInput,
    VoltageWInput,
};
use crate::hw::ConverterGroup;
use crate::sampler::{GROUP_A_LEN, GROUP_B_LEN};
use crate::{Buffer, RESULT_REGISTERS};

/// Analog pins, held so nothing else can reconfigure them. The scan runs in
/// ascending channel order, which puts group A in the first half of the
/// result buffer and group B (plus VREFINT as padding) in the second.
pub struct AnalogInputs {
    pub voltage_u: VoltageUInput,
    pub voltage_v: VoltageVInput,
    pub voltage_w: VoltageWInput,
    pub reference: ReferenceInput,
    pub current_u: CurrentUInput,
    pub current_v: CurrentVInput,
    pub current_w: CurrentWInput,
}

impl AnalogInputs {
    fn channel_mask() -> u32 {
        1 << <VoltageUInput as AdcChannel<HalAdc>>::channel()
            | 1 << <VoltageVInput as AdcChannel<HalAdc>>::channel()
            | 1 << <VoltageWInput as AdcChannel<HalAdc>>::channel()
            | 1 << <ReferenceInput as AdcChannel<HalAdc>>::channel()
            | 1 << <CurrentUInput as AdcChannel<HalAdc>>::channel()
            | 1 << <CurrentVInput as AdcChannel<HalAdc>>::channel()
            | 1 << <CurrentWInput as AdcChannel<HalAdc>>::channel()
            | 1 << VRef::channel()
    }
}

pub struct AdcConfig<C> {
    inputs: AnalogInputs,
    dma_channel: C,
    frequency: Hertz,
}

impl<C> AdcConfig<C>
where
    C: DmaChannel,
{
    pub fn new(inputs: AnalogInputs, dma_channel: C, frequency: Hertz) -> Self {
        AdcConfig {
            inputs,
            dma_channel,
            frequency,
        }
    }
}

/// Both converter groups: one ADC scan per trigger, DMA half transfer marks
/// group A complete and transfer complete marks group B.
pub struct Converter<C> {
    adc: InnerAdc,
    dma: Dma<C>,
    trigger: Trigger,
    results: Results,
}

impl<C> Converter<C>
where
    C: DmaChannel,
{
    pub fn new(
        pac_adc: ADC,
        pac_timer: TIM1,
        buffer: &'static mut Buffer,
        config: AdcConfig<C>,
        rcc: &mut Rcc,
        delay: &mut Delay<SYST>,
    ) -> Self {
        let adc = InnerAdc::new(pac_adc, config.inputs, rcc, delay);
        let memory_addr = buffer.as_ptr() as u32;
        let dma = Dma::new(
            config.dma_channel,
            InnerAdc::get_dma_address(),
            memory_addr,
            buffer.len() as u16,
        );
        let trigger = Trigger::new(pac_timer, config.frequency, rcc);
        Converter {
            adc,
            dma,
            trigger,
            results: Results::new(buffer),
        }
    }

    pub fn start(&mut self) {
        self.adc.start();
        self.dma.start();
        self.trigger.start();
    }

    /// Next group with an unacknowledged completion, group A first.
    pub fn pending(&self) -> Option<Group> {
        if self.dma.channel.event_occurred(Event::HalfTransfer) {
            Some(Group::A)
        } else if self.dma.channel.event_occurred(Event::TransferComplete) {
            Some(Group::B)
        } else {
            None
        }
    }

    pub fn group(&mut self, group: Group) -> GroupRegisters<'_, C> {
        GroupRegisters {
            group,
            converter: self,
        }
    }
}

/// Result view of one group, see [`ConverterGroup`].
pub struct GroupRegisters<'a, C> {
    group: Group,
    converter: &'a mut Converter<C>,
}

impl<'a, C> GroupRegisters<'a, C> {
    fn offset(&self) -> usize {
        match self.group {
            Group::A => 0,
            Group::B => RESULT_REGISTERS / 2,
        }
    }

    fn len(&self) -> usize {
        match self.group {
            Group::A => GROUP_A_LEN,
            Group::B => GROUP_B_LEN,
        }
    }
}

impl<'a, C> ConverterGroup for GroupRegisters<'a, C>
where
    C: DmaChannel,
{
    fn result(&self, index: usize) -> u16 {
        debug_assert!(index < self.len());
        self.converter.results.result[self.offset() + index].read()
    }

    fn clear_status(&mut self) {
        let event = match self.group {
            Group::A => Event::HalfTransfer,
            Group::B => Event::TransferComplete,
        };
        self.converter.dma.channel.clear_event(event);
    }

    fn overflowed(&self) -> bool {
        self.converter.adc.overrun()
    }

    fn clear_overflow(&mut self) {
        self.converter.adc.clear_overrun();
    }
}

/// Compare channel 4 of TIM1. It has no pin; EXTSEL 1 routes its compare
/// event to the converter.
struct Cc4;

impl TimerPin<TIM1> for Cc4 {
    type Channel = Channel4;

    fn setup(&self) {}

    fn release(self) -> Self {
        self
    }
}

/// One compare match per sample period starts one scan.
struct Trigger {
    compare: PwmPin<TIM1, Channel4>,
}

impl Trigger {
    fn new(pac_timer: TIM1, frequency: Hertz, rcc: &mut Rcc) -> Self {
        Trigger {
            compare: pac_timer.pwm(frequency, rcc).bind_pin(Cc4),
        }
    }

    fn start(&mut self) {
        let period = self.compare.get_max_duty();
        self.compare.set_duty(period / 2);
        self.compare.enable();
    }
}

struct Dma<C> {
    channel: C,
}

impl<C> Dma<C>
where
    C: DmaChannel,
{
    pub fn new(channel: C, peripheral_addr: u32, memory_addr: u32, len: u16) -> Self {
        let mut dma = Dma { channel };
        dma.configure(peripheral_addr, memory_addr, len);
        dma
    }

    pub fn start(&mut self) {
        self.channel.clear_event(Event::HalfTransfer);
        self.channel.clear_event(Event::TransferComplete);
        self.channel.listen(Event::HalfTransfer);
        self.channel.listen(Event::TransferComplete);
        self.channel.enable();
    }

    fn configure(&mut self, peripheral_addr: u32, memory_addr: u32, len: u16) {
        self.channel.set_priority_level(Priority::VeryHigh);
        self.channel.set_word_size(WordSize::BITS16);
        self.channel.set_direction(Direction::FromPeripheral);
        self.channel.set_peripheral_address(peripheral_addr, false);
        self.channel.set_memory_address(memory_addr, true);
        self.channel.set_transfer_length(len);
        self.channel.set_circular_mode(true);
    }
}

struct InnerAdc {
    adc: ADC,
    _inputs: AnalogInputs,
}

impl InnerAdc {
    pub fn new<D: DelayUs<u8>>(
        pac_adc: ADC,
        inputs: AnalogInputs,
        rcc: &mut Rcc,
        delay: &mut D,
    ) -> Self {
        InnerAdc::enable_clock_and_reset(rcc);
        let mut adc = InnerAdc {
            adc: pac_adc,
            _inputs: inputs,
        };
        adc.disable();
        adc.enable_vreg(delay);
        adc.calibrate();
        adc.enable();
        adc.configure();
        adc
    }

    pub fn start(&mut self) {
        self.adc.isr.write(|w| {
            w.eoc().set_bit();
            w.eos().set_bit();
            w.ovr().set_bit()
        });
        self.adc.cr.modify(|_, w| w.adstart().set_bit());
    }

    pub fn get_dma_address() -> u32 {
        unsafe { &(*ADC::ptr()).dr as *const _ as u32 }
    }

    pub fn overrun(&self) -> bool {
        self.adc.isr.read().ovr().bit_is_set()
    }

    pub fn clear_overrun(&mut self) {
        self.adc.isr.write(|w| w.ovr().set_bit());
    }

    fn configure(&mut self) {
        self.adc.cfgr1.write(|w| unsafe {
            // External trigger rising edge
            w.exten().bits(0b01);
            // External trigger 1
            w.extsel().bits(0b001);
            // Right alignment
            w.align().clear_bit();
            // 12-bit resolution
            w.res().bits(0b00);
            // Ascending scan
            w.scandir().clear_bit();
            // Circular DMA
            w.dmacfg().set_bit();
            // Enable DMA requests
            w.dmaen().set_bit()
        });
        // Enable Vref
        self.adc.ccr.write(|w| w.vrefen().set_bit());
        // 19.5 cycles keeps the eight channel scan well inside one trigger period
        self.adc.smpr.write(|w| unsafe { w.smp1().bits(0b100) });
        // Seven inputs and Vref
        self.adc
            .chselr()
            .write(|w| unsafe { w.chsel().bits(AnalogInputs::channel_mask()) });
    }

    fn enable_clock_and_reset(_: &mut Rcc) {
        let rcc = unsafe { &(*RCC::ptr()) };
        rcc.apbenr2.modify(|_, w| w.adcen().set_bit());
        rcc.apbrstr2.modify(|_, w| w.adcrst().set_bit());
        rcc.apbrstr2.modify(|_, w| w.adcrst().clear_bit());
    }

    fn enable_vreg<D: DelayUs<u8>>(&mut self, delay: &mut D) {
        self.adc.cr.modify(|_, w| w.advregen().set_bit());
        // Max starting time declared by stm32g070 datasheet is 20 us
        delay.delay_us(20);
    }

    fn enable(&mut self) {
        self.adc.isr.write(|w| w.adrdy().set_bit());
        self.adc.cr.modify(|_, w| w.aden().set_bit());
        while self.adc.isr.read().adrdy().bit_is_clear() {}
    }

    fn disable(&mut self) {
        let cr = self.adc.cr.read();
        if cr.aden().bit_is_clear() {
            return;
        }
        if cr.adstart().bit_is_set() {
            self.adc.cr.modify(|_, w| w.adstp().set_bit());
        }
        self.adc.cr.modify(|_, w| w.addis().set_bit());
        while self.adc.cr.read().aden().bit_is_set() {}
        self.adc.isr.write(|w| w.adrdy().set_bit());
    }

    fn calibrate(&mut self) {
        self.adc.cr.modify(|_, w| w.adcal().set_bit());
        while self.adc.isr.read().eocal().bit_is_clear() {}
        self.adc.isr.write(|w| w.eocal().set_bit());
    }
}

/// Volatile view of the DMA target, the result registers of both groups.
struct Results {
    ptr: *const ResultsRegBlock,
}

impl Results {
    fn new(buffer: &'static mut Buffer) -> Self {
        Results {
            ptr: buffer.as_ptr() as *const _,
        }
    }
}

// The buffer is 'static and only ever read through this view.
unsafe impl Send for Results {}

impl Deref for Results {
    type Target = ResultsRegBlock;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.ptr }
    }
}

#[repr(C)]
pub struct ResultsRegBlock {
    pub result: [RO<u16>; RESULT_REGISTERS],
}
