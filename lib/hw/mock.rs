use crate::hw::{ConverterGroup, SlaveBus};

#[derive(Debug, Default)]
pub struct MockGroup {
    pub results: Vec<u16>,
    pub pending: bool,
    pub overflow: bool,
    pub status_clears: usize,
    pub overflow_clears: usize,
}

impl MockGroup {
    pub fn with(results: &[u16]) -> Self {
        MockGroup {
            results: results.to_vec(),
            pending: true,
            ..MockGroup::default()
        }
    }
}

impl ConverterGroup for MockGroup {
    fn result(&self, index: usize) -> u16 {
        self.results[index]
    }

    fn clear_status(&mut self) {
        self.pending = false;
        self.status_clears += 1;
    }

    fn overflowed(&self) -> bool {
        self.overflow
    }

    fn clear_overflow(&mut self) {
        self.overflow = false;
        self.overflow_clears += 1;
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MockBusError {
    Overrun,
}

#[derive(Debug, Default)]
pub struct MockBus {
    pub inbound: Option<u16>,
    pub reads: usize,
    pub written: Vec<u16>,
    /// Write index at which an overrun latches on the bus.
    pub overrun_at: Option<usize>,
    /// Overrun latched and not yet reported.
    pub latched: Option<MockBusError>,
    pub acks: usize,
}

impl MockBus {
    pub fn with_command(command: u16) -> Self {
        MockBus {
            inbound: Some(command),
            ..MockBus::default()
        }
    }
}

impl SlaveBus for MockBus {
    type Error = MockBusError;

    fn read_word(&mut self) -> Result<u16, Self::Error> {
        self.reads += 1;
        self.inbound.take().ok_or(MockBusError::Overrun)
    }

    /// Stays failed while an error is latched; reporting the error clears it
    /// and the word still goes out, as on `SlaveSpi`.
    fn write_word(&mut self, word: u16) -> Result<(), Self::Error> {
        if self.overrun_at == Some(self.written.len()) {
            self.latched = Some(MockBusError::Overrun);
        }
        self.written.push(word);
        match self.latched.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn acknowledge(&mut self) {
        self.acks += 1;
    }
}
