use rtic::Mutex;

use crate::acquisition::Acquisition;
use crate::error::{Error, Result};
use crate::hw::SlaveBus;

/// Services one master transaction per transfer-start notification.
pub struct Responder {
    last_command: Option<u16>,
    transfers: u32,
}

impl Responder {
    pub const fn new() -> Self {
        Responder {
            last_command: None,
            transfers: 0,
        }
    }

    /// Reads the master's word, sends the last published frame and opens a
    /// new acquisition window. The full transaction always runs; the first
    /// bus error, if any, is returned afterwards.
    pub fn serve<B, M>(&mut self, bus: &mut B, shared: &mut M) -> Result<(), B::Error>
    where
        B: SlaveBus,
        M: Mutex<T = Acquisition>,
    {
        log!(trace, "transfer started");

        let mut result = match bus.read_word() {
            Ok(command) => {
                self.last_command = Some(command);
                Ok(())
            }
            Err(error) => Err(Error::Bus(error)),
        };

        let frame = shared.lock(|acquisition: &mut Acquisition| acquisition.frame());
        for word in frame.words().iter() {
            if let Err(error) = bus.write_word(*word) {
                if result.is_ok() {
                    result = Err(Error::Bus(error));
                }
            }
        }

        shared.lock(|acquisition: &mut Acquisition| acquisition.reopen());
        bus.acknowledge();

        self.transfers = self.transfers.wrapping_add(1);
        log!(debug, "transfer {=u32} served", self.transfers);
        result
    }

    /// Transmission-complete notification; nothing on the data path.
    pub fn on_transmitted<B: SlaveBus>(&self, bus: &mut B) {
        bus.acknowledge();
    }

    /// Inbound word of the latest transaction, unused by the frame path.
    pub fn last_command(&self) -> Option<u16> {
        self.last_command
    }

    pub fn transfers(&self) -> u32 {
        self.transfers
    }
}

impl Default for Responder {
    fn default() -> Self {
        Responder::new()
    }
}
