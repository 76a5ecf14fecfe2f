//! Acquisition window shared by the converter handlers and the bus handler.
//!
//! The bus handler opens a window; each converter group fills its slots at
//! most once per window; the second group to fill publishes a frame and
//! closes the window. The converter handler runs at the higher priority and
//! owns the context outright; the bus handler reaches it through the RTIC
//! priority-ceiling lock. The served frame is the last one published, so it
//! may lag the running transfer by one window.

use crate::frame::{Frame, Readings};
use crate::hw::ConverterGroup;
use crate::sampler::{SamplerA, SamplerB};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(not(test), derive(defmt::Format))]
pub enum Group {
    A,
    B,
}

/// Sampling gate. `filled_a` and `filled_b` are both true only between the
/// second capture of a window and the frame publication that follows it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Gate {
    accepting: bool,
    filled_a: bool,
    filled_b: bool,
}

impl Gate {
    pub const fn closed() -> Self {
        Gate {
            accepting: false,
            filled_a: false,
            filled_b: false,
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    pub fn is_filled(&self, group: Group) -> bool {
        match group {
            Group::A => self.filled_a,
            Group::B => self.filled_b,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.filled_a && self.filled_b
    }

    fn fill(&mut self, group: Group) {
        match group {
            Group::A => self.filled_a = true,
            Group::B => self.filled_b = true,
        }
    }

    fn open(&mut self) {
        *self = Gate {
            accepting: true,
            ..Gate::closed()
        };
    }

    fn close(&mut self) {
        *self = Gate::closed();
    }
}

/// What a converter notification did to the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(not(test), derive(defmt::Format))]
pub enum Outcome {
    /// Gate closed, results dropped.
    Dropped,
    /// Results stored, waiting for the other group.
    Captured,
    /// Results stored and a new frame published.
    Published,
}

pub struct Acquisition {
    gate: Gate,
    sampler_a: SamplerA,
    sampler_b: SamplerB,
    frame: Frame,
}

impl Acquisition {
    pub const fn new() -> Self {
        Acquisition {
            gate: Gate::closed(),
            sampler_a: SamplerA::new(),
            sampler_b: SamplerB::new(),
            frame: Frame::new(),
        }
    }

    /// Converter group completion handler.
    pub fn on_conversion<G: ConverterGroup>(&mut self, group: Group, hw: &mut G) -> Outcome {
        let mut outcome = Outcome::Dropped;
        if self.gate.is_accepting() {
            match group {
                Group::A => self.sampler_a.capture(hw),
                Group::B => self.sampler_b.capture(hw),
            }
            self.gate.fill(group);
            outcome = Outcome::Captured;
        }

        if self.gate.is_complete() {
            self.publish();
            outcome = Outcome::Published;
        }

        let overflowed = match group {
            Group::A => SamplerA::acknowledge(hw),
            Group::B => SamplerB::acknowledge(hw),
        };
        if overflowed {
            log!(debug, "group {} overflow cleared", group);
        }
        outcome
    }

    /// Starts a new window. Called by the bus handler once the frame is out.
    pub fn reopen(&mut self) {
        self.gate.open();
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn readings(&self) -> Readings {
        let [u_volts, v_volts, w_volts, reference] = *self.sampler_a.slots();
        let [u_amps, v_amps, w_amps] = *self.sampler_b.slots();
        [u_volts, v_volts, w_volts, u_amps, v_amps, w_amps, reference]
    }

    fn publish(&mut self) {
        self.frame = Frame::build(&self.readings());
        self.gate.close();
        log!(trace, "frame published {}", self.frame.words());
    }
}

impl Default for Acquisition {
    fn default() -> Self {
        Acquisition::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::mock::MockGroup;

    const SCENARIO_FRAME: [u16; 8] = [
        0x0000, 0x1064, 0x20C8, 0x712C, 0xC00A, 0xF014, 0xA01E, 0x9005,
    ];

    fn open() -> Acquisition {
        let mut acquisition = Acquisition::new();
        acquisition.reopen();
        acquisition
    }

    #[test]
    fn starts_closed_with_empty_frame() {
        let acquisition = Acquisition::new();
        assert_eq!(acquisition.gate(), Gate::closed());
        assert_eq!(acquisition.frame(), Frame::new());
    }

    #[test]
    fn second_group_publishes() {
        let mut acquisition = open();
        let mut a = MockGroup::with(&[100, 200, 300, 5]);
        let mut b = MockGroup::with(&[10, 20, 30]);

        assert_eq!(acquisition.on_conversion(Group::A, &mut a), Outcome::Captured);
        assert!(acquisition.gate().is_filled(Group::A));
        assert_eq!(acquisition.frame(), Frame::new());

        assert_eq!(acquisition.on_conversion(Group::B, &mut b), Outcome::Published);
        assert_eq!(acquisition.frame().words(), &SCENARIO_FRAME);
        assert_eq!(acquisition.gate(), Gate::closed());
    }

    #[test]
    fn either_order_publishes() {
        let mut acquisition = open();
        let mut a = MockGroup::with(&[100, 200, 300, 5]);
        let mut b = MockGroup::with(&[10, 20, 30]);

        assert_eq!(acquisition.on_conversion(Group::B, &mut b), Outcome::Captured);
        assert_eq!(acquisition.on_conversion(Group::A, &mut a), Outcome::Published);
        assert_eq!(acquisition.frame().words(), &SCENARIO_FRAME);
    }

    #[test]
    fn repeated_group_keeps_latest_value() {
        let mut acquisition = open();
        acquisition.on_conversion(Group::A, &mut MockGroup::with(&[1, 1, 1, 1]));
        acquisition.on_conversion(Group::A, &mut MockGroup::with(&[100, 200, 300, 5]));
        assert!(!acquisition.gate().is_complete());

        acquisition.on_conversion(Group::B, &mut MockGroup::with(&[10, 20, 30]));
        assert_eq!(acquisition.frame().words(), &SCENARIO_FRAME);
    }

    #[test]
    fn closed_gate_drops_samples() {
        let mut acquisition = open();
        acquisition.on_conversion(Group::A, &mut MockGroup::with(&[100, 200, 300, 5]));
        acquisition.on_conversion(Group::B, &mut MockGroup::with(&[10, 20, 30]));
        let published = acquisition.frame();
        let readings = acquisition.readings();

        let mut a = MockGroup::with(&[7, 7, 7, 7]);
        assert_eq!(acquisition.on_conversion(Group::A, &mut a), Outcome::Dropped);
        assert_eq!(acquisition.readings(), readings);
        assert_eq!(acquisition.frame(), published);
        assert_eq!(acquisition.gate(), Gate::closed());
        assert_eq!(a.status_clears, 1);
        assert!(!a.pending);
    }

    #[test]
    fn closed_window_never_publishes_twice() {
        let mut acquisition = open();
        acquisition.on_conversion(Group::A, &mut MockGroup::with(&[100, 200, 300, 5]));
        acquisition.on_conversion(Group::B, &mut MockGroup::with(&[10, 20, 30]));
        let readings = acquisition.readings();

        for _ in 0..3 {
            let mut b = MockGroup::with(&[1, 2, 3]);
            assert_eq!(acquisition.on_conversion(Group::B, &mut b), Outcome::Dropped);
        }
        assert_eq!(acquisition.readings(), readings);
        assert_eq!(acquisition.frame().words(), &SCENARIO_FRAME);
    }

    #[test]
    fn overflow_is_cleared_and_sample_kept() {
        let mut acquisition = open();
        acquisition.on_conversion(Group::A, &mut MockGroup::with(&[100, 200, 300, 5]));

        let mut b = MockGroup::with(&[10, 20, 30]);
        b.overflow = true;
        assert_eq!(acquisition.on_conversion(Group::B, &mut b), Outcome::Published);
        assert!(!b.overflow);
        assert!(!b.pending);
        assert_eq!(b.overflow_clears, 1);
        assert_eq!(b.status_clears, 2);
        assert_eq!(acquisition.frame().words(), &SCENARIO_FRAME);
    }

    #[test]
    fn reopen_resets_fill_flags() {
        let mut acquisition = open();
        acquisition.on_conversion(Group::A, &mut MockGroup::with(&[0; 4]));
        acquisition.reopen();

        let gate = acquisition.gate();
        assert!(gate.is_accepting());
        assert!(!gate.is_filled(Group::A));
        assert!(!gate.is_filled(Group::B));

        acquisition.on_conversion(Group::B, &mut MockGroup::with(&[0; 3]));
        assert!(!acquisition.gate().is_complete());
    }
}
