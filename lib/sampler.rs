use crate::hw::ConverterGroup;

/// Group A: phase U, V, W voltage and the reference quantity.
pub const GROUP_A_LEN: usize = 4;
/// Group B: phase U, V, W current.
pub const GROUP_B_LEN: usize = 3;

pub type SamplerA = Sampler<GROUP_A_LEN>;
pub type SamplerB = Sampler<GROUP_B_LEN>;

/// Latest raw results of one converter group.
pub struct Sampler<const LEN: usize> {
    slots: [u16; LEN],
}

impl<const LEN: usize> Sampler<LEN> {
    pub const fn new() -> Self {
        Sampler { slots: [0; LEN] }
    }

    pub fn capture<G: ConverterGroup>(&mut self, group: &G) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            *slot = group.result(index);
        }
    }

    /// Clears the completion status so the converter keeps running, whether
    /// or not the results were taken. Returns true if an overflow was
    /// pending.
    pub fn acknowledge<G: ConverterGroup>(group: &mut G) -> bool {
        group.clear_status();
        if group.overflowed() {
            group.clear_overflow();
            group.clear_status();
            return true;
        }
        false
    }

    pub fn slots(&self) -> &[u16; LEN] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::mock::MockGroup;

    #[test]
    fn capture_reads_every_result() {
        let mut sampler = SamplerA::new();
        sampler.capture(&MockGroup::with(&[1, 2, 3, 4]));
        assert_eq!(sampler.slots(), &[1, 2, 3, 4]);
    }

    #[test]
    fn acknowledge_without_overflow() {
        let mut group = MockGroup::with(&[0; 3]);
        assert!(!SamplerB::acknowledge(&mut group));
        assert!(!group.pending);
        assert_eq!(group.status_clears, 1);
        assert_eq!(group.overflow_clears, 0);
    }

    #[test]
    fn acknowledge_clears_overflow_and_status() {
        let mut group = MockGroup::with(&[0; 3]);
        group.overflow = true;
        assert!(SamplerB::acknowledge(&mut group));
        assert!(!group.overflow);
        assert_eq!(group.status_clears, 2);
        assert_eq!(group.overflow_clears, 1);
    }
}
