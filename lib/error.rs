use core::convert::Infallible;

pub type Result<T, BUSER = Infallible> = core::result::Result<T, Error<BUSER>>;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(not(test), derive(defmt::Format))]
pub enum Error<BUS = Infallible> {
    // Serial bus driver error
    Bus(BUS),
    // Frame slot carries a tag other than the one assigned to it
    Tag { slot: usize, tag: u16 },
}
