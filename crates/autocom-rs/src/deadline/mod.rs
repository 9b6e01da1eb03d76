// crates/autocom-rs/src/deadline/mod.rs
//! Deadline monitoring on top of the timer table.
//!
//! The DM state of a monitor is two independent bits: `active` says whether
//! the monitor is watched, `occurred` records that it expired. Deactivating a
//! monitor never clears `occurred`; only an explicit clear does.

pub mod rx;
pub mod tx;

pub use rx::RxDeadlineMonitor;
pub use tx::TxDeadlineMonitor;

/// Active/Occurred bits of one monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutState {
    pub active: bool,
    pub occurred: bool,
}
