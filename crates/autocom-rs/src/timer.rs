// crates/autocom-rs/src/timer.rs
//! Generic countdown timer table shared by the Rx/Tx deadline monitors and the
//! gateway timeout.
//!
//! A timer is disarmed while its counter is 0. Every `dec_counter` moves an
//! armed counter one step towards 0 and reports the timer's tagged event on
//! the 1 -> 0 transition; the caller owns the tag switch.

use crate::config::TimerConfig;
use crate::types::{GwTimeoutId, RxTimeoutId, TimerId, TxTimeoutId};
use alloc::vec::Vec;

/// Destination of a timer underflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimerEvent {
    RxTimeout(RxTimeoutId),
    TxTimeout(TxTimeoutId),
    GwTimeout(GwTimeoutId),
    None,
}

/// Dynamic state of one timer. The static values are copied from its
/// `TimerConfig` so the table is self-contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerInfo {
    counter: u16,
    start: u16,
    init: u16,
    auto_reload: bool,
    event: TimerEvent,
}

impl TimerInfo {
    fn from_config(config: &TimerConfig) -> Self {
        Self {
            counter: 0,
            start: config.start,
            init: config.init.min(config.start),
            auto_reload: config.auto_reload,
            event: config.event,
        }
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn start_value(&self) -> u16 {
        self.start
    }

    pub fn is_running(&self) -> bool {
        self.counter > 0
    }
}

/// The flat array of countdown timers.
#[derive(Debug, Default)]
pub struct TimerTable {
    timers: Vec<TimerInfo>,
}

impl TimerTable {
    /// Builds the table with every timer disarmed.
    pub fn new(configs: &[TimerConfig]) -> Self {
        Self {
            timers: configs.iter().map(TimerInfo::from_config).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn get(&self, timer: TimerId) -> Option<&TimerInfo> {
        self.timers.get(timer.index())
    }

    /// Disarms every timer.
    pub fn reset(&mut self) {
        for timer in &mut self.timers {
            timer.counter = 0;
        }
    }

    /// Loads the start value.
    pub fn start_counter(&mut self, timer: TimerId) {
        if let Some(t) = self.timers.get_mut(timer.index()) {
            t.counter = t.start;
        }
    }

    /// Loads the init value used at module and group start.
    pub fn init_counter(&mut self, timer: TimerId) {
        if let Some(t) = self.timers.get_mut(timer.index()) {
            t.counter = t.init;
        }
    }

    /// Disarms the timer.
    pub fn stop_counter(&mut self, timer: TimerId) {
        if let Some(t) = self.timers.get_mut(timer.index()) {
            t.counter = 0;
        }
    }

    pub fn is_running(&self, timer: TimerId) -> bool {
        self.get(timer).is_some_and(TimerInfo::is_running)
    }

    /// Decrements an armed timer and returns its event on underflow.
    ///
    /// An auto-reload timer is reloaded to `start - 1` before the event is
    /// returned, so the next underflow is counted from the current tick.
    pub fn dec_counter(&mut self, timer: TimerId) -> Option<TimerEvent> {
        let t = self.timers.get_mut(timer.index())?;
        if t.counter == 0 {
            return None;
        }
        t.counter -= 1;
        if t.counter != 0 {
            return None;
        }
        if t.auto_reload {
            t.counter = t.start.saturating_sub(1);
        }
        Some(t.event)
    }
}
