// crates/autocom-rs/src/deadline/tx.rs
use super::TimeoutState;
use crate::config::{ComConfig, TxDmMode, TxTimeoutConfig};
use crate::hal::TxEngine;
use crate::timer::TimerTable;
use crate::types::TxTimeoutId;
use alloc::vec;
use alloc::vec::Vec;
use log::{trace, warn};

/// Transmission deadline monitors, one state per configured Tx timeout.
#[derive(Debug, Default)]
pub struct TxDeadlineMonitor {
    states: Vec<TimeoutState>,
}

impl TxDeadlineMonitor {
    pub fn new(count: usize) -> Self {
        Self { states: vec![TimeoutState::default(); count] }
    }

    pub fn reset(&mut self) {
        self.states.fill(TimeoutState::default());
    }

    pub fn state(&self, id: TxTimeoutId) -> Option<TimeoutState> {
        self.states.get(id.index()).copied()
    }

    pub fn is_active(&self, id: TxTimeoutId) -> bool {
        self.state(id).is_some_and(|s| s.active)
    }

    pub fn occurred(&self, id: TxTimeoutId) -> bool {
        self.state(id).is_some_and(|s| s.occurred)
    }

    pub fn clear_occurred(&mut self, id: TxTimeoutId) -> bool {
        self.states
            .get_mut(id.index())
            .is_some_and(|s| core::mem::take(&mut s.occurred))
    }

    /// In Normal mode the monitor starts counting at once; in None mode it
    /// waits for the first transmission.
    pub fn activate(&mut self, id: TxTimeoutId, config: &TxTimeoutConfig, timers: &mut TimerTable) {
        let Some(state) = self.states.get_mut(id.index()) else {
            return;
        };
        state.active = true;
        match config.mode {
            TxDmMode::Normal => timers.init_counter(config.timer),
            TxDmMode::None => timers.stop_counter(config.timer),
        }
    }

    pub fn deactivate(&mut self, id: TxTimeoutId, config: &TxTimeoutConfig, timers: &mut TimerTable) {
        if let Some(state) = self.states.get_mut(id.index()) {
            state.active = false;
            timers.stop_counter(config.timer);
        }
    }

    pub fn on_confirmation(&mut self, id: TxTimeoutId, config: &TxTimeoutConfig, timers: &mut TimerTable) {
        if !self.is_active(id) {
            return;
        }
        match config.mode {
            TxDmMode::Normal => timers.start_counter(config.timer),
            TxDmMode::None => {
                if timers.is_running(config.timer) {
                    timers.start_counter(config.timer);
                }
            }
        }
    }

    /// A transmission was issued: arm an idle None-mode monitor.
    pub fn arm_on_transmit(&mut self, id: TxTimeoutId, config: &TxTimeoutConfig, timers: &mut TimerTable) {
        if config.mode == TxDmMode::None && self.is_active(id) && !timers.is_running(config.timer) {
            trace!("[DM] {} armed by transmission of {}", id, config.pdu);
            timers.start_counter(config.timer);
        }
    }

    /// Handles an expired monitor. Pending transmissions of the PDU are
    /// cancelled; a retry-on-failure request is dropped as well.
    pub fn on_timeout<E: TxEngine + ?Sized>(
        &mut self,
        id: TxTimeoutId,
        config: &ComConfig,
        engine: &mut E,
        tx_requests: &mut [bool],
    ) -> bool {
        let Some(state) = self.states.get_mut(id.index()) else {
            return false;
        };
        if !state.active {
            return false;
        }
        state.occurred = true;

        let timeout = &config.tx_timeouts[id.index()];
        let pdu = timeout.pdu;
        warn!("[DM] {} expired, no confirmation for {}", id, pdu);
        engine.stop_repetitions(pdu);
        engine.reset_min_delay(pdu);
        engine.cancel_transmit(pdu);
        if config.tx_pdu(pdu).is_some_and(|p| p.retry_on_failure) {
            if let Some(request) = tx_requests.get_mut(pdu.index()) {
                *request = false;
            }
        }
        true
    }
}
