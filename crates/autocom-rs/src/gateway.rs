// crates/autocom-rs/src/gateway.rs
//! Signal routing flags and the gateway timeout of routed Tx PDUs.

use crate::config::{ComConfig, GwTimeoutConfig, GwTimeoutMode, RxPduConfig};
use crate::hal::TxEngine;
use crate::timer::TimerTable;
use crate::types::{DescriptionRouteId, GwTimeoutId, SignalId, SignalRouteId};
use alloc::vec;
use alloc::vec::Vec;
use log::{trace, warn};

/// Pending-forward flags, one per routing entry. Set on the Rx side, consumed
/// by `main_function_route_signals`.
#[derive(Debug, Default)]
pub struct RoutingFlags {
    signal: Vec<bool>,
    description: Vec<bool>,
}

impl RoutingFlags {
    pub fn new(config: &ComConfig) -> Self {
        Self {
            signal: vec![false; config.signal_routes.len()],
            description: vec![false; config.description_routes.len()],
        }
    }

    pub fn reset(&mut self) {
        self.signal.fill(false);
        self.description.fill(false);
    }

    /// A reception of the PDU makes every route sourced from it pending.
    pub fn mark_reception(&mut self, pdu: &RxPduConfig) {
        for route in &pdu.signal_routes {
            self.signal[route.index()] = true;
        }
        for route in &pdu.description_routes {
            self.description[route.index()] = true;
        }
    }

    /// A replace value written into `signal` is forwarded like received data.
    pub fn mark_signal(&mut self, pdu: &RxPduConfig, config: &ComConfig, signal: SignalId) {
        for route in &pdu.signal_routes {
            if config.signal_routes[route.index()].source_signal == signal {
                self.signal[route.index()] = true;
            }
        }
    }

    /// Drops everything pending for the PDU.
    pub fn clear_pdu(&mut self, pdu: &RxPduConfig) {
        for route in &pdu.signal_routes {
            self.signal[route.index()] = false;
        }
        for route in &pdu.description_routes {
            self.description[route.index()] = false;
        }
    }

    pub fn take_signal(&mut self, route: SignalRouteId) -> bool {
        self.signal
            .get_mut(route.index())
            .is_some_and(|flag| core::mem::take(flag))
    }

    pub fn take_description(&mut self, route: DescriptionRouteId) -> bool {
        self.description
            .get_mut(route.index())
            .is_some_and(|flag| core::mem::take(flag))
    }

    pub fn is_signal_pending(&self, route: SignalRouteId) -> bool {
        self.signal.get(route.index()).copied().unwrap_or(false)
    }
}

/// Loads the gateway counter when its PDU is activated.
pub fn init_counter(config: &GwTimeoutConfig, timers: &mut TimerTable) {
    match config.mode {
        GwTimeoutMode::Periodic => timers.init_counter(config.timer),
        GwTimeoutMode::None => timers.stop_counter(config.timer),
    }
}

pub fn stop_counter(config: &GwTimeoutConfig, timers: &mut TimerTable) {
    timers.stop_counter(config.timer);
}

/// New routed data arrived for the PDU.
pub fn event<E: TxEngine + ?Sized>(config: &GwTimeoutConfig, timers: &mut TimerTable, engine: &mut E) {
    match config.mode {
        GwTimeoutMode::Periodic => {
            engine.start_cyclic(config.pdu);
            timers.start_counter(config.timer);
            trace!("[GW] {} re-armed by routed data", config.pdu);
        }
        GwTimeoutMode::None => timers.stop_counter(config.timer),
    }
}

/// The routed source went silent: stop transmitting stale data.
pub fn on_timeout<E: TxEngine + ?Sized>(id: GwTimeoutId, config: &GwTimeoutConfig, engine: &mut E) {
    warn!(
        "[GW] {} expired, stopping cyclic transmission of {}",
        id, config.pdu
    );
    engine.stop_cyclic(config.pdu);
}
