// crates/autocom-rs/src/com/state.rs
use crate::config::{ComConfig, RxPduConfig};
use crate::deadline::{RxDeadlineMonitor, TxDeadlineMonitor};
use crate::gateway::RoutingFlags;
use crate::group::IpduGroupState;
use crate::timer::TimerTable;
use crate::tp::RxTpTable;
use alloc::vec;
use alloc::vec::Vec;

/// A reception waiting for `main_function_rx`.
///
/// Normal PDUs keep a copy of their payload here. TP PDUs leave the payload
/// in the locked TP buffer and only set `pending`. The copy is reserved at
/// `init` from the configured length; a longer payload grows it once.
#[derive(Debug, Clone, Default)]
pub struct DeferredRx {
    pub pending: bool,
    pub sdu: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl DeferredRx {
    /// Storage for one deferred Normal PDU.
    pub fn reserved(pdu: &RxPduConfig) -> Self {
        if !pdu.deferred || pdu.tp_connection().is_some() {
            return Self::default();
        }
        Self {
            pending: false,
            sdu: Vec::with_capacity(pdu.length),
            metadata: Vec::with_capacity(usize::from(pdu.metadata_len)),
        }
    }

    pub fn clear(&mut self) {
        self.pending = false;
        self.sdu.clear();
        self.metadata.clear();
    }
}

/// Holds the complete dynamic state of the module.
///
/// Every vector is sized from the configuration at `init` and never resized.
#[derive(Debug, Default)]
pub struct ComContext {
    pub groups: Vec<IpduGroupState>,
    pub rx_active: Vec<bool>,
    pub tx_active: Vec<bool>,
    pub timers: TimerTable,
    pub rx_dm: RxDeadlineMonitor,
    pub tx_dm: TxDeadlineMonitor,
    pub tp: RxTpTable,
    pub rx_deferred: Vec<DeferredRx>,
    /// Transmit requests set by `trigger_ipdu_send`, consumed by the Tx tick.
    pub tx_requests: Vec<bool>,
    /// Confirmations whose notifications are deferred to the Tx tick.
    pub tx_confirmations: Vec<bool>,
    pub routing: RoutingFlags,
}

impl ComContext {
    pub fn new(config: &ComConfig) -> Self {
        Self {
            groups: vec![IpduGroupState::Inactive; config.groups.len()],
            rx_active: vec![false; config.rx_pdus.len()],
            tx_active: vec![false; config.tx_pdus.len()],
            timers: TimerTable::new(&config.timers),
            rx_dm: RxDeadlineMonitor::new(config.rx_timeouts.len()),
            tx_dm: TxDeadlineMonitor::new(config.tx_timeouts.len()),
            tp: RxTpTable::new(config),
            rx_deferred: config.rx_pdus.iter().map(DeferredRx::reserved).collect(),
            tx_requests: vec![false; config.tx_pdus.len()],
            tx_confirmations: vec![false; config.tx_pdus.len()],
            routing: RoutingFlags::new(config),
        }
    }
}
