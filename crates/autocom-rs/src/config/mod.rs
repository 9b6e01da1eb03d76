// crates/autocom-rs/src/config/mod.rs
//! Static descriptor tables of the COM module.
//!
//! A `ComConfig` is immutable once handed to `Com::init`. The back-reference
//! lists (`groups`, `timeouts`, routes) are derived from the forward tables by
//! [`ComConfig::link`]; [`ComConfig::validate`] rejects any table that is not
//! consistent.

pub mod validation;

pub use validation::ConfigError;

use crate::timer::TimerEvent;
use crate::types::{
    COM_CONFIG_MAGIC, DescriptionRouteId, GwTimeoutId, IpduGroupId, NotificationId, RxPduId,
    RxTimeoutId, RxTpConnectionId, SignalId, SignalRouteId, TimerId, TxPduId, TxTimeoutId,
};
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of a received PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RxPduKind {
    #[default]
    Normal,
    /// Segmented reception through the given TP connection.
    Tp(RxTpConnectionId),
}

/// Kind of a transmitted PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TxPduKind {
    #[default]
    Normal,
    Tp,
}

/// Descriptor of a received I-PDU.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RxPduConfig {
    pub kind: RxPduKind,
    /// Number of metadata bytes carried with every reception.
    pub metadata_len: u8,
    /// Largest expected payload of a Normal PDU. Sizes the deferred copy.
    pub length: usize,
    /// Signal processing happens in `main_function_rx` instead of the indication context.
    pub deferred: bool,
    /// Invoked after the PDU has been unpacked.
    pub notifications: Vec<NotificationId>,
    // --- derived by `ComConfig::link` ---
    pub groups: Vec<IpduGroupId>,
    pub timeouts: Vec<RxTimeoutId>,
    pub signal_routes: Vec<SignalRouteId>,
    pub description_routes: Vec<DescriptionRouteId>,
}

impl RxPduConfig {
    pub fn normal() -> Self {
        Self::default()
    }

    pub fn tp(connection: RxTpConnectionId) -> Self {
        Self { kind: RxPduKind::Tp(connection), ..Self::default() }
    }

    pub fn tp_connection(&self) -> Option<RxTpConnectionId> {
        match self.kind {
            RxPduKind::Tp(connection) => Some(connection),
            RxPduKind::Normal => None,
        }
    }

    /// A PDU without group references is activated at init and deactivated at deinit only.
    pub fn is_always_on(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Descriptor of a transmitted I-PDU.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TxPduConfig {
    pub kind: TxPduKind,
    pub metadata_len: u8,
    /// A failed transmit request stays pending and is retried on the next Tx tick.
    pub retry_on_failure: bool,
    /// Confirmation notifications are invoked from `main_function_tx`.
    pub deferred_confirmation: bool,
    pub confirmation_notifications: Vec<NotificationId>,
    // --- derived by `ComConfig::link` ---
    pub groups: Vec<IpduGroupId>,
    pub timeout: Option<TxTimeoutId>,
    pub gw_timeout: Option<GwTimeoutId>,
}

impl TxPduConfig {
    pub fn normal() -> Self {
        Self::default()
    }

    pub fn is_always_on(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Membership lists of an I-PDU group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IpduGroupConfig {
    pub rx_pdus: Vec<RxPduId>,
    pub tx_pdus: Vec<TxPduId>,
}

/// Descriptor of one countdown timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimerConfig {
    /// Value loaded by `start_counter`.
    pub start: u16,
    /// Value loaded by `init_counter` at module or group start. Never larger than `start`.
    pub init: u16,
    pub auto_reload: bool,
    pub event: TimerEvent,
}

impl TimerConfig {
    pub fn new(start: u16, event: TimerEvent) -> Self {
        Self { start, init: start, auto_reload: false, event }
    }
}

/// Rx deadline monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RxTimeoutConfig {
    pub pdu: RxPduId,
    pub timer: TimerId,
    /// Restart only when this signal's update bit is set (per-signal monitoring).
    #[cfg_attr(feature = "serde", serde(default))]
    pub update_bit: Option<SignalId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub replace_signals: Vec<SignalId>,
    /// Replaced signals are marked for gateway forwarding.
    #[cfg_attr(feature = "serde", serde(default))]
    pub replace_to_gateway: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub notifications: Vec<NotificationId>,
}

impl RxTimeoutConfig {
    pub fn new(pdu: RxPduId, timer: TimerId) -> Self {
        Self {
            pdu,
            timer,
            update_bit: None,
            replace_signals: Vec::new(),
            replace_to_gateway: false,
            notifications: Vec::new(),
        }
    }
}

/// Transmission mode seen by the Tx deadline monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TxDmMode {
    /// The monitor runs while the PDU is active and is reloaded by every confirmation.
    #[default]
    Normal,
    /// The monitor is armed by a transmission; a confirmation only restarts a running monitor.
    None,
}

/// Tx deadline monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TxTimeoutConfig {
    pub pdu: TxPduId,
    pub timer: TimerId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: TxDmMode,
    #[cfg_attr(feature = "serde", serde(default))]
    pub notifications: Vec<NotificationId>,
}

impl TxTimeoutConfig {
    pub fn new(pdu: TxPduId, timer: TimerId, mode: TxDmMode) -> Self {
        Self { pdu, timer, mode, notifications: Vec::new() }
    }
}

/// Transmission mode seen by the gateway timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GwTimeoutMode {
    #[default]
    Periodic,
    None,
}

/// Gateway timeout of a routed Tx PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GwTimeoutConfig {
    pub pdu: TxPduId,
    pub timer: TimerId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: GwTimeoutMode,
}

/// Range of the shared TP buffer owned by one Rx TP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RxTpConnectionConfig {
    pub buffer_start: usize,
    /// Number of bytes in the range, metadata included.
    pub capacity: usize,
}

/// Forwarding of one received signal to a Tx PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalRouteConfig {
    pub source_pdu: RxPduId,
    pub source_signal: SignalId,
    pub destination: TxPduId,
}

/// Forwarding of a whole received PDU description to a Tx PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DescriptionRouteConfig {
    pub source_pdu: RxPduId,
    pub destination: TxPduId,
}

/// Work assigned to one `main_function_rx` partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MainFunctionRxConfig {
    pub deferred_pdus: Vec<RxPduId>,
    pub timeouts: Vec<RxTimeoutId>,
}

/// Work assigned to one `main_function_tx` partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MainFunctionTxConfig {
    pub tx_pdus: Vec<TxPduId>,
    pub timeouts: Vec<TxTimeoutId>,
    pub gw_timeouts: Vec<GwTimeoutId>,
}

/// Work assigned to one `main_function_route_signals` partition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MainFunctionRouteSignalsConfig {
    pub signal_routes: Vec<SignalRouteId>,
    pub description_routes: Vec<DescriptionRouteId>,
}

/// The complete configuration of the module.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ComConfig {
    /// Must equal [`COM_CONFIG_MAGIC`].
    pub magic_number: u32,
    pub configuration_id: u32,
    /// Loop iterations per exclusive-area acquisition; 0 disables chunking.
    pub iteration_threshold: u16,
    pub tp_buffer_size: usize,
    pub rx_pdus: Vec<RxPduConfig>,
    pub tx_pdus: Vec<TxPduConfig>,
    pub groups: Vec<IpduGroupConfig>,
    pub timers: Vec<TimerConfig>,
    pub rx_timeouts: Vec<RxTimeoutConfig>,
    pub tx_timeouts: Vec<TxTimeoutConfig>,
    pub gw_timeouts: Vec<GwTimeoutConfig>,
    pub rx_tp_connections: Vec<RxTpConnectionConfig>,
    pub signal_routes: Vec<SignalRouteConfig>,
    pub description_routes: Vec<DescriptionRouteConfig>,
    pub main_functions_rx: Vec<MainFunctionRxConfig>,
    pub main_functions_tx: Vec<MainFunctionTxConfig>,
    pub main_functions_route_signals: Vec<MainFunctionRouteSignalsConfig>,
}

impl Default for ComConfig {
    fn default() -> Self {
        Self {
            magic_number: COM_CONFIG_MAGIC,
            configuration_id: 0,
            iteration_threshold: 0,
            tp_buffer_size: 0,
            rx_pdus: Vec::new(),
            tx_pdus: Vec::new(),
            groups: Vec::new(),
            timers: Vec::new(),
            rx_timeouts: Vec::new(),
            tx_timeouts: Vec::new(),
            gw_timeouts: Vec::new(),
            rx_tp_connections: Vec::new(),
            signal_routes: Vec::new(),
            description_routes: Vec::new(),
            main_functions_rx: Vec::new(),
            main_functions_tx: Vec::new(),
            main_functions_route_signals: Vec::new(),
        }
    }
}

impl ComConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds every derived back-reference list from the forward tables.
    ///
    /// References that point outside their table are skipped here and
    /// reported by `validate`.
    pub fn link(&mut self) {
        for pdu in &mut self.rx_pdus {
            pdu.groups.clear();
            pdu.timeouts.clear();
            pdu.signal_routes.clear();
            pdu.description_routes.clear();
        }
        for pdu in &mut self.tx_pdus {
            pdu.groups.clear();
            pdu.timeout = None;
            pdu.gw_timeout = None;
        }

        for (index, group) in self.groups.iter().enumerate() {
            let id = IpduGroupId(index as u16);
            for rx in &group.rx_pdus {
                if let Some(pdu) = self.rx_pdus.get_mut(rx.index()) {
                    if !pdu.groups.contains(&id) {
                        pdu.groups.push(id);
                    }
                }
            }
            for tx in &group.tx_pdus {
                if let Some(pdu) = self.tx_pdus.get_mut(tx.index()) {
                    if !pdu.groups.contains(&id) {
                        pdu.groups.push(id);
                    }
                }
            }
        }

        for (index, timeout) in self.rx_timeouts.iter().enumerate() {
            if let Some(pdu) = self.rx_pdus.get_mut(timeout.pdu.index()) {
                pdu.timeouts.push(RxTimeoutId(index as u16));
            }
        }
        for (index, timeout) in self.tx_timeouts.iter().enumerate() {
            if let Some(pdu) = self.tx_pdus.get_mut(timeout.pdu.index()) {
                pdu.timeout = Some(TxTimeoutId(index as u16));
            }
        }
        for (index, timeout) in self.gw_timeouts.iter().enumerate() {
            if let Some(pdu) = self.tx_pdus.get_mut(timeout.pdu.index()) {
                pdu.gw_timeout = Some(GwTimeoutId(index as u16));
            }
        }
        for (index, route) in self.signal_routes.iter().enumerate() {
            if let Some(pdu) = self.rx_pdus.get_mut(route.source_pdu.index()) {
                pdu.signal_routes.push(SignalRouteId(index as u16));
            }
        }
        for (index, route) in self.description_routes.iter().enumerate() {
            if let Some(pdu) = self.rx_pdus.get_mut(route.source_pdu.index()) {
                pdu.description_routes.push(DescriptionRouteId(index as u16));
            }
        }
    }

    /// Convenience for configuration code: link, then validate.
    pub fn linked(mut self) -> Result<Self, ConfigError> {
        self.link();
        self.validate()?;
        Ok(self)
    }

    pub fn rx_pdu(&self, id: RxPduId) -> Option<&RxPduConfig> {
        self.rx_pdus.get(id.index())
    }

    pub fn tx_pdu(&self, id: TxPduId) -> Option<&TxPduConfig> {
        self.tx_pdus.get(id.index())
    }

    pub fn group(&self, id: IpduGroupId) -> Option<&IpduGroupConfig> {
        self.groups.get(id.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn link_derives_back_references() {
        let mut config = ComConfig {
            rx_pdus: vec![RxPduConfig::normal(), RxPduConfig::normal()],
            tx_pdus: vec![TxPduConfig::normal()],
            groups: vec![
                IpduGroupConfig { rx_pdus: vec![RxPduId(0)], tx_pdus: vec![TxPduId(0)] },
                IpduGroupConfig { rx_pdus: vec![RxPduId(0)], tx_pdus: vec![] },
            ],
            timers: vec![TimerConfig::new(5, TimerEvent::RxTimeout(RxTimeoutId(0)))],
            rx_timeouts: vec![RxTimeoutConfig::new(RxPduId(0), TimerId(0))],
            ..ComConfig::default()
        };
        config.link();

        assert_eq!(config.rx_pdus[0].groups, vec![IpduGroupId(0), IpduGroupId(1)]);
        assert!(config.rx_pdus[1].is_always_on());
        assert_eq!(config.rx_pdus[0].timeouts, vec![RxTimeoutId(0)]);
        assert_eq!(config.tx_pdus[0].groups, vec![IpduGroupId(0)]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn link_is_repeatable() {
        let mut config = ComConfig {
            rx_pdus: vec![RxPduConfig::normal()],
            groups: vec![IpduGroupConfig { rx_pdus: vec![RxPduId(0)], tx_pdus: vec![] }],
            ..ComConfig::default()
        };
        config.link();
        config.link();
        assert_eq!(config.rx_pdus[0].groups.len(), 1);
    }
}
