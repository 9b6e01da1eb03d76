// crates/autocom-rs/src/config/validation.rs
use super::{ComConfig, RxPduKind};
use crate::timer::TimerEvent;
use crate::types::{
    COM_CONFIG_MAGIC, DescriptionRouteId, GwTimeoutId, IpduGroupId, RxTimeoutId, SignalRouteId,
    TxTimeoutId,
};
use alloc::vec;
use core::fmt;
use log::error;

/// Reasons a configuration is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `magic_number` does not match [`COM_CONFIG_MAGIC`].
    MagicMismatch(u32),
    /// An entry of `table` at `index` references a handle outside its table.
    DanglingReference { table: &'static str, index: usize },
    /// A derived back-reference list disagrees with the forward table. Call `link()`.
    BackReferenceMismatch { table: &'static str, index: usize },
    /// A timer's init value exceeds its start value.
    TimerInitAboveStart { timer: usize },
    /// A timer's event tag does not point back at the monitor that uses it.
    TimerEventMismatch { timer: usize },
    /// A timer is used by more than one monitor.
    TimerShared { timer: usize },
    /// A TP connection range exceeds `tp_buffer_size` or overlaps another range.
    TpBufferRange { connection: usize },
    /// A TP connection is used by more than one PDU, or its metadata does not fit.
    TpConnectionUsage { connection: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MagicMismatch(v) => write!(
                f,
                "Configuration magic number {v:#010x} does not match {COM_CONFIG_MAGIC:#010x}"
            ),
            Self::DanglingReference { table, index } => {
                write!(f, "Entry {} of {} references a missing handle", index, table)
            }
            Self::BackReferenceMismatch { table, index } => write!(
                f,
                "Back-references of {} entry {} are inconsistent (configuration not linked?)",
                table, index
            ),
            Self::TimerInitAboveStart { timer } => {
                write!(f, "Timer {} has an init value above its start value", timer)
            }
            Self::TimerEventMismatch { timer } => {
                write!(f, "Timer {} is tagged with an event of another monitor", timer)
            }
            Self::TimerShared { timer } => write!(f, "Timer {} is used by more than one monitor", timer),
            Self::TpBufferRange { connection } => {
                write!(f, "TP connection {} has an invalid buffer range", connection)
            }
            Self::TpConnectionUsage { connection } => {
                write!(f, "TP connection {} is not used by exactly one fitting PDU", connection)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl ComConfig {
    /// Checks every cross-reference of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.magic_number != COM_CONFIG_MAGIC {
            error!("[COM] Configuration rejected: magic number {:#010x}", self.magic_number);
            return Err(ConfigError::MagicMismatch(self.magic_number));
        }
        self.validate_groups()?;
        self.validate_timers()?;
        self.validate_tp()?;
        self.validate_routes()?;
        self.validate_partitions()?;
        Ok(())
    }

    fn validate_groups(&self) -> Result<(), ConfigError> {
        let tx_count = self.tx_pdus.len();
        for (index, group) in self.groups.iter().enumerate() {
            let id = IpduGroupId(index as u16);
            for rx in &group.rx_pdus {
                let pdu = self
                    .rx_pdus
                    .get(rx.index())
                    .ok_or(ConfigError::DanglingReference { table: "groups", index })?;
                if !pdu.groups.contains(&id) {
                    return Err(ConfigError::BackReferenceMismatch { table: "rx_pdus", index: rx.index() });
                }
            }
            for tx in &group.tx_pdus {
                let pdu = self
                    .tx_pdus
                    .get(tx.index())
                    .ok_or(ConfigError::DanglingReference { table: "groups", index })?;
                if !pdu.groups.contains(&id) {
                    return Err(ConfigError::BackReferenceMismatch { table: "tx_pdus", index: tx.index() });
                }
            }
        }
        for (index, pdu) in self.rx_pdus.iter().enumerate() {
            for group in &pdu.groups {
                let listed = self
                    .groups
                    .get(group.index())
                    .is_some_and(|g| g.rx_pdus.iter().any(|rx| rx.index() == index));
                if !listed {
                    return Err(ConfigError::BackReferenceMismatch { table: "rx_pdus", index });
                }
            }
            if pdu.timeouts.iter().any(|t| {
                self.rx_timeouts.get(t.index()).is_none_or(|cfg| cfg.pdu.index() != index)
            }) {
                return Err(ConfigError::BackReferenceMismatch { table: "rx_pdus", index });
            }
            if let RxPduKind::Tp(connection) = pdu.kind {
                if connection.index() >= self.rx_tp_connections.len() {
                    return Err(ConfigError::DanglingReference { table: "rx_pdus", index });
                }
            }
        }
        for (index, pdu) in self.tx_pdus.iter().enumerate() {
            for group in &pdu.groups {
                let listed = self
                    .groups
                    .get(group.index())
                    .is_some_and(|g| g.tx_pdus.iter().any(|tx| tx.index() == index));
                if !listed {
                    return Err(ConfigError::BackReferenceMismatch { table: "tx_pdus", index });
                }
            }
            let timeout_ok = pdu.timeout.is_none_or(|t| {
                self.tx_timeouts.get(t.index()).is_some_and(|cfg| cfg.pdu.index() == index)
            });
            let gw_ok = pdu.gw_timeout.is_none_or(|t| {
                self.gw_timeouts.get(t.index()).is_some_and(|cfg| cfg.pdu.index() == index)
            });
            if !timeout_ok || !gw_ok {
                return Err(ConfigError::BackReferenceMismatch { table: "tx_pdus", index });
            }
        }
        for (index, timeout) in self.rx_timeouts.iter().enumerate() {
            let id = RxTimeoutId(index as u16);
            let pdu = self
                .rx_pdus
                .get(timeout.pdu.index())
                .ok_or(ConfigError::DanglingReference { table: "rx_timeouts", index })?;
            if !pdu.timeouts.contains(&id) {
                return Err(ConfigError::BackReferenceMismatch { table: "rx_timeouts", index });
            }
        }
        for (index, timeout) in self.tx_timeouts.iter().enumerate() {
            if timeout.pdu.index() >= tx_count {
                return Err(ConfigError::DanglingReference { table: "tx_timeouts", index });
            }
            if self.tx_pdus[timeout.pdu.index()].timeout != Some(TxTimeoutId(index as u16)) {
                return Err(ConfigError::BackReferenceMismatch { table: "tx_timeouts", index });
            }
        }
        for (index, timeout) in self.gw_timeouts.iter().enumerate() {
            if timeout.pdu.index() >= tx_count {
                return Err(ConfigError::DanglingReference { table: "gw_timeouts", index });
            }
            if self.tx_pdus[timeout.pdu.index()].gw_timeout != Some(GwTimeoutId(index as u16)) {
                return Err(ConfigError::BackReferenceMismatch { table: "gw_timeouts", index });
            }
        }
        Ok(())
    }

    fn validate_timers(&self) -> Result<(), ConfigError> {
        for (index, timer) in self.timers.iter().enumerate() {
            if timer.init > timer.start {
                return Err(ConfigError::TimerInitAboveStart { timer: index });
            }
        }

        let mut used = vec![false; self.timers.len()];
        let mut claim = |timer: usize, expected: TimerEvent| -> Result<(), ConfigError> {
            let config = self.timers.get(timer).ok_or(ConfigError::DanglingReference {
                table: "timers",
                index: timer,
            })?;
            if config.event != expected {
                return Err(ConfigError::TimerEventMismatch { timer });
            }
            if core::mem::replace(&mut used[timer], true) {
                return Err(ConfigError::TimerShared { timer });
            }
            Ok(())
        };

        for (index, timeout) in self.rx_timeouts.iter().enumerate() {
            claim(timeout.timer.index(), TimerEvent::RxTimeout(RxTimeoutId(index as u16)))?;
        }
        for (index, timeout) in self.tx_timeouts.iter().enumerate() {
            claim(timeout.timer.index(), TimerEvent::TxTimeout(TxTimeoutId(index as u16)))?;
        }
        for (index, timeout) in self.gw_timeouts.iter().enumerate() {
            claim(timeout.timer.index(), TimerEvent::GwTimeout(GwTimeoutId(index as u16)))?;
        }
        Ok(())
    }

    fn validate_tp(&self) -> Result<(), ConfigError> {
        for (index, connection) in self.rx_tp_connections.iter().enumerate() {
            let end = connection.buffer_start.checked_add(connection.capacity);
            if end.is_none_or(|end| end > self.tp_buffer_size) {
                return Err(ConfigError::TpBufferRange { connection: index });
            }
            let overlaps = self.rx_tp_connections.iter().enumerate().any(|(other_index, other)| {
                other_index != index
                    && connection.capacity > 0
                    && other.capacity > 0
                    && connection.buffer_start < other.buffer_start + other.capacity
                    && other.buffer_start < connection.buffer_start + connection.capacity
            });
            if overlaps {
                return Err(ConfigError::TpBufferRange { connection: index });
            }

            let mut users = self
                .rx_pdus
                .iter()
                .filter(|pdu| pdu.tp_connection().is_some_and(|c| c.index() == index));
            match (users.next(), users.next()) {
                (Some(pdu), None) if usize::from(pdu.metadata_len) <= connection.capacity => {}
                _ => return Err(ConfigError::TpConnectionUsage { connection: index }),
            }
        }
        Ok(())
    }

    fn validate_routes(&self) -> Result<(), ConfigError> {
        for (index, route) in self.signal_routes.iter().enumerate() {
            if route.source_pdu.index() >= self.rx_pdus.len()
                || route.destination.index() >= self.tx_pdus.len()
            {
                return Err(ConfigError::DanglingReference { table: "signal_routes", index });
            }
            let id = SignalRouteId(index as u16);
            if !self.rx_pdus[route.source_pdu.index()].signal_routes.contains(&id) {
                return Err(ConfigError::BackReferenceMismatch { table: "signal_routes", index });
            }
        }
        for (index, route) in self.description_routes.iter().enumerate() {
            if route.source_pdu.index() >= self.rx_pdus.len()
                || route.destination.index() >= self.tx_pdus.len()
            {
                return Err(ConfigError::DanglingReference { table: "description_routes", index });
            }
            let id = DescriptionRouteId(index as u16);
            if !self.rx_pdus[route.source_pdu.index()].description_routes.contains(&id) {
                return Err(ConfigError::BackReferenceMismatch { table: "description_routes", index });
            }
        }
        for (index, pdu) in self.rx_pdus.iter().enumerate() {
            let signals_ok = pdu.signal_routes.iter().all(|r| {
                self.signal_routes.get(r.index()).is_some_and(|cfg| cfg.source_pdu.index() == index)
            });
            let descriptions_ok = pdu.description_routes.iter().all(|r| {
                self.description_routes
                    .get(r.index())
                    .is_some_and(|cfg| cfg.source_pdu.index() == index)
            });
            if !signals_ok || !descriptions_ok {
                return Err(ConfigError::BackReferenceMismatch { table: "rx_pdus", index });
            }
        }
        Ok(())
    }

    fn validate_partitions(&self) -> Result<(), ConfigError> {
        for (index, partition) in self.main_functions_rx.iter().enumerate() {
            let bad_pdu = partition.deferred_pdus.iter().any(|p| p.index() >= self.rx_pdus.len());
            let bad_timeout = partition.timeouts.iter().any(|t| t.index() >= self.rx_timeouts.len());
            if bad_pdu || bad_timeout {
                return Err(ConfigError::DanglingReference { table: "main_functions_rx", index });
            }
        }
        for (index, partition) in self.main_functions_tx.iter().enumerate() {
            let bad = partition.tx_pdus.iter().any(|p| p.index() >= self.tx_pdus.len())
                || partition.timeouts.iter().any(|t| t.index() >= self.tx_timeouts.len())
                || partition.gw_timeouts.iter().any(|t| t.index() >= self.gw_timeouts.len());
            if bad {
                return Err(ConfigError::DanglingReference { table: "main_functions_tx", index });
            }
        }
        for (index, partition) in self.main_functions_route_signals.iter().enumerate() {
            let bad = partition.signal_routes.iter().any(|r| r.index() >= self.signal_routes.len())
                || partition
                    .description_routes
                    .iter()
                    .any(|r| r.index() >= self.description_routes.len());
            if bad {
                return Err(ConfigError::DanglingReference {
                    table: "main_functions_route_signals",
                    index,
                });
            }
        }
        Ok(())
    }
}
