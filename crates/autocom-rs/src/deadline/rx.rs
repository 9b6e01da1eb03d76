// crates/autocom-rs/src/deadline/rx.rs
use super::TimeoutState;
use crate::config::{ComConfig, RxPduConfig, RxTimeoutConfig};
use crate::gateway::RoutingFlags;
use crate::hal::SignalCodec;
use crate::timer::TimerTable;
use crate::types::RxTimeoutId;
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, warn};

/// Reception deadline monitors, one state per configured Rx timeout.
#[derive(Debug, Default)]
pub struct RxDeadlineMonitor {
    states: Vec<TimeoutState>,
}

impl RxDeadlineMonitor {
    pub fn new(count: usize) -> Self {
        Self { states: vec![TimeoutState::default(); count] }
    }

    pub fn reset(&mut self) {
        self.states.fill(TimeoutState::default());
    }

    pub fn state(&self, id: RxTimeoutId) -> Option<TimeoutState> {
        self.states.get(id.index()).copied()
    }

    pub fn is_active(&self, id: RxTimeoutId) -> bool {
        self.state(id).is_some_and(|s| s.active)
    }

    pub fn occurred(&self, id: RxTimeoutId) -> bool {
        self.state(id).is_some_and(|s| s.occurred)
    }

    /// Clears the occurred bit and returns its previous value.
    pub fn clear_occurred(&mut self, id: RxTimeoutId) -> bool {
        self.states
            .get_mut(id.index())
            .is_some_and(|s| core::mem::take(&mut s.occurred))
    }

    /// Starts watching the monitor with its first-timeout value.
    pub fn activate(&mut self, id: RxTimeoutId, config: &RxTimeoutConfig, timers: &mut TimerTable) {
        if let Some(state) = self.states.get_mut(id.index()) {
            state.active = true;
            timers.init_counter(config.timer);
        }
    }

    pub fn deactivate(&mut self, id: RxTimeoutId, config: &RxTimeoutConfig, timers: &mut TimerTable) {
        if let Some(state) = self.states.get_mut(id.index()) {
            state.active = false;
            timers.stop_counter(config.timer);
        }
    }

    /// Activates every monitor of the PDU that is not already active.
    pub fn activate_pdu(&mut self, pdu: &RxPduConfig, config: &ComConfig, timers: &mut TimerTable) {
        for &id in &pdu.timeouts {
            if !self.is_active(id) {
                self.activate(id, &config.rx_timeouts[id.index()], timers);
            }
        }
    }

    pub fn deactivate_pdu(&mut self, pdu: &RxPduConfig, config: &ComConfig, timers: &mut TimerTable) {
        for &id in &pdu.timeouts {
            self.deactivate(id, &config.rx_timeouts[id.index()], timers);
        }
    }

    /// Reloads the monitors of a received PDU.
    ///
    /// A monitor bound to an update bit is only reloaded when the codec sees
    /// that bit set in `sdu`; without payload it is left running.
    pub fn on_reception<C: SignalCodec + ?Sized>(
        &mut self,
        pdu: &RxPduConfig,
        config: &ComConfig,
        timers: &mut TimerTable,
        codec: &C,
        sdu: Option<&[u8]>,
    ) {
        for &id in &pdu.timeouts {
            if !self.is_active(id) {
                continue;
            }
            let timeout = &config.rx_timeouts[id.index()];
            let reload = match (timeout.update_bit, sdu) {
                (None, _) => true,
                (Some(signal), Some(sdu)) => codec.is_updated(signal, sdu),
                (Some(_), None) => false,
            };
            if reload {
                timers.start_counter(timeout.timer);
            }
        }
    }

    /// Handles an expired monitor.
    ///
    /// Returns `false` if the monitor is not active, in which case nothing was
    /// done and no notification is due.
    pub fn on_timeout<C: SignalCodec + ?Sized>(
        &mut self,
        id: RxTimeoutId,
        config: &ComConfig,
        codec: &mut C,
        routing: &mut RoutingFlags,
    ) -> bool {
        let Some(state) = self.states.get_mut(id.index()) else {
            return false;
        };
        if !state.active {
            debug!("[DM] {} expired while inactive, ignored", id);
            return false;
        }
        state.occurred = true;

        let timeout = &config.rx_timeouts[id.index()];
        warn!("[DM] {} expired for {}", id, timeout.pdu);
        for &signal in &timeout.replace_signals {
            codec.apply_replace_value(signal);
        }
        if timeout.replace_to_gateway {
            if let Some(pdu) = config.rx_pdu(timeout.pdu) {
                for &signal in &timeout.replace_signals {
                    routing.mark_signal(pdu, config, signal);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SignalRouteConfig, TimerConfig, TxPduConfig};
    use crate::timer::TimerEvent;
    use crate::types::{RxPduId, SignalId, SignalRouteId, TimerId, TxPduId};

    #[derive(Default)]
    struct Codec {
        replaced: Vec<SignalId>,
    }

    impl SignalCodec for Codec {
        // Update bit is bit 0 of the first byte.
        fn is_updated(&self, _signal: SignalId, sdu: &[u8]) -> bool {
            sdu.first().is_some_and(|b| b & 1 != 0)
        }

        fn apply_replace_value(&mut self, signal: SignalId) {
            self.replaced.push(signal);
        }
    }

    fn config(update_bit: Option<SignalId>) -> ComConfig {
        let mut timeout = RxTimeoutConfig::new(RxPduId(0), TimerId(0));
        timeout.update_bit = update_bit;
        timeout.replace_signals = vec![SignalId(7)];
        timeout.replace_to_gateway = true;
        let mut config = ComConfig {
            rx_pdus: vec![RxPduConfig::normal()],
            tx_pdus: vec![TxPduConfig::normal()],
            timers: vec![TimerConfig {
                start: 5,
                init: 2,
                auto_reload: true,
                event: TimerEvent::RxTimeout(RxTimeoutId(0)),
            }],
            rx_timeouts: vec![timeout],
            signal_routes: vec![SignalRouteConfig {
                source_pdu: RxPduId(0),
                source_signal: SignalId(7),
                destination: TxPduId(0),
            }],
            ..ComConfig::default()
        };
        config.link();
        config
    }

    #[test]
    fn activation_loads_init_value_and_deactivation_stops() {
        let config = config(None);
        let mut timers = TimerTable::new(&config.timers);
        let mut dm = RxDeadlineMonitor::new(1);

        dm.activate_pdu(&config.rx_pdus[0], &config, &mut timers);
        assert!(dm.is_active(RxTimeoutId(0)));
        assert_eq!(timers.get(TimerId(0)).unwrap().counter(), 2);

        dm.deactivate_pdu(&config.rx_pdus[0], &config, &mut timers);
        assert!(!dm.is_active(RxTimeoutId(0)));
        assert!(!timers.is_running(TimerId(0)));
    }

    #[test]
    fn update_bit_gates_the_reload() {
        let config = config(Some(SignalId(3)));
        let mut timers = TimerTable::new(&config.timers);
        let mut dm = RxDeadlineMonitor::new(1);
        let codec = Codec::default();
        dm.activate_pdu(&config.rx_pdus[0], &config, &mut timers);

        dm.on_reception(&config.rx_pdus[0], &config, &mut timers, &codec, Some(&[0x00][..]));
        assert_eq!(timers.get(TimerId(0)).unwrap().counter(), 2);

        dm.on_reception(&config.rx_pdus[0], &config, &mut timers, &codec, Some(&[0x01][..]));
        assert_eq!(timers.get(TimerId(0)).unwrap().counter(), 5);
    }

    #[test]
    fn timeout_replaces_signals_and_marks_routes() {
        let config = config(None);
        let mut dm = RxDeadlineMonitor::new(1);
        let mut timers = TimerTable::new(&config.timers);
        let mut codec = Codec::default();
        let mut routing = RoutingFlags::new(&config);

        assert!(!dm.on_timeout(RxTimeoutId(0), &config, &mut codec, &mut routing));

        dm.activate_pdu(&config.rx_pdus[0], &config, &mut timers);
        assert!(dm.on_timeout(RxTimeoutId(0), &config, &mut codec, &mut routing));
        assert_eq!(codec.replaced, [SignalId(7)]);
        assert!(routing.is_signal_pending(SignalRouteId(0)));
        assert!(dm.occurred(RxTimeoutId(0)));
    }

    #[test]
    fn occurred_survives_deactivation_until_cleared() {
        let config = config(None);
        let mut dm = RxDeadlineMonitor::new(1);
        let mut timers = TimerTable::new(&config.timers);
        let mut codec = Codec::default();
        let mut routing = RoutingFlags::new(&config);

        dm.activate_pdu(&config.rx_pdus[0], &config, &mut timers);
        dm.on_timeout(RxTimeoutId(0), &config, &mut codec, &mut routing);
        dm.deactivate_pdu(&config.rx_pdus[0], &config, &mut timers);

        assert!(dm.occurred(RxTimeoutId(0)));
        assert!(dm.clear_occurred(RxTimeoutId(0)));
        assert!(!dm.occurred(RxTimeoutId(0)));
        assert!(!dm.clear_occurred(RxTimeoutId(0)));
    }
}
