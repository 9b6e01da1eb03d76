// crates/autocom-rs/src/com/tick.rs
//! Periodic entry points. Each partition processes only the handles its
//! configuration lists; an unknown partition or an uninitialized module
//! makes the call a silent no-op.

use super::rx::process_reception;
use super::{Com, ComContext};
use crate::config::ComConfig;
use crate::det::ErrorReporter;
use crate::exclusive::ChunkedSection;
use crate::gateway;
use crate::hal::{Area, ComPlatform};
use crate::log::{LogContext, com_debug};
use crate::timer::TimerEvent;
use crate::types::{ComStatus, DescriptionRouteId, PduInfo, SignalRouteId};
use alloc::vec::Vec;

/// Performs the tag switch for an expired timer. Notifications run with the
/// section suspended.
fn dispatch<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
    section: &mut ChunkedSection,
    event: TimerEvent,
) {
    match event {
        TimerEvent::RxTimeout(id) => {
            if ctx.rx_dm.on_timeout(id, config, platform, &mut ctx.routing) {
                let notifications = &config.rx_timeouts[id.index()].notifications;
                if !notifications.is_empty() {
                    section.suspend(platform, |p| {
                        for &n in notifications {
                            p.rx_timeout(n);
                        }
                    });
                }
            }
        }
        TimerEvent::TxTimeout(id) => {
            if ctx.tx_dm.on_timeout(id, config, platform, &mut ctx.tx_requests) {
                let notifications = &config.tx_timeouts[id.index()].notifications;
                if !notifications.is_empty() {
                    section.suspend(platform, |p| {
                        for &n in notifications {
                            p.tx_timeout(n);
                        }
                    });
                }
            }
        }
        TimerEvent::GwTimeout(id) => {
            gateway::on_timeout(id, &config.gw_timeouts[id.index()], platform);
        }
        TimerEvent::None => {}
    }
}

impl<'c, P: ComPlatform, R: ErrorReporter> Com<'c, P, R> {
    fn tick_config(&self) -> Option<&'c ComConfig> {
        match self.status {
            ComStatus::Init => self.config,
            ComStatus::Uninit => None,
        }
    }

    /// Rx tick: deferred receptions first, then the Rx deadline countdown.
    pub fn main_function_rx(&mut self, partition: usize) {
        let Some(config) = self.tick_config() else {
            return;
        };
        let Some(work) = config.main_functions_rx.get(partition) else {
            return;
        };
        let ctx = &mut self.context;
        let platform = &mut self.platform;
        let mut section = ChunkedSection::enter(platform, Area::Rx, config.iteration_threshold);

        for &id in &work.deferred_pdus {
            let i = id.index();
            if !ctx.rx_active[i] || !ctx.rx_deferred[i].pending {
                continue;
            }
            let pdu = &config.rx_pdus[i];
            ctx.rx_deferred[i].pending = false;
            match pdu.tp_connection() {
                Some(connection) => {
                    let info = PduInfo {
                        sdu: Some(ctx.tp.payload(connection)),
                        metadata: Some(ctx.tp.metadata(connection)),
                    };
                    process_reception(
                        config,
                        id,
                        &info,
                        platform,
                        &mut ctx.rx_dm,
                        &mut ctx.timers,
                        &mut ctx.routing,
                    );
                    ctx.tp.reset(connection);
                }
                None => {
                    let deferred = &ctx.rx_deferred[i];
                    let info = PduInfo {
                        sdu: Some(deferred.sdu.as_slice()),
                        metadata: Some(deferred.metadata.as_slice()),
                    };
                    process_reception(
                        config,
                        id,
                        &info,
                        platform,
                        &mut ctx.rx_dm,
                        &mut ctx.timers,
                        &mut ctx.routing,
                    );
                    ctx.rx_deferred[i].clear();
                }
            }
            if !pdu.notifications.is_empty() {
                section.suspend(platform, |p| {
                    for &n in &pdu.notifications {
                        p.rx_indication(n);
                    }
                });
            }
            section.check(platform);
        }

        for &id in &work.timeouts {
            let timer = config.rx_timeouts[id.index()].timer;
            if let Some(event) = ctx.timers.dec_counter(timer) {
                dispatch(ctx, config, platform, &mut section, event);
            }
            section.check(platform);
        }
        section.leave(platform);
    }

    /// Tx tick: Tx mode, Tx deadline countdown, gateway countdown, transmit
    /// requests and deferred confirmations, in that order.
    pub fn main_function_tx(&mut self, partition: usize) {
        let Some(config) = self.tick_config() else {
            return;
        };
        let Some(work) = config.main_functions_tx.get(partition) else {
            return;
        };
        let ctx = &mut self.context;
        let platform = &mut self.platform;
        let mut section = ChunkedSection::enter(platform, Area::Tx, config.iteration_threshold);

        for &id in &work.tx_pdus {
            if ctx.tx_active[id.index()] {
                platform.process_tx_mode(id);
            }
            section.check(platform);
        }

        for &id in &work.timeouts {
            let timer = config.tx_timeouts[id.index()].timer;
            if let Some(event) = ctx.timers.dec_counter(timer) {
                dispatch(ctx, config, platform, &mut section, event);
            }
            section.check(platform);
        }

        for &id in &work.gw_timeouts {
            let gw = &config.gw_timeouts[id.index()];
            if ctx.tx_active[gw.pdu.index()] {
                if let Some(event) = ctx.timers.dec_counter(gw.timer) {
                    dispatch(ctx, config, platform, &mut section, event);
                }
            }
            section.check(platform);
        }

        for &id in &work.tx_pdus {
            let i = id.index();
            if ctx.tx_active[i] && ctx.tx_requests[i] {
                let pdu = &config.tx_pdus[i];
                match platform.transmit(id) {
                    Ok(()) => {
                        ctx.tx_requests[i] = false;
                        if let Some(timeout) = pdu.timeout {
                            ctx.tx_dm.arm_on_transmit(
                                timeout,
                                &config.tx_timeouts[timeout.index()],
                                &mut ctx.timers,
                            );
                        }
                    }
                    Err(e) => {
                        com_debug!(ctx: LogContext::tx(id.0), "Transmit failed: {} (retry: {})", e, pdu.retry_on_failure);
                        if !pdu.retry_on_failure {
                            ctx.tx_requests[i] = false;
                        }
                    }
                }
            }
            section.check(platform);
        }

        for &id in &work.tx_pdus {
            let i = id.index();
            if core::mem::take(&mut ctx.tx_confirmations[i]) {
                let notifications = &config.tx_pdus[i].confirmation_notifications;
                section.suspend(platform, |p| {
                    for &n in notifications {
                        p.tx_confirmation(n);
                    }
                });
            }
        }
        section.leave(platform);
    }

    /// Forwards routed signals and descriptions whose source was received
    /// since the last call.
    pub fn main_function_route_signals(&mut self, partition: usize) {
        let Some(config) = self.tick_config() else {
            return;
        };
        let Some(work) = config.main_functions_route_signals.get(partition) else {
            return;
        };
        let ctx = &mut self.context;
        let platform = &mut self.platform;

        let section = ChunkedSection::enter(platform, Area::Rx, config.iteration_threshold);
        let signals: Vec<SignalRouteId> = work
            .signal_routes
            .iter()
            .copied()
            .filter(|&route| ctx.routing.take_signal(route))
            .collect();
        let descriptions: Vec<DescriptionRouteId> = work
            .description_routes
            .iter()
            .copied()
            .filter(|&route| ctx.routing.take_description(route))
            .collect();
        section.leave(platform);

        if signals.is_empty() && descriptions.is_empty() {
            return;
        }

        let mut section = ChunkedSection::enter(platform, Area::Tx, config.iteration_threshold);
        for route in descriptions {
            let entry = &config.description_routes[route.index()];
            if ctx.tx_active[entry.destination.index()] {
                platform.forward_description(route, entry.source_pdu, entry.destination);
                if let Some(gw) = config.tx_pdus[entry.destination.index()].gw_timeout {
                    gateway::event(&config.gw_timeouts[gw.index()], &mut ctx.timers, platform);
                }
            }
            section.check(platform);
        }
        for route in signals {
            let entry = &config.signal_routes[route.index()];
            if ctx.tx_active[entry.destination.index()] {
                platform.forward_signal(route, entry.source_signal, entry.destination);
                if let Some(gw) = config.tx_pdus[entry.destination.index()].gw_timeout {
                    gateway::event(&config.gw_timeouts[gw.index()], &mut ctx.timers, platform);
                }
            }
            section.check(platform);
        }
        section.leave(platform);
    }
}
