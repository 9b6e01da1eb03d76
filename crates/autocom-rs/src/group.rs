// crates/autocom-rs/src/group.rs
//! I-PDU group handling: activation of member PDUs and the per-group
//! deadline monitoring switch.
//!
//! A PDU is active while at least one of its groups is not `Inactive`. The
//! check is a scan over the PDU's back-reference list every time a group
//! stops, so there is no reference counter to drift out of sync.

use crate::com::ComContext;
use crate::config::ComConfig;
use crate::exclusive::ChunkedSection;
use crate::gateway;
use crate::hal::{Area, ComPlatform};
use crate::log::{LogContext, com_debug};
use crate::types::{IpduGroupId, RxPduId, TxPduId};
use alloc::vec;
use alloc::vec::Vec;

/// State of one I-PDU group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpduGroupState {
    #[default]
    Inactive,
    ActiveDmActive,
    ActiveDmInactive,
}

impl IpduGroupState {
    pub fn is_active(self) -> bool {
        self != Self::Inactive
    }
}

/// Bit vector with one bit per configured I-PDU group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpduGroupVector {
    bits: Vec<u8>,
    len: usize,
}

impl IpduGroupVector {
    /// All bits clear.
    pub fn new(len: usize) -> Self {
        Self { bits: vec![0; len.div_ceil(8)], len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bits outside the vector are ignored.
    pub fn set(&mut self, group: IpduGroupId) {
        if group.index() < self.len {
            self.bits[group.index() / 8] |= 1 << (group.index() % 8);
        }
    }

    pub fn clear(&mut self, group: IpduGroupId) {
        if group.index() < self.len {
            self.bits[group.index() / 8] &= !(1 << (group.index() % 8));
        }
    }

    pub fn is_set(&self, group: IpduGroupId) -> bool {
        group.index() < self.len && self.bits[group.index() / 8] & (1 << (group.index() % 8)) != 0
    }

    pub fn clear_all(&mut self) {
        self.bits.fill(0);
    }

    /// Raw bytes, bit `n` of the vector is bit `n % 8` of byte `n / 8`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}

fn any_group(states: &[IpduGroupState], groups: &[IpduGroupId], pred: fn(IpduGroupState) -> bool) -> bool {
    groups
        .iter()
        .any(|g| states.get(g.index()).copied().is_some_and(pred))
}

fn wants_activation(states: &[IpduGroupState], groups: &[IpduGroupId]) -> bool {
    any_group(states, groups, IpduGroupState::is_active)
}

fn wants_dm(states: &[IpduGroupState], groups: &[IpduGroupId]) -> bool {
    any_group(states, groups, |s| s == IpduGroupState::ActiveDmActive)
}

/// Activates an Rx PDU; an already active PDU only gets its inactive
/// deadline monitors switched on.
fn activate_rx<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
    id: RxPduId,
    initialize: bool,
) {
    let pdu = &config.rx_pdus[id.index()];
    if !ctx.rx_active[id.index()] {
        if initialize {
            platform.init_rx_buffers(id);
            if let Some(connection) = pdu.tp_connection() {
                ctx.tp.reset(connection);
            }
            ctx.rx_deferred[id.index()].clear();
            ctx.routing.clear_pdu(pdu);
        }
        ctx.rx_active[id.index()] = true;
    }
    ctx.rx_dm.activate_pdu(pdu, config, &mut ctx.timers);
}

fn deactivate_rx(ctx: &mut ComContext, config: &ComConfig, id: RxPduId) {
    let pdu = &config.rx_pdus[id.index()];
    ctx.rx_active[id.index()] = false;
    ctx.rx_dm.deactivate_pdu(pdu, config, &mut ctx.timers);
    if let Some(connection) = pdu.tp_connection() {
        ctx.tp.reset(connection);
    }
    ctx.rx_deferred[id.index()].clear();
    ctx.routing.clear_pdu(pdu);
}

fn activate_tx<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
    id: TxPduId,
    initialize: bool,
) {
    if ctx.tx_active[id.index()] {
        return;
    }
    let pdu = &config.tx_pdus[id.index()];
    if initialize {
        platform.init_tx_pdu(id);
        ctx.tx_requests[id.index()] = false;
        ctx.tx_confirmations[id.index()] = false;
    }
    if let Some(timeout) = pdu.timeout {
        ctx.tx_dm
            .activate(timeout, &config.tx_timeouts[timeout.index()], &mut ctx.timers);
    }
    if let Some(gw) = pdu.gw_timeout {
        gateway::init_counter(&config.gw_timeouts[gw.index()], &mut ctx.timers);
    }
    platform.clear_update_bits(id);
    ctx.tx_active[id.index()] = true;
    platform.activate(id);
}

fn deactivate_tx<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
    id: TxPduId,
) {
    let pdu = &config.tx_pdus[id.index()];
    ctx.tx_active[id.index()] = false;
    if let Some(timeout) = pdu.timeout {
        ctx.tx_dm
            .deactivate(timeout, &config.tx_timeouts[timeout.index()], &mut ctx.timers);
    }
    if let Some(gw) = pdu.gw_timeout {
        gateway::stop_counter(&config.gw_timeouts[gw.index()], &mut ctx.timers);
    }
    ctx.tx_requests[id.index()] = false;
    ctx.tx_confirmations[id.index()] = false;
    platform.deactivate(id);
}

/// Starts a group. Returns `false` if it was already started.
pub(crate) fn start<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
    id: IpduGroupId,
    initialize: bool,
) -> bool {
    if ctx.groups[id.index()].is_active() {
        return false;
    }
    let group = &config.groups[id.index()];
    let threshold = config.iteration_threshold;

    let mut section = ChunkedSection::enter(platform, Area::Rx, threshold);
    ctx.groups[id.index()] = IpduGroupState::ActiveDmActive;
    for &rx in &group.rx_pdus {
        activate_rx(ctx, config, platform, rx, initialize);
        section.check(platform);
    }
    section.leave(platform);

    let mut section = ChunkedSection::enter(platform, Area::Tx, threshold);
    for &tx in &group.tx_pdus {
        activate_tx(ctx, config, platform, tx, initialize);
        section.check(platform);
    }
    section.leave(platform);

    com_debug!(ctx: LogContext::group(id.0), "started (initialize={})", initialize);
    true
}

/// Stops a group. Member PDUs stay active while another group still references them.
pub(crate) fn stop<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
    id: IpduGroupId,
) -> bool {
    if !ctx.groups[id.index()].is_active() {
        return false;
    }
    let group = &config.groups[id.index()];
    let threshold = config.iteration_threshold;

    let mut section = ChunkedSection::enter(platform, Area::Rx, threshold);
    ctx.groups[id.index()] = IpduGroupState::Inactive;
    for &rx in &group.rx_pdus {
        let pdu = &config.rx_pdus[rx.index()];
        if !wants_activation(&ctx.groups, &pdu.groups) {
            if ctx.rx_active[rx.index()] {
                deactivate_rx(ctx, config, rx);
            }
        } else if !wants_dm(&ctx.groups, &pdu.groups) {
            ctx.rx_dm.deactivate_pdu(pdu, config, &mut ctx.timers);
        }
        section.check(platform);
    }
    section.leave(platform);

    let mut section = ChunkedSection::enter(platform, Area::Tx, threshold);
    for &tx in &group.tx_pdus {
        let pdu = &config.tx_pdus[tx.index()];
        if ctx.tx_active[tx.index()] && !wants_activation(&ctx.groups, &pdu.groups) {
            deactivate_tx(ctx, config, platform, tx);
        }
        section.check(platform);
    }
    section.leave(platform);

    com_debug!(ctx: LogContext::group(id.0), "stopped");
    true
}

/// Switches deadline monitoring of an active group on.
pub(crate) fn enable_dm<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
    id: IpduGroupId,
) -> bool {
    if ctx.groups[id.index()] != IpduGroupState::ActiveDmInactive {
        return false;
    }
    let mut section = ChunkedSection::enter(platform, Area::Rx, config.iteration_threshold);
    ctx.groups[id.index()] = IpduGroupState::ActiveDmActive;
    for &rx in &config.groups[id.index()].rx_pdus {
        if ctx.rx_active[rx.index()] {
            ctx.rx_dm
                .activate_pdu(&config.rx_pdus[rx.index()], config, &mut ctx.timers);
        }
        section.check(platform);
    }
    section.leave(platform);
    com_debug!(ctx: LogContext::group(id.0), "reception DM enabled");
    true
}

/// Switches deadline monitoring of an active group off. Monitors stay on
/// for PDUs that another DM-active group still references.
pub(crate) fn disable_dm<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
    id: IpduGroupId,
) -> bool {
    if ctx.groups[id.index()] != IpduGroupState::ActiveDmActive {
        return false;
    }
    let mut section = ChunkedSection::enter(platform, Area::Rx, config.iteration_threshold);
    ctx.groups[id.index()] = IpduGroupState::ActiveDmInactive;
    for &rx in &config.groups[id.index()].rx_pdus {
        let pdu = &config.rx_pdus[rx.index()];
        if !wants_dm(&ctx.groups, &pdu.groups) {
            ctx.rx_dm.deactivate_pdu(pdu, config, &mut ctx.timers);
        }
        section.check(platform);
    }
    section.leave(platform);
    com_debug!(ctx: LogContext::group(id.0), "reception DM disabled");
    true
}

/// Activates every PDU without group references. Called once by `init`.
pub(crate) fn activate_always_on<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
) {
    let mut section = ChunkedSection::enter(platform, Area::Rx, config.iteration_threshold);
    for (index, pdu) in config.rx_pdus.iter().enumerate() {
        if pdu.is_always_on() {
            activate_rx(ctx, config, platform, RxPduId(index as u16), true);
            section.check(platform);
        }
    }
    section.leave(platform);

    let mut section = ChunkedSection::enter(platform, Area::Tx, config.iteration_threshold);
    for (index, pdu) in config.tx_pdus.iter().enumerate() {
        if pdu.is_always_on() {
            activate_tx(ctx, config, platform, TxPduId(index as u16), true);
            section.check(platform);
        }
    }
    section.leave(platform);
}

/// Deactivates every PDU without group references. Called once by `deinit`.
pub(crate) fn deactivate_always_on<P: ComPlatform + ?Sized>(
    ctx: &mut ComContext,
    config: &ComConfig,
    platform: &mut P,
) {
    let mut section = ChunkedSection::enter(platform, Area::Rx, config.iteration_threshold);
    for (index, pdu) in config.rx_pdus.iter().enumerate() {
        if pdu.is_always_on() && ctx.rx_active[index] {
            deactivate_rx(ctx, config, RxPduId(index as u16));
            section.check(platform);
        }
    }
    section.leave(platform);

    let mut section = ChunkedSection::enter(platform, Area::Tx, config.iteration_threshold);
    for (index, pdu) in config.tx_pdus.iter().enumerate() {
        if pdu.is_always_on() && ctx.tx_active[index] {
            deactivate_tx(ctx, config, platform, TxPduId(index as u16));
            section.check(platform);
        }
    }
    section.leave(platform);
}
