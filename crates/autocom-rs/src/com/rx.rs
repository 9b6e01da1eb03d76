// crates/autocom-rs/src/com/rx.rs
//! Reception services: normal indications and the TP reception path.

use super::Com;
use crate::config::{ComConfig, RxPduConfig};
use crate::deadline::RxDeadlineMonitor;
use crate::det::{DetError, ErrorReporter, ServiceId};
use crate::gateway::RoutingFlags;
use crate::hal::{Area, ComError, ComPlatform};
use crate::log::{LogContext, com_trace, com_warn};
use crate::timer::TimerTable;
use crate::tp::TpIndication;
use crate::types::{PduInfo, RxPduId, RxTpConnectionId, TpResult};

/// Unpacks a received PDU and updates everything that depends on it.
pub(super) fn process_reception<P: ComPlatform + ?Sized>(
    config: &ComConfig,
    id: RxPduId,
    info: &PduInfo<'_>,
    platform: &mut P,
    rx_dm: &mut RxDeadlineMonitor,
    timers: &mut TimerTable,
    routing: &mut RoutingFlags,
) {
    let pdu = &config.rx_pdus[id.index()];
    platform.unpack(id, info);
    rx_dm.on_reception(pdu, config, timers, &*platform, info.sdu);
    routing.mark_reception(pdu);
}

/// A deferred PDU is only accepted if some Rx partition will process it.
pub(super) fn is_scheduled(config: &ComConfig, id: RxPduId) -> bool {
    config
        .main_functions_rx
        .iter()
        .any(|partition| partition.deferred_pdus.contains(&id))
}

fn metadata_matches(pdu: &RxPduConfig, info: &PduInfo<'_>) -> bool {
    info.metadata.map_or(0, <[u8]>::len) == usize::from(pdu.metadata_len)
}

impl<'c, P: ComPlatform, R: ErrorReporter> Com<'c, P, R> {
    /// Indication of a received Normal PDU. Receptions of inactive PDUs are dropped.
    pub fn rx_indication(&mut self, id: RxPduId, info: &PduInfo<'_>) {
        let Ok((config, pdu)) = self.checked_rx(ServiceId::RxIndication, id) else {
            return;
        };
        let Some(sdu) = info.sdu else {
            self.det(ServiceId::RxIndication, DetError::ParamPointer);
            return;
        };
        if pdu.tp_connection().is_some() || !metadata_matches(pdu, info) {
            self.det(ServiceId::RxIndication, DetError::Param);
            return;
        }

        self.platform.enter(Area::Rx);
        if !self.context.rx_active[id.index()] {
            self.platform.exit(Area::Rx);
            com_trace!(ctx: LogContext::rx(id.0), "Reception of inactive PDU dropped");
            return;
        }
        let notify = if pdu.deferred {
            if is_scheduled(config, id) {
                let deferred = &mut self.context.rx_deferred[id.index()];
                deferred.pending = true;
                deferred.sdu.clear();
                deferred.sdu.extend_from_slice(sdu);
                deferred.metadata.clear();
                deferred.metadata.extend_from_slice(info.metadata.unwrap_or_default());
            } else {
                com_warn!(ctx: LogContext::rx(id.0), "Deferred PDU has no Rx partition, reception dropped");
            }
            false
        } else {
            let ctx = &mut self.context;
            process_reception(
                config,
                id,
                info,
                &mut self.platform,
                &mut ctx.rx_dm,
                &mut ctx.timers,
                &mut ctx.routing,
            );
            true
        };
        self.platform.exit(Area::Rx);

        if notify {
            for &notification in &pdu.notifications {
                self.platform.rx_indication(notification);
            }
        }
    }

    /// Validates a TP service call and returns the PDU's connection.
    fn checked_tp(
        &mut self,
        service: ServiceId,
        id: RxPduId,
    ) -> Result<(&'c ComConfig, &'c RxPduConfig, RxTpConnectionId), ComError> {
        let (config, pdu) = self.checked_rx(service, id)?;
        match pdu.tp_connection() {
            Some(connection) => Ok((config, pdu, connection)),
            None => {
                self.det(service, DetError::Param);
                Err(ComError::WrongPduKind)
            }
        }
    }

    /// Announces a segmented reception of `len` bytes.
    ///
    /// Returns the payload space available in the connection buffer.
    /// `ComError::Overflow` means the message can never fit.
    pub fn start_of_reception(
        &mut self,
        id: RxPduId,
        info: &PduInfo<'_>,
        len: usize,
    ) -> Result<usize, ComError> {
        let (_, pdu, connection) = self.checked_tp(ServiceId::StartOfReception, id)?;
        if pdu.metadata_len > 0 && !metadata_matches(pdu, info) {
            self.det(ServiceId::StartOfReception, DetError::Param);
            return Err(ComError::MetadataMismatch);
        }

        self.platform.enter(Area::Rx);
        let result = if self.context.rx_active[id.index()] {
            self.context.tp.start_of_reception(connection, info.metadata, len)
        } else {
            Err(ComError::PduInactive)
        };
        self.platform.exit(Area::Rx);
        result
    }

    /// Copies one segment into the connection buffer; returns the remaining space.
    pub fn copy_rx_data(&mut self, id: RxPduId, info: &PduInfo<'_>) -> Result<usize, ComError> {
        let (_, _, connection) = self.checked_tp(ServiceId::CopyRxData, id)?;
        let Some(segment) = info.sdu else {
            self.det(ServiceId::CopyRxData, DetError::ParamPointer);
            return Err(ComError::MissingData);
        };

        self.platform.enter(Area::Rx);
        let result = if self.context.rx_active[id.index()] {
            self.context.tp.copy_rx_data(connection, segment)
        } else {
            Err(ComError::PduInactive)
        };
        self.platform.exit(Area::Rx);
        result
    }

    /// End of a segmented reception.
    pub fn tp_rx_indication(&mut self, id: RxPduId, result: TpResult) {
        let Ok((config, pdu, connection)) = self.checked_tp(ServiceId::TpRxIndication, id) else {
            return;
        };

        self.platform.enter(Area::Rx);
        if !self.context.rx_active[id.index()] {
            self.platform.exit(Area::Rx);
            return;
        }
        let mut notify = false;
        if self.context.tp.rx_indication(connection, result) == TpIndication::Deliver {
            if pdu.deferred {
                if is_scheduled(config, id) {
                    self.context.tp.lock_buffer(connection);
                    self.context.rx_deferred[id.index()].pending = true;
                } else {
                    com_warn!(ctx: LogContext::rx(id.0), "Deferred TP PDU has no Rx partition, message dropped");
                    self.context.tp.reset(connection);
                }
            } else {
                let ctx = &mut self.context;
                let info = PduInfo {
                    sdu: Some(ctx.tp.payload(connection)),
                    metadata: Some(ctx.tp.metadata(connection)),
                };
                process_reception(
                    config,
                    id,
                    &info,
                    &mut self.platform,
                    &mut ctx.rx_dm,
                    &mut ctx.timers,
                    &mut ctx.routing,
                );
                ctx.tp.reset(connection);
                notify = true;
            }
        }
        self.platform.exit(Area::Rx);

        if notify {
            for &notification in &pdu.notifications {
                self.platform.rx_indication(notification);
            }
        }
    }
}
