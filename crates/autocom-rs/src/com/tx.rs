// crates/autocom-rs/src/com/tx.rs
use super::Com;
use crate::config::TxPduKind;
use crate::det::{DetError, ErrorReporter, ServiceId};
use crate::hal::{Area, ComError, ComPlatform};
use crate::log::{LogContext, com_trace, com_warn};
use crate::types::TxPduId;

impl<'c, P: ComPlatform, R: ErrorReporter> Com<'c, P, R> {
    /// The lower layer fetches the current content of a Normal Tx PDU.
    /// Returns the number of bytes written into `buffer`.
    pub fn trigger_transmit(&mut self, id: TxPduId, buffer: &mut [u8]) -> Result<usize, ComError> {
        let (_, pdu) = self.checked_tx(ServiceId::TriggerTransmit, id)?;
        if pdu.kind == TxPduKind::Tp {
            self.det(ServiceId::TriggerTransmit, DetError::Param);
            return Err(ComError::WrongPduKind);
        }

        self.platform.enter(Area::Tx);
        let result = if self.context.tx_active[id.index()] {
            self.platform.copy_tx_data(id, buffer).map_err(|e| {
                com_warn!(ctx: LogContext::tx(id.0), "Transmit buffer copy failed: {}", e);
                ComError::LowerLayer
            })
        } else {
            Err(ComError::PduInactive)
        };
        self.platform.exit(Area::Tx);
        result
    }

    /// The lower layer confirms a transmission. Confirmations of inactive PDUs are ignored.
    pub fn tx_confirmation(&mut self, id: TxPduId) {
        let Ok((config, pdu)) = self.checked_tx(ServiceId::TxConfirmation, id) else {
            return;
        };

        self.platform.enter(Area::Tx);
        if !self.context.tx_active[id.index()] {
            self.platform.exit(Area::Tx);
            com_trace!(ctx: LogContext::tx(id.0), "Confirmation of inactive PDU ignored");
            return;
        }
        self.platform.confirm(id);
        if let Some(timeout) = pdu.timeout {
            let ctx = &mut self.context;
            ctx.tx_dm
                .on_confirmation(timeout, &config.tx_timeouts[timeout.index()], &mut ctx.timers);
        }
        let notify_now = !pdu.deferred_confirmation;
        if !notify_now {
            self.context.tx_confirmations[id.index()] = true;
        }
        self.platform.exit(Area::Tx);

        if notify_now {
            for &notification in &pdu.confirmation_notifications {
                self.platform.tx_confirmation(notification);
            }
        }
    }

    /// Requests a transmission of the PDU on the next Tx tick.
    pub fn trigger_ipdu_send(&mut self, id: TxPduId) -> Result<(), ComError> {
        self.checked_tx(ServiceId::TriggerIpduSend, id)?;

        self.platform.enter(Area::Tx);
        let result = if self.context.tx_active[id.index()] {
            self.context.tx_requests[id.index()] = true;
            Ok(())
        } else {
            Err(ComError::PduInactive)
        };
        self.platform.exit(Area::Tx);
        result
    }
}
