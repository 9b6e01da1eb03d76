// crates/autocom-rs/src/tp.rs
//! Reassembly of segmented inbound messages.
//!
//! Every Rx TP connection owns a fixed range of one shared byte buffer.
//! Metadata (if configured) occupies the first bytes of the range and the
//! payload follows directly after it.

use crate::config::ComConfig;
use crate::hal::ComError;
use crate::types::{RxTpConnectionId, TpResult};
use alloc::vec;
use alloc::vec::Vec;
use log::{trace, warn};

/// State of one Rx TP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RxTpState {
    #[default]
    Ready,
    ReceptionStarted,
    Copying,
    WaitingForIndication,
    /// A complete message waits in the buffer for deferred processing.
    BufferLocked,
}

/// What `tp_rx_indication` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpIndication {
    /// No transfer was waiting for an indication; nothing changed.
    Ignored,
    /// The transfer failed or was incomplete; the connection is `Ready` again.
    Aborted,
    /// The message is complete. The connection stays in `WaitingForIndication`
    /// until the caller delivers it and then resets or locks the buffer.
    Deliver,
}

/// Dynamic state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxTpConnection {
    state: RxTpState,
    expected_len: usize,
    written: usize,
    buffer_start: usize,
    capacity: usize,
    metadata_len: usize,
}

impl RxTpConnection {
    pub fn state(&self) -> RxTpState {
        self.state
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Payload bytes the buffer can hold.
    pub fn payload_capacity(&self) -> usize {
        self.capacity - self.metadata_len
    }

    fn payload_start(&self) -> usize {
        self.buffer_start + self.metadata_len
    }

    fn reset(&mut self) {
        self.state = RxTpState::Ready;
        self.expected_len = 0;
        self.written = 0;
    }
}

/// All Rx TP connections plus the shared buffer they reassemble into.
#[derive(Debug, Default)]
pub struct RxTpTable {
    connections: Vec<RxTpConnection>,
    buffer: Vec<u8>,
}

impl RxTpTable {
    pub fn new(config: &ComConfig) -> Self {
        let connections = config
            .rx_tp_connections
            .iter()
            .enumerate()
            .map(|(index, range)| {
                let metadata_len = config
                    .rx_pdus
                    .iter()
                    .find(|pdu| pdu.tp_connection().is_some_and(|c| c.index() == index))
                    .map_or(0, |pdu| usize::from(pdu.metadata_len));
                RxTpConnection {
                    state: RxTpState::Ready,
                    expected_len: 0,
                    written: 0,
                    buffer_start: range.buffer_start,
                    capacity: range.capacity,
                    metadata_len,
                }
            })
            .collect();
        Self {
            connections,
            buffer: vec![0; config.tp_buffer_size],
        }
    }

    pub fn get(&self, connection: RxTpConnectionId) -> Option<&RxTpConnection> {
        self.connections.get(connection.index())
    }

    /// Forces the connection back to `Ready`, whatever it was doing.
    pub fn reset(&mut self, connection: RxTpConnectionId) {
        if let Some(c) = self.connections.get_mut(connection.index()) {
            if c.state != RxTpState::Ready {
                trace!("[TP] Connection {} reset from {:?}", connection, c.state);
            }
            c.reset();
        }
    }

    pub fn reset_all(&mut self) {
        for c in &mut self.connections {
            c.reset();
        }
    }

    /// Starts a reception of `len` payload bytes.
    ///
    /// Returns the payload space of the connection buffer. `metadata` must
    /// already be checked against the configured metadata length.
    pub fn start_of_reception(
        &mut self,
        connection: RxTpConnectionId,
        metadata: Option<&[u8]>,
        len: usize,
    ) -> Result<usize, ComError> {
        let c = self
            .connections
            .get_mut(connection.index())
            .ok_or(ComError::InvalidHandle)?;
        if c.state != RxTpState::Ready {
            warn!(
                "[TP] StartOfReception on {} rejected: connection busy ({:?})",
                connection, c.state
            );
            return Err(ComError::Busy);
        }
        if len.saturating_add(c.metadata_len) > c.capacity {
            warn!(
                "[TP] StartOfReception on {} rejected: {} + {} metadata bytes exceed capacity {}",
                connection, len, c.metadata_len, c.capacity
            );
            return Err(ComError::Overflow);
        }

        if c.metadata_len > 0 {
            if let Some(metadata) = metadata {
                let n = metadata.len().min(c.metadata_len);
                self.buffer[c.buffer_start..c.buffer_start + n].copy_from_slice(&metadata[..n]);
            }
        }
        c.expected_len = len;
        c.written = 0;
        c.state = if len == 0 {
            RxTpState::WaitingForIndication
        } else {
            RxTpState::ReceptionStarted
        };
        trace!("[TP] {} started: expecting {} bytes", connection, len);
        Ok(c.payload_capacity())
    }

    /// Copies one segment; returns the remaining free payload space.
    pub fn copy_rx_data(
        &mut self,
        connection: RxTpConnectionId,
        segment: &[u8],
    ) -> Result<usize, ComError> {
        let c = self
            .connections
            .get_mut(connection.index())
            .ok_or(ComError::InvalidHandle)?;
        match c.state {
            RxTpState::ReceptionStarted | RxTpState::Copying => {
                if c.written + segment.len() > c.expected_len {
                    warn!(
                        "[TP] {}: segment of {} bytes overruns announced length ({}/{}), aborting",
                        connection,
                        segment.len(),
                        c.written,
                        c.expected_len
                    );
                    c.reset();
                    return Err(ComError::TransferAborted);
                }
                let at = c.payload_start() + c.written;
                self.buffer[at..at + segment.len()].copy_from_slice(segment);
                c.written += segment.len();
                c.state = if c.written == c.expected_len {
                    RxTpState::WaitingForIndication
                } else {
                    RxTpState::Copying
                };
                Ok(c.payload_capacity() - c.written)
            }
            RxTpState::WaitingForIndication => {
                if segment.is_empty() {
                    Ok(0)
                } else {
                    warn!(
                        "[TP] {}: {} bytes received after the message was complete, aborting",
                        connection,
                        segment.len()
                    );
                    c.reset();
                    Err(ComError::TransferAborted)
                }
            }
            RxTpState::Ready => Err(ComError::NoReception),
            RxTpState::BufferLocked => Err(ComError::Busy),
        }
    }

    /// Evaluates the end-of-transfer indication.
    pub fn rx_indication(&mut self, connection: RxTpConnectionId, result: TpResult) -> TpIndication {
        let Some(c) = self.connections.get_mut(connection.index()) else {
            return TpIndication::Ignored;
        };
        match (c.state, result) {
            (RxTpState::WaitingForIndication, TpResult::Ok) => TpIndication::Deliver,
            (RxTpState::WaitingForIndication, TpResult::NotOk) => {
                warn!("[TP] {}: transfer reported failed by the transport layer", connection);
                c.reset();
                TpIndication::Aborted
            }
            (RxTpState::ReceptionStarted | RxTpState::Copying, _) => {
                warn!(
                    "[TP] {}: indication after {}/{} bytes, aborting",
                    connection, c.written, c.expected_len
                );
                c.reset();
                TpIndication::Aborted
            }
            (RxTpState::Ready | RxTpState::BufferLocked, _) => TpIndication::Ignored,
        }
    }

    /// Keeps a complete message in the buffer for deferred processing.
    pub fn lock_buffer(&mut self, connection: RxTpConnectionId) {
        if let Some(c) = self.connections.get_mut(connection.index()) {
            if c.state == RxTpState::WaitingForIndication {
                c.state = RxTpState::BufferLocked;
            }
        }
    }

    /// Reassembled payload of the connection.
    pub fn payload(&self, connection: RxTpConnectionId) -> &[u8] {
        match self.connections.get(connection.index()) {
            Some(c) => &self.buffer[c.payload_start()..c.payload_start() + c.written],
            None => &[],
        }
    }

    /// Metadata stored by `start_of_reception`.
    pub fn metadata(&self, connection: RxTpConnectionId) -> &[u8] {
        match self.connections.get(connection.index()) {
            Some(c) => &self.buffer[c.buffer_start..c.buffer_start + c.metadata_len],
            None => &[],
        }
    }

    /// `written <= expected_len`, and a message waiting for its indication is complete.
    pub fn invariants_hold(&self) -> bool {
        self.connections.iter().all(|c| {
            c.written <= c.expected_len
                && (c.state != RxTpState::WaitingForIndication || c.written == c.expected_len)
        })
    }
}
