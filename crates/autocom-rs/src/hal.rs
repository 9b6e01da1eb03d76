// crates/autocom-rs/src/hal.rs
use crate::types::{
    DescriptionRouteId, NotificationId, PduInfo, RxPduId, SignalId, SignalRouteId, TxPduId,
};
use core::fmt;

/// Defines a portable, descriptive Error type for the COM module.
///
/// `Overflow` is the only variant that a transport protocol distinguishes from
/// a plain rejection; every other variant means "not OK".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComError {
    /// The module has not been initialized.
    Uninit,
    /// `init` was called on an initialized module.
    AlreadyInitialized,
    /// The configuration reference is missing, has the wrong magic number or is inconsistent.
    InvalidConfiguration,
    /// A handle is outside its configuration table.
    InvalidHandle,
    /// Payload data was required but not provided.
    MissingData,
    /// A TP service was called for a Normal PDU, or the other way around.
    WrongPduKind,
    /// The metadata length does not match the configured length.
    MetadataMismatch,
    /// The addressed PDU is not active.
    PduInactive,
    /// The TP connection is already in use by another transfer.
    Busy,
    /// The TP buffer cannot hold the announced message.
    Overflow,
    /// No TP reception is in progress on the connection.
    NoReception,
    /// A TP segment did not fit the announced length; the transfer was aborted.
    TransferAborted,
    /// The lower layer rejected the request.
    LowerLayer,
}

impl fmt::Display for ComError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninit => write!(f, "COM module is not initialized"),
            Self::AlreadyInitialized => write!(f, "COM module is already initialized"),
            Self::InvalidConfiguration => write!(f, "Configuration is missing or invalid"),
            Self::InvalidHandle => write!(f, "Handle is out of range"),
            Self::MissingData => write!(f, "Required PDU data was not provided"),
            Self::WrongPduKind => write!(f, "Service not applicable to this PDU kind"),
            Self::MetadataMismatch => write!(f, "Metadata length does not match configuration"),
            Self::PduInactive => write!(f, "PDU is not active"),
            Self::Busy => write!(f, "TP connection is busy"),
            Self::Overflow => write!(f, "TP buffer overflow"),
            Self::NoReception => write!(f, "No TP reception in progress"),
            Self::TransferAborted => write!(f, "TP transfer aborted"),
            Self::LowerLayer => write!(f, "Lower layer rejected the request"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ComError {}

/// The two logical sides guarded by their own exclusive area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Rx,
    Tx,
}

/// Critical section primitive.
///
/// Implementations typically mask interrupts or take a spin lock. `enter` and
/// `exit` for the same area are always balanced; the areas are never nested
/// into each other.
pub trait ExclusiveArea {
    fn enter(&mut self, area: Area);
    fn exit(&mut self, area: Area);
}

/// Receive side of the signal codec.
///
/// The codec owns the signal buffers and knows the bit layout of every PDU;
/// this module only tells it when to act.
pub trait SignalCodec {
    /// Resets all signal buffers of the PDU to their init values.
    fn init_rx_buffers(&mut self, _pdu: RxPduId) {}

    /// Unpacks a received PDU into its signal buffers.
    fn unpack(&mut self, _pdu: RxPduId, _info: &PduInfo<'_>) {}

    /// Reports whether the update bit of `signal` is set in `sdu`.
    /// Signals without an update bit are always considered updated.
    fn is_updated(&self, _signal: SignalId, _sdu: &[u8]) -> bool {
        true
    }

    /// Writes the configured replace value into the signal buffer.
    fn apply_replace_value(&mut self, _signal: SignalId) {}
}

/// Contract of the transmission engine (Tx-mode handling and transmit buffers).
pub trait TxEngine {
    /// Re-initializes the transmit buffer, TP state and Tx-mode state of the PDU.
    fn init_tx_pdu(&mut self, _pdu: TxPduId) {}

    /// Clears the update bits in the transmit buffer.
    fn clear_update_bits(&mut self, _pdu: TxPduId) {}

    /// Starts Tx-mode handling for a PDU that just became active.
    fn activate(&mut self, _pdu: TxPduId) {}

    /// Stops Tx-mode handling and cancels outstanding transmissions.
    fn deactivate(&mut self, _pdu: TxPduId) {}

    fn start_cyclic(&mut self, _pdu: TxPduId) {}

    fn stop_cyclic(&mut self, _pdu: TxPduId) {}

    fn stop_repetitions(&mut self, _pdu: TxPduId) {}

    fn reset_min_delay(&mut self, _pdu: TxPduId) {}

    fn cancel_transmit(&mut self, _pdu: TxPduId) {}

    /// Per-tick Tx-mode evaluation (cycle and repetition counters).
    fn process_tx_mode(&mut self, _pdu: TxPduId) {}

    /// Hands the PDU to the lower layer.
    fn transmit(&mut self, _pdu: TxPduId) -> Result<(), ComError> {
        Ok(())
    }

    /// Copies the current transmit buffer into `buffer`, returning the number of bytes written.
    fn copy_tx_data(&mut self, _pdu: TxPduId, _buffer: &mut [u8]) -> Result<usize, ComError> {
        Ok(0)
    }

    /// A transmission of the PDU was confirmed by the lower layer.
    fn confirm(&mut self, _pdu: TxPduId) {}
}

/// Signal routing back end.
pub trait SignalGateway {
    fn forward_signal(&mut self, _route: SignalRouteId, _source: SignalId, _destination: TxPduId) {}

    fn forward_description(
        &mut self,
        _route: DescriptionRouteId,
        _source: RxPduId,
        _destination: TxPduId,
    ) {
    }
}

/// User notification callbacks. They are never invoked while an exclusive area is held.
pub trait ComNotifications {
    fn rx_indication(&mut self, _notification: NotificationId) {}
    fn rx_timeout(&mut self, _notification: NotificationId) {}
    fn tx_confirmation(&mut self, _notification: NotificationId) {}
    fn tx_timeout(&mut self, _notification: NotificationId) {}
}

/// Everything the module needs from its environment.
pub trait ComPlatform: ExclusiveArea + SignalCodec + TxEngine + SignalGateway + ComNotifications {}

impl<T> ComPlatform for T where
    T: ExclusiveArea + SignalCodec + TxEngine + SignalGateway + ComNotifications
{
}
