// crates/autocom-rs/src/types.rs
use core::fmt;

// --- Handle Types ---
// Every configured object is addressed by a dense index into its descriptor
// table. The newtypes keep an Rx PDU index from being used where a Tx PDU
// index is expected.

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub u16);

        impl $name {
            /// Returns the handle as a table index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<$name> for u16 {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

handle_type!(
    /// Handle of a received I-PDU.
    RxPduId, "rx-pdu"
);
handle_type!(
    /// Handle of a transmitted I-PDU.
    TxPduId, "tx-pdu"
);
handle_type!(
    /// Handle of an I-PDU group.
    IpduGroupId, "ipdu-group"
);
handle_type!(
    /// Handle of a countdown timer in the timer table.
    TimerId, "timer"
);
handle_type!(
    /// Handle of an Rx deadline monitor.
    RxTimeoutId, "rx-timeout"
);
handle_type!(
    /// Handle of a Tx deadline monitor.
    TxTimeoutId, "tx-timeout"
);
handle_type!(
    /// Handle of a gateway timeout.
    GwTimeoutId, "gw-timeout"
);
handle_type!(
    /// Handle of an Rx transport protocol connection.
    RxTpConnectionId, "rx-tp"
);
handle_type!(
    /// Handle of a signal (or signal group) owned by the signal codec.
    SignalId, "signal"
);
handle_type!(
    /// Handle of a user notification callback.
    NotificationId, "notification"
);
handle_type!(
    /// Handle of a signal-based routing entry.
    SignalRouteId, "signal-route"
);
handle_type!(
    /// Handle of a description-based routing entry.
    DescriptionRouteId, "description-route"
);

// --- Module Constants ---

/// AUTOSAR vendor id reported by `get_version_info`.
pub const COM_VENDOR_ID: u16 = 0xFFFF;

/// AUTOSAR module id of the COM module.
pub const COM_MODULE_ID: u16 = 50;

/// Expected value of `ComConfig::magic_number`.
pub const COM_CONFIG_MAGIC: u32 = 0xC0_4D_20_25;

// --- Boundary Types ---

/// Data handed across the lower-layer boundary.
///
/// `sdu` is `None` when the caller did not provide a data pointer; this is a
/// development error for every service that needs payload bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PduInfo<'a> {
    pub sdu: Option<&'a [u8]>,
    pub metadata: Option<&'a [u8]>,
}

impl<'a> PduInfo<'a> {
    /// Payload only, no metadata.
    pub fn new(sdu: &'a [u8]) -> Self {
        Self { sdu: Some(sdu), metadata: None }
    }

    /// Payload plus metadata.
    pub fn with_metadata(sdu: &'a [u8], metadata: &'a [u8]) -> Self {
        Self { sdu: Some(sdu), metadata: Some(metadata) }
    }

    /// Info without payload, used by `start_of_reception` for metadata-only requests.
    pub fn metadata_only(metadata: &'a [u8]) -> Self {
        Self { sdu: None, metadata: Some(metadata) }
    }

    /// Length of the payload, 0 if absent.
    pub fn sdu_len(&self) -> usize {
        self.sdu.map_or(0, <[u8]>::len)
    }
}

/// Result code a transport protocol passes to `tp_rx_indication`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpResult {
    Ok,
    NotOk,
}

/// Module status as reported by `get_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComStatus {
    #[default]
    Uninit,
    Init,
}

/// Version information of this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub vendor_id: u16,
    pub module_id: u16,
    pub sw_major_version: u8,
    pub sw_minor_version: u8,
    pub sw_patch_version: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_index_and_display() {
        let pdu = RxPduId(7);
        assert_eq!(pdu.index(), 7);
        assert_eq!(u16::from(pdu), 7);
        assert_eq!(alloc::format!("{}", pdu), "rx-pdu#7");
    }

    #[test]
    fn pdu_info_length() {
        let data = [1u8, 2, 3];
        assert_eq!(PduInfo::new(&data).sdu_len(), 3);
        assert_eq!(PduInfo::metadata_only(&data).sdu_len(), 0);
    }
}
