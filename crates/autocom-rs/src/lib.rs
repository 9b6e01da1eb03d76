#![cfg_attr(not(any(feature = "std", test)), no_std)]

// 'alloc' is used for the fixed-size state tables (Vec sized once at init)
extern crate alloc;

// --- Foundation Modules ---
pub mod types;
pub mod hal;
pub mod det;
pub mod log;
pub mod config;

// --- Building Blocks ---
pub mod timer;
pub mod exclusive;
pub mod tp;
pub mod deadline;
pub mod gateway;
pub mod group;

// --- Module Instance ---
pub mod com;

// --- Top-level Exports ---
pub use types::{
    ComStatus, DescriptionRouteId, GwTimeoutId, IpduGroupId, NotificationId, PduInfo, RxPduId,
    RxTimeoutId, RxTpConnectionId, SignalId, SignalRouteId, TimerId, TpResult, TxPduId,
    TxTimeoutId, VersionInfo,
};
pub use hal::{
    Area, ComError, ComNotifications, ComPlatform, ExclusiveArea, SignalCodec, SignalGateway,
    TxEngine,
};
pub use det::{DetError, ErrorReporter, LoggingErrorReporter, NoOpErrorReporter, ServiceId};
pub use config::{ComConfig, ConfigError};
pub use timer::TimerEvent;
pub use tp::RxTpState;
pub use group::{IpduGroupState, IpduGroupVector};
pub use com::Com;
