// crates/autocom-rs/src/com/mod.rs
//! The COM module instance and its public services.
//!
//! `Com` owns all dynamic state. The configuration is borrowed for the
//! lifetime of the instance; the platform collaborators are owned so tests
//! can inspect them through [`Com::platform`].

mod rx;
mod state;
mod tick;
mod tx;

pub use state::{ComContext, DeferredRx};

use crate::config::{ComConfig, RxPduConfig, TxPduConfig};
use crate::det::{self, DetError, ErrorReporter, LoggingErrorReporter, ServiceId};
use crate::group::{self, IpduGroupState, IpduGroupVector};
use crate::hal::{ComError, ComPlatform};
use crate::log::{com_error, com_info};
use crate::tp::RxTpState;
use crate::types::{
    COM_MODULE_ID, COM_VENDOR_ID, ComStatus, IpduGroupId, RxPduId, RxTimeoutId,
    RxTpConnectionId, TimerId, TxPduId, TxTimeoutId, VersionInfo,
};

const fn parse_version(s: &str) -> u8 {
    let bytes = s.as_bytes();
    let mut value: u8 = 0;
    let mut i = 0;
    while i < bytes.len() {
        value = value.wrapping_mul(10).wrapping_add(bytes[i] - b'0');
        i += 1;
    }
    value
}

const SW_MAJOR_VERSION: u8 = parse_version(env!("CARGO_PKG_VERSION_MAJOR"));
const SW_MINOR_VERSION: u8 = parse_version(env!("CARGO_PKG_VERSION_MINOR"));
const SW_PATCH_VERSION: u8 = parse_version(env!("CARGO_PKG_VERSION_PATCH"));

/// The COM module.
pub struct Com<'c, P: ComPlatform, R: ErrorReporter = LoggingErrorReporter> {
    config: Option<&'c ComConfig>,
    context: ComContext,
    status: ComStatus,
    platform: P,
    reporter: R,
}

impl<'c, P: ComPlatform> Com<'c, P> {
    /// Creates an uninitialized module that logs development errors.
    pub fn new(platform: P) -> Self {
        Self::with_reporter(platform, LoggingErrorReporter)
    }
}

impl<'c, P: ComPlatform, R: ErrorReporter> Com<'c, P, R> {
    pub fn with_reporter(platform: P, reporter: R) -> Self {
        Self {
            config: None,
            context: ComContext::default(),
            status: ComStatus::Uninit,
            platform,
            reporter,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    // --- Lifecycle ---

    /// Initializes the module with `config` and activates every PDU that
    /// belongs to no I-PDU group. All groups start `Inactive`.
    pub fn init(&mut self, config: Option<&'c ComConfig>) -> Result<(), ComError> {
        let Some(config) = config else {
            self.det(ServiceId::Init, DetError::ParamPointer);
            return Err(ComError::InvalidConfiguration);
        };
        if self.status == ComStatus::Init {
            self.det(ServiceId::Init, DetError::InitFailed);
            return Err(ComError::AlreadyInitialized);
        }
        if let Err(e) = config.validate() {
            com_error!("Configuration rejected: {}", e);
            self.det(ServiceId::Init, DetError::InitFailed);
            return Err(ComError::InvalidConfiguration);
        }

        self.context = ComContext::new(config);
        self.config = Some(config);
        group::activate_always_on(&mut self.context, config, &mut self.platform);
        self.status = ComStatus::Init;
        com_info!(
            "Initialized with configuration {:#010x}: {} Rx PDUs, {} Tx PDUs, {} groups",
            config.configuration_id,
            config.rx_pdus.len(),
            config.tx_pdus.len(),
            config.groups.len()
        );
        Ok(())
    }

    /// Drops all dynamic state and returns to `Uninit` without touching the
    /// platform. Intended for start-up before `init`.
    pub fn init_memory(&mut self) {
        self.context = ComContext::default();
        self.config = None;
        self.status = ComStatus::Uninit;
    }

    /// Stops every group, deactivates the always-on PDUs and returns to `Uninit`.
    pub fn deinit(&mut self) {
        let Ok(config) = self.initialized(ServiceId::DeInit) else {
            return;
        };
        for index in 0..config.groups.len() {
            group::stop(
                &mut self.context,
                config,
                &mut self.platform,
                IpduGroupId(index as u16),
            );
        }
        group::deactivate_always_on(&mut self.context, config, &mut self.platform);
        self.init_memory();
        com_info!("De-initialized");
    }

    pub fn get_status(&self) -> ComStatus {
        self.status
    }

    /// Returns 0 while uninitialized.
    pub fn get_configuration_id(&mut self) -> u32 {
        self.initialized(ServiceId::GetConfigurationId)
            .map_or(0, |config| config.configuration_id)
    }

    pub fn get_version_info(&self) -> VersionInfo {
        VersionInfo {
            vendor_id: COM_VENDOR_ID,
            module_id: COM_MODULE_ID,
            sw_major_version: SW_MAJOR_VERSION,
            sw_minor_version: SW_MINOR_VERSION,
            sw_patch_version: SW_PATCH_VERSION,
        }
    }

    // --- I-PDU group control ---

    /// Starts a group; `initialize` re-initializes member PDUs that become active.
    pub fn ipdu_group_start(&mut self, id: IpduGroupId, initialize: bool) {
        if let Ok(config) = self.checked_group(ServiceId::IpduGroupStart, id) {
            group::start(&mut self.context, config, &mut self.platform, id, initialize);
        }
    }

    pub fn ipdu_group_stop(&mut self, id: IpduGroupId) {
        if let Ok(config) = self.checked_group(ServiceId::IpduGroupStop, id) {
            group::stop(&mut self.context, config, &mut self.platform, id);
        }
    }

    pub fn enable_reception_dm(&mut self, id: IpduGroupId) {
        if let Ok(config) = self.checked_group(ServiceId::EnableReceptionDm, id) {
            group::enable_dm(&mut self.context, config, &mut self.platform, id);
        }
    }

    pub fn disable_reception_dm(&mut self, id: IpduGroupId) {
        if let Ok(config) = self.checked_group(ServiceId::DisableReceptionDm, id) {
            group::disable_dm(&mut self.context, config, &mut self.platform, id);
        }
    }

    /// Starts every group whose bit is set and stops every other group.
    pub fn ipdu_group_control(&mut self, vector: &IpduGroupVector, initialize: bool) {
        let Ok(config) = self.initialized(ServiceId::IpduGroupControl) else {
            return;
        };
        if vector.len() != config.groups.len() {
            self.det(ServiceId::IpduGroupControl, DetError::Param);
            return;
        }
        // Start first: a PDU shared by a stopping and a starting group stays active throughout.
        for index in 0..config.groups.len() {
            let id = IpduGroupId(index as u16);
            if vector.is_set(id) {
                group::start(&mut self.context, config, &mut self.platform, id, initialize);
            }
        }
        for index in 0..config.groups.len() {
            let id = IpduGroupId(index as u16);
            if !vector.is_set(id) {
                group::stop(&mut self.context, config, &mut self.platform, id);
            }
        }
    }

    /// Enables reception DM for every set bit and disables it for every clear bit.
    pub fn reception_dm_control(&mut self, vector: &IpduGroupVector) {
        let Ok(config) = self.initialized(ServiceId::ReceptionDmControl) else {
            return;
        };
        if vector.len() != config.groups.len() {
            self.det(ServiceId::ReceptionDmControl, DetError::Param);
            return;
        }
        for index in 0..config.groups.len() {
            let id = IpduGroupId(index as u16);
            if vector.is_set(id) {
                group::enable_dm(&mut self.context, config, &mut self.platform, id);
            } else {
                group::disable_dm(&mut self.context, config, &mut self.platform, id);
            }
        }
    }

    // --- Queries ---

    pub fn ipdu_group_state(&self, id: IpduGroupId) -> Option<IpduGroupState> {
        self.context.groups.get(id.index()).copied()
    }

    pub fn is_rx_pdu_active(&self, id: RxPduId) -> bool {
        self.context.rx_active.get(id.index()).copied().unwrap_or(false)
    }

    pub fn is_tx_pdu_active(&self, id: TxPduId) -> bool {
        self.context.tx_active.get(id.index()).copied().unwrap_or(false)
    }

    pub fn tp_connection_state(&self, id: RxTpConnectionId) -> Option<RxTpState> {
        self.context.tp.get(id).map(|c| c.state())
    }

    pub fn timer_counter(&self, id: TimerId) -> Option<u16> {
        self.context.timers.get(id).map(|t| t.counter())
    }

    pub fn is_transmit_requested(&self, id: TxPduId) -> bool {
        self.context.tx_requests.get(id.index()).copied().unwrap_or(false)
    }

    pub fn rx_timeout_occurred(&mut self, id: RxTimeoutId) -> bool {
        if !self.checked_index(id.index(), |c| c.rx_timeouts.len()) {
            return false;
        }
        self.context.rx_dm.occurred(id)
    }

    /// Clears the occurred flag; returns whether it was set.
    pub fn clear_rx_timeout_occurred(&mut self, id: RxTimeoutId) -> bool {
        if !self.checked_index(id.index(), |c| c.rx_timeouts.len()) {
            return false;
        }
        self.context.rx_dm.clear_occurred(id)
    }

    pub fn tx_timeout_occurred(&mut self, id: TxTimeoutId) -> bool {
        if !self.checked_index(id.index(), |c| c.tx_timeouts.len()) {
            return false;
        }
        self.context.tx_dm.occurred(id)
    }

    pub fn clear_tx_timeout_occurred(&mut self, id: TxTimeoutId) -> bool {
        if !self.checked_index(id.index(), |c| c.tx_timeouts.len()) {
            return false;
        }
        self.context.tx_dm.clear_occurred(id)
    }

    // --- Parameter checks ---

    fn det(&mut self, service: ServiceId, error: DetError) {
        det::report(&mut self.reporter, service, error);
    }

    fn initialized(&mut self, service: ServiceId) -> Result<&'c ComConfig, ComError> {
        match (self.status, self.config) {
            (ComStatus::Init, Some(config)) => Ok(config),
            _ => {
                self.det(service, DetError::Uninit);
                Err(ComError::Uninit)
            }
        }
    }

    fn checked_group(&mut self, service: ServiceId, id: IpduGroupId) -> Result<&'c ComConfig, ComError> {
        let config = self.initialized(service)?;
        if config.group(id).is_none() {
            self.det(service, DetError::Param);
            return Err(ComError::InvalidHandle);
        }
        Ok(config)
    }

    fn checked_rx(
        &mut self,
        service: ServiceId,
        id: RxPduId,
    ) -> Result<(&'c ComConfig, &'c RxPduConfig), ComError> {
        let config = self.initialized(service)?;
        match config.rx_pdu(id) {
            Some(pdu) => Ok((config, pdu)),
            None => {
                self.det(service, DetError::Param);
                Err(ComError::InvalidHandle)
            }
        }
    }

    fn checked_tx(
        &mut self,
        service: ServiceId,
        id: TxPduId,
    ) -> Result<(&'c ComConfig, &'c TxPduConfig), ComError> {
        let config = self.initialized(service)?;
        match config.tx_pdu(id) {
            Some(pdu) => Ok((config, pdu)),
            None => {
                self.det(service, DetError::Param);
                Err(ComError::InvalidHandle)
            }
        }
    }

    fn checked_index(&mut self, index: usize, table_len: fn(&ComConfig) -> usize) -> bool {
        let Ok(config) = self.initialized(ServiceId::Query) else {
            return false;
        };
        if index >= table_len(config) {
            self.det(ServiceId::Query, DetError::Param);
            return false;
        }
        true
    }
}
