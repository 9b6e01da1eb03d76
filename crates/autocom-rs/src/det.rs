// crates/autocom-rs/src/det.rs
//! Development error reporting: service ids, error codes and the reporting sink.

use log::error;

/// Service ids as used in development error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceId {
    Init = 0x01,
    DeInit = 0x02,
    IpduGroupStart = 0x03,
    IpduGroupStop = 0x04,
    DisableReceptionDm = 0x05,
    EnableReceptionDm = 0x06,
    GetStatus = 0x07,
    GetConfigurationId = 0x08,
    GetVersionInfo = 0x09,
    IpduGroupControl = 0x0A,
    ReceptionDmControl = 0x0B,
    TriggerIpduSend = 0x17,
    MainFunctionRx = 0x18,
    MainFunctionTx = 0x19,
    MainFunctionRouteSignals = 0x1A,
    TxConfirmation = 0x40,
    TriggerTransmit = 0x41,
    RxIndication = 0x42,
    CopyRxData = 0x44,
    TpRxIndication = 0x45,
    StartOfReception = 0x46,
    /// Internal queries (timeout flags, PDU state).
    Query = 0xF0,
}

/// Development error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DetError {
    /// API called with an invalid parameter (handle out of range, wrong PDU kind).
    Param = 0x01,
    /// API called before the module was initialized.
    Uninit = 0x02,
    /// API called with a missing data reference.
    ParamPointer = 0x03,
    /// `init` failed (re-initialization or invalid configuration).
    InitFailed = 0x04,
}

/// A trait that defines how development errors are reported.
pub trait ErrorReporter {
    fn report_error(&mut self, service: ServiceId, error: DetError);
}

/// A `no_std` compatible reporter that does nothing.
pub struct NoOpErrorReporter;
impl ErrorReporter for NoOpErrorReporter {
    fn report_error(&mut self, _service: ServiceId, _error: DetError) {}
}

/// A reporter that logs all errors using the `log` facade.
pub struct LoggingErrorReporter;
impl ErrorReporter for LoggingErrorReporter {
    fn report_error(&mut self, service: ServiceId, error: DetError) {
        error!(
            "[COM DET] module={} service={:#04x} ({:?}) error={:#04x} ({:?})",
            crate::types::COM_MODULE_ID,
            service as u8,
            service,
            error as u8,
            error
        );
    }
}

/// Forwards a report to the sink when development error detection is compiled in.
#[inline]
pub(crate) fn report<R: ErrorReporter>(reporter: &mut R, service: ServiceId, error: DetError) {
    if cfg!(feature = "dev-error-detect") {
        reporter.report_error(service, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    struct Recorder(Vec<(ServiceId, DetError)>);
    impl ErrorReporter for Recorder {
        fn report_error(&mut self, service: ServiceId, error: DetError) {
            self.0.push((service, error));
        }
    }

    #[test]
    fn report_reaches_sink_with_detection_enabled() {
        let mut recorder = Recorder(Vec::new());
        report(&mut recorder, ServiceId::RxIndication, DetError::Param);
        if cfg!(feature = "dev-error-detect") {
            assert_eq!(recorder.0, [(ServiceId::RxIndication, DetError::Param)]);
        } else {
            assert!(recorder.0.is_empty());
        }
    }

    #[test]
    fn codes_match_wire_values() {
        assert_eq!(ServiceId::StartOfReception as u8, 0x46);
        assert_eq!(DetError::ParamPointer as u8, 0x03);
    }
}
