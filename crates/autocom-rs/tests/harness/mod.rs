// crates/autocom-rs/tests/harness/mod.rs
//! Mock platform shared by the integration tests.
#![allow(dead_code)]

use autocom_rs::{
    Area, ComConfig, ComError, ComNotifications, DescriptionRouteId, DetError, ErrorReporter,
    ExclusiveArea, NotificationId, PduInfo, RxPduId, ServiceId, SignalCodec, SignalGateway,
    SignalId, SignalRouteId, TxEngine, TxPduId,
};

/// Everything the module asked the platform to do, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    InitRxBuffers(RxPduId),
    Unpack { pdu: RxPduId, sdu: Vec<u8>, metadata: Vec<u8> },
    ReplaceValue(SignalId),
    InitTxPdu(TxPduId),
    ClearUpdateBits(TxPduId),
    Activate(TxPduId),
    Deactivate(TxPduId),
    StartCyclic(TxPduId),
    StopCyclic(TxPduId),
    StopRepetitions(TxPduId),
    ResetMinDelay(TxPduId),
    CancelTransmit(TxPduId),
    ProcessTxMode(TxPduId),
    Transmit(TxPduId),
    Confirm(TxPduId),
    ForwardSignal(SignalRouteId, SignalId, TxPduId),
    ForwardDescription(DescriptionRouteId, RxPduId, TxPduId),
    RxIndication(NotificationId),
    RxTimeout(NotificationId),
    TxConfirmation(NotificationId),
    TxTimeout(NotificationId),
}

impl Event {
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            Event::RxIndication(_) | Event::RxTimeout(_) | Event::TxConfirmation(_) | Event::TxTimeout(_)
        )
    }
}

/// Records every call and checks the exclusive-area discipline.
#[derive(Debug, Default)]
pub struct MockPlatform {
    pub events: Vec<Event>,
    /// Current exclusive-area nesting depth.
    pub depth: u32,
    /// Number of `enter` calls per area, `[rx, tx]`.
    pub entries: [usize; 2],
    /// Makes `transmit` fail.
    pub fail_transmit: bool,
    /// Content returned by `copy_tx_data`.
    pub tx_data: Vec<u8>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|&e| pred(e)).count()
    }

    pub fn contains(&self, event: &Event) -> bool {
        self.events.contains(event)
    }

    pub fn notifications(&self) -> Vec<Event> {
        self.events.iter().filter(|e| e.is_notification()).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn notify(&mut self, event: Event) {
        assert_eq!(self.depth, 0, "{:?} invoked inside an exclusive area", event);
        self.events.push(event);
    }
}

impl ExclusiveArea for MockPlatform {
    fn enter(&mut self, area: Area) {
        assert_eq!(self.depth, 0, "exclusive areas must not nest ({:?})", area);
        self.depth += 1;
        self.entries[match area {
            Area::Rx => 0,
            Area::Tx => 1,
        }] += 1;
    }

    fn exit(&mut self, area: Area) {
        assert_eq!(self.depth, 1, "unbalanced exit of {:?}", area);
        self.depth -= 1;
    }
}

impl SignalCodec for MockPlatform {
    fn init_rx_buffers(&mut self, pdu: RxPduId) {
        self.events.push(Event::InitRxBuffers(pdu));
    }

    fn unpack(&mut self, pdu: RxPduId, info: &PduInfo<'_>) {
        self.events.push(Event::Unpack {
            pdu,
            sdu: info.sdu.unwrap_or_default().to_vec(),
            metadata: info.metadata.unwrap_or_default().to_vec(),
        });
    }

    /// The update bit of every signal is bit 0 of the first payload byte.
    fn is_updated(&self, _signal: SignalId, sdu: &[u8]) -> bool {
        sdu.first().is_some_and(|b| b & 0x01 != 0)
    }

    fn apply_replace_value(&mut self, signal: SignalId) {
        self.events.push(Event::ReplaceValue(signal));
    }
}

impl TxEngine for MockPlatform {
    fn init_tx_pdu(&mut self, pdu: TxPduId) {
        self.events.push(Event::InitTxPdu(pdu));
    }
    fn clear_update_bits(&mut self, pdu: TxPduId) {
        self.events.push(Event::ClearUpdateBits(pdu));
    }
    fn activate(&mut self, pdu: TxPduId) {
        self.events.push(Event::Activate(pdu));
    }
    fn deactivate(&mut self, pdu: TxPduId) {
        self.events.push(Event::Deactivate(pdu));
    }
    fn start_cyclic(&mut self, pdu: TxPduId) {
        self.events.push(Event::StartCyclic(pdu));
    }
    fn stop_cyclic(&mut self, pdu: TxPduId) {
        self.events.push(Event::StopCyclic(pdu));
    }
    fn stop_repetitions(&mut self, pdu: TxPduId) {
        self.events.push(Event::StopRepetitions(pdu));
    }
    fn reset_min_delay(&mut self, pdu: TxPduId) {
        self.events.push(Event::ResetMinDelay(pdu));
    }
    fn cancel_transmit(&mut self, pdu: TxPduId) {
        self.events.push(Event::CancelTransmit(pdu));
    }
    fn process_tx_mode(&mut self, pdu: TxPduId) {
        self.events.push(Event::ProcessTxMode(pdu));
    }
    fn transmit(&mut self, pdu: TxPduId) -> Result<(), ComError> {
        self.events.push(Event::Transmit(pdu));
        if self.fail_transmit { Err(ComError::LowerLayer) } else { Ok(()) }
    }
    fn copy_tx_data(&mut self, _pdu: TxPduId, buffer: &mut [u8]) -> Result<usize, ComError> {
        if buffer.len() < self.tx_data.len() {
            return Err(ComError::Overflow);
        }
        buffer[..self.tx_data.len()].copy_from_slice(&self.tx_data);
        Ok(self.tx_data.len())
    }
    fn confirm(&mut self, pdu: TxPduId) {
        self.events.push(Event::Confirm(pdu));
    }
}

impl SignalGateway for MockPlatform {
    fn forward_signal(&mut self, route: SignalRouteId, source: SignalId, destination: TxPduId) {
        self.events.push(Event::ForwardSignal(route, source, destination));
    }
    fn forward_description(&mut self, route: DescriptionRouteId, source: RxPduId, destination: TxPduId) {
        self.events.push(Event::ForwardDescription(route, source, destination));
    }
}

impl ComNotifications for MockPlatform {
    fn rx_indication(&mut self, notification: NotificationId) {
        self.notify(Event::RxIndication(notification));
    }
    fn rx_timeout(&mut self, notification: NotificationId) {
        self.notify(Event::RxTimeout(notification));
    }
    fn tx_confirmation(&mut self, notification: NotificationId) {
        self.notify(Event::TxConfirmation(notification));
    }
    fn tx_timeout(&mut self, notification: NotificationId) {
        self.notify(Event::TxTimeout(notification));
    }
}

/// Collects development error reports.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub reports: Vec<(ServiceId, DetError)>,
}

impl ErrorReporter for RecordingReporter {
    fn report_error(&mut self, service: ServiceId, error: DetError) {
        self.reports.push((service, error));
    }
}

pub type TestCom<'c> = autocom_rs::Com<'c, MockPlatform, RecordingReporter>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Links `config` and panics if it does not validate.
pub fn linked(config: ComConfig) -> ComConfig {
    match config.linked() {
        Ok(config) => config,
        Err(e) => panic!("test configuration rejected: {}", e),
    }
}

/// A module initialized with `config`.
pub fn started(config: &ComConfig) -> TestCom<'_> {
    init_logging();
    let mut com = TestCom::with_reporter(MockPlatform::new(), RecordingReporter::default());
    com.init(Some(config)).expect("init");
    com
}
