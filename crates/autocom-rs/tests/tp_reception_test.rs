// crates/autocom-rs/tests/tp_reception_test.rs
mod harness;

use autocom_rs::config::{
    IpduGroupConfig, MainFunctionRxConfig, RxPduConfig, RxTimeoutConfig, RxTpConnectionConfig,
    TimerConfig,
};
use autocom_rs::{
    ComConfig, ComError, DetError, IpduGroupId, NotificationId, PduInfo, RxPduId, RxTimeoutId,
    RxTpConnectionId, RxTpState, ServiceId, TimerEvent, TimerId, TpResult,
};
use harness::{Event, linked, started};

const TP_PDU: RxPduId = RxPduId(0);
const NORMAL_PDU: RxPduId = RxPduId(1);
const CONN: RxTpConnectionId = RxTpConnectionId(0);
const GROUP: IpduGroupId = IpduGroupId(0);

fn tp_config(capacity: usize, metadata_len: u8, deferred: bool) -> ComConfig {
    let mut tp = RxPduConfig::tp(CONN);
    tp.metadata_len = metadata_len;
    tp.deferred = deferred;
    tp.notifications = vec![NotificationId(3)];
    linked(ComConfig {
        tp_buffer_size: 8 + capacity,
        rx_pdus: vec![tp, RxPduConfig::normal()],
        groups: vec![IpduGroupConfig { rx_pdus: vec![TP_PDU, NORMAL_PDU], tx_pdus: vec![] }],
        rx_tp_connections: vec![RxTpConnectionConfig { buffer_start: 8, capacity }],
        main_functions_rx: vec![MainFunctionRxConfig {
            deferred_pdus: vec![TP_PDU],
            timeouts: vec![],
        }],
        ..ComConfig::default()
    })
}

#[test]
fn segmented_message_is_reassembled_and_delivered() {
    let config = tp_config(16, 0, false);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);
    let none = PduInfo::default();

    assert_eq!(com.start_of_reception(TP_PDU, &none, 20), Err(ComError::Overflow));
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));

    assert_eq!(com.start_of_reception(TP_PDU, &none, 10), Ok(16));
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::ReceptionStarted));

    assert_eq!(com.copy_rx_data(TP_PDU, &PduInfo::new(&[1, 2, 3, 4, 5, 6])), Ok(10));
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Copying));

    assert_eq!(com.copy_rx_data(TP_PDU, &PduInfo::new(&[7, 8, 9, 10])), Ok(6));
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::WaitingForIndication));

    // A zero-length copy while waiting is harmless.
    assert_eq!(com.copy_rx_data(TP_PDU, &PduInfo::new(&[])), Ok(0));

    com.tp_rx_indication(TP_PDU, TpResult::Ok);
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));
    assert!(com.platform().contains(&Event::Unpack {
        pdu: TP_PDU,
        sdu: (1..=10).collect(),
        metadata: vec![],
    }));
    assert_eq!(com.platform().notifications(), [Event::RxIndication(NotificationId(3))]);
}

#[test]
fn metadata_travels_with_the_message() {
    let config = tp_config(8, 2, false);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);

    assert_eq!(com.start_of_reception(TP_PDU, &PduInfo::metadata_only(&[0xE1, 0xE2]), 3), Ok(6));
    assert_eq!(com.copy_rx_data(TP_PDU, &PduInfo::new(&[9, 9, 9])), Ok(3));
    com.tp_rx_indication(TP_PDU, TpResult::Ok);

    assert!(com.platform().contains(&Event::Unpack {
        pdu: TP_PDU,
        sdu: vec![9, 9, 9],
        metadata: vec![0xE1, 0xE2],
    }));
}

#[test]
fn failed_or_early_indication_resets_without_delivery() {
    let config = tp_config(16, 0, false);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);

    com.start_of_reception(TP_PDU, &PduInfo::default(), 4).unwrap();
    com.copy_rx_data(TP_PDU, &PduInfo::new(&[1, 2])).unwrap();
    com.tp_rx_indication(TP_PDU, TpResult::Ok);
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));

    com.start_of_reception(TP_PDU, &PduInfo::default(), 2).unwrap();
    com.copy_rx_data(TP_PDU, &PduInfo::new(&[1, 2])).unwrap();
    com.tp_rx_indication(TP_PDU, TpResult::NotOk);
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));

    assert_eq!(com.platform().count(|e| matches!(e, Event::Unpack { .. })), 0);
}

#[test]
fn overrun_and_late_segments_abort_the_transfer() {
    let config = tp_config(16, 0, false);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);

    com.start_of_reception(TP_PDU, &PduInfo::default(), 3).unwrap();
    assert_eq!(
        com.copy_rx_data(TP_PDU, &PduInfo::new(&[1, 2, 3, 4])),
        Err(ComError::TransferAborted)
    );
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));

    com.start_of_reception(TP_PDU, &PduInfo::default(), 1).unwrap();
    com.copy_rx_data(TP_PDU, &PduInfo::new(&[1])).unwrap();
    assert_eq!(com.copy_rx_data(TP_PDU, &PduInfo::new(&[2])), Err(ComError::TransferAborted));
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));
}

#[test]
fn second_start_of_reception_is_busy() {
    let config = tp_config(16, 0, false);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);

    com.start_of_reception(TP_PDU, &PduInfo::default(), 5).unwrap();
    com.copy_rx_data(TP_PDU, &PduInfo::new(&[1, 2])).unwrap();
    assert_eq!(com.start_of_reception(TP_PDU, &PduInfo::default(), 5), Err(ComError::Busy));
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Copying));
}

#[test]
fn deferred_message_is_processed_by_the_rx_tick() {
    let config = tp_config(16, 0, true);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);

    com.start_of_reception(TP_PDU, &PduInfo::default(), 2).unwrap();
    com.copy_rx_data(TP_PDU, &PduInfo::new(&[0x11, 0x22])).unwrap();
    com.tp_rx_indication(TP_PDU, TpResult::Ok);
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::BufferLocked));
    assert_eq!(com.start_of_reception(TP_PDU, &PduInfo::default(), 2), Err(ComError::Busy));
    assert!(com.platform().notifications().is_empty());

    com.main_function_rx(0);
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));
    assert!(com.platform().contains(&Event::Unpack {
        pdu: TP_PDU,
        sdu: vec![0x11, 0x22],
        metadata: vec![],
    }));
    assert_eq!(com.platform().notifications(), [Event::RxIndication(NotificationId(3))]);
}

/// A deferred Normal PDU with one metadata byte, monitored by a 3-tick timer.
fn deferred_normal_config(scheduled: bool) -> ComConfig {
    let mut pdu = RxPduConfig::normal();
    pdu.metadata_len = 1;
    pdu.length = 4;
    pdu.deferred = true;
    pdu.notifications = vec![NotificationId(4)];
    linked(ComConfig {
        rx_pdus: vec![pdu],
        groups: vec![IpduGroupConfig { rx_pdus: vec![RxPduId(0)], tx_pdus: vec![] }],
        timers: vec![TimerConfig::new(3, TimerEvent::RxTimeout(RxTimeoutId(0)))],
        rx_timeouts: vec![RxTimeoutConfig::new(RxPduId(0), TimerId(0))],
        main_functions_rx: vec![MainFunctionRxConfig {
            deferred_pdus: if scheduled { vec![RxPduId(0)] } else { vec![] },
            timeouts: vec![RxTimeoutId(0)],
        }],
        ..ComConfig::default()
    })
}

#[test]
fn deferred_normal_pdu_is_unpacked_by_the_rx_tick() {
    let config = deferred_normal_config(true);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);
    com.main_function_rx(0);
    com.main_function_rx(0);
    assert_eq!(com.timer_counter(TimerId(0)), Some(1));

    com.rx_indication(RxPduId(0), &PduInfo::with_metadata(&[0x31, 0x32, 0x33], &[0x7E]));
    assert_eq!(com.platform().count(|e| matches!(e, Event::Unpack { .. })), 0);
    assert!(com.platform().notifications().is_empty());
    assert_eq!(com.timer_counter(TimerId(0)), Some(1));

    // Processing reloads the monitor before this tick's countdown.
    com.main_function_rx(0);
    assert_eq!(com.timer_counter(TimerId(0)), Some(2));
    assert!(!com.rx_timeout_occurred(RxTimeoutId(0)));
    assert!(com.platform().contains(&Event::Unpack {
        pdu: RxPduId(0),
        sdu: vec![0x31, 0x32, 0x33],
        metadata: vec![0x7E],
    }));
    assert_eq!(com.platform().notifications(), [Event::RxIndication(NotificationId(4))]);

    // Nothing pending any more.
    com.main_function_rx(0);
    assert_eq!(com.platform().count(|e| matches!(e, Event::Unpack { .. })), 1);
}

#[test]
fn deferred_pdu_without_rx_partition_is_dropped() {
    let config = deferred_normal_config(false);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);

    com.rx_indication(RxPduId(0), &PduInfo::with_metadata(&[0x01], &[0x02]));
    com.main_function_rx(0);
    com.main_function_rx(0);
    com.main_function_rx(0);

    assert_eq!(com.platform().count(|e| matches!(e, Event::Unpack { .. })), 0);
    assert!(com.platform().notifications().is_empty());
    assert!(com.rx_timeout_occurred(RxTimeoutId(0)));
    assert!(com.reporter().reports.is_empty());
}

#[test]
fn group_stop_resets_a_running_transfer() {
    let config = tp_config(16, 0, false);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);

    com.start_of_reception(TP_PDU, &PduInfo::default(), 8).unwrap();
    com.ipdu_group_stop(GROUP);
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));
    assert_eq!(com.start_of_reception(TP_PDU, &PduInfo::default(), 8), Err(ComError::PduInactive));
}

#[test]
fn parameter_errors_precede_the_state_machine() {
    let config = tp_config(8, 2, false);
    let mut com = started(&config);
    com.ipdu_group_start(GROUP, true);

    assert_eq!(
        com.start_of_reception(TP_PDU, &PduInfo::default(), 2),
        Err(ComError::MetadataMismatch)
    );
    assert_eq!(com.copy_rx_data(TP_PDU, &PduInfo::default()), Err(ComError::MissingData));
    assert_eq!(
        com.start_of_reception(NORMAL_PDU, &PduInfo::default(), 2),
        Err(ComError::WrongPduKind)
    );
    com.rx_indication(TP_PDU, &PduInfo::new(&[1]));
    assert_eq!(com.tp_connection_state(CONN), Some(RxTpState::Ready));
    assert_eq!(com.platform().count(|e| matches!(e, Event::Unpack { .. })), 0);

    if cfg!(feature = "dev-error-detect") {
        assert_eq!(
            com.reporter().reports,
            [
                (ServiceId::StartOfReception, DetError::Param),
                (ServiceId::CopyRxData, DetError::ParamPointer),
                (ServiceId::StartOfReception, DetError::Param),
                (ServiceId::RxIndication, DetError::Param),
            ]
        );
    }
}
