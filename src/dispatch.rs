use crate::proto::command::Message;
use crate::proto::parser::rejection;

/// Receives decoded telemetry.
pub trait TelemetrySink {
    fn on_sample(&self, millivolts: i64, milliamps: i64, timestamp_ms: u64);
}

/// Receives the device's model and serial number.
pub trait IdentitySink {
    fn on_identity(&self, model: &str, serial: &str);
}

/// What `dispatch` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Sample,
    Identity,
    Status,
    DeviceError,
    Unrecognized,
}

/// Route one decoded message. Only telemetry and identification touch the sink;
/// everything else is logged and dropped.
pub fn dispatch<S>(msg: Message, sink: &S) -> Disposition
where
    S: TelemetrySink + IdentitySink + ?Sized,
{
    match msg {
        Message::Telemetry {
            time_ms,
            millivolts,
            milliamps,
        } => {
            log::debug!(
                "[dispatch] sample t={}ms mv={} ma={}",
                time_ms,
                millivolts,
                milliamps
            );
            sink.on_sample(millivolts, milliamps, time_ms);
            Disposition::Sample
        }
        Message::Identification { model, serial } => {
            log::info!("[dispatch] device model={} serial={}", model, serial);
            sink.on_identity(&model, &serial);
            Disposition::Identity
        }
        Message::TestStarted => {
            log::info!("[dispatch] test started");
            Disposition::Status
        }
        Message::TestStopped => {
            log::info!("[dispatch] test stopped");
            Disposition::Status
        }
        Message::Idle => {
            log::info!("[dispatch] device idle");
            Disposition::Status
        }
        Message::AlreadyStarted => {
            log::warn!("[dispatch] device error state: test already started");
            Disposition::DeviceError
        }
        Message::AlreadyStopped => {
            log::warn!("[dispatch] device error state: test already stopped");
            Disposition::DeviceError
        }
        Message::Unrecognized { raw } => {
            log::warn!("[dispatch] unrecognized message: {:?}", raw);
            if let Some(reason) = rejection(&raw) {
                log::debug!("[dispatch] rejected: {}", reason);
            }
            Disposition::Unrecognized
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::proto::parser::decode;
    use std::cell::RefCell;

    /// Records every sink call in order.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub samples: RefCell<Vec<(u64, i64, i64)>>,
        pub identity: RefCell<Option<(String, String)>>,
    }

    impl TelemetrySink for RecordingSink {
        fn on_sample(&self, millivolts: i64, milliamps: i64, timestamp_ms: u64) {
            self.samples
                .borrow_mut()
                .push((timestamp_ms, millivolts, milliamps));
        }
    }

    impl IdentitySink for RecordingSink {
        fn on_identity(&self, model: &str, serial: &str) {
            *self.identity.borrow_mut() = Some((model.to_string(), serial.to_string()));
        }
    }

    #[test]
    fn mixed_sequence() {
        let sink = RecordingSink::default();
        let outcomes: Vec<Disposition> = [
            "STATUS;TIME=1;MV=10;MA=1;",
            "STATUS;TIME=2;MV=20;MA=2;",
            "ID;MODEL=15;SERIAL=4643;",
            "garbage",
        ]
        .into_iter()
        .map(|raw| dispatch(decode(raw), &sink))
        .collect();

        assert_eq!(*sink.samples.borrow(), vec![(1, 10, 1), (2, 20, 2)]);
        assert_eq!(
            *sink.identity.borrow(),
            Some(("15".to_string(), "4643".to_string()))
        );
        assert_eq!(
            outcomes
                .iter()
                .filter(|d| **d == Disposition::Unrecognized)
                .count(),
            1
        );
    }

    #[test]
    fn status_messages_leave_sink_untouched() {
        let sink = RecordingSink::default();
        assert_eq!(dispatch(Message::TestStarted, &sink), Disposition::Status);
        assert_eq!(dispatch(Message::TestStopped, &sink), Disposition::Status);
        assert_eq!(dispatch(Message::Idle, &sink), Disposition::Status);
        assert_eq!(
            dispatch(Message::AlreadyStarted, &sink),
            Disposition::DeviceError
        );
        assert_eq!(
            dispatch(Message::AlreadyStopped, &sink),
            Disposition::DeviceError
        );
        assert!(sink.samples.borrow().is_empty());
        assert!(sink.identity.borrow().is_none());
    }

    #[test]
    fn identity_is_last_write_wins() {
        let sink = RecordingSink::default();
        dispatch(decode("ID;MODEL=1;SERIAL=2;"), &sink);
        dispatch(decode("ID;MODEL=1531;SERIAL=04643;"), &sink);
        assert_eq!(
            *sink.identity.borrow(),
            Some(("1531".to_string(), "04643".to_string()))
        );
    }
}
