//! Mock construction helpers

use cmdpipe::adapter::{ConversionError, PropertyAdapter};
use cmdpipe::pipeline::HostMessage;
use cmdpipe::{Value, ValueType};
use crossbeam_channel::{unbounded, Receiver, Sender};
use mockall::mock;

mock! {
    pub Adapter {}

    impl PropertyAdapter for Adapter {
        fn get_property(&self, object: &Value, name: &str) -> Option<Value>;
        fn property_names(&self, object: &Value) -> Option<Vec<String>>;
        fn convert_to(&self, value: &Value, target: ValueType) -> Result<Value, ConversionError>;
    }
}

/// Create a live host channel
pub fn create_host_channel() -> (Sender<HostMessage>, Receiver<HostMessage>) {
    unbounded()
}

/// Collect messages until `Completed` arrives or the channel closes
pub fn collect_until_completed(rx: &Receiver<HostMessage>) -> Vec<HostMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.recv_timeout(super::test_timeout()) {
        let done = matches!(message, HostMessage::Completed { .. });
        messages.push(message);
        if done {
            break;
        }
    }
    messages
}
