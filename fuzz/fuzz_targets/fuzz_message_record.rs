#![no_main]

//! Arbitrary JSON through the message record schema must either validate
//! or report issues, and a validated record must survive re-validation.

use hookq_sdk::{MessageRecord, Schema};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    match MessageRecord::validate(&value) {
        Ok(record) => {
            let reserialized = serde_json::to_value(&record).unwrap();
            let again = MessageRecord::validate(&reserialized).unwrap();
            assert_eq!(record, again);
        }
        Err(err) => assert!(!err.issues().is_empty()),
    }
});
