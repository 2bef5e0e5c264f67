#![no_main]

use hookq_sdk::{HealthRecord, Schema, TimelineRecord};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    if let Ok(timeline) = TimelineRecord::validate(&value) {
        let reserialized = serde_json::to_value(&timeline).unwrap();
        assert_eq!(TimelineRecord::validate(&reserialized).unwrap(), timeline);
    }
    let _ = HealthRecord::validate(&value);
});
