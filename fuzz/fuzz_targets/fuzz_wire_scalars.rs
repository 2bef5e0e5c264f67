#![no_main]

//! Message ids and timestamps from arbitrary strings.

use hookq_sdk::{MessageId, format_timestamp, is_valid_message_id, parse_timestamp};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let parsed = raw.parse::<MessageId>();
    assert_eq!(parsed.is_ok(), is_valid_message_id(raw));

    if let Ok(ts) = parse_timestamp(raw) {
        let formatted = format_timestamp(&ts);
        assert_eq!(parse_timestamp(&formatted).unwrap(), ts);
    }
});
