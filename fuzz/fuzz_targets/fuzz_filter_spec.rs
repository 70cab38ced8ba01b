// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for filter spec parsing and matching

#![no_main]

use datamanager_model::{matches, FilterSpec, Record};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    // Input is "<spec json>\n<record json>"; either half may be garbage.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (spec_text, record_text) = text.split_once('\n').unwrap_or((text, "{}"));

    let Ok(spec_value) = serde_json::from_str::<Value>(spec_text) else {
        return;
    };
    // Parsing must reject non-objects without panicking.
    let Ok(spec) = FilterSpec::from_value(spec_value) else {
        return;
    };

    let record = serde_json::from_str::<Value>(record_text)
        .ok()
        .and_then(|value| Record::try_from(value).ok());
    if let Some(record) = record {
        let _ = matches(&record, &spec, false);
        let _ = matches(&record, &spec, true);
    }
});
