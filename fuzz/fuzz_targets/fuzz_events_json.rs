//! Fuzz target for event-log JSON ingestion.
//!
//! Arbitrary bytes must either fail to parse or produce a snapshot whose
//! recommendation honors the output contract.

#![no_main]

use bw_core::{EventSnapshot, RefreshAnalyzer};
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(snapshot) = EventSnapshot::from_json(text) else {
        return;
    };
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let rec = RefreshAnalyzer::with_defaults().recommend(&snapshot, now);
    assert!(rec.is_well_formed(), "{rec:?}");
});
