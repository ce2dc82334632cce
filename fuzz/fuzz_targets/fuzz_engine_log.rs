//! Fuzz target for the full analysis pipeline on structured logs.

#![no_main]

use arbitrary::Arbitrary;
use bw_common::Event;
use bw_core::{EventSnapshot, RefreshAnalyzer};
use chrono::{Duration, TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzEvent {
    offset_seconds: u32,
    open_minutes: Option<u8>,
    bridge: u8,
}

#[derive(Debug, Arbitrary)]
struct FuzzLog {
    events: Vec<FuzzEvent>,
    now_offset_seconds: u32,
}

fuzz_target!(|log: FuzzLog| {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let events = log
        .events
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let open = t0 + Duration::seconds(i64::from(e.offset_seconds));
            let event = Event::new(i.to_string(), format!("b{}", e.bridge % 4), open);
            match e.open_minutes {
                Some(m) => event.closed_at(open + Duration::minutes(i64::from(m))),
                None => event,
            }
        })
        .collect();
    let snapshot = EventSnapshot::new(events);
    let now = t0 + Duration::seconds(i64::from(log.now_offset_seconds));

    let analyzer = RefreshAnalyzer::with_defaults();
    let report = analyzer.analyze(&snapshot, now);
    assert!(report.recommendation.is_well_formed(), "{:?}", report.recommendation);
    let again = analyzer.analyze(&snapshot, now);
    assert_eq!(
        serde_json::to_string(&report).ok(),
        serde_json::to_string(&again).ok()
    );
});
