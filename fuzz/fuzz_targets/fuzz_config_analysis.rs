//! Fuzz target for analysis.json configuration parsing.
//!
//! Parsing and validation must never panic; a config that validates must
//! keep every recommendation inside the hard bounds.

#![no_main]

use bw_config::{validate_config, AnalysisConfig};
use bw_core::synthetic::{self, default_start};
use bw_core::{EventSnapshot, RefreshAnalyzer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = serde_json::from_slice::<AnalysisConfig>(data) else {
        return;
    };
    if validate_config(&config).is_err() {
        return;
    }
    let snapshot = EventSnapshot::new(synthetic::commute(120, default_start(), "fuzz"));
    let rec = RefreshAnalyzer::new(config).recommend(&snapshot, default_start());
    assert!(rec.is_well_formed(), "{rec:?}");
});
