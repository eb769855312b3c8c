//! Fuzz target: `json_api::handle`
//!
//! Feeds arbitrary request bodies to a two-line runtime and asserts that
//! every answer is valid JSON, that rejections carry a known kind, and
//! that no request ever leaves two valves open.
//!
//! cargo fuzz run fuzz_api_request

#![no_main]

use std::time::Duration;

use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use sprinkler::adapters::json_api;
use sprinkler::adapters::time::ManualClock;
use sprinkler::app::ports::NullSink;
use sprinkler::app::service::Controller;
use sprinkler::config::SystemConfig;
use sprinkler::drivers::sim::SimulatedPins;
use sprinkler::runtime::Runtime;

const KINDS: &[&str] = &["InvalidLine", "InvalidAction", "HardwareFault", "BadRequest"];

fuzz_target!(|data: &[u8]| {
    let Some(noon) = NaiveDate::from_ymd_opt(2024, 6, 1).and_then(|d| d.and_hms_opt(12, 0, 0))
    else {
        return;
    };
    let config = SystemConfig {
        lines: vec![
            vec!["A".into(), "GPIO17".into()],
            vec!["B".into(), "GPIO21".into()],
        ],
        ..SystemConfig::default()
    };
    let controller = Controller::from_config(&config, SimulatedPins::new(), noon, &mut NullSink)
        .expect("fixed config is valid");
    let rt = Runtime::new(controller, NullSink, ManualClock::new(noon), Duration::from_millis(1));

    // Split on newlines so one input exercises a sequence of requests.
    for body in data.split(|b| *b == b'\n') {
        let response = json_api::handle(&rt, body);
        let value: serde_json::Value =
            serde_json::from_str(&response).expect("response must be JSON");
        if let Some(kind) = value.get("error").and_then(|k| k.as_str()) {
            assert!(KINDS.contains(&kind), "unexpected rejection kind {kind}");
        }
        let open = rt.with_controller(|c| c.driver().high_pins().count());
        assert!(open <= 1, "{open} valves open");
    }
});
