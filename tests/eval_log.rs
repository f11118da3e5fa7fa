#![allow(dead_code)]

use chrono::DateTime;
use log::{Level, Log, Record};
use toggle::{evaluate, Feature, Rule, RuntimeFact, State, Value};

use crate::utils::{log_record_init, RecordingLogger};

mod utils;

fn fact() -> RuntimeFact {
    RuntimeFact::new()
        .app_version(20)
        .api_level(23)
        .at(DateTime::from_timestamp_millis(1_700_000_000_000).unwrap())
}

#[test]
fn rule_trace() {
    log_record_init();

    let feature = Feature::new(
        "video",
        None,
        State::Enabled,
        vec![
            Rule::new(false, false, Some("old app"), Value::app_range(None, Some(13))),
            Rule::new(true, false, Some("sample metadata"), Value::app_range(Some(14), Some(23))),
        ],
    );
    let result = evaluate(&feature, &fact());
    assert!(result.enabled);

    let logs = RecordingLogger::LOGS.take();
    assert!(logs.starts_with("INFO [5000] Evaluating 'video' for {app version: 20, API level: 23"));
    assert!(logs.contains("- Rule #1: IF App version <= 13 THEN DISABLED => no match"));
    assert!(logs.contains(
        "- Rule #2: IF App version BETWEEN 14 AND 23 THEN ENABLED => MATCH, applying rule"
    ));
    assert!(logs.ends_with("Returning 'ENABLED'.\n"));
}

#[test]
fn inverted_rule_trace() {
    log_record_init();

    let feature = Feature::new(
        "legacy",
        None,
        State::Disabled,
        vec![Rule::new(true, true, None, Value::api_range(Some(21), None))],
    );
    let result = evaluate(&feature, &fact());
    assert!(!result.enabled);

    let logs = RecordingLogger::LOGS.take();
    assert!(logs.contains("- Rule #1: IF NOT API level >= 21 THEN ENABLED => no match"));
    assert!(logs.contains("No rule matched, using the default state DISABLED."));
    assert!(logs.ends_with("Returning 'DISABLED'.\n"));
}

#[test]
fn static_state_trace() {
    log_record_init();

    let feature = Feature::new(
        "mixpanel",
        Some(State::Disabled),
        State::Enabled,
        vec![Rule::new(true, false, None, Value::default())],
    );
    assert!(!evaluate(&feature, &fact()).enabled);

    let logs = RecordingLogger::LOGS.take();
    assert!(logs.contains("Static state DISABLED is set, skipping rules."));
    assert!(!logs.contains("Rule #1"));
}

#[test]
fn date_rule_trace() {
    log_record_init();

    let feature = Feature::new(
        "launch",
        None,
        State::Disabled,
        vec![Rule::new(true, false, None, Value::after(1_453_196_880_000))],
    );
    assert!(evaluate(&feature, &fact()).enabled);

    let logs = RecordingLogger::LOGS.take();
    assert!(logs.contains("IF Now AFTER 1453196880000 (2016-01-19 09:48:00 UTC) THEN ENABLED => MATCH"));
}

#[test]
fn record_without_event_id() {
    log_record_init();

    RecordingLogger {}.log(
        &Record::builder()
            .level(Level::Warn)
            .target("toggle::fetch::service")
            .args(format_args!("Config fetched"))
            .build(),
    );

    assert_eq!(RecordingLogger::LOGS.take(), "WARNING [-] Config fetched\n");
}
