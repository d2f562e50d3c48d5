//! Metric helper tests

use prometheus::core::Collector;
use redfish_exporter::metrics::{
    gauge_vec, health_value, render, round, status_health, ScrapeTimer, HEALTH_DEGRADED,
    HEALTH_NOT_AVAILABLE, HEALTH_OK,
};
use redfish_exporter::redfish::types::Status;
use std::time::{Duration, Instant};

#[test]
fn test_health_mapping() {
    assert_eq!(health_value(Some("OK")), HEALTH_OK);
    assert_eq!(health_value(Some("Warning")), HEALTH_DEGRADED);
    assert_eq!(health_value(Some("Critical")), HEALTH_DEGRADED);
    assert_eq!(health_value(Some("ok")), HEALTH_DEGRADED);
    assert_eq!(health_value(Some("")), HEALTH_NOT_AVAILABLE);
    assert_eq!(health_value(None), HEALTH_NOT_AVAILABLE);
}

#[test]
fn test_status_health_reads_health_field() {
    let status = Status {
        health: Some("OK".to_string()),
        state: Some("Absent".to_string()),
    };

    assert_eq!(status_health(&status), HEALTH_OK);
    assert_eq!(status_health(&Status::default()), HEALTH_NOT_AVAILABLE);
}

#[test]
fn test_round_to_three_places() {
    assert_eq!(round(12.0456, 3), 12.046);
    assert_eq!(round(3.3, 3), 3.3);
    assert_eq!(round(-1.23449, 3), -1.234);
}

#[test]
fn test_gauge_vec_uses_ipmi_namespace() {
    // Given: A gauge vector built through the helper
    let gauge = gauge_vec("fan_speed_rpm", "Fan speed in RPM", &["name"]).expect("gauge");
    gauge.with_label_values(&["Fan1"]).set(5400.0);

    // When: Rendering it
    let text = render(&gauge.collect()).expect("render");

    // Then: The metric carries the ipmi_ prefix
    assert!(text.contains("ipmi_fan_speed_rpm{name=\"Fan1\"} 5400"));
}

#[test]
fn test_scrape_timer_records_elapsed_time() {
    // Given: A timer for the fan family
    let timer = ScrapeTimer::new("fan").expect("timer");
    timer.bind_target("bmc-1");
    let start = Instant::now() - Duration::from_millis(50);

    // When: Recording
    timer.record(start);

    // Then: The gauge holds at least the elapsed time and the target is kept
    assert!(timer.seconds() >= 0.05);
    assert_eq!(timer.target(), "bmc-1");
    assert_eq!(timer.family(), "fan");
    let text = render(&timer.collect()).expect("render");
    assert!(text.contains("ipmi_fan_scrape_duration_seconds"));
}

#[test]
fn test_render_empty_is_empty() {
    assert_eq!(render(&[]).expect("render"), "");
}
