//! Integration tests for parsing registry data.
//!
//! These tests validate that the devhub-registry models correctly round-trip
//! realistic registry response documents.

use std::fs;
use std::path::PathBuf;

use devhub_registry::models::{DeviceInfo, JobStatus, JobType};

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_fixture(name: &str) -> String {
    let fixture_path = fixtures_dir().join(name);
    fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    })
}

#[test]
fn test_deserialize_device_list() {
    let json_data = load_fixture("device_list.json");

    let devices: Vec<DeviceInfo> = serde_json::from_str(&json_data).unwrap_or_else(|e| {
        panic!("Failed to deserialize device list: {}\nJSON: {}", e, json_data)
    });

    assert_eq!(devices.len(), 3, "Expected 3 devices in test data");
    assert_eq!(devices[0].device_id, "thermostat-0001");
    assert_eq!(devices[1].device_id, "valve-controller-7");

    // Untyped properties pass through uninterpreted.
    assert_eq!(
        devices[0].properties["connectionState"],
        serde_json::json!("Connected")
    );
    assert_eq!(
        devices[1].properties["statusReason"],
        serde_json::json!("decommissioned for maintenance")
    );
    assert_eq!(
        devices[0].properties["authentication"]["symmetricKey"]["primaryKey"],
        serde_json::json!("VGhpcyBpcyBub3QgYSByZWFsIHByaW1hcnkga2V5")
    );

    // Sparse documents are valid: only deviceId is required.
    assert!(devices[2].properties.get("authentication").is_none());
}

#[test]
fn test_device_list_round_trip() {
    let json_data = load_fixture("device_list.json");
    let devices: Vec<DeviceInfo> = serde_json::from_str(&json_data).unwrap();

    let reserialized = serde_json::to_string(&devices).unwrap();
    let reparsed: Vec<DeviceInfo> = serde_json::from_str(&reserialized).unwrap();

    assert_eq!(devices, reparsed);
}

#[test]
fn test_deserialize_job_list() {
    let json_data = load_fixture("job_list.json");

    let jobs: Vec<JobStatus> = serde_json::from_str(&json_data).unwrap_or_else(|e| {
        panic!("Failed to deserialize job list: {}\nJSON: {}", e, json_data)
    });

    assert_eq!(jobs.len(), 2, "Expected 2 jobs in test data");

    let export = &jobs[0];
    assert_eq!(export.job_id.as_deref(), Some("3a7c1f6e-export-nightly"));
    assert_eq!(export.job_type, Some(JobType::Export));
    assert_eq!(export.status.as_deref(), Some("completed"));
    assert_eq!(export.progress, Some(100));
    assert_eq!(
        export.extra["outputBlobContainerUri"],
        serde_json::json!("https://backups.blob.example.net/devices")
    );

    let import = &jobs[1];
    assert_eq!(import.job_type, Some(JobType::Import));
    assert_eq!(
        import.failure_reason.as_deref(),
        Some("blob container unreachable")
    );
    assert_eq!(import.progress, Some(37));
}
