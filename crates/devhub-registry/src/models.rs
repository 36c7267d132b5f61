//! Registry data models shared by client and prospective server tooling.
//!
//! Device and twin documents are open-shaped: only `deviceId` is required,
//! everything else passes through verbatim. Job documents carry the fields
//! the service defines today, plus a flattened bag for anything it adds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A device identity as stored in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeviceInfo {
    /// Device identifier, the only structurally required field.
    #[serde(rename = "deviceId")]
    pub device_id: String,

    /// Remaining device properties, passed through uninterpreted.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl DeviceInfo {
    /// Creates a device record with the given id and no other properties.
    #[must_use]
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            properties: Map::new(),
        }
    }

    /// Adds an opaque property to the record.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// A device twin: the server-side document holding desired and reported
/// state for a device, retrieved through its own read path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeviceTwin {
    /// Identifier of the device this twin belongs to.
    #[serde(rename = "deviceId")]
    pub device_id: String,

    /// The rest of the twin document, passed through uninterpreted.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// Direction of a bulk registry job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Import device records from blob storage into the registry.
    Import,
    /// Export device records from the registry to blob storage.
    Export,
}

/// Body of a `POST /jobs/create` request. Built by the client, not supplied
/// by callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    /// Job direction; discriminates the create-job body.
    #[serde(rename = "type")]
    pub job_type: JobType,

    /// Source container for import jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_blob_container_uri: Option<String>,

    /// Destination container for job output.
    pub output_blob_container_uri: String,

    /// Whether exported records should omit authentication keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_keys_in_export: Option<bool>,
}

/// A job document as returned by the service. The service owns this shape;
/// every field is optional and unknown fields are retained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Job identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// Job direction.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<JobType>,

    /// Lifecycle state reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Completion percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,

    /// Failure detail for failed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Remaining job fields, passed through uninterpreted.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_info_round_trips_opaque_properties() {
        let parsed: DeviceInfo = serde_json::from_value(json!({
            "deviceId": "d1",
            "status": "enabled",
            "authentication": {"symmetricKey": {"primaryKey": "abc"}}
        }))
        .unwrap();

        assert_eq!(parsed.device_id, "d1");
        assert_eq!(parsed.properties["status"], json!("enabled"));

        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back["authentication"]["symmetricKey"]["primaryKey"], "abc");
    }

    #[test]
    fn device_info_builder() {
        let device = DeviceInfo::new("d1").with_property("status", json!("disabled"));
        assert_eq!(device.device_id, "d1");
        assert_eq!(device.properties["status"], json!("disabled"));
    }

    #[test]
    fn job_request_import_serialization() {
        let request = JobRequest {
            job_type: JobType::Import,
            input_blob_container_uri: Some("https://blobs/in".to_string()),
            output_blob_container_uri: "https://blobs/out".to_string(),
            exclude_keys_in_export: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "import",
                "inputBlobContainerUri": "https://blobs/in",
                "outputBlobContainerUri": "https://blobs/out"
            })
        );
    }

    #[test]
    fn job_request_export_serialization() {
        let request = JobRequest {
            job_type: JobType::Export,
            input_blob_container_uri: None,
            output_blob_container_uri: "https://blobs/out".to_string(),
            exclude_keys_in_export: Some(true),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "export",
                "outputBlobContainerUri": "https://blobs/out",
                "excludeKeysInExport": true
            })
        );
    }

    #[test]
    fn job_status_tolerates_unknown_fields() {
        let parsed: JobStatus = serde_json::from_value(json!({
            "jobId": "job-1",
            "type": "export",
            "status": "completed",
            "progress": 100,
            "outputBlobContainerUri": "https://blobs/out"
        }))
        .unwrap();

        assert_eq!(parsed.job_id.as_deref(), Some("job-1"));
        assert_eq!(parsed.job_type, Some(JobType::Export));
        assert_eq!(parsed.status.as_deref(), Some("completed"));
        assert_eq!(parsed.progress, Some(100));
        assert_eq!(
            parsed.extra["outputBlobContainerUri"],
            json!("https://blobs/out")
        );
    }
}
