//! Asynchronous registry client implementation.

use std::sync::Arc;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, IF_MATCH, USER_AGENT,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use devhub_core::auth::{ConnectionString, SharedAccessSignature};
use devhub_core::error::{translate_error, Error};
use devhub_core::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

use crate::config::RegistryConfig;
use crate::models::{DeviceInfo, DeviceTwin, JobRequest, JobStatus, JobType};
use crate::Result;

const USER_AGENT_VALUE: &str = concat!("devhub-registry/", env!("CARGO_PKG_VERSION"));

/// Value of the `api-version` query parameter carried by every request.
pub const API_VERSION: &str = "2016-11-14";

/// Lifetime of tokens derived from a connection string (seconds).
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Asynchronous client for a device-identity registry.
///
/// The client is stateless between calls: each operation owns its request
/// descriptor and header map, so any number of operations may be in flight
/// concurrently on one (cheaply cloneable) instance.
#[derive(Clone)]
pub struct Registry {
    config: RegistryConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Constructs a client over the default HTTP transport.
    ///
    /// No network activity occurs at construction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the default transport cannot be
    /// built.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let transport = HttpTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Constructs a client over a caller-supplied transport.
    #[must_use]
    pub fn with_transport(config: RegistryConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Constructs a client from a connection string, deriving a shared
    /// access signature valid for one hour from the moment of the call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty input and propagates
    /// any connection-string parse failure.
    pub fn from_connection_string(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::MissingArgument("connectionString"));
        }

        let parsed = ConnectionString::parse(value)?;
        let expiry = SharedAccessSignature::expiry_after(DEFAULT_TOKEN_LIFETIME_SECS);
        let signature = parsed.derive_signature(expiry)?;
        let config = RegistryConfig::new(parsed.host_name(), signature.to_string())?;
        Self::new(config)
    }

    /// Constructs a client from a pre-built shared access signature, used
    /// verbatim as the credential with no expiry adjustment. The signature's
    /// `sr` field names the hub host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty input and propagates
    /// any signature parse failure.
    pub fn from_shared_access_signature(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::MissingArgument("sharedAccessSignature"));
        }

        let parsed = SharedAccessSignature::parse(value)?;
        let config = RegistryConfig::new(parsed.resource(), value)?;
        Self::new(config)
    }

    /// Returns the hub host this client talks to.
    #[must_use]
    pub fn host(&self) -> &str {
        self.config.host()
    }

    /// Registers a new device. Fails with `DeviceAlreadyExists` if the id is
    /// taken; no `If-Match` header is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// the device id is empty.
    pub async fn create_device(&self, device: &DeviceInfo) -> Result<DeviceInfo> {
        require_arg(&device.device_id, "deviceId")?;
        self.fetch_json(
            Method::PUT,
            &device_path(&device.device_id),
            HeaderMap::new(),
            Some(device),
        )
        .await
    }

    /// Updates an existing device unconditionally (`If-Match: *`), with
    /// last-writer-wins semantics delegated to the service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// the device id is empty.
    pub async fn update_device(&self, device: &DeviceInfo) -> Result<DeviceInfo> {
        require_arg(&device.device_id, "deviceId")?;
        self.fetch_json(
            Method::PUT,
            &device_path(&device.device_id),
            unconditional(),
            Some(device),
        )
        .await
    }

    /// Fetches a single device by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// the device id is empty.
    pub async fn get_device(&self, device_id: &str) -> Result<DeviceInfo> {
        require_arg(device_id, "deviceId")?;
        self.fetch_json::<(), DeviceInfo>(
            Method::GET,
            &device_path(device_id),
            HeaderMap::new(),
            None,
        )
        .await
    }

    /// Lists the first page of devices in the registry.
    ///
    /// # Errors
    ///
    /// Propagates transport and service errors.
    pub async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        self.fetch_json::<(), Vec<DeviceInfo>>(
            Method::GET,
            &format!("/devices?api-version={API_VERSION}"),
            HeaderMap::new(),
            None,
        )
        .await
    }

    /// Deletes a device unconditionally (`If-Match: *`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// the device id is empty.
    pub async fn delete_device(&self, device_id: &str) -> Result<()> {
        require_arg(device_id, "deviceId")?;
        self.execute_api_call(Method::DELETE, &device_path(device_id), unconditional(), None)
            .await?;
        Ok(())
    }

    /// Fetches the twin document for a device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// the device id is empty.
    pub async fn get_device_twin(&self, device_id: &str) -> Result<DeviceTwin> {
        require_arg(device_id, "deviceId")?;
        self.fetch_json::<(), DeviceTwin>(
            Method::GET,
            &format!("/twins/{device_id}?api-version={API_VERSION}"),
            HeaderMap::new(),
            None,
        )
        .await
    }

    /// Starts a bulk job importing device records from blob storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// either container URI is empty.
    pub async fn import_devices_from_blob(
        &self,
        input_blob_container_uri: &str,
        output_blob_container_uri: &str,
    ) -> Result<JobStatus> {
        require_arg(input_blob_container_uri, "inputBlobContainerUri")?;
        require_arg(output_blob_container_uri, "outputBlobContainerUri")?;

        let request = JobRequest {
            job_type: JobType::Import,
            input_blob_container_uri: Some(input_blob_container_uri.to_string()),
            output_blob_container_uri: output_blob_container_uri.to_string(),
            exclude_keys_in_export: None,
        };

        self.fetch_json(
            Method::POST,
            &format!("/jobs/create?api-version={API_VERSION}"),
            HeaderMap::new(),
            Some(&request),
        )
        .await
    }

    /// Starts a bulk job exporting device records to blob storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// the output container URI is empty.
    pub async fn export_devices_to_blob(
        &self,
        output_blob_container_uri: &str,
        exclude_keys: bool,
    ) -> Result<JobStatus> {
        require_arg(output_blob_container_uri, "outputBlobContainerUri")?;

        let request = JobRequest {
            job_type: JobType::Export,
            input_blob_container_uri: None,
            output_blob_container_uri: output_blob_container_uri.to_string(),
            exclude_keys_in_export: Some(exclude_keys),
        };

        self.fetch_json(
            Method::POST,
            &format!("/jobs/create?api-version={API_VERSION}"),
            HeaderMap::new(),
            Some(&request),
        )
        .await
    }

    /// Lists bulk import/export jobs.
    ///
    /// # Errors
    ///
    /// Propagates transport and service errors.
    pub async fn list_jobs(&self) -> Result<Vec<JobStatus>> {
        self.fetch_json::<(), Vec<JobStatus>>(
            Method::GET,
            &format!("/jobs?api-version={API_VERSION}"),
            HeaderMap::new(),
            None,
        )
        .await
    }

    /// Fetches the status of a bulk job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// the job id is empty.
    pub async fn get_job(&self, job_id: &str) -> Result<JobStatus> {
        require_arg(job_id, "jobId")?;
        self.fetch_json::<(), JobStatus>(
            Method::GET,
            &job_path(job_id),
            HeaderMap::new(),
            None,
        )
        .await
    }

    /// Cancels a bulk job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] before any request is issued when
    /// the job id is empty.
    pub async fn cancel_job(&self, job_id: &str) -> Result<()> {
        require_arg(job_id, "jobId")?;
        self.execute_api_call(Method::DELETE, &job_path(job_id), HeaderMap::new(), None)
            .await?;
        Ok(())
    }

    async fn fetch_json<B, R>(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<&B>,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| {
                Error::ArgumentError(format!("failed to serialize request body: {err}"))
            })?;

        let response = self.execute_api_call(method, path, headers, payload).await?;

        serde_json::from_str(&response.body).map_err(|err| {
            Error::ParseError(format!("failed to parse response for `{path}`: {err}"))
        })
    }

    async fn execute_api_call(
        &self,
        method: Method,
        path: &str,
        mut headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        let request_id = Uuid::new_v4().to_string();

        // Mandatory headers overwrite any caller-supplied values of the same
        // name; `HeaderMap::insert` also guarantees a single value per name.
        headers.insert(
            AUTHORIZATION,
            header_value(self.config.shared_access_signature())?,
        );
        headers.insert(HeaderName::from_static("request-id"), header_value(&request_id)?);
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        if body.is_some() {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
        }

        debug!(method = %method, path, request_id = %request_id, "dispatching registry request");

        let response = self
            .transport
            .execute(HttpRequest {
                method,
                host: self.config.host().to_string(),
                path: path.to_string(),
                headers,
                body,
            })
            .await?;

        if !response.is_success() {
            warn!(
                status = response.status.as_u16(),
                path,
                request_id = %request_id,
                "registry request failed"
            );
            return Err(translate_error(response.status.as_u16(), &response.body));
        }

        Ok(response)
    }
}

fn device_path(device_id: &str) -> String {
    format!("/devices/{device_id}?api-version={API_VERSION}")
}

fn job_path(job_id: &str) -> String {
    format!("/jobs/{job_id}?api-version={API_VERSION}")
}

fn unconditional() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(IF_MATCH, HeaderValue::from_static("*"));
    headers
}

fn require_arg(value: &str, name: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::MissingArgument(name));
    }
    Ok(())
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| Error::ArgumentError(format!("invalid header value: {err}")))
}
