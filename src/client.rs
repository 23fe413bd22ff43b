use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    error::{RequestFailure, Result, SubmissionError},
    submissions::{
        jars, Action, DriverState, KillResponse, SparkProperties, SparkResponse, StatusResponse,
        SubmitRequest, SubmitResponse,
    },
    transport::{HttpRequest, HttpTransport, Transport},
};

pub const DEFAULT_SPARK_VERSION: &str = "2.4.0";

fn default_spark_version() -> String {
    DEFAULT_SPARK_VERSION.to_string()
}

/// Connection settings for one master. Fixed once built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    master: String,
    #[serde(default = "default_spark_version")]
    spark_version: String,
    #[serde(default)]
    environment_variables: HashMap<String, String>,
    #[serde(default)]
    supervise: Option<bool>,
    #[serde(default)]
    event_log_disabled: Option<bool>,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

impl ClientConfig {
    /// `master` is `host:port`, without a scheme.
    pub fn builder(master: &str) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self {
                master: master.to_string(),
                spark_version: default_spark_version(),
                environment_variables: HashMap::new(),
                supervise: None,
                event_log_disabled: None,
                timeout_ms: None,
            },
        }
    }

    pub fn master(&self) -> &str {
        &self.master
    }

    pub fn spark_version(&self) -> &str {
        &self.spark_version
    }

    pub fn environment_variables(&self) -> &HashMap<String, String> {
        &self.environment_variables
    }

    pub fn supervise(&self) -> Option<bool> {
        self.supervise
    }

    pub fn event_log_disabled(&self) -> Option<bool> {
        self.event_log_disabled
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Same settings pointed at another master.
    pub fn with_master(self, master: &str) -> Self {
        Self {
            master: master.to_string(),
            ..self
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn spark_version(mut self, version: &str) -> Self {
        self.config.spark_version = version.to_string();
        self
    }

    pub fn environment_variable(mut self, key: &str, value: &str) -> Self {
        self.config
            .environment_variables
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn environment_variables(mut self, variables: HashMap<String, String>) -> Self {
        self.config.environment_variables.extend(variables);
        self
    }

    pub fn supervise(mut self, supervise: bool) -> Self {
        self.config.supervise = Some(supervise);
        self
    }

    pub fn event_log_disabled(mut self, disabled: bool) -> Self {
        self.config.event_log_disabled = Some(disabled);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Submits, inspects and kills drivers through the master's REST gateway.
pub struct SubmissionClient<T: Transport = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl SubmissionClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> SubmissionClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Each segment is percent-encoded, so an id can't escape its path segment.
    fn url(&self, segments: &[&str]) -> Result<String> {
        let mut url = Url::parse(&format!("http://{}/v1/submissions", self.config.master))
            .map_err(|err| RequestFailure::Transport(Box::new(err)))?;
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        Ok(url.into())
    }

    pub fn submit_request(
        &self,
        app_name: &str,
        main_class: &str,
        app_resource: &str,
        app_args: &[String],
        extra_jars: Option<&HashSet<String>>,
    ) -> SubmitRequest {
        SubmitRequest {
            action: Action::CreateSubmissionRequest,
            app_args: app_args.to_vec(),
            app_resource: app_resource.to_string(),
            client_spark_version: self.config.spark_version.clone(),
            main_class: main_class.to_string(),
            environment_variables: self.config.environment_variables.clone(),
            spark_properties: SparkProperties {
                jars: jars(app_resource, extra_jars),
                app_name: app_name.to_string(),
                event_log_enabled: self.config.event_log_disabled.map(|disabled| !disabled),
                driver_supervise: self.config.supervise,
                master: self.config.master.clone(),
            },
        }
    }

    /// Launches a driver and returns its submission id. An accepted
    /// submission does not mean the driver was deployed.
    pub async fn submit_job(
        &self,
        app_name: &str,
        main_class: &str,
        app_resource: &str,
        app_args: &[String],
        extra_jars: Option<&HashSet<String>>,
    ) -> Result<String> {
        let request =
            self.submit_request(app_name, main_class, app_resource, app_args, extra_jars);
        let body = serde_json::to_string(&request).map_err(RequestFailure::Encode)?;
        let response: SubmitResponse = self
            .execute_and_decode("create", HttpRequest::post(&self.url(&["create"])?, Some(body)))
            .await?;
        match response.submission_id {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => Err(RequestFailure::Rejected(
                "master accepted the submission without a submission id".to_string(),
            )
            .into()),
        }
    }

    pub async fn kill_job(&self, submission_id: &str) -> Result<()> {
        let submission_id = validate_submission_id(submission_id)?;
        let url = self.url(&["kill", submission_id])?;
        self.execute_and_decode::<KillResponse>("kill", HttpRequest::post(&url, None))
            .await?;
        Ok(())
    }

    /// Full status record, including where the driver runs.
    pub async fn status(&self, submission_id: &str) -> Result<StatusResponse> {
        let submission_id = validate_submission_id(submission_id)?;
        let url = self.url(&["status", submission_id])?;
        self.execute_and_decode("status", HttpRequest::get(&url))
            .await
    }

    pub async fn job_status(&self, submission_id: &str) -> Result<DriverState> {
        self.status(submission_id).await?.driver_state.ok_or_else(|| {
            RequestFailure::Rejected("master returned a status without a driver state".to_string())
                .into()
        })
    }

    async fn execute_and_decode<R: SparkResponse>(
        &self,
        operation: &str,
        request: HttpRequest,
    ) -> Result<R> {
        let body = self.transport.execute(request).await?;
        if body.trim().is_empty() {
            return Err(RequestFailure::EmptyBody.into());
        }
        let response: R = serde_json::from_str(&body).map_err(RequestFailure::Decode)?;
        if !response.success() {
            let reason = match response.message() {
                Some(message) => format!(
                    "master failed executing the {} request: {}",
                    operation, message
                ),
                None => format!("master failed executing the {} request", operation),
            };
            return Err(RequestFailure::Rejected(reason).into());
        }
        Ok(response)
    }
}

fn validate_submission_id(submission_id: &str) -> Result<&str> {
    if submission_id.trim().is_empty() {
        Err(SubmissionError::InvalidArgument(
            "submission id must be a non blank string".to_string(),
        ))
    } else {
        Ok(submission_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::Value;

    use super::*;

    /// Replays one canned body (or an I/O failure when `None`) and keeps
    /// every request it was handed.
    struct RecordingTransport {
        body: Option<String>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingTransport {
        fn replying(body: &str) -> Self {
            Self {
                body: Some(body.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                body: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn execute(&self, request: HttpRequest) -> std::result::Result<String, RequestFailure> {
            self.requests.lock().unwrap().push(request);
            match &self.body {
                Some(body) => Ok(body.clone()),
                None => Err(RequestFailure::Transport(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )))),
            }
        }
    }

    fn client(transport: RecordingTransport) -> SubmissionClient<RecordingTransport> {
        let config = ClientConfig::builder("master:6066")
            .spark_version("2.4.5")
            .environment_variable("SPARK_ENV_LOADED", "1")
            .supervise(true)
            .event_log_disabled(true)
            .build();
        SubmissionClient::with_transport(config, transport)
    }

    async fn submit(client: &SubmissionClient<RecordingTransport>) -> Result<String> {
        client
            .submit_job(
                "wordcount",
                "com.example.WordCount",
                "hdfs:///apps/wordcount.jar",
                &["in.txt".to_string()],
                None,
            )
            .await
    }

    #[tokio::test]
    async fn submit_returns_submission_id() {
        let client = client(RecordingTransport::replying(
            r#"{"success":true,"submissionId":"driver-001"}"#,
        ));
        assert_eq!(submit(&client).await.unwrap(), "driver-001");

        let requests = client.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].url, "http://master:6066/v1/submissions/create");

        let sent: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent["action"], "CreateSubmissionRequest");
        assert_eq!(sent["clientSparkVersion"], "2.4.5");
        assert_eq!(sent["environmentVariables"]["SPARK_ENV_LOADED"], "1");
        assert_eq!(sent["sparkProperties"]["jars"], "hdfs:///apps/wordcount.jar");
        assert_eq!(sent["sparkProperties"]["driverSupervise"], true);
        assert_eq!(sent["sparkProperties"]["eventLogEnabled"], false);
        assert_eq!(sent["sparkProperties"]["master"], "master:6066");
    }

    #[tokio::test]
    async fn submit_rejected_by_master_fails() {
        let client = client(RecordingTransport::replying(
            r#"{"success":false,"message":"no resources"}"#,
        ));
        let err = submit(&client).await.unwrap_err();
        assert!(err.is_request_failed());
        assert!(err.to_string().contains("no resources"));
    }

    // A success without an id is a broken master response, not a submission.
    #[tokio::test]
    async fn submit_success_without_id_is_rejected() {
        for body in [
            r#"{"success":true}"#,
            r#"{"success":true,"submissionId":""}"#,
        ] {
            let client = client(RecordingTransport::replying(body));
            assert!(submit(&client).await.unwrap_err().is_request_failed());
        }
    }

    #[tokio::test]
    async fn empty_body_fails_every_endpoint() {
        let client = client(RecordingTransport::replying(""));
        assert!(matches!(
            submit(&client).await,
            Err(SubmissionError::RequestFailed(RequestFailure::EmptyBody))
        ));
        assert!(matches!(
            client.kill_job("driver-001").await,
            Err(SubmissionError::RequestFailed(RequestFailure::EmptyBody))
        ));
        assert!(matches!(
            client.job_status("driver-001").await,
            Err(SubmissionError::RequestFailed(RequestFailure::EmptyBody))
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_failure() {
        let client = client(RecordingTransport::replying("<html>oops</html>"));
        assert!(matches!(
            client.job_status("driver-001").await,
            Err(SubmissionError::RequestFailed(RequestFailure::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_request_failed() {
        let client = client(RecordingTransport::unreachable());
        assert!(matches!(
            client.kill_job("driver-001").await,
            Err(SubmissionError::RequestFailed(RequestFailure::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn blank_submission_id_never_reaches_transport() {
        let client = client(RecordingTransport::replying(r#"{"success":true}"#));
        for id in ["", " ", "\t\n"] {
            assert!(client.kill_job(id).await.unwrap_err().is_invalid_argument());
            assert!(client.job_status(id).await.unwrap_err().is_invalid_argument());
        }
        assert!(client.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn kill_posts_without_body() {
        let client = client(RecordingTransport::replying(
            r#"{"success":true,"submissionId":"driver-001","message":"Kill request submitted"}"#,
        ));
        client.kill_job("driver-001").await.unwrap();

        let requests = client.transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].url, "http://master:6066/v1/submissions/kill/driver-001");
        assert_eq!(requests[0].body, None);
    }

    #[tokio::test]
    async fn kill_rejected_by_master_fails() {
        let client = client(RecordingTransport::replying(
            r#"{"success":false,"message":"Driver driver-001 has already finished"}"#,
        ));
        assert!(client.kill_job("driver-001").await.unwrap_err().is_request_failed());
    }

    #[tokio::test]
    async fn job_status_returns_driver_state() {
        let client = client(RecordingTransport::replying(
            r#"{"success":true,"driverState":"RUNNING"}"#,
        ));
        assert_eq!(
            client.job_status("driver-001").await.unwrap(),
            DriverState::Running
        );

        let requests = client.transport.requests();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(
            requests[0].url,
            "http://master:6066/v1/submissions/status/driver-001"
        );
    }

    #[tokio::test]
    async fn job_status_failure_hides_driver_state() {
        let client = client(RecordingTransport::replying(
            r#"{"success":false,"driverState":"FINISHED"}"#,
        ));
        assert!(client.job_status("driver-001").await.unwrap_err().is_request_failed());

        let client = self::client(RecordingTransport::replying(r#"{"success":false}"#));
        assert!(client.job_status("driver-001").await.unwrap_err().is_request_failed());
    }

    #[tokio::test]
    async fn job_status_without_state_fails() {
        let client = client(RecordingTransport::replying(r#"{"success":true}"#));
        assert!(client.job_status("driver-001").await.unwrap_err().is_request_failed());
    }

    #[test]
    fn config_loads_from_yaml_with_defaults() {
        let config: ClientConfig = serde_yaml::from_str("master: spark-master:6066\n").unwrap();
        assert_eq!(config.master(), "spark-master:6066");
        assert_eq!(config.spark_version(), DEFAULT_SPARK_VERSION);
        assert!(config.environment_variables().is_empty());
        assert_eq!(config.supervise(), None);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn unset_flags_serialize_as_null() {
        let client = SubmissionClient::with_transport(
            ClientConfig::builder("m:6066").build(),
            RecordingTransport::unreachable(),
        );
        let request = client.submit_request("a", "Main", "a.jar", &[], None);
        assert_eq!(request.spark_properties.event_log_enabled, None);
        assert_eq!(request.spark_properties.driver_supervise, None);
    }

    // The wire flag is "enabled", so the configured "disabled" is negated
    // rather than forwarded as-is.
    #[test]
    fn event_log_disabled_is_sent_negated_as_event_log_enabled() {
        for (disabled, enabled) in [(true, false), (false, true)] {
            let client = SubmissionClient::with_transport(
                ClientConfig::builder("m:6066").event_log_disabled(disabled).build(),
                RecordingTransport::unreachable(),
            );
            let request = client.submit_request("a", "Main", "a.jar", &[], None);
            assert_eq!(request.spark_properties.event_log_enabled, Some(enabled));
        }
    }

    #[test]
    fn oversized_timeout_saturates() {
        let config = ClientConfig::builder("m:6066")
            .timeout(Duration::from_secs(u64::MAX))
            .build();
        assert_eq!(config.timeout(), Some(Duration::from_millis(u64::MAX)));

        let config = ClientConfig::builder("m:6066")
            .timeout(Duration::from_millis(1500))
            .build();
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    }

    #[tokio::test]
    async fn submission_id_is_encoded_as_one_path_segment() {
        let client = client(RecordingTransport::replying(
            r#"{"success":true,"driverState":"RUNNING"}"#,
        ));
        client.job_status("a/b?c#d").await.unwrap();
        client.kill_job("driver 1").await.unwrap();

        let requests = client.transport.requests();
        assert_eq!(
            requests[0].url,
            "http://master:6066/v1/submissions/status/a%2Fb%3Fc%23d"
        );
        assert_eq!(
            requests[1].url,
            "http://master:6066/v1/submissions/kill/driver%201"
        );
    }

    #[tokio::test]
    async fn malformed_master_is_request_failed() {
        let client = SubmissionClient::with_transport(
            ClientConfig::builder("bad host:6066").build(),
            RecordingTransport::replying(r#"{"success":true}"#),
        );
        assert!(client.kill_job("driver-001").await.unwrap_err().is_request_failed());
        assert!(client.transport.requests().is_empty());
    }
}
