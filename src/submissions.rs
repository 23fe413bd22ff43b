use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateSubmissionRequest,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub action: Action,
    pub app_args: Vec<String>,
    pub app_resource: String,
    pub client_spark_version: String,
    pub main_class: String,
    pub environment_variables: HashMap<String, String>,
    pub spark_properties: SparkProperties,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SparkProperties {
    /// Comma separated, always starts with the application resource.
    pub jars: String,
    pub app_name: String,
    pub event_log_enabled: Option<bool>,
    pub driver_supervise: Option<bool>,
    pub master: String,
}

/// Joins the application resource and the extra jars into the single string
/// the master expects. The resource comes first, the rest follow sorted and
/// without duplicates.
pub fn jars(app_resource: &str, jars: Option<&HashSet<String>>) -> String {
    let mut output = vec![app_resource.to_string()];
    if let Some(jars) = jars {
        let mut extra = jars
            .iter()
            .filter(|jar| jar.as_str() != app_resource)
            .cloned()
            .collect::<Vec<_>>();
        extra.sort();
        output.extend(extra);
    }
    output.join(",")
}

/// Lifecycle of a submitted driver, as reported by the master.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum DriverState {
    Submitted,
    Running,
    Finished,
    Relaunching,
    Unknown,
    Killed,
    Failed,
    Error,
}

impl DriverState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Killed | Self::Failed | Self::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Finished => "FINISHED",
            Self::Relaunching => "RELAUNCHING",
            Self::Unknown => "UNKNOWN",
            Self::Killed => "KILLED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
        }
    }
}

// Anything outside the known vocabulary (e.g. NOT_FOUND) is reported as UNKNOWN.
impl From<String> for DriverState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SUBMITTED" => Self::Submitted,
            "RUNNING" => Self::Running,
            "FINISHED" => Self::Finished,
            "RELAUNCHING" => Self::Relaunching,
            "KILLED" => Self::Killed,
            "FAILED" => Self::Failed,
            "ERROR" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every master response carries. The success flag is checked before
/// anything else in the payload is trusted.
pub trait SparkResponse: DeserializeOwned {
    fn success(&self) -> bool;
    fn message(&self) -> Option<&str>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_spark_version: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KillResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_spark_version: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_state: Option<DriverState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_host_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_spark_version: Option<String>,
}

macro_rules! spark_response {
    ($($response:ty),*) => {
        $(
            impl SparkResponse for $response {
                fn success(&self) -> bool {
                    self.success
                }

                fn message(&self) -> Option<&str> {
                    self.message.as_deref()
                }
            }
        )*
    };
}

spark_response!(SubmitResponse, KillResponse, StatusResponse);
