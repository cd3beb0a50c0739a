use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::{LifecycleEvent, Outcome, ResponseStatus};

/// Body PUT to the event's `ResponseURL`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl CallbackResponse {
    /// Addresses the outcome with the event's pass-through fields.
    ///
    /// The physical id is the one CloudFormation already knows for this
    /// resource, or the log stream name on a first Create.
    pub fn from_outcome(event: &LifecycleEvent, outcome: &Outcome, log_stream_name: &str) -> Self {
        let (reason, data) = match outcome {
            Outcome::Success { data } => (log_stream_reason(log_stream_name), Some(data.clone())),
            Outcome::Failure { reason } => (reason.clone(), None),
        };

        Self {
            status: outcome.status(),
            reason,
            physical_resource_id: event
                .physical_resource_id
                .clone()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| log_stream_name.to_string()),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data,
        }
    }
}

pub fn log_stream_reason(log_stream_name: &str) -> String {
    format!("See the details in CloudWatch Log Stream: {log_stream_name}")
}
