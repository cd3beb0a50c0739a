use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::identity::{ResourceIdentity, Tag};

pub const NOTHING_TO_DELETE: &str = "Nothing to delete";
pub const DATA_IMAGE_ID: &str = "ImageId";
pub const DATA_INFO: &str = "Info";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

/// Properties declared on the custom resource in the stack template.
///
/// CloudFormation also passes `ServiceToken` here; unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    pub stack_name: Option<String>,
    pub instance_id: Option<String>,
    pub region: Option<String>,
    pub ami_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A custom-resource request as delivered by CloudFormation.
///
/// `ResponseURL`, `RequestId` and `PhysicalResourceId` are only echoed back in
/// the callback and never interpreted. `ResourceProperties` stays raw JSON so a
/// malformed property still leaves an event that can be answered; it is typed
/// by [`LifecycleEvent::properties`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_properties: Value,
}

impl LifecycleEvent {
    pub fn properties(&self) -> Result<ResourceProperties, ValidationError> {
        match &self.resource_properties {
            Value::Null => Ok(ResourceProperties::default()),
            raw => ResourceProperties::deserialize(raw)
                .map_err(|error| ValidationError::MalformedProperties(error.to_string())),
        }
    }

    /// Whether the raw properties carry a non-blank `InstanceId`. A non-string
    /// value counts as present and is rejected by [`Self::properties`].
    fn names_instance(&self) -> bool {
        match self.resource_properties.get("InstanceId") {
            None | Some(Value::Null) => false,
            Some(Value::String(value)) => !value.trim().is_empty(),
            Some(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("StackName missing")]
    MissingStackName,
    #[error("InstanceId missing")]
    MissingInstanceId,
    #[error("Region missing")]
    MissingRegion,
    #[error("ResourceProperties malformed: {0}")]
    MalformedProperties(String),
}

/// Everything the Create/Update path needs, with required fields resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakeRequest {
    pub instance_id: String,
    pub region: String,
    pub ami_name: String,
    pub caller_tags: Vec<Tag>,
    pub identity: ResourceIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveRequest {
    pub region: String,
    pub identity: ResourceIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleRequest {
    Bake(BakeRequest),
    Remove(RemoveRequest),
    /// Delete of a resource whose Create never carried an instance.
    NothingCreated,
}

pub fn default_ami_name(stack_name: &str, instance_id: &str) -> String {
    format!("{stack_name}-{instance_id}")
}

/// Resolves the required fields for the event's request type.
///
/// Update is validated exactly like Create. A Delete without `InstanceId`
/// resolves to [`LifecycleRequest::NothingCreated`] before any other field is
/// looked at, even when the remaining properties are malformed.
pub fn validate_event(event: &LifecycleEvent) -> Result<LifecycleRequest, ValidationError> {
    if event.request_type == RequestType::Delete && !event.names_instance() {
        return Ok(LifecycleRequest::NothingCreated);
    }

    let properties = event.properties()?;

    if event.request_type == RequestType::Delete {
        let stack_name =
            present(&properties.stack_name).ok_or(ValidationError::MissingStackName)?;
        let region = present(&properties.region).ok_or(ValidationError::MissingRegion)?;

        return Ok(LifecycleRequest::Remove(RemoveRequest {
            region: region.to_string(),
            identity: event_identity(event, stack_name),
        }));
    }

    let stack_name = present(&properties.stack_name).ok_or(ValidationError::MissingStackName)?;
    let instance_id =
        present(&properties.instance_id).ok_or(ValidationError::MissingInstanceId)?;
    let region = present(&properties.region).ok_or(ValidationError::MissingRegion)?;
    let ami_name = present(&properties.ami_name)
        .map(str::to_string)
        .unwrap_or_else(|| default_ami_name(stack_name, instance_id));

    Ok(LifecycleRequest::Bake(BakeRequest {
        instance_id: instance_id.to_string(),
        region: region.to_string(),
        ami_name,
        caller_tags: properties.tags,
        identity: event_identity(event, stack_name),
    }))
}

fn event_identity(event: &LifecycleEvent, stack_name: &str) -> ResourceIdentity {
    ResourceIdentity::new(
        stack_name,
        event.stack_id.clone(),
        event.logical_resource_id.clone(),
    )
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Terminal result of one lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success { data: Map<String, Value> },
    Failure { reason: String },
}

impl Outcome {
    pub fn image(image_id: impl Into<String>) -> Self {
        Self::with_data(DATA_IMAGE_ID, image_id.into())
    }

    pub fn nothing_to_delete() -> Self {
        Self::with_data(DATA_INFO, NOTHING_TO_DELETE.to_string())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    fn with_data(key: &str, value: String) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), Value::String(value));
        Self::Success { data }
    }

    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::Success { .. } => ResponseStatus::Success,
            Self::Failure { .. } => ResponseStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn image_id(&self) -> Option<&str> {
        match self {
            Self::Success { data } => data.get(DATA_IMAGE_ID).and_then(Value::as_str),
            Self::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(request_type: &str, properties: Value) -> LifecycleEvent {
        serde_json::from_value(json!({
            "RequestType": request_type,
            "ResponseURL": "https://example.com/response",
            "StackId": "s-1",
            "RequestId": "req-1",
            "LogicalResourceId": "AMI",
            "ResourceType": "Custom::AmiBaker",
            "ResourceProperties": properties,
        }))
        .expect("event should parse")
    }

    #[test]
    fn parses_cloudformation_request_shape() {
        let parsed = event(
            "Create",
            json!({
                "ServiceToken": "arn:aws:lambda:us-east-1:1:function:baker",
                "StackName": "web",
                "InstanceId": "i-1",
                "Region": "us-east-1",
                "Tags": [{"Key": "env", "Value": "prod"}]
            }),
        );

        assert_eq!(parsed.request_type, RequestType::Create);
        assert_eq!(parsed.response_url, "https://example.com/response");
        assert_eq!(
            parsed.properties().map(|properties| properties.tags),
            Ok(vec![Tag::new("env", "prod")])
        );
        assert_eq!(parsed.physical_resource_id, None);
    }

    #[test]
    fn create_defaults_ami_name_from_stack_and_instance() {
        let request = validate_event(&event(
            "Create",
            json!({"StackName": "web", "InstanceId": "i-1", "Region": "us-east-1"}),
        ))
        .expect("create should validate");

        let LifecycleRequest::Bake(bake) = request else {
            panic!("expected bake request");
        };
        assert_eq!(bake.ami_name, "web-i-1");
        assert_eq!(bake.identity, ResourceIdentity::new("web", "s-1", "AMI"));
    }

    #[test]
    fn create_prefers_caller_ami_name() {
        let request = validate_event(&event(
            "Update",
            json!({
                "StackName": "web",
                "InstanceId": "i-1",
                "Region": "us-east-1",
                "AmiName": "golden"
            }),
        ))
        .expect("update should validate");

        let LifecycleRequest::Bake(bake) = request else {
            panic!("expected bake request");
        };
        assert_eq!(bake.ami_name, "golden");
    }

    #[test]
    fn create_requires_each_field() {
        let missing_region = validate_event(&event(
            "Create",
            json!({"StackName": "web", "InstanceId": "i-1"}),
        ));
        assert_eq!(missing_region, Err(ValidationError::MissingRegion));

        let missing_instance = validate_event(&event(
            "Create",
            json!({"StackName": "web", "Region": "us-east-1"}),
        ));
        assert_eq!(missing_instance, Err(ValidationError::MissingInstanceId));

        let blank_stack = validate_event(&event(
            "Create",
            json!({"StackName": "  ", "InstanceId": "i-1", "Region": "us-east-1"}),
        ));
        assert_eq!(blank_stack, Err(ValidationError::MissingStackName));
    }

    #[test]
    fn delete_without_instance_short_circuits_before_other_checks() {
        let request = validate_event(&event("Delete", json!({})));

        assert_eq!(request, Ok(LifecycleRequest::NothingCreated));
    }

    #[test]
    fn event_without_response_url_does_not_parse() {
        let parsed = serde_json::from_value::<LifecycleEvent>(json!({
            "RequestType": "Create",
            "StackId": "s-1",
            "RequestId": "req-1",
            "LogicalResourceId": "AMI",
            "ResourceProperties": {"StackName": "web"}
        }));

        assert!(parsed.is_err());
    }

    #[test]
    fn malformed_tags_still_parse_the_envelope() {
        let parsed = event(
            "Create",
            json!({
                "StackName": "web",
                "InstanceId": "i-1",
                "Region": "us-east-1",
                "Tags": [{"Key": "env"}]
            }),
        );

        assert_eq!(parsed.response_url, "https://example.com/response");
        let Err(ValidationError::MalformedProperties(reason)) = validate_event(&parsed) else {
            panic!("expected malformed properties");
        };
        assert!(reason.contains("Value"), "unexpected reason {reason}");
    }

    #[test]
    fn delete_without_instance_ignores_malformed_properties() {
        let request = validate_event(&event(
            "Delete",
            json!({"StackName": "web", "Tags": "env=prod"}),
        ));

        assert_eq!(request, Ok(LifecycleRequest::NothingCreated));
    }

    #[test]
    fn delete_with_instance_rejects_malformed_properties() {
        let request = validate_event(&event(
            "Delete",
            json!({
                "StackName": "web",
                "InstanceId": "i-1",
                "Region": "us-east-1",
                "Tags": "env=prod"
            }),
        ));

        assert!(matches!(request, Err(ValidationError::MalformedProperties(_))));
    }

    #[test]
    fn missing_properties_validate_as_empty() {
        let parsed: LifecycleEvent = serde_json::from_value(json!({
            "RequestType": "Create",
            "ResponseURL": "https://example.com/response"
        }))
        .expect("event should parse");

        assert_eq!(parsed.properties(), Ok(ResourceProperties::default()));
        assert_eq!(validate_event(&parsed), Err(ValidationError::MissingStackName));
    }

    #[test]
    fn delete_requires_stack_name_and_region() {
        let missing_region = validate_event(&event(
            "Delete",
            json!({"StackName": "web", "InstanceId": "i-1"}),
        ));
        assert_eq!(missing_region, Err(ValidationError::MissingRegion));

        let missing_stack = validate_event(&event(
            "Delete",
            json!({"InstanceId": "i-1", "Region": "us-east-1"}),
        ));
        assert_eq!(missing_stack, Err(ValidationError::MissingStackName));
    }

    #[test]
    fn outcome_exposes_status_and_image() {
        let success = Outcome::image("ami-1");
        assert_eq!(success.status(), ResponseStatus::Success);
        assert_eq!(success.image_id(), Some("ami-1"));

        let failure = Outcome::failure("createImage failed: boom");
        assert_eq!(failure.status(), ResponseStatus::Failed);
        assert_eq!(failure.image_id(), None);
        assert_eq!(Outcome::nothing_to_delete().image_id(), None);
    }
}
