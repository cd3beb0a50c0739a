use ami_baker_core::contract::{LifecycleEvent, Outcome};
use ami_baker_core::response::CallbackResponse;

use crate::adapters::callback::{CallbackError, CallbackSender};

/// Sends the single callback for an event.
///
/// Delivery is attempted once; a failed delivery is returned to the caller
/// and never retried here.
pub fn report_outcome(
    event: &LifecycleEvent,
    outcome: &Outcome,
    log_stream_name: &str,
    sender: &impl CallbackSender,
) -> Result<(), CallbackError> {
    let response = CallbackResponse::from_outcome(event, outcome, log_stream_name);
    let body = serde_json::to_vec(&response)
        .map_err(|error| CallbackError::Serialization(error.to_string()))?;
    sender.send(&event.response_url, &body)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::RecordingCallbackSender;

    fn sample_event() -> LifecycleEvent {
        serde_json::from_value(json!({
            "RequestType": "Delete",
            "ResponseURL": "https://cloudformation-custom-resource-response.example.com/signed",
            "StackId": "s-1",
            "RequestId": "req-9",
            "LogicalResourceId": "AMI",
            "PhysicalResourceId": "phys-1",
            "ResourceProperties": {}
        }))
        .expect("event should parse")
    }

    #[test]
    fn sends_one_body_to_the_response_url() {
        let sender = RecordingCallbackSender::new();

        report_outcome(&sample_event(), &Outcome::nothing_to_delete(), "stream", &sender)
            .expect("delivery should succeed");

        assert_eq!(
            sender.response_urls(),
            vec!["https://cloudformation-custom-resource-response.example.com/signed".to_string()]
        );
        let bodies = sender.bodies();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["Status"], "SUCCESS");
        assert_eq!(bodies[0]["RequestId"], "req-9");
        assert_eq!(bodies[0]["PhysicalResourceId"], "phys-1");
        assert_eq!(bodies[0]["Data"], json!({"Info": "Nothing to delete"}));
    }

    #[test]
    fn surfaces_rejected_delivery_without_retrying() {
        let sender = RecordingCallbackSender::rejecting(403);

        let error = report_outcome(
            &sample_event(),
            &Outcome::failure("deregisterImage failed: boom"),
            "stream",
            &sender,
        )
        .expect_err("rejected delivery should fail");

        assert_eq!(error, CallbackError::Rejected { status: 403 });
        assert_eq!(sender.bodies().len(), 1);
        assert_eq!(sender.bodies()[0]["Reason"], "deregisterImage failed: boom");
    }
}
