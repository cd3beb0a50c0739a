use ami_baker_core::contract::{LifecycleEvent, ResponseStatus};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::adapters::callback::CallbackSender;
use crate::adapters::compute::ComputeProviderFactory;
use crate::handlers::lifecycle::handle_lifecycle_event;
use crate::handlers::reporter::report_outcome;

/// Returned to the Lambda runtime once the callback has been attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationSummary {
    pub status: ResponseStatus,
    pub callback_delivered: bool,
}

/// Runs the state machine for one event and reports its outcome.
///
/// A failed callback is logged but does not fail the invocation: an error
/// would make the Lambda service replay the whole event.
pub fn handle_custom_resource_event(
    event: &LifecycleEvent,
    providers: &impl ComputeProviderFactory,
    sender: &impl CallbackSender,
    log_stream_name: &str,
) -> InvocationSummary {
    info!(
        component = "custom_resource",
        event = "request_received",
        request_type = event.request_type.as_str(),
        request_id = %event.request_id,
        stack_id = %event.stack_id,
        logical_resource_id = %event.logical_resource_id,
    );

    let outcome = handle_lifecycle_event(event, providers);
    let status = outcome.status();
    info!(
        component = "custom_resource",
        event = "outcome_decided",
        request_id = %event.request_id,
        status = ?status,
        image_id = outcome.image_id().unwrap_or_default(),
    );

    let callback_delivered = match report_outcome(event, &outcome, log_stream_name, sender) {
        Ok(()) => {
            info!(
                component = "custom_resource",
                event = "callback_delivered",
                request_id = %event.request_id,
            );
            true
        }
        Err(callback_error) => {
            error!(
                component = "custom_resource",
                event = "callback_failed",
                request_id = %event.request_id,
                error = %callback_error,
            );
            false
        }
    };

    InvocationSummary {
        status,
        callback_delivered,
    }
}
