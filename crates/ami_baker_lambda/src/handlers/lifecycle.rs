//! Lifecycle state machine for one custom-resource event.
//!
//! ```text
//! Validating ─┬─> CreatingImage ──> TaggingImage ───────┬─> Done
//!             ├─> LocatingImage ──> DeregisteringImage ─┤
//!             └──────────────────────────────────────────┴─> Failed
//! ```
//!
//! Each state owns the data it needs and either advances or ends with an
//! [`Outcome`]. Provider calls are strictly sequential.

use ami_baker_core::contract::{
    validate_event, BakeRequest, LifecycleEvent, LifecycleRequest, Outcome, RemoveRequest,
};
use ami_baker_core::identity::merge_tags;
use tracing::{info, warn};

use crate::adapters::compute::{ComputeProvider, ComputeProviderFactory};

#[derive(Debug, Clone, PartialEq)]
enum LifecycleState {
    CreatingImage(BakeRequest),
    TaggingImage {
        request: BakeRequest,
        image_id: String,
    },
    LocatingImage(RemoveRequest),
    DeregisteringImage {
        image_id: String,
    },
    Done(Outcome),
    Failed(String),
}

impl LifecycleState {
    fn name(&self) -> &'static str {
        match self {
            Self::CreatingImage(_) => "creating_image",
            Self::TaggingImage { .. } => "tagging_image",
            Self::LocatingImage(_) => "locating_image",
            Self::DeregisteringImage { .. } => "deregistering_image",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }
}

/// Runs one event to its terminal outcome.
///
/// Never fails: validation and provider errors become
/// [`Outcome::Failure`] with a reason naming what went wrong.
pub fn handle_lifecycle_event(
    event: &LifecycleEvent,
    providers: &impl ComputeProviderFactory,
) -> Outcome {
    let request = match validate_event(event) {
        Ok(request) => request,
        Err(error) => {
            warn!(
                component = "lifecycle",
                event = "validation_failed",
                request_type = event.request_type.as_str(),
                error = %error,
            );
            return Outcome::failure(error.to_string());
        }
    };

    let (initial, region) = match request {
        LifecycleRequest::NothingCreated => {
            info!(
                component = "lifecycle",
                event = "nothing_created",
                logical_resource_id = %event.logical_resource_id,
            );
            return Outcome::nothing_to_delete();
        }
        LifecycleRequest::Bake(request) => {
            let region = request.region.clone();
            (LifecycleState::CreatingImage(request), region)
        }
        LifecycleRequest::Remove(request) => {
            let region = request.region.clone();
            (LifecycleState::LocatingImage(request), region)
        }
    };

    let provider = providers.for_region(&region);
    run_states(initial, &provider)
}

fn run_states(initial: LifecycleState, provider: &impl ComputeProvider) -> Outcome {
    let mut state = initial;
    loop {
        info!(component = "lifecycle", event = "state_entered", state = state.name());
        state = match state {
            LifecycleState::CreatingImage(request) => create_image(request, provider),
            LifecycleState::TaggingImage { request, image_id } => {
                tag_image(request, image_id, provider)
            }
            LifecycleState::LocatingImage(request) => locate_image(&request, provider),
            LifecycleState::DeregisteringImage { image_id } => {
                deregister_image(image_id, provider)
            }
            LifecycleState::Done(outcome) => return outcome,
            LifecycleState::Failed(reason) => return Outcome::failure(reason),
        };
    }
}

fn create_image(request: BakeRequest, provider: &impl ComputeProvider) -> LifecycleState {
    match provider.create_image(&request.instance_id, &request.ami_name, true) {
        Ok(image_id) => LifecycleState::TaggingImage { request, image_id },
        Err(error) => LifecycleState::Failed(error.to_string()),
    }
}

fn tag_image(
    request: BakeRequest,
    image_id: String,
    provider: &impl ComputeProvider,
) -> LifecycleState {
    let tags = merge_tags(&request.caller_tags, &request.identity.identity_tags());

    match provider.create_tags(std::slice::from_ref(&image_id), &tags) {
        Ok(()) => LifecycleState::Done(Outcome::image(image_id)),
        // The image exists but a later Delete cannot find it without tags.
        Err(error) => LifecycleState::Failed(format!(
            "{error} (image {image_id} was created without identity tags)"
        )),
    }
}

fn locate_image(request: &RemoveRequest, provider: &impl ComputeProvider) -> LifecycleState {
    let images = match provider.find_images(&request.identity.tag_filters()) {
        Ok(images) => images,
        Err(error) => return LifecycleState::Failed(error.to_string()),
    };

    let Some(first) = images.first() else {
        return LifecycleState::Done(Outcome::nothing_to_delete());
    };

    if images.len() > 1 {
        warn!(
            component = "lifecycle",
            event = "multiple_images_matched",
            matches = images.len(),
            image_id = %first.image_id,
            logical_resource_id = %request.identity.logical_resource_id,
        );
    }

    LifecycleState::DeregisteringImage {
        image_id: first.image_id.clone(),
    }
}

fn deregister_image(image_id: String, provider: &impl ComputeProvider) -> LifecycleState {
    match provider.deregister_image(&image_id) {
        Ok(()) => LifecycleState::Done(Outcome::image(image_id)),
        Err(error) if error.is_not_found() => {
            info!(
                component = "lifecycle",
                event = "image_already_gone",
                image_id = %image_id,
            );
            LifecycleState::Done(Outcome::image(image_id))
        }
        Err(error) => LifecycleState::Failed(error.to_string()),
    }
}
