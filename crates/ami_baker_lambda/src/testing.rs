//! In-memory fakes for the gateway and callback traits.
//!
//! Used by unit tests and the integration tests under `tests/`.

use std::sync::{Arc, Mutex};

use ami_baker_core::identity::{matches_all, Tag, TagFilter};
use serde_json::Value;

use crate::adapters::callback::{CallbackError, CallbackSender};
use crate::adapters::compute::{
    ComputeProvider, ComputeProviderFactory, Image, ProviderError, ProviderOperation,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CreateImage {
        instance_id: String,
        name: String,
        no_reboot: bool,
    },
    CreateTags {
        resource_ids: Vec<String>,
        tags: Vec<Tag>,
    },
    FindImages {
        filters: Vec<TagFilter>,
    },
    DeregisterImage {
        image_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InjectedFailure {
    Sdk,
    NotFound,
}

#[derive(Debug, Default)]
struct ProviderState {
    images: Vec<Image>,
    calls: Vec<ProviderCall>,
    regions: Vec<String>,
    failures: Vec<(ProviderOperation, InjectedFailure)>,
    next_image: usize,
}

/// Simulated EC2 account: images with tags, tag-filter lookups, and per
/// operation failure injection. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryComputeProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl InMemoryComputeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, operation: ProviderOperation) -> Self {
        self.inject(operation, InjectedFailure::Sdk)
    }

    pub fn failing_with_not_found(self, operation: ProviderOperation) -> Self {
        self.inject(operation, InjectedFailure::NotFound)
    }

    fn inject(self, operation: ProviderOperation, failure: InjectedFailure) -> Self {
        self.lock().failures.push((operation, failure));
        self
    }

    pub fn seed_image(&self, image_id: &str, tags: Vec<Tag>) {
        self.lock().images.push(Image {
            image_id: image_id.to_string(),
            tags,
        });
    }

    pub fn images(&self) -> Vec<Image> {
        self.lock().images.clone()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    pub fn regions(&self) -> Vec<String> {
        self.lock().regions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProviderState> {
        self.state.lock().expect("poisoned mutex")
    }

    fn record(&self, operation: ProviderOperation, call: ProviderCall) -> Result<(), ProviderError> {
        let mut state = self.lock();
        state.calls.push(call);
        let failure = state
            .failures
            .iter()
            .find(|(failing, _)| *failing == operation)
            .map(|(_, failure)| *failure);

        match failure {
            None => Ok(()),
            Some(InjectedFailure::Sdk) => Err(ProviderError::Sdk {
                operation,
                code: Some("InjectedFailure".to_string()),
                message: "injected provider failure".to_string(),
            }),
            Some(InjectedFailure::NotFound) => Err(ProviderError::NotFound {
                operation,
                message: "injected not found".to_string(),
            }),
        }
    }
}

impl ComputeProvider for InMemoryComputeProvider {
    fn create_image(
        &self,
        instance_id: &str,
        name: &str,
        no_reboot: bool,
    ) -> Result<String, ProviderError> {
        self.record(
            ProviderOperation::CreateImage,
            ProviderCall::CreateImage {
                instance_id: instance_id.to_string(),
                name: name.to_string(),
                no_reboot,
            },
        )?;

        let mut state = self.lock();
        state.next_image += 1;
        let image_id = format!("ami-{:08}", state.next_image);
        state.images.push(Image {
            image_id: image_id.clone(),
            tags: Vec::new(),
        });
        Ok(image_id)
    }

    fn create_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<(), ProviderError> {
        self.record(
            ProviderOperation::CreateTags,
            ProviderCall::CreateTags {
                resource_ids: resource_ids.to_vec(),
                tags: tags.to_vec(),
            },
        )?;

        let mut state = self.lock();
        for image in state
            .images
            .iter_mut()
            .filter(|image| resource_ids.contains(&image.image_id))
        {
            for tag in tags {
                image.tags.retain(|existing| existing.key != tag.key);
                image.tags.push(tag.clone());
            }
        }
        Ok(())
    }

    fn find_images(&self, filters: &[TagFilter]) -> Result<Vec<Image>, ProviderError> {
        self.record(
            ProviderOperation::DescribeImages,
            ProviderCall::FindImages {
                filters: filters.to_vec(),
            },
        )?;

        Ok(self
            .lock()
            .images
            .iter()
            .filter(|image| matches_all(filters, &image.tags))
            .cloned()
            .collect())
    }

    fn deregister_image(&self, image_id: &str) -> Result<(), ProviderError> {
        self.record(
            ProviderOperation::DeregisterImage,
            ProviderCall::DeregisterImage {
                image_id: image_id.to_string(),
            },
        )?;

        let mut state = self.lock();
        let before = state.images.len();
        state.images.retain(|image| image.image_id != image_id);
        if state.images.len() == before {
            return Err(ProviderError::NotFound {
                operation: ProviderOperation::DeregisterImage,
                message: format!("image {image_id} does not exist"),
            });
        }
        Ok(())
    }
}

impl ComputeProviderFactory for InMemoryComputeProvider {
    type Provider = InMemoryComputeProvider;

    fn for_region(&self, region: &str) -> InMemoryComputeProvider {
        self.lock().regions.push(region.to_string());
        self.clone()
    }
}

/// Captures callback bodies; optionally rejects every delivery.
#[derive(Debug, Default)]
pub struct RecordingCallbackSender {
    deliveries: Mutex<Vec<(String, Vec<u8>)>>,
    failure: Option<CallbackError>,
}

impl RecordingCallbackSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            failure: Some(CallbackError::Rejected { status }),
        }
    }

    pub fn response_urls(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .expect("poisoned mutex")
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Delivered bodies parsed as JSON.
    pub fn bodies(&self) -> Vec<Value> {
        self.deliveries
            .lock()
            .expect("poisoned mutex")
            .iter()
            .map(|(_, body)| serde_json::from_slice(body).expect("callback body should be JSON"))
            .collect()
    }
}

impl CallbackSender for RecordingCallbackSender {
    fn send(&self, response_url: &str, body: &[u8]) -> Result<(), CallbackError> {
        self.deliveries
            .lock()
            .expect("poisoned mutex")
            .push((response_url.to_string(), body.to_vec()));
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
