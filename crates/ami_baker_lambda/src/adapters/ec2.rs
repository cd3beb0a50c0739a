//! EC2 implementation of the compute provider gateway.

use std::future::Future;
use std::time::Duration;

use ami_baker_core::identity::{Tag, TagFilter};
use aws_config::SdkConfig;
use aws_sdk_ec2::config::retry::RetryConfig;
use aws_sdk_ec2::config::timeout::TimeoutConfig;
use aws_sdk_ec2::config::Region;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ec2::types::Filter;
use tracing::debug;

use crate::adapters::compute::{
    classify_provider_error, ComputeProvider, ComputeProviderFactory, Image, ProviderError,
    ProviderOperation,
};

/// Builds region-bound EC2 clients from the shared SDK configuration.
#[derive(Clone)]
pub struct Ec2ProviderFactory {
    sdk_config: SdkConfig,
    operation_timeout: Duration,
}

impl Ec2ProviderFactory {
    pub fn new(sdk_config: SdkConfig, operation_timeout: Duration) -> Self {
        Self {
            sdk_config,
            operation_timeout,
        }
    }
}

impl ComputeProviderFactory for Ec2ProviderFactory {
    type Provider = Ec2ComputeProvider;

    fn for_region(&self, region: &str) -> Ec2ComputeProvider {
        // Retries are disabled: a failed call ends the invocation.
        let config = aws_sdk_ec2::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(self.operation_timeout)
                    .build(),
            )
            .build();

        Ec2ComputeProvider {
            client: aws_sdk_ec2::Client::from_conf(config),
        }
    }
}

#[derive(Clone)]
pub struct Ec2ComputeProvider {
    client: aws_sdk_ec2::Client,
}

impl ComputeProvider for Ec2ComputeProvider {
    fn create_image(
        &self,
        instance_id: &str,
        name: &str,
        no_reboot: bool,
    ) -> Result<String, ProviderError> {
        let client = self.client.clone();
        let instance_id = instance_id.to_string();
        let image_name = name.to_string();

        let output = block_on(async move {
            client
                .create_image()
                .instance_id(instance_id)
                .name(image_name)
                .no_reboot(no_reboot)
                .send()
                .await
        })
        .map_err(|error| provider_error(ProviderOperation::CreateImage, &error))?;

        let image_id = output
            .image_id()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Sdk {
                operation: ProviderOperation::CreateImage,
                code: None,
                message: "response did not include an image id".to_string(),
            })?;
        debug!(image_id = %image_id, name = %name, "EC2 image creation started");
        Ok(image_id)
    }

    fn create_tags(&self, resource_ids: &[String], tags: &[Tag]) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let resources = resource_ids.to_vec();
        let ec2_tags = tags
            .iter()
            .map(|tag| {
                aws_sdk_ec2::types::Tag::builder()
                    .key(&tag.key)
                    .value(&tag.value)
                    .build()
            })
            .collect::<Vec<_>>();

        block_on(async move {
            client
                .create_tags()
                .set_resources(Some(resources))
                .set_tags(Some(ec2_tags))
                .send()
                .await
        })
        .map(|_| ())
        .map_err(|error| provider_error(ProviderOperation::CreateTags, &error))
    }

    fn find_images(&self, filters: &[TagFilter]) -> Result<Vec<Image>, ProviderError> {
        let client = self.client.clone();
        let ec2_filters = filters
            .iter()
            .map(|filter| {
                Filter::builder()
                    .name(&filter.name)
                    .set_values(Some(filter.values.clone()))
                    .build()
            })
            .collect::<Vec<_>>();

        let output = block_on(async move {
            client
                .describe_images()
                .set_filters(Some(ec2_filters))
                .send()
                .await
        })
        .map_err(|error| provider_error(ProviderOperation::DescribeImages, &error))?;

        let images = output
            .images()
            .iter()
            .filter_map(|image| {
                let image_id = image.image_id()?;
                Some(Image {
                    image_id: image_id.to_string(),
                    tags: image
                        .tags()
                        .iter()
                        .filter_map(|tag| {
                            Some(Tag::new(tag.key()?, tag.value().unwrap_or_default()))
                        })
                        .collect(),
                })
            })
            .collect::<Vec<_>>();
        debug!(matches = images.len(), "EC2 image lookup finished");
        Ok(images)
    }

    fn deregister_image(&self, image_id: &str) -> Result<(), ProviderError> {
        let client = self.client.clone();
        let image_id = image_id.to_string();

        block_on(async move { client.deregister_image().image_id(image_id).send().await })
            .map(|_| ())
            .map_err(|error| provider_error(ProviderOperation::DeregisterImage, &error))
    }
}

fn provider_error<E>(operation: ProviderOperation, error: &E) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(error).to_string());
    classify_provider_error(operation, error.code(), Some(&message))
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
