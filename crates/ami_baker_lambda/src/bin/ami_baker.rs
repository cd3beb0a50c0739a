use ami_baker_core::contract::LifecycleEvent;
use ami_baker_lambda::adapters::ec2::Ec2ProviderFactory;
use ami_baker_lambda::adapters::http_callback::HttpCallbackSender;
use ami_baker_lambda::config::RuntimeConfig;
use ami_baker_lambda::handlers::custom_resource::{
    handle_custom_resource_event, InvocationSummary,
};
use ami_baker_lambda::logging::init_logging;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct RuntimeDependencies {
    providers: Ec2ProviderFactory,
    callback: HttpCallbackSender,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<InvocationSummary, Error> {
    // Without a parsed event there is no ResponseURL to report to.
    let lifecycle_event: LifecycleEvent = serde_json::from_value(event.payload)
        .map_err(|error| Error::from(format!("invalid lifecycle event: {error}")))?;

    Ok(handle_custom_resource_event(
        &lifecycle_event,
        &deps.providers,
        &deps.callback,
        &event.context.env_config.log_stream,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let config = RuntimeConfig::from_env()?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let deps = RuntimeDependencies {
        providers: Ec2ProviderFactory::new(aws_config, config.provider_timeout),
        callback: HttpCallbackSender::new(config.callback_timeout)?,
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, deps).await
    }))
    .await
}
