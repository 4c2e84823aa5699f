mod auto_scaling_client;
mod collector;
mod config;
mod decision;
mod disconnects;
mod ec2_instance_client;
mod ecs_cluster_client;
mod error;
mod gate;
mod notifier;
mod scaler;
mod sizer;
mod slot;
mod usage;

use chrono::Utc;
use lambda_runtime::{handler_fn, Context, Error};
use rusoto_autoscaling::AutoscalingClient;
use rusoto_core::Region;
use rusoto_ec2::Ec2Client;
use rusoto_ecs::EcsClient;
use rusoto_sns::SnsClient;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::auto_scaling_client::AutoScalingGroupClient;
use crate::config::SizerConfig;
use crate::ec2_instance_client::Ec2InstanceClient;
use crate::ecs_cluster_client::EcsClusterClient;
use crate::notifier::SnsNotifier;
use crate::sizer::Sizer;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    lambda_runtime::run(handler_fn(size_handler)).await?;
    Ok(())
}

async fn size_handler(_: Value, context: Context) -> Result<Value, Error> {
    let config = SizerConfig::from_env()?;
    info!(
        request_id = %context.request_id,
        cluster = %config.ecs_cluster,
        group = %config.asg_name,
        dry_run = config.dry_run,
        "sizing cluster"
    );

    let region = Region::default();
    let notifier = config
        .slack_sns_topic
        .clone()
        .map(|topic| SnsNotifier::new_with_client(SnsClient::new(region.clone()), topic));
    let sizer = Sizer::new(
        config,
        EcsClusterClient::new_with_client(EcsClient::new(region.clone())),
        AutoScalingGroupClient::new_with_client(AutoscalingClient::new(region.clone())),
        Ec2InstanceClient::new_with_client(Ec2Client::new(region)),
        notifier,
    );

    let report = sizer.run(Utc::now()).await?;
    Ok(serde_json::to_value(report)?)
}
