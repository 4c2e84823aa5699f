use rusoto_autoscaling::{
    DescribeAutoScalingGroupsError, SetDesiredCapacityError,
    TerminateInstanceInAutoScalingGroupError,
};
use rusoto_core::RusotoError;
use rusoto_ec2::DescribeInstancesError;
use rusoto_ecs::{
    DescribeClustersError, DescribeContainerInstancesError, DescribeServicesError,
    DescribeTaskDefinitionError, ListContainerInstancesError, ListServicesError,
    ListTagsForResourceError, TagResourceError,
};
use rusoto_sns::PublishError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SizerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("container instance {instance} has no {resource} in its {counter} resources")]
    MissingResource {
        instance: String,
        resource: &'static str,
        counter: &'static str,
    },

    #[error("value is None: {0}")]
    MissingField(&'static str),

    #[error("no usable instances in cluster {0}")]
    NoUsableInstances(String),

    #[error("invalid timestamp {value}: {source}")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },

    #[error("failed to encode notification: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    ListContainerInstances(#[from] RusotoError<ListContainerInstancesError>),

    #[error(transparent)]
    DescribeContainerInstances(#[from] RusotoError<DescribeContainerInstancesError>),

    #[error(transparent)]
    DescribeClusters(#[from] RusotoError<DescribeClustersError>),

    #[error(transparent)]
    ListTags(#[from] RusotoError<ListTagsForResourceError>),

    #[error(transparent)]
    TagResource(#[from] RusotoError<TagResourceError>),

    #[error(transparent)]
    ListServices(#[from] RusotoError<ListServicesError>),

    #[error(transparent)]
    DescribeServices(#[from] RusotoError<DescribeServicesError>),

    #[error(transparent)]
    DescribeTaskDefinition(#[from] RusotoError<DescribeTaskDefinitionError>),

    #[error(transparent)]
    DescribeAutoScalingGroups(#[from] RusotoError<DescribeAutoScalingGroupsError>),

    #[error(transparent)]
    SetDesiredCapacity(#[from] RusotoError<SetDesiredCapacityError>),

    #[error(transparent)]
    TerminateInstance(#[from] RusotoError<TerminateInstanceInAutoScalingGroupError>),

    #[error(transparent)]
    DescribeInstances(#[from] RusotoError<DescribeInstancesError>),

    #[error(transparent)]
    Publish(#[from] RusotoError<PublishError>),
}
