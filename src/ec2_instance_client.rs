use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusoto_ec2::{DescribeInstancesRequest, Ec2, Ec2Client};

use crate::error::SizerError;

#[async_trait]
pub trait InstanceLaunches {
    async fn launch_time(&self, instance_id: &str) -> Result<DateTime<Utc>, SizerError>;
}

pub struct Ec2InstanceClient {
    client: Ec2Client,
}

#[async_trait]
impl InstanceLaunches for Ec2InstanceClient {
    async fn launch_time(&self, instance_id: &str) -> Result<DateTime<Utc>, SizerError> {
        let request = DescribeInstancesRequest {
            instance_ids: Some(vec![instance_id.to_string()]),
            ..DescribeInstancesRequest::default()
        };

        let result = self.client.describe_instances(request).await?;

        let launch_time = result
            .reservations
            .unwrap_or_default()
            .into_iter()
            .flat_map(|reservation| reservation.instances.unwrap_or_default())
            .find(|instance| instance.instance_id.as_deref() == Some(instance_id))
            .ok_or_else(|| SizerError::NotFound {
                kind: "instance",
                name: instance_id.to_string(),
            })?
            .launch_time
            .ok_or(SizerError::MissingField("launchTime"))?;

        DateTime::parse_from_rfc3339(&launch_time)
            .map(|launched| launched.with_timezone(&Utc))
            .map_err(|source| SizerError::InvalidTimestamp {
                value: launch_time,
                source,
            })
    }
}

impl Ec2InstanceClient {
    pub fn new_with_client(client: Ec2Client) -> Self {
        Ec2InstanceClient { client }
    }
}
