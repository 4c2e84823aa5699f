use async_trait::async_trait;
use rusoto_autoscaling::{
    AutoScalingGroup, AutoScalingGroupNamesType, Autoscaling, AutoscalingClient,
    SetDesiredCapacityType, TerminateInstanceInAutoScalingGroupType,
};

use crate::error::SizerError;

#[async_trait]
pub trait ScalingGroups {
    async fn describe_group(&self, name: &str) -> Result<AutoScalingGroup, SizerError>;

    /// Sets the desired capacity, bypassing the group's cooldown.
    async fn set_desired_capacity(&self, name: &str, desired: i64) -> Result<(), SizerError>;

    /// Terminates a member without lowering desired capacity, so the group
    /// launches a replacement.
    async fn terminate_instance(&self, instance_id: &str) -> Result<(), SizerError>;
}

pub struct AutoScalingGroupClient {
    client: AutoscalingClient,
}

impl AutoScalingGroupClient {
    pub fn new_with_client(client: AutoscalingClient) -> Self {
        AutoScalingGroupClient { client }
    }
}

#[async_trait]
impl ScalingGroups for AutoScalingGroupClient {
    async fn describe_group(&self, name: &str) -> Result<AutoScalingGroup, SizerError> {
        let groups = self
            .client
            .describe_auto_scaling_groups(AutoScalingGroupNamesType {
                auto_scaling_group_names: Some(vec![name.to_string()]),
                ..Default::default()
            })
            .await?;
        let mut groups = groups.auto_scaling_groups;
        if groups.len() != 1 {
            return Err(SizerError::NotFound {
                kind: "autoscaling group",
                name: name.to_string(),
            });
        }
        Ok(groups.remove(0))
    }

    async fn set_desired_capacity(&self, name: &str, desired: i64) -> Result<(), SizerError> {
        self.client
            .set_desired_capacity(SetDesiredCapacityType {
                auto_scaling_group_name: name.to_string(),
                desired_capacity: desired,
                honor_cooldown: Some(false),
            })
            .await?;
        Ok(())
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<(), SizerError> {
        self.client
            .terminate_instance_in_auto_scaling_group(TerminateInstanceInAutoScalingGroupType {
                instance_id: instance_id.to_string(),
                should_decrement_desired_capacity: false,
            })
            .await?;
        Ok(())
    }
}
