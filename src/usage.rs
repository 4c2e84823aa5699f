use rusoto_ecs::{ContainerInstance, Resource};
use std::convert::TryFrom;

use crate::error::SizerError;

const CPU: &str = "CPU";
const MEMORY: &str = "MEMORY";

/// Resource usage of one cluster member, as reported by its ECS agent.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceUsage {
    pub id: String,
    pub remaining_cpu: i64,
    pub remaining_memory: i64,
    pub total_cpu: i64,
    pub total_memory: i64,
    pub connected: bool,
    pub disconnected_seconds: i64,
}

impl InstanceUsage {
    /// Whether this instance still counts towards cluster capacity.
    pub fn is_usable(&self, disconnect_threshold_seconds: i64) -> bool {
        self.connected || self.disconnected_seconds < disconnect_threshold_seconds
    }
}

impl TryFrom<ContainerInstance> for InstanceUsage {
    type Error = SizerError;

    fn try_from(instance: ContainerInstance) -> Result<Self, Self::Error> {
        let id = instance
            .ec_2_instance_id
            .ok_or(SizerError::MissingField("ec2InstanceId"))?;
        let remaining = instance.remaining_resources.unwrap_or_default();
        let registered = instance.registered_resources.unwrap_or_default();

        Ok(InstanceUsage {
            remaining_cpu: integer_resource(&id, &remaining, CPU, "remaining")?,
            remaining_memory: integer_resource(&id, &remaining, MEMORY, "remaining")?,
            total_cpu: integer_resource(&id, &registered, CPU, "registered")?,
            total_memory: integer_resource(&id, &registered, MEMORY, "registered")?,
            connected: instance.agent_connected.unwrap_or(false),
            disconnected_seconds: 0,
            id,
        })
    }
}

fn integer_resource(
    instance: &str,
    resources: &[Resource],
    name: &'static str,
    counter: &'static str,
) -> Result<i64, SizerError> {
    resources
        .iter()
        .find(|resource| resource.name.as_deref() == Some(name))
        .and_then(|resource| resource.integer_value)
        .ok_or_else(|| SizerError::MissingResource {
            instance: instance.to_string(),
            resource: name,
            counter,
        })
}
