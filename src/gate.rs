use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use tracing::warn;

use crate::auto_scaling_client::ScalingGroups;
use crate::ec2_instance_client::InstanceLaunches;
use crate::error::SizerError;

const IN_SERVICE: &str = "InService";
const TERMINATED: &str = "Terminated";

/// Why a scaling action must wait for a later invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Blocked {
    LifecycleState(String),
    WaitingForAgent(String),
    StaleAgent { instance_id: String, terminated: bool },
    WaitingForInstanceCount { instances: usize, desired: i64 },
}

impl Blocked {
    /// Whether this is worth a warning rather than routine settling.
    pub fn is_warning(&self) -> bool {
        matches!(self, Blocked::StaleAgent { .. })
    }
}

impl Display for Blocked {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Blocked::LifecycleState(state) => write!(f, "lifecycle state {}", state),
            Blocked::WaitingForAgent(instance_id) => {
                write!(f, "waiting for ECS agent connection on {}", instance_id)
            }
            Blocked::StaleAgent {
                instance_id,
                terminated: true,
            } => write!(f, "terminating {} with stale ECS agent", instance_id),
            Blocked::StaleAgent { instance_id, .. } => {
                write!(f, "would terminate {} with stale ECS agent", instance_id)
            }
            Blocked::WaitingForInstanceCount { instances, desired } => write!(
                f,
                "waiting for ASG instance count ({} of {})",
                instances, desired
            ),
        }
    }
}

pub struct GateSettings<'a> {
    pub asg_name: &'a str,
    pub ecs_agent_wait: i64,
    pub dry_run: bool,
}

/// Returns `None` when the group is settled and may be scaled, or the first
/// reason it is not. Group members whose agent has not registered within the
/// grace period are terminated so the group can replace them.
pub async fn check<G, L>(
    groups: &G,
    launches: &L,
    settings: &GateSettings<'_>,
    cluster_instance_ids: &HashSet<String>,
    now: DateTime<Utc>,
) -> Result<Option<Blocked>, SizerError>
where
    G: ScalingGroups + Sync,
    L: InstanceLaunches + Sync,
{
    let group = groups.describe_group(settings.asg_name).await?;
    let instances = group.instances.unwrap_or_default();

    for instance in &instances {
        let state = instance.lifecycle_state.as_str();
        if state != IN_SERVICE && state != TERMINATED {
            return Ok(Some(Blocked::LifecycleState(state.to_string())));
        }
        // Already gone; its agent will never register.
        if state == TERMINATED {
            continue;
        }
        if cluster_instance_ids.contains(&instance.instance_id) {
            continue;
        }

        let launched = launches.launch_time(&instance.instance_id).await?;
        let elapsed = now.signed_duration_since(launched).num_seconds();
        if elapsed <= settings.ecs_agent_wait {
            return Ok(Some(Blocked::WaitingForAgent(instance.instance_id.clone())));
        }
        if settings.dry_run {
            warn!(instance = %instance.instance_id, elapsed, "dry run, not terminating stale instance");
        } else {
            groups.terminate_instance(&instance.instance_id).await?;
        }
        return Ok(Some(Blocked::StaleAgent {
            instance_id: instance.instance_id.clone(),
            terminated: !settings.dry_run,
        }));
    }

    if instances.len() as i64 != group.desired_capacity {
        return Ok(Some(Blocked::WaitingForInstanceCount {
            instances: instances.len(),
            desired: group.desired_capacity,
        }));
    }
    Ok(None)
}
