use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::auto_scaling_client::ScalingGroups;
use crate::collector::{collect_usages, log_usages};
use crate::config::SizerConfig;
use crate::decision::{decide, usable_instances, CapacityDecision};
use crate::ec2_instance_client::InstanceLaunches;
use crate::ecs_cluster_client::ClusterInventory;
use crate::error::SizerError;
use crate::gate::{self, GateSettings};
use crate::notifier::{Field, Notify, SlackMessage};
use crate::scaler::{scale, BoundReason, ScaleOutcome};
use crate::slot::slot_profile;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// A previous scaling action is still settling.
    Blocked,
    /// No services in the cluster, so there is no slot to size for.
    Deferred,
    Unchanged,
    Scaled,
    /// The change would leave the group's min/max bounds.
    Prevented,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizerReport {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<CapacityDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ScaleOutcome>,
}

impl SizerReport {
    fn without_decision(status: Status, message: String) -> Self {
        SizerReport {
            status,
            message,
            decision: None,
            outcome: None,
        }
    }
}

/// One sizing pass over an ECS cluster and the autoscaling group behind it.
pub struct Sizer<C, G, L, N> {
    config: SizerConfig,
    cluster: C,
    groups: G,
    launches: L,
    notifier: Option<N>,
}

impl<C, G, L, N> Sizer<C, G, L, N>
where
    C: ClusterInventory + Sync,
    G: ScalingGroups + Sync,
    L: InstanceLaunches + Sync,
    N: Notify + Sync,
{
    pub fn new(config: SizerConfig, cluster: C, groups: G, launches: L, notifier: Option<N>) -> Self {
        Sizer {
            config,
            cluster,
            groups,
            launches,
            notifier,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<SizerReport, SizerError> {
        let config = &self.config;

        let all_usages = collect_usages(&self.cluster, &config.ecs_cluster, now.timestamp()).await?;
        let usages = match usable_instances(&all_usages, config.disconnect_threshold_seconds) {
            Some(usages) => usages,
            None => {
                error!(cluster = %config.ecs_cluster, "no instances running in cluster");
                log_usages(&all_usages);
                return Err(SizerError::NoUsableInstances(config.ecs_cluster.clone()));
            }
        };

        let cluster_instance_ids: HashSet<String> =
            usages.iter().map(|usage| usage.id.clone()).collect();
        let settings = GateSettings {
            asg_name: &config.asg_name,
            ecs_agent_wait: config.ecs_agent_wait,
            dry_run: config.dry_run,
        };
        if let Some(blocked) =
            gate::check(&self.groups, &self.launches, &settings, &cluster_instance_ids, now).await?
        {
            let message = format!("Already scaling: {}", blocked);
            if blocked.is_warning() {
                warn!(group = %config.asg_name, "{}", message);
            } else {
                debug!(group = %config.asg_name, "{}", message);
            }
            log_usages(&all_usages);
            return Ok(SizerReport::without_decision(Status::Blocked, message));
        }

        let slot = slot_profile(&self.cluster, &config.ecs_cluster).await?;
        if slot.is_empty() {
            let message = format!("No services running in cluster {}", config.ecs_cluster);
            debug!("{}", message);
            return Ok(SizerReport::without_decision(Status::Deferred, message));
        }

        let target = format!("Targeting {}x {}", config.empty_slots, slot);
        debug!("{}", target);
        log_usages(&usages);

        let decision = decide(&usages, slot, config.empty_slots);
        let state = format!("{} slots available", decision.available_slots);
        let capacity = format!("{} per empty-instance", decision.slots_per_instance);
        debug!("{} ({})", state, capacity);

        let outcome = scale(&self.groups, &config.asg_name, decision.delta, config.dry_run).await?;
        let fields = vec![
            Field {
                title: "Target".to_string(),
                value: target,
                short: true,
            },
            Field {
                title: "State".to_string(),
                value: format!("{}\n{}", state, capacity),
                short: true,
            },
        ];

        let (status, message) = self.describe(&outcome);
        match status {
            Status::Unchanged => debug!("{}", message),
            Status::Prevented => {
                warn!("{}", message);
                self.notify(&message, fields).await;
            }
            _ => {
                info!("{}", message);
                self.notify(&message, fields).await;
            }
        }

        Ok(SizerReport {
            status,
            message,
            decision: Some(decision),
            outcome: Some(outcome),
        })
    }

    fn describe(&self, outcome: &ScaleOutcome) -> (Status, String) {
        let direction = if outcome.attempted_next < outcome.previous {
            "IN"
        } else if outcome.attempted_next > outcome.previous {
            "OUT"
        } else {
            return (
                Status::Unchanged,
                format!("No change - capacity at {}", outcome.attempted_next),
            );
        };

        let prefix = if self.config.dry_run {
            format!("DRY RUN Scale {} - ", direction)
        } else {
            format!("Scale {} - ", direction)
        };
        match outcome.bound {
            Some(BoundReason::MinSize(min)) => (
                Status::Prevented,
                format!("{}prevented by min-size {}", prefix, min),
            ),
            Some(BoundReason::MaxSize(max)) => (
                Status::Prevented,
                format!("{}prevented by max-size {}", prefix, max),
            ),
            None => (
                Status::Scaled,
                format!(
                    "{}capacity from {} to {}",
                    prefix, outcome.previous, outcome.attempted_next
                ),
            ),
        }
    }

    async fn notify(&self, text: &str, fields: Vec<Field>) {
        if let Some(notifier) = &self.notifier {
            let message = SlackMessage::new(&self.config.asg_name, text.to_string(), fields);
            if let Err(error) = notifier.publish(&message).await {
                warn!(error = %error, "failed to publish notification");
            }
        }
    }
}
