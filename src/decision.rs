use serde::Serialize;
use tracing::warn;

use crate::slot::SlotProfile;
use crate::usage::InstanceUsage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityDecision {
    pub available_slots: i64,
    pub slots_per_instance: i64,
    pub target_slack: i64,
    pub delta: i64,
}

/// Instances that still count towards capacity. Returns `None` when none do.
pub fn usable_instances(
    usages: &[InstanceUsage],
    disconnect_threshold_seconds: i64,
) -> Option<Vec<InstanceUsage>> {
    let usable: Vec<InstanceUsage> = usages
        .iter()
        .filter(|usage| usage.is_usable(disconnect_threshold_seconds))
        .cloned()
        .collect();
    if usable.is_empty() {
        None
    } else {
        Some(usable)
    }
}

/// Decides whether the group should grow or shrink by one instance.
///
/// `usable` must be non-empty; its first entry is the reference instance for
/// the size of an empty instance. The group is assumed homogeneous.
pub fn decide(usable: &[InstanceUsage], slot: SlotProfile, target_slack: i64) -> CapacityDecision {
    let available_slots: i64 = usable
        .iter()
        .map(|usage| slot.fit(usage.remaining_cpu, usage.remaining_memory))
        .sum();

    let slots_per_instance = match usable.first() {
        Some(reference) => {
            if let Some(other) = usable.iter().find(|usage| {
                usage.total_cpu != reference.total_cpu
                    || usage.total_memory != reference.total_memory
            }) {
                warn!(
                    reference = %reference.id,
                    other = %other.id,
                    "instances report different total capacity; sizing from the reference instance"
                );
            }
            slot.fit(reference.total_cpu, reference.total_memory)
        }
        None => 0,
    };

    let delta = if slot.is_empty() {
        0
    } else if available_slots < target_slack {
        1
    } else if available_slots - target_slack - slots_per_instance > 0 {
        -1
    } else {
        0
    };

    CapacityDecision {
        available_slots,
        slots_per_instance,
        target_slack,
        delta,
    }
}
