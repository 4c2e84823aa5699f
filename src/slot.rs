use rusoto_ecs::ContainerDefinition;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use crate::ecs_cluster_client::ClusterInventory;
use crate::error::SizerError;

/// The largest single-container reservation in the cluster. One slot is the
/// room needed to place that container.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SlotProfile {
    pub max_cpu: i64,
    pub max_memory: i64,
}

impl SlotProfile {
    /// True when no service reserves anything, so there is nothing to size for.
    pub fn is_empty(&self) -> bool {
        self.max_cpu == 0 && self.max_memory == 0
    }

    /// Counts how many slots fit in `(cpu, memory)` by repeatedly taking one
    /// slot out while both dimensions stay non-negative. A dimension the slot
    /// does not reserve never limits the count.
    pub fn fit(&self, cpu: i64, memory: i64) -> i64 {
        if self.is_empty() {
            return 0;
        }
        let by_cpu = if self.max_cpu > 0 {
            Some(cpu.max(0) / self.max_cpu)
        } else {
            None
        };
        let by_memory = if self.max_memory > 0 {
            Some(memory.max(0) / self.max_memory)
        } else {
            None
        };
        match (by_cpu, by_memory) {
            (Some(cpu), Some(memory)) => cpu.min(memory),
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => 0,
        }
    }

    fn include(&mut self, container: &ContainerDefinition) {
        let memory = container
            .memory_reservation
            .or(container.memory)
            .unwrap_or(0);
        self.max_cpu = self.max_cpu.max(container.cpu.unwrap_or(0));
        self.max_memory = self.max_memory.max(memory);
    }
}

impl Display for SlotProfile {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[{} cpu / {} mem]", self.max_cpu, self.max_memory)
    }
}

/// Walks every service's task definition in `cluster` and keeps the largest
/// container CPU and memory reservation.
pub async fn slot_profile<C>(inventory: &C, cluster: &str) -> Result<SlotProfile, SizerError>
where
    C: ClusterInventory + Sync,
{
    let task_definitions: BTreeSet<String> = inventory
        .service_task_definitions(cluster)
        .await?
        .into_iter()
        .collect();

    let mut profile = SlotProfile::default();
    for task_definition in &task_definitions {
        for container in inventory.container_definitions(task_definition).await? {
            profile.include(&container);
        }
    }
    Ok(profile)
}
