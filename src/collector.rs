use std::convert::TryFrom;
use tracing::{debug, error, warn};

use crate::disconnects::{
    fits_in_tag, DisconnectRegistry, DISCONNECTS_TAG, MAX_TAG_VALUE_LENGTH,
};
use crate::ecs_cluster_client::ClusterInventory;
use crate::error::SizerError;
use crate::usage::InstanceUsage;

/// Reads every container instance in `cluster`, marks how long disconnected
/// agents have been gone and rewrites the disconnect registry tag.
pub async fn collect_usages<C>(
    inventory: &C,
    cluster: &str,
    now: i64,
) -> Result<Vec<InstanceUsage>, SizerError>
where
    C: ClusterInventory + Sync,
{
    let cluster_arn = inventory.cluster_arn(cluster).await?;
    let mut usages = inventory
        .container_instances(cluster)
        .await?
        .into_iter()
        .map(InstanceUsage::try_from)
        .collect::<Result<Vec<InstanceUsage>, SizerError>>()?;

    let previous = inventory
        .tag_value(&cluster_arn, DISCONNECTS_TAG)
        .await?
        .map(|value| DisconnectRegistry::parse(&value))
        .unwrap_or_default();
    let next = previous.reconcile(&mut usages, now);

    let value = next.serialize();
    if !fits_in_tag(&value) {
        error!(
            cluster = %cluster,
            length = value.len(),
            limit = MAX_TAG_VALUE_LENGTH,
            "disconnect registry exceeds the tag value limit, disconnect times will not persist"
        );
    }
    match inventory.put_tag(&cluster_arn, DISCONNECTS_TAG, &value).await {
        Ok(()) => debug!(cluster = %cluster, disconnects = %value, "disconnect registry updated"),
        Err(error) => warn!(
            cluster = %cluster,
            error = %error,
            "failed to write disconnect registry"
        ),
    }

    Ok(usages)
}

pub fn log_usages(usages: &[InstanceUsage]) {
    for usage in usages {
        if usage.connected {
            debug!(
                instance = %usage.id,
                cpu = usage.remaining_cpu,
                memory = usage.remaining_memory,
                "instance usage"
            );
        } else {
            debug!(
                instance = %usage.id,
                cpu = usage.remaining_cpu,
                memory = usage.remaining_memory,
                disconnected_seconds = usage.disconnected_seconds,
                "instance usage (DISCONNECTED)"
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::collector::collect_usages;
    use crate::ecs_cluster_client::ClusterInventory;
    use crate::error::SizerError;
    use async_trait::async_trait;
    use rusoto_ecs::{ContainerDefinition, ContainerInstance, Resource};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory cluster used by the collector, slot and sizer tests.
    #[derive(Default)]
    pub(crate) struct FakeCluster {
        pub instances: Vec<ContainerInstance>,
        pub tag: Option<String>,
        pub fail_tag_write: bool,
        pub written_tags: Mutex<Vec<String>>,
        pub task_definitions: Vec<String>,
        pub containers: HashMap<String, Vec<ContainerDefinition>>,
        pub described_task_definitions: Mutex<Vec<String>>,
    }

    pub(crate) fn container_instance(
        id: &str,
        connected: bool,
        remaining: (i64, i64),
        total: (i64, i64),
    ) -> ContainerInstance {
        let resources = |(cpu, memory): (i64, i64)| {
            Some(vec![
                Resource {
                    name: Some("CPU".to_string()),
                    integer_value: Some(cpu),
                    ..Default::default()
                },
                Resource {
                    name: Some("MEMORY".to_string()),
                    integer_value: Some(memory),
                    ..Default::default()
                },
            ])
        };
        ContainerInstance {
            ec_2_instance_id: Some(id.to_string()),
            agent_connected: Some(connected),
            remaining_resources: resources(remaining),
            registered_resources: resources(total),
            ..Default::default()
        }
    }

    #[async_trait]
    impl ClusterInventory for FakeCluster {
        async fn container_instances(
            &self,
            _: &str,
        ) -> Result<Vec<ContainerInstance>, SizerError> {
            Ok(self.instances.clone())
        }

        async fn cluster_arn(&self, cluster: &str) -> Result<String, SizerError> {
            Ok(format!("arn:aws:ecs:us-east-1:123456789012:cluster/{}", cluster))
        }

        async fn tag_value(&self, _: &str, _: &str) -> Result<Option<String>, SizerError> {
            Ok(self.tag.clone())
        }

        async fn put_tag(&self, _: &str, _: &str, value: &str) -> Result<(), SizerError> {
            if self.fail_tag_write {
                return Err(SizerError::MissingField("tags"));
            }
            self.written_tags.lock().unwrap().push(value.to_string());
            Ok(())
        }

        async fn service_task_definitions(&self, _: &str) -> Result<Vec<String>, SizerError> {
            Ok(self.task_definitions.clone())
        }

        async fn container_definitions(
            &self,
            task_definition: &str,
        ) -> Result<Vec<ContainerDefinition>, SizerError> {
            self.described_task_definitions
                .lock()
                .unwrap()
                .push(task_definition.to_string());
            Ok(self
                .containers
                .get(task_definition)
                .cloned()
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_collect_usages() {
        let cluster = FakeCluster {
            instances: vec![
                container_instance("i-1", false, (0, 0), (1024, 2048)),
                container_instance("i-2", true, (512, 1024), (1024, 2048)),
                container_instance("i-3", false, (1024, 2048), (1024, 2048)),
            ],
            tag: Some("i-1:1000 i-9:500".to_string()),
            ..Default::default()
        };

        let usages = collect_usages(&cluster, "cluster-staging", 1300).await.unwrap();

        assert_eq!(usages.len(), 3);
        assert_eq!(usages[0].disconnected_seconds, 300);
        assert_eq!(usages[1].disconnected_seconds, 0);
        assert_eq!(usages[2].disconnected_seconds, 0);
        assert_eq!(
            *cluster.written_tags.lock().unwrap(),
            vec!["i-1:1000 i-3:1300".to_string()]
        );
    }

    #[tokio::test]
    async fn test_collect_usages_without_tag() {
        let cluster = FakeCluster {
            instances: vec![container_instance("i-1", true, (0, 0), (1024, 2048))],
            ..Default::default()
        };

        collect_usages(&cluster, "cluster-staging", 1300).await.unwrap();

        assert_eq!(*cluster.written_tags.lock().unwrap(), vec!["".to_string()]);
    }

    #[tokio::test]
    async fn test_tag_write_failure_is_swallowed() {
        let cluster = FakeCluster {
            instances: vec![container_instance("i-1", false, (0, 0), (1024, 2048))],
            fail_tag_write: true,
            ..Default::default()
        };

        let usages = collect_usages(&cluster, "cluster-staging", 1300).await.unwrap();

        assert_eq!(usages.len(), 1);
        assert!(cluster.written_tags.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_registry_still_collects() {
        let cluster = FakeCluster {
            instances: (0..9)
                .map(|n| {
                    container_instance(
                        &format!("i-0aaaaaaaaaaaaaa{:02}", n),
                        false,
                        (0, 0),
                        (1024, 2048),
                    )
                })
                .collect(),
            ..Default::default()
        };

        let usages = collect_usages(&cluster, "cluster-staging", 1600000000)
            .await
            .unwrap();

        assert_eq!(usages.len(), 9);
        let written = cluster.written_tags.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].len() > 256);
    }

    #[tokio::test]
    async fn test_missing_resource_aborts() {
        let mut broken = container_instance("i-1", true, (0, 0), (1024, 2048));
        broken.registered_resources = Some(vec![]);
        let cluster = FakeCluster {
            instances: vec![broken],
            ..Default::default()
        };

        let result = collect_usages(&cluster, "cluster-staging", 1300).await;

        assert!(matches!(result, Err(SizerError::MissingResource { .. })));
    }
}
