use async_trait::async_trait;
use rusoto_ecs::{
    ContainerDefinition, ContainerInstance, DescribeClustersRequest,
    DescribeContainerInstancesRequest, DescribeServicesRequest, DescribeTaskDefinitionRequest,
    Ecs, EcsClient, ListContainerInstancesRequest, ListServicesRequest,
    ListTagsForResourceRequest, Tag, TagResourceRequest,
};

use crate::error::SizerError;

// DescribeContainerInstances accepts at most 100 ids per call.
const DESCRIBE_BATCH_SIZE: usize = 100;
const SERVICES_PAGE_SIZE: i64 = 10;

/// The slice of the ECS control plane the sizer reads and writes.
#[async_trait]
pub trait ClusterInventory {
    async fn container_instances(&self, cluster: &str)
        -> Result<Vec<ContainerInstance>, SizerError>;

    async fn cluster_arn(&self, cluster: &str) -> Result<String, SizerError>;

    async fn tag_value(&self, resource_arn: &str, key: &str)
        -> Result<Option<String>, SizerError>;

    async fn put_tag(&self, resource_arn: &str, key: &str, value: &str)
        -> Result<(), SizerError>;

    /// Task definition ARNs of every service in the cluster, one per service.
    async fn service_task_definitions(&self, cluster: &str) -> Result<Vec<String>, SizerError>;

    async fn container_definitions(
        &self,
        task_definition: &str,
    ) -> Result<Vec<ContainerDefinition>, SizerError>;
}

pub struct EcsClusterClient {
    client: EcsClient,
}

impl EcsClusterClient {
    pub fn new_with_client(client: EcsClient) -> Self {
        EcsClusterClient { client }
    }
}

fn describe_batches(arns: &[String]) -> std::slice::Chunks<'_, String> {
    arns.chunks(DESCRIBE_BATCH_SIZE)
}

#[async_trait]
impl ClusterInventory for EcsClusterClient {
    async fn container_instances(
        &self,
        cluster: &str,
    ) -> Result<Vec<ContainerInstance>, SizerError> {
        let mut arns = Vec::<String>::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_container_instances(ListContainerInstancesRequest {
                    cluster: Some(cluster.to_string()),
                    next_token,
                    ..Default::default()
                })
                .await?;
            arns.extend(page.container_instance_arns.unwrap_or_default());
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        let mut instances = Vec::<ContainerInstance>::with_capacity(arns.len());
        for batch in describe_batches(&arns) {
            let described = self
                .client
                .describe_container_instances(DescribeContainerInstancesRequest {
                    cluster: Some(cluster.to_string()),
                    container_instances: batch.to_vec(),
                    ..Default::default()
                })
                .await?;
            instances.extend(described.container_instances.unwrap_or_default());
        }
        Ok(instances)
    }

    async fn cluster_arn(&self, cluster: &str) -> Result<String, SizerError> {
        let described = self
            .client
            .describe_clusters(DescribeClustersRequest {
                clusters: Some(vec![cluster.to_string()]),
                ..Default::default()
            })
            .await?;
        described
            .clusters
            .unwrap_or_default()
            .into_iter()
            .find_map(|found| found.cluster_arn)
            .ok_or_else(|| SizerError::NotFound {
                kind: "cluster",
                name: cluster.to_string(),
            })
    }

    async fn tag_value(&self, resource_arn: &str, key: &str) -> Result<Option<String>, SizerError> {
        let listed = self
            .client
            .list_tags_for_resource(ListTagsForResourceRequest {
                resource_arn: resource_arn.to_string(),
            })
            .await?;
        Ok(listed
            .tags
            .unwrap_or_default()
            .into_iter()
            .find(|tag| tag.key.as_deref() == Some(key))
            .and_then(|tag| tag.value))
    }

    async fn put_tag(&self, resource_arn: &str, key: &str, value: &str) -> Result<(), SizerError> {
        self.client
            .tag_resource(TagResourceRequest {
                resource_arn: resource_arn.to_string(),
                tags: vec![Tag {
                    key: Some(key.to_string()),
                    value: Some(value.to_string()),
                }],
            })
            .await?;
        Ok(())
    }

    async fn service_task_definitions(&self, cluster: &str) -> Result<Vec<String>, SizerError> {
        let mut task_definitions = Vec::<String>::new();
        let mut next_token = None;
        loop {
            let page = self
                .client
                .list_services(ListServicesRequest {
                    cluster: Some(cluster.to_string()),
                    max_results: Some(SERVICES_PAGE_SIZE),
                    next_token,
                    ..Default::default()
                })
                .await?;
            let service_arns = page.service_arns.unwrap_or_default();
            if !service_arns.is_empty() {
                let described = self
                    .client
                    .describe_services(DescribeServicesRequest {
                        cluster: Some(cluster.to_string()),
                        services: service_arns,
                        ..Default::default()
                    })
                    .await?;
                task_definitions.extend(
                    described
                        .services
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|service| service.task_definition),
                );
            }
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }
        Ok(task_definitions)
    }

    async fn container_definitions(
        &self,
        task_definition: &str,
    ) -> Result<Vec<ContainerDefinition>, SizerError> {
        let described = self
            .client
            .describe_task_definition(DescribeTaskDefinitionRequest {
                task_definition: task_definition.to_string(),
                ..Default::default()
            })
            .await?;
        Ok(described
            .task_definition
            .and_then(|definition| definition.container_definitions)
            .unwrap_or_default())
    }
}
