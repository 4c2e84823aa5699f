use config::{Config, Environment};
use serde::{Deserialize, Deserializer};

use crate::error::SizerError;

/// Sizer settings, read from the Lambda's environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SizerConfig {
    /// `ASG_NAME`: the autoscaling group backing the cluster.
    pub asg_name: String,

    /// `ECS_CLUSTER`: the cluster whose capacity is measured.
    pub ecs_cluster: String,

    /// `DRY_RUN`: decide and report, but never mutate the group. Blank means off.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub dry_run: bool,

    /// `SLACK_SNS_TOPIC`: relay topic for chat notifications.
    #[serde(default)]
    pub slack_sns_topic: Option<String>,

    /// `EMPTY_SLOTS`: the target slack, in slots.
    #[serde(default = "default_empty_slots")]
    pub empty_slots: i64,

    /// `DISCONNECT_THRESHOLD_SECONDS`
    #[serde(default = "default_disconnect_threshold")]
    pub disconnect_threshold_seconds: i64,

    /// `ECS_AGENT_WAIT`: grace period, in seconds, for a new instance to
    /// register its agent with the cluster.
    #[serde(default = "default_ecs_agent_wait")]
    pub ecs_agent_wait: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Number(i64),
    Text(String),
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => Ok(flag),
        Flag::Number(number) => Ok(number != 0),
        Flag::Text(text) if text.trim().is_empty() => Ok(false),
        Flag::Text(text) => text
            .trim()
            .to_lowercase()
            .parse::<bool>()
            .map_err(serde::de::Error::custom),
    }
}

fn default_empty_slots() -> i64 {
    2
}

fn default_disconnect_threshold() -> i64 {
    300
}

fn default_ecs_agent_wait() -> i64 {
    300
}

impl SizerConfig {
    pub fn from_env() -> Result<Self, SizerError> {
        Self::from_environment(Environment::default())
    }

    #[cfg(test)]
    fn from_map(vars: std::collections::HashMap<String, String>) -> Result<Self, SizerError> {
        Self::from_environment(Environment::default().source(Some(vars)))
    }

    fn from_environment(environment: Environment) -> Result<Self, SizerError> {
        let config = Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?;
        let mut sizer: SizerConfig = config.try_deserialize()?;
        if sizer
            .slack_sns_topic
            .as_ref()
            .map_or(false, |topic| topic.trim().is_empty())
        {
            sizer.slack_sns_topic = None;
        }
        Ok(sizer)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SizerConfig;
    use crate::error::SizerError;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_defaults() {
        let config = SizerConfig::from_map(vars(&[
            ("ASG_NAME", "cluster-production-asg"),
            ("ECS_CLUSTER", "cluster-production"),
        ]))
        .unwrap();

        assert_eq!(
            config,
            SizerConfig {
                asg_name: "cluster-production-asg".to_string(),
                ecs_cluster: "cluster-production".to_string(),
                dry_run: false,
                slack_sns_topic: None,
                empty_slots: 2,
                disconnect_threshold_seconds: 300,
                ecs_agent_wait: 300,
            }
        );
    }

    #[tokio::test]
    async fn test_overrides() {
        let config = SizerConfig::from_map(vars(&[
            ("ASG_NAME", "cluster-staging-asg"),
            ("ECS_CLUSTER", "cluster-staging"),
            ("DRY_RUN", "true"),
            ("SLACK_SNS_TOPIC", "arn:aws:sns:us-east-1:123456789012:slack"),
            ("EMPTY_SLOTS", "4"),
            ("DISCONNECT_THRESHOLD_SECONDS", "600"),
            ("ECS_AGENT_WAIT", "120"),
        ]))
        .unwrap();

        assert!(config.dry_run);
        assert_eq!(
            config.slack_sns_topic,
            Some("arn:aws:sns:us-east-1:123456789012:slack".to_string())
        );
        assert_eq!(config.empty_slots, 4);
        assert_eq!(config.disconnect_threshold_seconds, 600);
        assert_eq!(config.ecs_agent_wait, 120);
    }

    #[tokio::test]
    async fn test_blank_topic_disables_notifications() {
        let config = SizerConfig::from_map(vars(&[
            ("ASG_NAME", "asg"),
            ("ECS_CLUSTER", "cluster"),
            ("SLACK_SNS_TOPIC", " "),
        ]))
        .unwrap();

        assert_eq!(config.slack_sns_topic, None);
    }

    #[tokio::test]
    async fn test_blank_dry_run_is_off() {
        let config = SizerConfig::from_map(vars(&[
            ("ASG_NAME", "asg"),
            ("ECS_CLUSTER", "cluster"),
            ("DRY_RUN", ""),
        ]))
        .unwrap();

        assert!(!config.dry_run);
    }

    #[tokio::test]
    async fn test_dry_run_spellings() {
        for (value, expected) in [("TRUE", true), ("1", true), ("0", false), ("False", false)] {
            let config = SizerConfig::from_map(vars(&[
                ("ASG_NAME", "asg"),
                ("ECS_CLUSTER", "cluster"),
                ("DRY_RUN", value),
            ]))
            .unwrap();

            assert_eq!(config.dry_run, expected, "DRY_RUN={}", value);
        }
    }

    #[tokio::test]
    async fn test_unreadable_dry_run() {
        let result = SizerConfig::from_map(vars(&[
            ("ASG_NAME", "asg"),
            ("ECS_CLUSTER", "cluster"),
            ("DRY_RUN", "maybe"),
        ]));

        assert!(matches!(result, Err(SizerError::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_cluster() {
        let result = SizerConfig::from_map(vars(&[("ASG_NAME", "asg")]));

        assert!(matches!(result, Err(SizerError::Config(_))));
    }
}
