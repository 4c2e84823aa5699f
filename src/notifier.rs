use async_trait::async_trait;
use regex::Regex;
use rusoto_sns::{PublishInput, Sns, SnsClient};
use serde::Serialize;

use crate::error::SizerError;

const SLACK_CHANNEL: &str = "#ops-debug";
const SLACK_ICON: &str = ":ops-autoscaling:";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub title: String,
    pub value: String,
    pub short: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub fields: Vec<Field>,
}

/// Message understood by the Slack relay subscribed to the topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl SlackMessage {
    pub fn new(asg_name: &str, text: String, fields: Vec<Field>) -> Self {
        SlackMessage {
            channel: SLACK_CHANNEL.to_string(),
            username: format!("ASG Scaling {}", env_name(asg_name)),
            icon_emoji: SLACK_ICON.to_string(),
            text,
            attachments: if fields.is_empty() {
                vec![]
            } else {
                vec![Attachment { fields }]
            },
        }
    }
}

/// `Production` for `cluster-production-asg`, or the group name itself when
/// it names no known environment.
pub fn env_name(asg_name: &str) -> String {
    let pattern = Regex::new(r".*(test|development|staging|production).*");
    let found = pattern
        .ok()
        .and_then(|pattern| pattern.captures(asg_name))
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_string());
    match found {
        Some(env) => {
            let mut chars = env.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => env,
            }
        }
        None => asg_name.to_string(),
    }
}

#[async_trait]
pub trait Notify {
    async fn publish(&self, message: &SlackMessage) -> Result<(), SizerError>;
}

pub struct SnsNotifier {
    client: SnsClient,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new_with_client(client: SnsClient, topic_arn: String) -> Self {
        SnsNotifier { client, topic_arn }
    }
}

#[async_trait]
impl Notify for SnsNotifier {
    async fn publish(&self, message: &SlackMessage) -> Result<(), SizerError> {
        let body = serde_json::to_string(message)?;
        self.client
            .publish(PublishInput {
                topic_arn: Some(self.topic_arn.clone()),
                message: body,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}
