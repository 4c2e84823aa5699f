use std::collections::BTreeMap;

use crate::usage::InstanceUsage;

/// Cluster tag holding the registry.
pub const DISCONNECTS_TAG: &str = "ecs-asg-sizer:disconnects";
const DISCONNECTS_DELIMITER: char = ' ';
const DISCONNECTS_SEPARATOR: char = ':';
/// ECS rejects tag values longer than this.
pub const MAX_TAG_VALUE_LENGTH: usize = 256;

pub fn fits_in_tag(value: &str) -> bool {
    value.chars().count() <= MAX_TAG_VALUE_LENGTH
}

/// Instance id to the unix time its agent was first seen disconnected.
///
/// Persisted between invocations as a single tag value of the form
/// `i-1:1600000000 i-2:1600000300`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DisconnectRegistry {
    entries: BTreeMap<String, i64>,
}

impl DisconnectRegistry {
    /// Parses a tag value. Entries that are not exactly `id:seconds` are skipped.
    pub fn parse(value: &str) -> Self {
        let entries = value
            .split(DISCONNECTS_DELIMITER)
            .filter_map(|entry| {
                let parts: Vec<&str> = entry.split(DISCONNECTS_SEPARATOR).collect();
                match parts.as_slice() {
                    [id, seconds] if !id.is_empty() => seconds
                        .parse::<i64>()
                        .ok()
                        .map(|seconds| (id.to_string(), seconds)),
                    _ => None,
                }
            })
            .collect();
        DisconnectRegistry { entries }
    }

    pub fn serialize(&self) -> String {
        self.entries
            .iter()
            .map(|(id, seconds)| format!("{}{}{}", id, DISCONNECTS_SEPARATOR, seconds))
            .collect::<Vec<String>>()
            .join(&DISCONNECTS_DELIMITER.to_string())
    }

    pub fn first_seen(&self, id: &str) -> Option<i64> {
        self.entries.get(id).copied()
    }

    /// Fills in `disconnected_seconds` for every disconnected usage and returns
    /// the registry to persist: exactly the currently disconnected instances,
    /// each keeping its earliest recorded timestamp.
    pub fn reconcile(&self, usages: &mut [InstanceUsage], now: i64) -> DisconnectRegistry {
        let mut next = DisconnectRegistry::default();
        for usage in usages.iter_mut() {
            if usage.connected {
                usage.disconnected_seconds = 0;
                continue;
            }
            let first_seen = self.first_seen(&usage.id).unwrap_or(now);
            usage.disconnected_seconds = (now - first_seen).max(0);
            next.entries.insert(usage.id.clone(), first_seen);
        }
        next
    }
}
