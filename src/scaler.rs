use serde::Serialize;
use tracing::info;

use crate::auto_scaling_client::ScalingGroups;
use crate::error::SizerError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "bound", content = "size", rename_all = "snake_case")]
pub enum BoundReason {
    MinSize(i64),
    MaxSize(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleOutcome {
    pub min: i64,
    pub max: i64,
    pub previous: i64,
    pub attempted_next: i64,
    pub applied: bool,
    pub bound: Option<BoundReason>,
}

/// Moves the group's desired capacity by `delta`. Out-of-bounds targets are
/// refused rather than clamped.
pub async fn scale<G>(
    groups: &G,
    asg_name: &str,
    delta: i64,
    dry_run: bool,
) -> Result<ScaleOutcome, SizerError>
where
    G: ScalingGroups + Sync,
{
    let group = groups.describe_group(asg_name).await?;
    let previous = group.desired_capacity;
    let attempted_next = previous + delta;

    // A no-op never hits a bound, even when the group already sits outside one.
    let bound = if delta == 0 {
        None
    } else if attempted_next < group.min_size {
        Some(BoundReason::MinSize(group.min_size))
    } else if attempted_next > group.max_size {
        Some(BoundReason::MaxSize(group.max_size))
    } else {
        None
    };

    let applied = delta != 0 && bound.is_none() && !dry_run;
    if applied {
        groups.set_desired_capacity(asg_name, attempted_next).await?;
        info!(group = %asg_name, previous, next = attempted_next, "desired capacity set");
    }

    Ok(ScaleOutcome {
        min: group.min_size,
        max: group.max_size,
        previous,
        attempted_next,
        applied,
        bound,
    })
}

#[cfg(test)]
mod tests {
    use crate::gate::tests::FakeGroup;
    use crate::scaler::{scale, BoundReason, ScaleOutcome};

    #[tokio::test]
    async fn test_scale_out() {
        let group = FakeGroup::new(1, 4, 2, &[]);

        let outcome = scale(&group, "cluster-staging-asg", 1, false).await.unwrap();

        assert_eq!(
            outcome,
            ScaleOutcome {
                min: 1,
                max: 4,
                previous: 2,
                attempted_next: 3,
                applied: true,
                bound: None,
            }
        );
        assert_eq!(*group.desired_calls.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_no_change_makes_no_call() {
        let group = FakeGroup::new(1, 4, 2, &[]);

        let outcome = scale(&group, "cluster-staging-asg", 0, false).await.unwrap();

        assert!(!outcome.applied);
        assert_eq!(outcome.attempted_next, 2);
        assert!(group.desired_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_change_outside_bounds_is_not_refused() {
        let group = FakeGroup::new(2, 4, 1, &[]);

        let outcome = scale(&group, "cluster-staging-asg", 0, false).await.unwrap();

        assert_eq!(outcome.bound, None);
        assert!(!outcome.applied);
        assert_eq!(outcome.attempted_next, 1);
        assert!(group.desired_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_call() {
        let group = FakeGroup::new(1, 4, 2, &[]);

        let outcome = scale(&group, "cluster-staging-asg", -1, true).await.unwrap();

        assert!(!outcome.applied);
        assert_eq!(outcome.attempted_next, 1);
        assert_eq!(outcome.bound, None);
        assert!(group.desired_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refused_below_min() {
        let group = FakeGroup::new(2, 4, 2, &[]);

        let outcome = scale(&group, "cluster-staging-asg", -1, false).await.unwrap();

        assert!(!outcome.applied);
        assert_eq!(outcome.bound, Some(BoundReason::MinSize(2)));
        assert!(group.desired_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refused_above_max() {
        let group = FakeGroup::new(1, 4, 4, &[]);

        let outcome = scale(&group, "cluster-staging-asg", 1, false).await.unwrap();

        assert_eq!(outcome.attempted_next, 5);
        assert_eq!(outcome.bound, Some(BoundReason::MaxSize(4)));
        assert!(group.desired_calls.lock().unwrap().is_empty());
    }
}
