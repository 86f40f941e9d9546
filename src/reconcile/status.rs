// Copyright 2025 The rollouts-manager Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::Error;
use crate::context::Context;
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use crate::types::v1alpha1::status::Status;
use crate::types::v1alpha1::status::condition::Condition;
use crate::types::v1alpha1::status::phase::Phase;
use k8s_openapi::api::apps::v1 as appsv1;
use tracing::debug;

/// Phase of the managed controller, read off its Deployment.
pub fn controller_phase(deployment: Option<&appsv1::Deployment>) -> Phase {
    let Some(deployment) = deployment else {
        return Phase::Failure;
    };

    let Some(replicas) = deployment.spec.as_ref().and_then(|s| s.replicas) else {
        return Phase::Unknown;
    };

    let ready = deployment
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);

    if ready < replicas {
        Phase::Pending
    } else {
        Phase::Available
    }
}

/// The status `current` should move to. The overall phase mirrors the controller phase.
pub fn desired_status(
    current: Option<&Status>,
    controller: Phase,
    condition: Condition,
    now: &str,
) -> Status {
    let mut status = current.cloned().unwrap_or_default();
    status.phase = controller;
    status.rollout_controller = controller;
    status.set_condition(condition, now);
    status
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Writes phase and condition in a single status update, skipping the write when nothing changed.
pub async fn write_status(
    ctx: &Context,
    rm: &RolloutManager,
    controller: Phase,
    condition: Condition,
) -> Result<bool, Error> {
    let status = desired_status(rm.status.as_ref(), controller, condition, &now());
    if rm.status.as_ref() == Some(&status) {
        debug!("status of {} is unchanged", rm.name());
        return Ok(false);
    }

    let mut updated = rm.clone();
    updated.status = Some(status);
    ctx.update_status(&updated).await?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{controller_phase, desired_status};
    use crate::types::v1alpha1::status::condition::{
        Condition, ConditionStatus, REASON_SUCCESS,
    };
    use crate::types::v1alpha1::status::phase::Phase;
    use k8s_openapi::api::apps::v1 as appsv1;

    fn deployment(replicas: Option<i32>, ready: Option<i32>) -> appsv1::Deployment {
        appsv1::Deployment {
            spec: Some(appsv1::DeploymentSpec {
                replicas,
                ..Default::default()
            }),
            status: Some(appsv1::DeploymentStatus {
                ready_replicas: ready,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_controller_phase() {
        assert_eq!(controller_phase(None), Phase::Failure);
        assert_eq!(controller_phase(Some(&deployment(None, None))), Phase::Unknown);
        assert_eq!(
            controller_phase(Some(&deployment(Some(1), None))),
            Phase::Pending
        );
        assert_eq!(
            controller_phase(Some(&deployment(Some(1), Some(0)))),
            Phase::Pending
        );
        assert_eq!(
            controller_phase(Some(&deployment(Some(1), Some(1)))),
            Phase::Available
        );
        // surge during a rollout
        assert_eq!(
            controller_phase(Some(&deployment(Some(1), Some(2)))),
            Phase::Available
        );
    }

    // Test: rewriting the same condition keeps the status byte-for-byte equal
    #[test]
    fn test_desired_status_is_stable() {
        let condition = Condition::reconciled(ConditionStatus::True, REASON_SUCCESS, "");
        let first = desired_status(
            None,
            Phase::Available,
            condition.clone(),
            "2025-01-01T00:00:00Z",
        );
        let second = desired_status(
            Some(&first),
            Phase::Available,
            condition,
            "2025-02-01T00:00:00Z",
        );

        assert_eq!(first, second);
        assert_eq!(second.phase, second.rollout_controller);
    }
}
