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
use super::object::{Outcome, converge};
use crate::context::Context;
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use tracing::debug;

pub async fn reconcile_metrics_service(
    ctx: &Context,
    rm: &RolloutManager,
) -> Result<Outcome, Error> {
    converge(ctx, rm, rm.new_metrics_service()?).await
}

/// Only when the ServiceMonitor API was found at start; `None` otherwise.
pub async fn reconcile_service_monitor(
    ctx: &Context,
    rm: &RolloutManager,
) -> Result<Option<Outcome>, Error> {
    if !ctx.service_monitor_available {
        debug!("ServiceMonitor API is not served, skipping");
        return Ok(None);
    }

    converge(ctx, rm, rm.new_service_monitor()?).await.map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::{reconcile_metrics_service, reconcile_service_monitor};
    use crate::reconcile::object::Outcome;
    use crate::tests::{create_test_context, create_test_context_with, create_test_rollout_manager};
    use crate::types::v1alpha1::monitor::ServiceMonitor;
    use k8s_openapi::api::core::v1 as corev1;

    // Test: an allocated cluster IP is not a reason to update
    #[tokio::test]
    async fn test_metrics_service_keeps_cluster_ip() {
        let (store, ctx) = create_test_context();
        let rm = create_test_rollout_manager();

        reconcile_metrics_service(&ctx, &rm).await.unwrap();
        store.modify::<corev1::Service>(Some("default"), "argo-rollouts-metrics", |svc| {
            svc.spec.as_mut().unwrap().cluster_ip = Some("10.96.0.20".into());
        });

        assert_eq!(
            reconcile_metrics_service(&ctx, &rm).await.unwrap(),
            Outcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_service_monitor_follows_capability() {
        let (store, ctx) = create_test_context();
        let rm = create_test_rollout_manager();

        assert_eq!(reconcile_service_monitor(&ctx, &rm).await.unwrap(), None);
        assert!(
            store
                .get_typed::<ServiceMonitor>(Some("default"), "argo-rollouts-metrics")
                .is_none()
        );

        let (store, ctx) = create_test_context_with(Default::default(), true);
        assert_eq!(
            reconcile_service_monitor(&ctx, &rm).await.unwrap(),
            Some(Outcome::Created)
        );
        assert!(
            store
                .get_typed::<ServiceMonitor>(Some("default"), "argo-rollouts-metrics")
                .is_some()
        );
    }
}
