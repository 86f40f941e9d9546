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
use crate::types::v1alpha1::k8s;
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use k8s_openapi::api::core::v1 as corev1;
use kube::ResourceExt;
use tracing::{debug, info};

fn plugins_changed(outcome: Outcome) -> bool {
    match outcome {
        Outcome::Updated(field) => field.starts_with("data") || field == "malformed",
        _ => false,
    }
}

/// The plugin ConfigMap. The controller reads plugins only at start, so a changed plugin list
/// restarts its pods.
pub async fn reconcile_plugin_config_map(
    ctx: &Context,
    rm: &RolloutManager,
) -> Result<Outcome, Error> {
    let outcome = converge(ctx, rm, rm.new_plugin_config_map()?).await?;
    if plugins_changed(outcome) {
        restart_controller_pods(ctx, rm).await?;
    }
    Ok(outcome)
}

/// Deletes every controller pod. Pods that are already gone are skipped, any other failure aborts.
pub(crate) async fn restart_controller_pods(
    ctx: &Context,
    rm: &RolloutManager,
) -> Result<usize, Error> {
    let namespace = rm.namespace()?;
    let selector = format!("{}={}", k8s::LABEL_NAME, k8s::DEFAULT_RESOURCE_NAME);
    let pods = ctx
        .list::<corev1::Pod>(Some(namespace.as_str()), Some(selector.as_str()))
        .await?;

    let mut deleted = 0;
    for pod in pods {
        if ctx
            .delete_if_exists::<corev1::Pod>(&pod.name_any(), Some(namespace.as_str()))
            .await?
        {
            deleted += 1;
        } else {
            debug!("pod {} was already gone", pod.name_any());
        }
    }

    info!("restarted {deleted} rollouts controller pod(s) for new plugin configuration");
    Ok(deleted)
}
