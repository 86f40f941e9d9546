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
use super::object::{converge, notify};
use crate::context::Context;
use crate::types::v1alpha1::k8s;
use crate::types::v1alpha1::rollout_manager::{AggregateTo, RolloutManager};
use k8s_openapi::api::rbac::v1 as rbacv1;
use strum::IntoEnumIterator;
use tracing::info;

/// Role and binding for a namespace-scoped instance, ClusterRole and ClusterRoleBinding otherwise.
/// The aggregate ClusterRoles are kept in either case.
pub async fn reconcile_rbac(ctx: &Context, rm: &RolloutManager) -> Result<(), Error> {
    if rm.is_namespace_scoped() {
        converge(ctx, rm, rm.new_role()?).await?;
    } else {
        converge(ctx, rm, rm.new_cluster_role()).await?;
    }

    for to in AggregateTo::iter() {
        converge(ctx, rm, rm.new_aggregate_cluster_role(to)).await?;
    }

    if rm.is_namespace_scoped() {
        converge(ctx, rm, rm.new_role_binding()?).await?;
        remove_stale_cluster_rbac(ctx, rm).await?;
    } else {
        converge(ctx, rm, rm.new_cluster_role_binding()?).await?;
    }

    Ok(())
}

/// Deletes the ClusterRoleBinding (and its ClusterRole) left behind when `rm` used to be
/// cluster-scoped. Bindings that do not name this instance's ServiceAccount are not touched.
pub(crate) async fn remove_stale_cluster_rbac(
    ctx: &Context,
    rm: &RolloutManager,
) -> Result<bool, Error> {
    let Some(binding) = ctx
        .get_opt::<rbacv1::ClusterRoleBinding>(k8s::DEFAULT_RESOURCE_NAME, None)
        .await?
    else {
        return Ok(false);
    };

    if !rm.is_bound_by(&binding) {
        return Ok(false);
    }

    info!(
        "removing cluster-scoped RBAC of {} now that it is namespace-scoped",
        rm.name()
    );
    ctx.delete_if_exists::<rbacv1::ClusterRoleBinding>(k8s::DEFAULT_RESOURCE_NAME, None)
        .await?;
    ctx.delete_if_exists::<rbacv1::ClusterRole>(k8s::DEFAULT_RESOURCE_NAME, None)
        .await?;
    notify(
        ctx,
        rm,
        "Deleted",
        "Deleted ClusterRoleBinding and ClusterRole argo-rollouts",
    )
    .await;
    Ok(true)
}
