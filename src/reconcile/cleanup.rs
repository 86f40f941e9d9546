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

//! Finalizer handling.
//!
//! Namespaced objects go away with their owner through garbage collection. Cluster-scoped ones
//! cannot carry a namespaced owner reference, so they are deleted here before the finalizer is
//! released.

use super::Error;
use crate::context::Context;
use crate::types::v1alpha1::k8s;
use crate::types::v1alpha1::rollout_manager::{AggregateTo, RolloutManager};
use k8s_openapi::api::rbac::v1 as rbacv1;
use kube::ResourceExt;
use strum::IntoEnumIterator;
use tracing::{debug, info};

pub fn has_finalizer(rm: &RolloutManager) -> bool {
    rm.finalizers().iter().any(|f| f == k8s::FINALIZER)
}

/// Adds the cleanup finalizer, returning the stored object.
pub async fn ensure_finalizer(ctx: &Context, rm: RolloutManager) -> Result<RolloutManager, Error> {
    if has_finalizer(&rm) {
        return Ok(rm);
    }

    let mut updated = rm;
    updated.finalizers_mut().push(k8s::FINALIZER.to_owned());
    debug!("adding finalizer to {}", updated.name());
    Ok(ctx.update(&updated).await?)
}

/// Whether another live cluster-scoped instance in the namespace of `rm` relies on the shared
/// ClusterRole and ClusterRoleBinding.
fn cluster_rbac_shared(rm: &RolloutManager, others: &[RolloutManager]) -> bool {
    others.iter().any(|other| {
        !other.is_namespace_scoped() && other.metadata.namespace == rm.metadata.namespace
    })
}

/// Deletes the cluster-scoped objects of a RolloutManager that is going away and releases it.
///
/// The ClusterRole and ClusterRoleBinding are named the same for every instance, so they are kept
/// while another cluster-scoped instance of the same namespace is bound to them.
pub async fn finalize(ctx: &Context, rm: &RolloutManager) -> Result<(), Error> {
    if !has_finalizer(rm) {
        return Ok(());
    }

    let others: Vec<_> = ctx
        .list::<RolloutManager>(None, None)
        .await?
        .into_iter()
        .filter(|other| other.uid() != rm.uid() && !other.is_deleting())
        .collect();

    if !rm.is_namespace_scoped()
        && !cluster_rbac_shared(rm, &others)
        && let Some(binding) = ctx
            .get_opt::<rbacv1::ClusterRoleBinding>(k8s::DEFAULT_RESOURCE_NAME, None)
            .await?
        && rm.is_bound_by(&binding)
    {
        ctx.delete_if_exists::<rbacv1::ClusterRoleBinding>(k8s::DEFAULT_RESOURCE_NAME, None)
            .await?;
        ctx.delete_if_exists::<rbacv1::ClusterRole>(k8s::DEFAULT_RESOURCE_NAME, None)
            .await?;
    }

    if others.is_empty() {
        for to in AggregateTo::iter() {
            ctx.delete_if_exists::<rbacv1::ClusterRole>(to.role_name(), None)
                .await?;
        }
    } else {
        debug!(
            "{} other RolloutManager(s) remain, keeping aggregate ClusterRoles",
            others.len()
        );
    }

    let mut released = rm.clone();
    released.finalizers_mut().retain(|f| f != k8s::FINALIZER);
    ctx.update(&released).await?;

    info!("released RolloutManager {}", rm.name());
    Ok(())
}
