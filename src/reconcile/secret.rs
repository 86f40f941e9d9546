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
use super::object::{Outcome, converge_with_live, notify};
use crate::context::Context;
use crate::types::v1alpha1::k8s;
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use k8s_openapi::api::core::v1 as corev1;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretOutcome {
    Converged(Outcome),
    Deleted,
    /// Absent and not wanted.
    Skipped,
    /// Present but created by someone else.
    Foreign,
}

/// The notification Secret. A Secret of the same name this instance did not create is never
/// modified or deleted.
pub async fn reconcile_notification_secret(
    ctx: &Context,
    rm: &RolloutManager,
) -> Result<SecretOutcome, Error> {
    let desired = rm.new_notification_secret()?;
    let namespace = rm.namespace()?;
    let live = ctx
        .get_opt::<corev1::Secret>(k8s::NOTIFICATION_SECRET_NAME, Some(namespace.as_str()))
        .await?;

    if let Some(ref secret) = live
        && !rm.owns(&secret.metadata)
    {
        debug!(
            "secret {} is not owned by {}, leaving it alone",
            k8s::NOTIFICATION_SECRET_NAME,
            rm.name()
        );
        return Ok(SecretOutcome::Foreign);
    }

    if !rm.skips_notification_secret() {
        let outcome = converge_with_live(ctx, rm, desired, live).await?;
        return Ok(SecretOutcome::Converged(outcome));
    }

    if live.is_none() {
        return Ok(SecretOutcome::Skipped);
    }

    info!(
        "deleting secret {} of {}: notification secret is skipped",
        k8s::NOTIFICATION_SECRET_NAME,
        rm.name()
    );
    ctx.delete_if_exists::<corev1::Secret>(k8s::NOTIFICATION_SECRET_NAME, Some(namespace.as_str()))
        .await?;
    notify(
        ctx,
        rm,
        "Deleted",
        &format!("Deleted Secret {}", k8s::NOTIFICATION_SECRET_NAME),
    )
    .await;
    Ok(SecretOutcome::Deleted)
}
