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

use crate::context::Context;
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use crate::types::v1alpha1::status::condition::{
    Condition, ConditionStatus, REASON_ERROR_OCCURRED, REASON_SUCCESS,
};
use crate::types::v1alpha1::status::phase::Phase;
use crate::{context, types};
use k8s_openapi::api::apps::v1 as appsv1;
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use snafu::Snafu;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info_span, warn};

pub mod cleanup;
pub mod configmap;
pub mod deployment;
pub mod object;
pub mod rbac;
pub mod scope;
pub mod secret;
pub mod service;
pub mod service_account;
pub mod status;

/// How long an instance failing the scope check waits before it is looked at again.
pub const SCOPE_RETRY_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(transparent)]
    Context { source: context::Error },

    #[snafu(transparent)]
    Types { source: types::error::Error },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Context { source } if source.is_not_found())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Context { source } if source.is_conflict())
    }

    /// Errors no retry can fix until the RolloutManager spec changes.
    pub fn is_invalid_spec(&self) -> bool {
        match self {
            Error::Types { source } => source.is_invalid_spec(),
            Error::Context { source } => source.is_invalid_spec(),
        }
    }
}

pub async fn reconcile_rollout_manager(
    rm: Arc<RolloutManager>,
    ctx: Arc<Context>,
) -> Result<Action, Error> {
    let span = info_span!(
        "reconcile",
        namespace = rm.metadata.namespace.as_deref().unwrap_or_default(),
        name = %rm.name(),
    );
    reconcile(&rm, &ctx).instrument(span).await
}

async fn reconcile(rm: &RolloutManager, ctx: &Context) -> Result<Action, Error> {
    let ns = rm.namespace()?;
    let latest = ctx.get::<RolloutManager>(&rm.name(), Some(ns.as_str())).await?;

    if latest.is_deleting() {
        debug!(
            "RolloutManager {} is deleted, deletion_timestamp is {:?}",
            latest.name(),
            latest.metadata.deletion_timestamp
        );
        cleanup::finalize(ctx, &latest).await?;
        return Ok(Action::await_change());
    }

    let latest = cleanup::ensure_finalizer(ctx, latest).await?;

    // 1. Scope check against every instance on the cluster
    let all = ctx.list::<RolloutManager>(None, None).await?;
    let verdict = scope::check_scope(&latest, &all, ctx.config.namespace_scoped_only);
    if let Some(reason) = verdict.reason() {
        warn!("{}: {}", reason, verdict.message());
        status::write_status(
            ctx,
            &latest,
            Phase::Failure,
            Condition::reconciled(ConditionStatus::False, reason, verdict.message()),
        )
        .await?;
        if let Err(e) = ctx
            .record(&latest, EventType::Warning, reason, verdict.message())
            .await
        {
            warn!("failed to record event {reason}: {e}");
        }
        return Ok(Action::requeue(SCOPE_RETRY_INTERVAL));
    }

    // 2. Owned objects, then 3. status from the Deployment
    let result = reconcile_owned(ctx, &latest).await;

    let deployment = match ctx
        .get_opt::<appsv1::Deployment>(&latest.deployment_name(), Some(ns.as_str()))
        .await
    {
        Ok(deployment) => deployment,
        Err(e) => {
            warn!("reading Deployment for status failed: {e}");
            return result.and(Err(e.into()));
        }
    };
    let phase = status::controller_phase(deployment.as_ref());

    let condition = match &result {
        Ok(()) => Condition::reconciled(ConditionStatus::True, REASON_SUCCESS, ""),
        Err(e) => Condition::reconciled(ConditionStatus::False, REASON_ERROR_OCCURRED, e.to_string()),
    };

    match status::write_status(ctx, &latest, phase, condition).await {
        Ok(_) => {}
        Err(e) if result.is_ok() => return Err(e),
        Err(e) => warn!("writing status failed: {e}"),
    }

    result.map(|()| Action::await_change())
}

async fn reconcile_owned(ctx: &Context, rm: &RolloutManager) -> Result<(), Error> {
    service_account::reconcile_service_account(ctx, rm).await?;
    rbac::reconcile_rbac(ctx, rm).await?;
    secret::reconcile_notification_secret(ctx, rm).await?;
    configmap::reconcile_plugin_config_map(ctx, rm).await?;
    deployment::reconcile_deployment(ctx, rm).await?;
    service::reconcile_metrics_service(ctx, rm).await?;
    service::reconcile_service_monitor(ctx, rm).await?;
    Ok(())
}

pub fn error_policy(_object: Arc<RolloutManager>, error: &Error, _ctx: Arc<Context>) -> Action {
    if error.is_not_found() || error.is_invalid_spec() {
        Action::await_change()
    } else if error.is_conflict() {
        debug!("write conflict, retrying against the latest objects");
        Action::requeue(Duration::from_secs(1))
    } else {
        Action::requeue(Duration::from_secs(5))
    }
}
