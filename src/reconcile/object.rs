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

//! The create / update / recreate / leave-alone decision shared by every owned kind.

use super::Error;
use crate::context::Context;
use crate::diff::{self, Comparable, Verdict};
use crate::types::v1alpha1::rollout_manager::RolloutManager;
use kube::ResourceExt;
use kube::runtime::events::EventType;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    /// Updated in place; carries the first field found to differ.
    Updated(&'static str),
    Recreated(&'static str),
    Unchanged,
}

/// Records an event, logging instead of failing when the event cannot be written.
pub(crate) async fn notify(ctx: &Context, rm: &RolloutManager, reason: &str, message: &str) {
    if let Err(e) = ctx.record(rm, EventType::Normal, reason, message).await {
        warn!("failed to record event {reason}: {e}");
    }
}

/// Creates `obj`, attaching the owner reference when it is namespaced.
pub(crate) async fn create_owned<K>(ctx: &Context, rm: &RolloutManager, mut obj: K) -> Result<K, Error>
where
    K: Comparable + Serialize + DeserializeOwned,
{
    if obj.meta().namespace.is_some() {
        obj.meta_mut().owner_references = Some(vec![rm.new_owner_ref()]);
    }

    let created = ctx.create(&obj).await?;
    info!("created {} {}", K::kind(&()), created.name_any());
    notify(
        ctx,
        rm,
        "Created",
        &format!("Created {} {}", K::kind(&()), created.name_any()),
    )
    .await;
    Ok(created)
}

pub(crate) async fn converge<K>(ctx: &Context, rm: &RolloutManager, desired: K) -> Result<Outcome, Error>
where
    K: Comparable + Serialize + DeserializeOwned,
{
    let name = desired.name_any();
    let namespace = desired.namespace();
    let live = ctx.get_opt::<K>(&name, namespace.as_deref()).await?;
    converge_with_live(ctx, rm, desired, live).await
}

/// Drives `live` towards `desired`. `None` means the object does not exist yet.
pub(crate) async fn converge_with_live<K>(
    ctx: &Context,
    rm: &RolloutManager,
    desired: K,
    live: Option<K>,
) -> Result<Outcome, Error>
where
    K: Comparable + Serialize + DeserializeOwned,
{
    diff::check_normal_form(&desired);

    let Some(mut live) = live else {
        create_owned(ctx, rm, desired).await?;
        return Ok(Outcome::Created);
    };

    let name = desired.name_any();
    let comparison = diff::compare(&desired, &live);
    match comparison.verdict {
        Verdict::Unchanged => {
            debug!("{} {} is up to date", K::kind(&()), name);
            Ok(Outcome::Unchanged)
        }
        Verdict::Changed(field) => {
            info!("updating {} {}: {} differs", K::kind(&()), name, field);
            comparison.target.apply_to(&mut live);
            ctx.update(&live).await?;
            Ok(Outcome::Updated(field))
        }
        Verdict::Recreate(field) => {
            info!(
                "recreating {} {}: immutable field {} differs",
                K::kind(&()),
                name,
                field
            );
            ctx.delete_if_exists::<K>(&name, live.namespace().as_deref())
                .await?;
            create_owned(ctx, rm, comparison.target).await?;
            Ok(Outcome::Recreated(field))
        }
    }
}
