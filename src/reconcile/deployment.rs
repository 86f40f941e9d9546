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

/// The rollouts controller Deployment. A changed selector deletes and recreates it.
pub async fn reconcile_deployment(ctx: &Context, rm: &RolloutManager) -> Result<Outcome, Error> {
    let desired = rm.new_deployment(&ctx.config)?;
    converge(ctx, rm, desired).await
}
