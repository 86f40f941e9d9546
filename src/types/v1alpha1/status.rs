// Copyright 2025 The rollouts-manager Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod condition;
pub mod phase;

use condition::Condition;
use phase::Phase;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Overall phase of the RolloutManager. Mirrors `rolloutController` today.
    #[serde(default)]
    pub phase: Phase,

    /// Phase of the managed rollouts controller Deployment.
    #[serde(default)]
    pub rollout_controller: Phase,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Status {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Upserts a condition by type.
    ///
    /// The transition time is refreshed only when status, reason or message changed;
    /// any duplicate entries of the same type are collapsed into one.
    /// Returns whether the observable condition changed.
    pub fn set_condition(&mut self, mut condition: Condition, now: &str) -> bool {
        let existing = self
            .conditions
            .iter()
            .position(|c| c.type_ == condition.type_);

        let Some(index) = existing else {
            condition.last_transition_time = Some(now.to_owned());
            self.conditions.push(condition);
            return true;
        };

        let type_ = condition.type_.clone();
        let mut seen = false;
        self.conditions.retain(|c| {
            if c.type_ != type_ {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });

        let current = &mut self.conditions[index];
        if current.same_state(&condition) && current.last_transition_time.is_some() {
            return false;
        }

        condition.last_transition_time = Some(now.to_owned());
        *current = condition;
        true
    }
}
